//! Conversation collaborator traits.
//!
//! Conversations (their history storage, message model, and rendering) are
//! external to this engine. The engine only needs three things: find the
//! conversation bound to a view, read its loading flag, and trigger its lazy
//! history fill as a fire-and-forget task. It never mutates conversation
//! internals directly.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use moorline_host::ViewId;

use crate::error::TaskError;

/// One conversation with a remote channel or user.
pub trait Conversation {
    /// Name of the workspace this conversation belongs to.
    fn workspace_name(&self) -> &str;

    /// Whether a history fill is currently in flight.
    fn is_loading(&self) -> bool;

    /// Produce the lazy history-fill routine.
    ///
    /// The engine spawns the returned future as a task and never awaits it
    /// in place; repeated calls while a fill is in flight are the
    /// conversation's concern.
    fn fill_history(&self) -> LocalBoxFuture<'static, Result<(), TaskError>>;
}

/// Lookup of conversations by host view.
pub trait ConversationDirectory {
    /// The conversation bound to `view`, if any.
    fn by_view(&self, view: ViewId) -> Option<Rc<dyn Conversation>>;
}
