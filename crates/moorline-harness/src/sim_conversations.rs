//! In-memory conversation collaborators for routing tests.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use moorline_core::{Conversation, ConversationDirectory, TaskError};
use moorline_host::ViewId;

struct ConvState {
    loading: bool,
    fills: u32,
}

/// Conversation stub recording history-fill invocations.
#[derive(Clone)]
pub struct SimConversation {
    workspace: String,
    state: Rc<RefCell<ConvState>>,
}

impl SimConversation {
    /// Create a conversation belonging to the named workspace.
    #[must_use]
    pub fn new(workspace: &str) -> Self {
        Self {
            workspace: workspace.to_string(),
            state: Rc::new(RefCell::new(ConvState { loading: false, fills: 0 })),
        }
    }

    /// Set the loading flag read by the input renderer.
    pub fn set_loading(&self, loading: bool) {
        self.state.borrow_mut().loading = loading;
    }

    /// Number of history fills triggered so far.
    #[must_use]
    pub fn fills(&self) -> u32 {
        self.state.borrow().fills
    }
}

impl Conversation for SimConversation {
    fn workspace_name(&self) -> &str {
        &self.workspace
    }

    fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    fn fill_history(&self) -> LocalBoxFuture<'static, Result<(), TaskError>> {
        let state = Rc::clone(&self.state);
        async move {
            state.borrow_mut().fills += 1;
            Ok(())
        }
        .boxed_local()
    }
}

/// View-keyed directory of [`SimConversation`]s.
#[derive(Clone, Default)]
pub struct SimConversations {
    inner: Rc<RefCell<HashMap<ViewId, Rc<SimConversation>>>>,
}

impl SimConversations {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a conversation to a view.
    pub fn bind(&self, view: ViewId, conversation: SimConversation) {
        self.inner.borrow_mut().insert(view, Rc::new(conversation));
    }
}

impl ConversationDirectory for SimConversations {
    fn by_view(&self, view: ViewId) -> Option<Rc<dyn Conversation>> {
        self.inner
            .borrow()
            .get(&view)
            .map(|conversation| Rc::clone(conversation) as Rc<dyn Conversation>)
    }
}
