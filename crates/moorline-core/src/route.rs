//! Event routing layer.
//!
//! Receives host-originated signals and either answers synchronously (a
//! pure function of current state) or schedules a task. Two entry points:
//!
//! - Focus change (buffer or window switch): if a conversation is bound to
//!   the view, its lazy history fill is spawned fire-and-forget.
//! - Input render: synchronously composes the inline prefix reflecting the
//!   workspace's connection state and the conversation's loading flag. The
//!   host's modifier contract requires an immediate return value, so no
//!   suspension is allowed on this path.

use std::rc::Rc;

use moorline_host::{Host, HostStatus, ViewId};

use crate::{
    config::ColorConfig,
    conversation::ConversationDirectory,
    task::Scheduler,
    workspace::ConnectionHealth,
};

/// Color token for the `[` `]` delimiters around inline indicators.
const DELIMITER_COLOR: &str = "input_delimiter";

/// Routes host signals to engine state and tasks.
pub struct Router {
    scheduler: Scheduler,
    host: Rc<dyn Host>,
    conversations: Rc<dyn ConversationDirectory>,
    health: Rc<dyn ConnectionHealth>,
    colors: ColorConfig,
}

impl Router {
    /// Create a router over the engine's collaborators.
    #[must_use]
    pub fn new(
        scheduler: Scheduler,
        conversations: Rc<dyn ConversationDirectory>,
        health: Rc<dyn ConnectionHealth>,
        colors: ColorConfig,
    ) -> Self {
        let host = Rc::clone(scheduler.host());
        Self { scheduler, host, conversations, health, colors }
    }

    /// Handle a focus-change signal for `view`.
    ///
    /// Pure lookup: when no conversation is bound to the view, nothing is
    /// scheduled and the host still gets "handled".
    pub fn on_focus_change(&self, view: ViewId) -> HostStatus {
        if let Some(conversation) = self.conversations.by_view(view) {
            tracing::debug!(view = view.0, workspace = %conversation.workspace_name(), "focus change; filling history");
            self.scheduler.spawn(conversation.fill_history());
        }
        HostStatus::Ok
    }

    /// Compose the input-area prefix for `view`, synchronously.
    ///
    /// Fixed order: disconnected indicator, then loading indicator, then the
    /// original text unchanged. Views without a bound conversation pass
    /// through untouched. A workspace name the health view does not know
    /// reads as disconnected.
    #[must_use]
    pub fn render_input(&self, view: ViewId, input: &str) -> String {
        let Some(conversation) = self.conversations.by_view(view) else {
            return input.to_string();
        };

        let mut prefix = String::new();
        if !self.health.is_connected(conversation.workspace_name()) {
            prefix.push_str(&self.indicator("disconnected", &self.colors.disconnected));
        }
        if conversation.is_loading() {
            prefix.push_str(&self.indicator("loading", &self.colors.loading));
        }
        format!("{prefix}{input}")
    }

    /// Render one `[word]` indicator followed by a space, the delimiters in
    /// the host's input-delimiter color and the word in `color`.
    fn indicator(&self, word: &str, color: &str) -> String {
        format!(
            "{open}{word}{close} ",
            open = self.with_color(DELIMITER_COLOR, "["),
            word = self.with_color(color, word),
            close = self.with_color(DELIMITER_COLOR, "]"),
        )
    }

    fn with_color(&self, token: &str, text: &str) -> String {
        format!("{}{text}{}", self.host.color(token), self.host.color("reset"))
    }
}
