use std::sync::Arc;

use shared::{domain::Status, protocol::UnitPatch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    store::UnitStore,
    view_state::{UnitView, ViewState},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    ChangeStatus,
    AddComment,
    ToggleCommentResolved,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::ChangeStatus => "change_status",
            Intent::AddComment => "add_comment",
            Intent::ToggleCommentResolved => "toggle_comment_resolved",
        }
    }
}

/// Turns user intents into partial-update requests.
///
/// Nothing is applied to the view state here; the push channel delivers the
/// confirmed unit. Requests run on spawned tasks, so every method must be
/// called from inside a Tokio runtime. The returned handle may be awaited or
/// dropped; dropping it does not cancel the request.
pub struct MutationDispatcher {
    store: Arc<dyn UnitStore>,
}

impl MutationDispatcher {
    pub fn new(store: Arc<dyn UnitStore>) -> Self {
        Self { store }
    }

    /// `None` clears the status.
    pub fn change_status(
        &self,
        view: &ViewState,
        level: &str,
        unit_number: &str,
        status: Option<Status>,
    ) -> Option<JoinHandle<()>> {
        let target = resolve(view, level, unit_number, Intent::ChangeStatus)?;
        Some(self.dispatch(
            target.unit.unit_number.clone(),
            UnitPatch::status(status),
            Intent::ChangeStatus,
        ))
    }

    pub fn add_comment(
        &self,
        view: &ViewState,
        level: &str,
        unit_number: &str,
        text: &str,
    ) -> Option<JoinHandle<()>> {
        if text.trim().is_empty() {
            debug!(level, unit_number, "blank comment not sent");
            return None;
        }
        let target = resolve(view, level, unit_number, Intent::AddComment)?;
        Some(self.dispatch(
            target.unit.unit_number.clone(),
            UnitPatch::comment(text),
            Intent::AddComment,
        ))
    }

    /// Comments are addressed by position, so the index must exist in the
    /// local copy of the unit.
    pub fn toggle_comment_resolved(
        &self,
        view: &ViewState,
        level: &str,
        unit_number: &str,
        comment_index: usize,
    ) -> Option<JoinHandle<()>> {
        let target = resolve(view, level, unit_number, Intent::ToggleCommentResolved)?;
        let comment_count = target.unit.comments.len();
        if comment_index >= comment_count {
            warn!(
                level,
                unit_number,
                comment_index,
                comment_count,
                "comment index out of range; toggle not sent"
            );
            return None;
        }
        Some(self.dispatch(
            target.unit.unit_number.clone(),
            UnitPatch::toggle_comment(comment_index),
            Intent::ToggleCommentResolved,
        ))
    }

    fn dispatch(&self, unit_number: String, patch: UnitPatch, intent: Intent) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match store.update_unit(&unit_number, &patch).await {
                Ok(()) => info!(
                    unit_number = %unit_number,
                    intent = intent.as_str(),
                    "update sent, waiting for push confirmation"
                ),
                Err(err) => error!(
                    unit_number = %unit_number,
                    intent = intent.as_str(),
                    error = %err,
                    "unit update failed"
                ),
            }
        })
    }
}

fn resolve<'a>(
    view: &'a ViewState,
    level: &str,
    unit_number: &str,
    intent: Intent,
) -> Option<&'a UnitView> {
    let target = view.find_unit(level, unit_number);
    if target.is_none() {
        warn!(
            level,
            unit_number,
            intent = intent.as_str(),
            "no such unit in view; intent dropped"
        );
    }
    target
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
