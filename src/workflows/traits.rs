// Collaborator interfaces - the engine only ever talks to these

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use super::errors::WorkflowError;
use super::notifier::CompletionSignal;
use super::types::*;

/// Extra arguments handed to a workflow when executing a command
#[derive(Debug, Default)]
pub struct TransitionArgs {
    pub comment: Option<String>,
    pub suppress_comment: bool,
    /// State the item must still be in for the write to happen
    pub expected_state_id: Option<StateId>,
    /// Completed by the pipeline once the transition has been applied
    pub completion: Option<CompletionSignal>,
}

/// Looks up workflows by id
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkflowProvider: Send + Sync {
    async fn get_workflow(&self, workflow_id: &str) -> Option<Arc<dyn Workflow>>;
}

/// A named graph of states and commands
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Workflow: Send + Sync {
    fn id(&self) -> &str;

    async fn get_state(&self, state_id: &str) -> Option<WorkflowState>;

    /// Commands available from a state; empty when the state is unknown
    async fn get_commands(&self, state_id: &str) -> BTreeSet<CommandId>;

    /// Apply a command to an item and return the state it landed in
    async fn execute(
        &self,
        command_id: &str,
        item: &ItemRef,
        args: TransitionArgs,
    ) -> Result<StateId, WorkflowError>;
}

/// Resolves a logical reference to the item's live workflow position
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ItemResolver: Send + Sync {
    /// Side-effect free; `NotFound` when the revision no longer exists
    async fn resolve(&self, item: &ItemRef) -> Result<ItemSnapshot, WorkflowError>;
}

/// Index of which items currently sit in which state
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StateIndex: Send + Sync {
    /// A finite snapshot taken at call time, not a live cursor
    async fn items_in_state(&self, workflow_id: &str, state_id: &str) -> Result<Vec<ItemRef>>;
}

/// Fire-and-forget signals back to whoever shows the items
#[cfg_attr(test, automock)]
pub trait UiSignals: Send + Sync {
    fn alert(&self, message: &str);
    fn request_refresh(&self);
}

/// Collects a comment before a single-item transition
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommentPrompt: Send + Sync {
    async fn collect(&self, request: &CommentRequest) -> CommentOutcome;
}

/// Comment step for callers that never ask the user anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoComment;

#[async_trait]
impl CommentPrompt for NoComment {
    async fn collect(&self, _request: &CommentRequest) -> CommentOutcome {
        CommentOutcome::Skipped
    }
}
