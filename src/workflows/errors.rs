use thiserror::Error;

use super::types::{CommandId, ItemRef, StateId};

/// Per-item failures. None of these abort a multi-item batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("Item {item} no longer exists")]
    NotFound { item: ItemRef },
    #[error("Item {item} is in state '{actual}', expected '{expected}'")]
    StaleState {
        item: ItemRef,
        expected: StateId,
        actual: StateId,
    },
    #[error("State '{state_id}' does not specify the next step for command '{command_id}'")]
    MissingNextStep {
        state_id: StateId,
        command_id: CommandId,
    },
    #[error("Command '{command_id}' is not available in state '{state_id}'")]
    InvalidCommand {
        state_id: StateId,
        command_id: CommandId,
    },
    #[error("Transition failed: {0}")]
    Failed(String),
}

impl WorkflowError {
    /// Errors that mean "someone else moved the item first"
    pub fn is_moved(&self) -> bool {
        matches!(
            self,
            WorkflowError::NotFound { .. }
                | WorkflowError::StaleState { .. }
                | WorkflowError::InvalidCommand { .. }
        )
    }
}

/// Errors that stop a whole action before any item is touched
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Workflow '{0}' does not exist")]
    UnknownWorkflow(String),
    #[error("State index lookup for {workflow_id}/{state_id} failed: {cause}")]
    StateIndex {
        workflow_id: String,
        state_id: StateId,
        cause: anyhow::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseItemRefError {
    #[error("Expected 'id,language,version', got '{0}'")]
    Malformed(String),
    #[error("Invalid item version '{0}'")]
    InvalidVersion(String),
}
