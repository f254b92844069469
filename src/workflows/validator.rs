// Command validity against an item's current state

use tracing::debug;

use super::traits::Workflow;
use super::types::{ItemSnapshot, WorkflowState};

/// Is `command_id` legal from the snapshot's current state?
///
/// Unknown states and states without commands are simply invalid. Call this
/// right before executing; the answer goes stale as soon as anyone else writes.
pub async fn is_valid(snapshot: &ItemSnapshot, workflow: &dyn Workflow, command_id: &str) -> bool {
    valid_state(snapshot, workflow, command_id).await.is_some()
}

/// The snapshot's current state, if `command_id` is available from it
pub async fn valid_state(
    snapshot: &ItemSnapshot,
    workflow: &dyn Workflow,
    command_id: &str,
) -> Option<WorkflowState> {
    match workflow.get_state(&snapshot.current_state_id).await {
        Some(state) if state.available_commands.contains(command_id) => Some(state),
        Some(_) => {
            debug!(
                item = %snapshot.item,
                state = %snapshot.current_state_id,
                command = command_id,
                "Command not available in current state"
            );
            None
        }
        None => {
            debug!(
                item = %snapshot.item,
                state = %snapshot.current_state_id,
                "State not found in workflow"
            );
            None
        }
    }
}
