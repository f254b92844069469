// Transition executor - one command, one item

use tracing::{debug, warn};

use super::errors::WorkflowError;
use super::traits::{TransitionArgs, Workflow};
use super::types::{ItemSnapshot, StateId};
use crate::observability::transition_metrics;

/// Apply `command_id` to the snapshot's item.
///
/// The snapshot's state is always sent as the expected state so the workflow
/// can refuse the write if the item moved after validation. Batch sends
/// suppress the comment step and record the state's display name instead.
pub async fn execute(
    snapshot: &ItemSnapshot,
    workflow: &dyn Workflow,
    command_id: &str,
    display_name: &str,
    mut args: TransitionArgs,
) -> Result<StateId, WorkflowError> {
    args.expected_state_id = Some(snapshot.current_state_id.clone());
    if args.comment.is_none() && args.suppress_comment {
        args.comment = Some(display_name.to_string());
    }

    transition_metrics().record_execution();
    match workflow.execute(command_id, &snapshot.item, args).await {
        Ok(new_state) => {
            debug!(
                item = %snapshot.item,
                from = %snapshot.current_state_id,
                to = %new_state,
                command = command_id,
                "Transition applied"
            );
            Ok(new_state)
        }
        Err(e @ WorkflowError::MissingNextStep { .. }) => {
            transition_metrics().record_missing_step();
            warn!(item = %snapshot.item, command = command_id, "{}", e);
            Err(e)
        }
        Err(e) => {
            transition_metrics().record_failure();
            warn!(item = %snapshot.item, command = command_id, error = %e, "Transition failed");
            Err(e)
        }
    }
}
