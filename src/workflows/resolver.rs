// Item resolution with staleness detection

use tracing::debug;

use super::errors::WorkflowError;
use super::traits::ItemResolver;
use super::types::{ItemRef, ItemSnapshot};

/// Resolve an item and check it still sits where the caller thinks it does.
///
/// A mismatch against `expected_state_id` is the concurrent-modification signal.
pub async fn resolve_expecting(
    resolver: &dyn ItemResolver,
    item: &ItemRef,
    expected_state_id: Option<&str>,
) -> Result<ItemSnapshot, WorkflowError> {
    let snapshot = resolver.resolve(item).await?;

    match expected_state_id {
        Some(expected) if snapshot.current_state_id != expected => {
            debug!(
                item = %item,
                expected = expected,
                actual = %snapshot.current_state_id,
                "Item is no longer in the expected state"
            );
            Err(WorkflowError::StaleState {
                item: item.clone(),
                expected: expected.to_string(),
                actual: snapshot.current_state_id,
            })
        }
        _ => Ok(snapshot),
    }
}
