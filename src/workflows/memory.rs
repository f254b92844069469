// In-memory workflow store implementing every collaborator the engine needs

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::errors::WorkflowError;
use super::fixture::{Fixture, FixtureItem, WorkflowDefinition};
use super::traits::*;
use super::types::*;

/// One applied transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub item: ItemRef,
    pub workflow_id: String,
    pub from_state: StateId,
    pub to_state: StateId,
    pub command_id: CommandId,
    pub comment: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredItem {
    item: ItemRef,
    workflow_id: String,
    state_id: StateId,
}

#[derive(Debug, Default)]
struct StoreInner {
    workflows: BTreeMap<String, WorkflowDefinition>,
    /// Insertion order is the order the state index reports
    items: Vec<StoredItem>,
    history: Vec<HistoryEntry>,
}

impl StoreInner {
    fn find(&self, item: &ItemRef) -> Option<&StoredItem> {
        self.items.iter().find(|stored| &stored.item == item)
    }

    fn find_mut(&mut self, item: &ItemRef) -> Option<&mut StoredItem> {
        self.items.iter_mut().find(|stored| &stored.item == item)
    }
}

/// Workflow store kept in memory.
///
/// Writes go through a compare-and-swap on the item's current state, so two
/// batches racing for the same item cannot both apply a transition.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkflowStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Result<Self> {
        fixture.validate()?;

        let mut inner = StoreInner::default();
        for workflow in fixture.workflows {
            inner.workflows.insert(workflow.id.clone(), workflow);
        }
        for item in fixture.items {
            inner.items.push(StoredItem {
                item: item.item_ref(),
                workflow_id: item.workflow,
                state_id: item.state,
            });
        }

        info!(
            workflows = inner.workflows.len(),
            items = inner.items.len(),
            "Loaded workflow store"
        );
        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
        })
    }

    pub async fn to_fixture(&self) -> Fixture {
        let inner = self.inner.read().await;
        Fixture {
            workflows: inner.workflows.values().cloned().collect(),
            items: inner
                .items
                .iter()
                .map(|stored| FixtureItem {
                    id: stored.item.id.clone(),
                    language: stored.item.language.clone(),
                    version: stored.item.version,
                    workflow: stored.workflow_id.clone(),
                    state: stored.state_id.clone(),
                })
                .collect(),
        }
    }

    pub async fn add_workflow(&self, workflow: WorkflowDefinition) {
        let mut inner = self.inner.write().await;
        inner.workflows.insert(workflow.id.clone(), workflow);
    }

    /// Place an item in a state, replacing any earlier position
    pub async fn insert_item(&self, item: ItemRef, workflow_id: &str, state_id: &str) {
        let mut inner = self.inner.write().await;
        match inner.find_mut(&item) {
            Some(stored) => {
                stored.workflow_id = workflow_id.to_string();
                stored.state_id = state_id.to_string();
            }
            None => inner.items.push(StoredItem {
                item,
                workflow_id: workflow_id.to_string(),
                state_id: state_id.to_string(),
            }),
        }
    }

    /// Move an item without going through a command, as another editor might.
    /// Returns false when the item does not exist.
    pub async fn set_state(&self, item: &ItemRef, state_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        match inner.find_mut(item) {
            Some(stored) => {
                stored.state_id = state_id.to_string();
                true
            }
            None => false,
        }
    }

    pub async fn remove_item(&self, item: &ItemRef) -> bool {
        let mut inner = self.inner.write().await;
        let before = inner.items.len();
        inner.items.retain(|stored| &stored.item != item);
        inner.items.len() != before
    }

    pub async fn state_of(&self, item: &ItemRef) -> Option<StateId> {
        let inner = self.inner.read().await;
        inner.find(item).map(|stored| stored.state_id.clone())
    }

    pub async fn history(&self, item: &ItemRef) -> Vec<HistoryEntry> {
        let inner = self.inner.read().await;
        inner
            .history
            .iter()
            .filter(|entry| &entry.item == item)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl WorkflowProvider for InMemoryWorkflowStore {
    async fn get_workflow(&self, workflow_id: &str) -> Option<Arc<dyn Workflow>> {
        let inner = self.inner.read().await;
        if !inner.workflows.contains_key(workflow_id) {
            return None;
        }
        Some(Arc::new(StoreWorkflow {
            workflow_id: workflow_id.to_string(),
            inner: self.inner.clone(),
        }))
    }
}

#[async_trait]
impl ItemResolver for InMemoryWorkflowStore {
    async fn resolve(&self, item: &ItemRef) -> Result<ItemSnapshot, WorkflowError> {
        let inner = self.inner.read().await;
        inner
            .find(item)
            .map(|stored| ItemSnapshot {
                item: stored.item.clone(),
                current_state_id: stored.state_id.clone(),
            })
            .ok_or_else(|| WorkflowError::NotFound { item: item.clone() })
    }
}

#[async_trait]
impl StateIndex for InMemoryWorkflowStore {
    async fn items_in_state(&self, workflow_id: &str, state_id: &str) -> Result<Vec<ItemRef>> {
        let inner = self.inner.read().await;
        Ok(inner
            .items
            .iter()
            .filter(|stored| stored.workflow_id == workflow_id && stored.state_id == state_id)
            .map(|stored| stored.item.clone())
            .collect())
    }
}

/// A workflow view bound to the store it lives in
struct StoreWorkflow {
    workflow_id: String,
    inner: Arc<RwLock<StoreInner>>,
}

#[async_trait]
impl Workflow for StoreWorkflow {
    fn id(&self) -> &str {
        &self.workflow_id
    }

    async fn get_state(&self, state_id: &str) -> Option<WorkflowState> {
        let inner = self.inner.read().await;
        inner
            .workflows
            .get(&self.workflow_id)?
            .states
            .get(state_id)
            .map(|state| state.to_workflow_state(state_id))
    }

    async fn get_commands(&self, state_id: &str) -> BTreeSet<CommandId> {
        self.get_state(state_id)
            .await
            .map(|state| state.available_commands)
            .unwrap_or_default()
    }

    async fn execute(
        &self,
        command_id: &str,
        item: &ItemRef,
        args: TransitionArgs,
    ) -> Result<StateId, WorkflowError> {
        let mut inner = self.inner.write().await;

        let stored = inner
            .find(item)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound { item: item.clone() })?;

        if let Some(expected) = args.expected_state_id.as_deref() {
            if stored.state_id != expected {
                return Err(WorkflowError::StaleState {
                    item: item.clone(),
                    expected: expected.to_string(),
                    actual: stored.state_id,
                });
            }
        }

        let invalid = || WorkflowError::InvalidCommand {
            state_id: stored.state_id.clone(),
            command_id: command_id.to_string(),
        };
        if stored.workflow_id != self.workflow_id {
            return Err(invalid());
        }
        let workflow = inner.workflows.get(&self.workflow_id).ok_or_else(invalid)?;
        let command = workflow
            .states
            .get(&stored.state_id)
            .and_then(|state| state.commands.get(command_id))
            .ok_or_else(invalid)?;

        let next_state = match command.next_state.as_deref() {
            Some(next) if workflow.states.contains_key(next) => next.to_string(),
            _ => {
                return Err(WorkflowError::MissingNextStep {
                    state_id: stored.state_id.clone(),
                    command_id: command_id.to_string(),
                })
            }
        };

        if let Some(target) = inner.find_mut(item) {
            target.state_id = next_state.clone();
        }
        inner.history.push(HistoryEntry {
            item: item.clone(),
            workflow_id: self.workflow_id.clone(),
            from_state: stored.state_id.clone(),
            to_state: next_state.clone(),
            command_id: command_id.to_string(),
            comment: if args.suppress_comment { None } else { args.comment },
            at: Utc::now(),
        });
        drop(inner);

        debug!(item = %item, from = %stored.state_id, to = %next_state, "Item moved");
        if let Some(completion) = args.completion {
            completion.complete();
        }
        Ok(next_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editorial() -> WorkflowDefinition {
        WorkflowDefinition::new("editorial")
            .state("draft", "Draft")
            .state("review", "Awaiting Approval")
            .state("done", "Done")
            .command("draft", "submit", Some("review"))
            .command("review", "approve", Some("done"))
            .command("review", "escalate", None)
    }

    async fn store_with(items: &[(&str, &str)]) -> InMemoryWorkflowStore {
        let store = InMemoryWorkflowStore::new();
        store.add_workflow(editorial()).await;
        for (id, state) in items {
            store
                .insert_item(ItemRef::new(*id, "en", 1), "editorial", state)
                .await;
        }
        store
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let store = store_with(&[("home", "draft")]).await;
        let home = ItemRef::new("home", "en", 1);

        let first = store.resolve(&home).await.unwrap();
        let second = store.resolve(&home).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.current_state_id, "draft");
    }

    #[tokio::test]
    async fn test_resolve_unknown_revision_is_not_found() {
        let store = store_with(&[("home", "draft")]).await;

        let err = store.resolve(&ItemRef::new("home", "en", 2)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_index_lists_items_in_insertion_order() {
        let store = store_with(&[("c", "draft"), ("a", "review"), ("b", "draft")]).await;

        let items = store.items_in_state("editorial", "draft").await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);

        assert!(store.items_in_state("legal", "draft").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_execute_moves_item_and_records_history() {
        let store = store_with(&[("home", "draft")]).await;
        let home = ItemRef::new("home", "en", 1);
        let workflow = store.get_workflow("editorial").await.unwrap();

        let args = TransitionArgs {
            comment: Some("ready".to_string()),
            expected_state_id: Some("draft".to_string()),
            ..Default::default()
        };
        let new_state = workflow.execute("submit", &home, args).await.unwrap();

        assert_eq!(new_state, "review");
        assert_eq!(store.state_of(&home).await.as_deref(), Some("review"));

        let history = store.history(&home).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_state, "draft");
        assert_eq!(history[0].to_state, "review");
        assert_eq!(history[0].comment.as_deref(), Some("ready"));
    }

    #[tokio::test]
    async fn test_execute_rejects_stale_expected_state() {
        let store = store_with(&[("home", "draft")]).await;
        let home = ItemRef::new("home", "en", 1);
        let workflow = store.get_workflow("editorial").await.unwrap();
        store.set_state(&home, "review").await;

        let args = TransitionArgs {
            expected_state_id: Some("draft".to_string()),
            ..Default::default()
        };
        let err = workflow.execute("submit", &home, args).await.unwrap_err();

        assert!(matches!(err, WorkflowError::StaleState { .. }));
        assert_eq!(store.state_of(&home).await.as_deref(), Some("review"));
        assert!(store.history(&home).await.is_empty());
    }

    #[tokio::test]
    async fn test_command_without_destination_is_missing_next_step() {
        let store = store_with(&[("home", "review")]).await;
        let home = ItemRef::new("home", "en", 1);
        let workflow = store.get_workflow("editorial").await.unwrap();

        let err = workflow
            .execute("escalate", &home, TransitionArgs::default())
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::MissingNextStep { .. }));
        assert_eq!(store.state_of(&home).await.as_deref(), Some("review"));
    }

    #[tokio::test]
    async fn test_get_commands_for_unknown_state_is_empty() {
        let store = store_with(&[]).await;
        let workflow = store.get_workflow("editorial").await.unwrap();

        assert_eq!(workflow.id(), "editorial");
        assert!(workflow.get_commands("archived").await.is_empty());
        assert_eq!(workflow.get_commands("review").await.len(), 2);
        assert!(store.get_workflow("legal").await.is_none());
    }

    #[tokio::test]
    async fn test_fixture_round_trip_keeps_states() {
        let store = store_with(&[("home", "draft"), ("about", "review")]).await;
        store.set_state(&ItemRef::new("home", "en", 1), "done").await;

        let reloaded = InMemoryWorkflowStore::from_fixture(store.to_fixture().await).unwrap();

        assert_eq!(
            reloaded.state_of(&ItemRef::new("home", "en", 1)).await.as_deref(),
            Some("done")
        );
        assert_eq!(
            reloaded.state_of(&ItemRef::new("about", "en", 1)).await.as_deref(),
            Some("review")
        );
    }
}
