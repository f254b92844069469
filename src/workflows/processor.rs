// Batch processor - resolve, validate and execute across a set of items

use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

use super::errors::{EngineError, WorkflowError};
use super::executor;
use super::notifier::CompletionNotifier;
use super::resolver::resolve_expecting;
use super::traits::*;
use super::types::*;
use super::validator::valid_state;
use crate::observability::{create_batch_span, transition_metrics, OperationTimer};
use crate::telemetry::generate_correlation_id;

/// The user actions the engine understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionAction {
    /// One item, preceded by the comment step unless suppressed
    Send {
        request: TransitionRequest,
        suppress_comment: bool,
    },
    /// An explicit selection of items expected to be in `state_id`
    SendSelected {
        workflow_id: String,
        state_id: StateId,
        command_id: CommandId,
        items: Vec<SelectedItem>,
    },
    /// Every item the state index lists under `state_id`
    SendAll {
        workflow_id: String,
        state_id: StateId,
        command_id: CommandId,
    },
}

/// How a single item fared
#[derive(Debug)]
enum ItemOutcome {
    Moved,
    Executed(Result<StateId, WorkflowError>),
}

/// Options for one item execution
#[derive(Debug, Default)]
struct ExecutionOptions {
    comment: Option<String>,
    suppress_comment: bool,
    notify_on_completion: bool,
}

/// Accumulates per-item outcomes for one batch; never shared across batches
#[derive(Debug, Default)]
struct BatchAccumulator {
    processed: usize,
    succeeded: usize,
    moved: bool,
    missing_next_step: bool,
}

impl BatchAccumulator {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Moved => {
                transition_metrics().record_moved();
                self.moved = true;
            }
            ItemOutcome::Executed(result) => {
                self.processed += 1;
                match result {
                    Ok(_) => self.succeeded += 1,
                    Err(WorkflowError::MissingNextStep { .. }) => self.missing_next_step = true,
                    Err(_) => {}
                }
            }
        }
    }

    fn finish(self) -> BatchResult {
        BatchResult {
            processed_count: self.processed,
            succeeded_count: self.succeeded,
            item_was_moved: self.moved,
            missing_next_step: self.missing_next_step,
        }
    }
}

/// Orchestrates item resolution, command validation and execution
pub struct TransitionEngine {
    provider: Arc<dyn WorkflowProvider>,
    resolver: Arc<dyn ItemResolver>,
    index: Arc<dyn StateIndex>,
    signals: Arc<dyn UiSignals>,
    comments: Arc<dyn CommentPrompt>,
    notifier: Arc<CompletionNotifier>,
    notify_on_completion: bool,
}

impl TransitionEngine {
    pub fn new(
        provider: Arc<dyn WorkflowProvider>,
        resolver: Arc<dyn ItemResolver>,
        index: Arc<dyn StateIndex>,
        signals: Arc<dyn UiSignals>,
    ) -> Self {
        Self {
            provider,
            resolver,
            index,
            signals,
            comments: Arc::new(NoComment),
            notifier: Arc::new(CompletionNotifier::new()),
            notify_on_completion: true,
        }
    }

    /// Build an engine whose provider, resolver and index are one store
    pub fn from_store<S>(store: Arc<S>, signals: Arc<dyn UiSignals>) -> Self
    where
        S: WorkflowProvider + ItemResolver + StateIndex + 'static,
    {
        Self::new(store.clone(), store.clone(), store, signals)
    }

    pub fn with_comment_prompt(mut self, comments: Arc<dyn CommentPrompt>) -> Self {
        self.comments = comments;
        self
    }

    /// Whether all-in-state transitions request a refresh when they complete
    pub fn with_completion_notifications(mut self, enabled: bool) -> Self {
        self.notify_on_completion = enabled;
        self
    }

    pub fn notifier(&self) -> &CompletionNotifier {
        &self.notifier
    }

    /// Dispatch one user action
    pub async fn handle(&self, action: TransitionAction) -> Result<BatchOutcome, EngineError> {
        match action {
            TransitionAction::Send {
                request,
                suppress_comment,
            } => self.send_one(&request, suppress_comment).await,
            TransitionAction::SendSelected {
                workflow_id,
                state_id,
                command_id,
                items,
            } => {
                self.send_selected(&workflow_id, &state_id, &command_id, &items)
                    .await
            }
            TransitionAction::SendAll {
                workflow_id,
                state_id,
                command_id,
            } => self.send_all(&workflow_id, &state_id, &command_id).await,
        }
    }

    /// Transition a single item.
    ///
    /// A target that no longer resolves is reported as moved before the
    /// workflow is looked up. A target that no longer offers the command also
    /// aborts before the comment step and before any execution.
    pub async fn send_one(
        &self,
        request: &TransitionRequest,
        suppress_comment: bool,
    ) -> Result<BatchOutcome, EngineError> {
        let span = create_batch_span("send", &request.workflow_id, &generate_correlation_id());
        self.send_one_inner(request, suppress_comment)
            .instrument(span)
            .await
    }

    async fn send_one_inner(
        &self,
        request: &TransitionRequest,
        suppress_comment: bool,
    ) -> Result<BatchOutcome, EngineError> {
        let timer = OperationTimer::new("send");
        transition_metrics().record_batch();
        let mut batch = BatchAccumulator::default();

        let snapshot = match resolve_expecting(
            self.resolver.as_ref(),
            &request.target,
            request.expected_state_id.as_deref(),
        )
        .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                info!(item = %request.target, reason = %e, "Target item has moved");
                batch.record(ItemOutcome::Moved);
                return Ok(self.conclude(batch));
            }
        };

        let workflow = self.workflow(&request.workflow_id).await?;
        let Some(state) =
            valid_state(&snapshot, workflow.as_ref(), &request.command_id).await
        else {
            info!(
                item = %request.target,
                state = %snapshot.current_state_id,
                command = %request.command_id,
                "Command no longer available for target item"
            );
            batch.record(ItemOutcome::Moved);
            return Ok(self.conclude(batch));
        };

        let comment = if suppress_comment {
            None
        } else {
            let prompt = CommentRequest {
                item: request.target.clone(),
                workflow_id: request.workflow_id.clone(),
                command_id: request.command_id.clone(),
                state_display_name: state.display_name.clone(),
            };
            match self.comments.collect(&prompt).await {
                CommentOutcome::Provided(text) => Some(text),
                CommentOutcome::Skipped => None,
                CommentOutcome::Cancelled => {
                    info!(item = %request.target, "Comment cancelled, nothing sent");
                    timer.finish();
                    return Ok(BatchOutcome::silent());
                }
            }
        };

        // The comment step can take arbitrarily long, so check again
        let options = ExecutionOptions {
            comment,
            suppress_comment,
            notify_on_completion: false,
        };
        let outcome = self
            .process_item(
                workflow.as_ref(),
                &request.target,
                &snapshot.current_state_id,
                &request.command_id,
                options,
            )
            .await;
        batch.record(outcome);

        timer.finish();
        Ok(self.conclude(batch))
    }

    /// Transition an explicit selection of items
    pub async fn send_selected(
        &self,
        workflow_id: &str,
        state_id: &str,
        command_id: &str,
        items: &[SelectedItem],
    ) -> Result<BatchOutcome, EngineError> {
        let span = create_batch_span("send_selected", workflow_id, &generate_correlation_id());
        self.send_selected_inner(workflow_id, state_id, command_id, items)
            .instrument(span)
            .await
    }

    async fn send_selected_inner(
        &self,
        workflow_id: &str,
        state_id: &str,
        command_id: &str,
        items: &[SelectedItem],
    ) -> Result<BatchOutcome, EngineError> {
        let timer = OperationTimer::new("send_selected");
        transition_metrics().record_batch();
        let workflow = self.workflow(workflow_id).await?;
        info!(
            items = items.len(),
            state = state_id,
            command = command_id,
            "Sending selected items"
        );

        let mut batch = BatchAccumulator::default();
        for selected in items {
            // The selection was made in `state_id`; a per-item expectation can only narrow it
            if let Some(expected) = selected.expected_state_id.as_deref() {
                if expected != state_id {
                    debug!(
                        item = %selected.item,
                        expected,
                        state = state_id,
                        "Selected item was recorded in another state"
                    );
                    batch.record(ItemOutcome::Moved);
                    continue;
                }
            }
            let options = ExecutionOptions {
                suppress_comment: true,
                ..Default::default()
            };
            let outcome = self
                .process_item(workflow.as_ref(), &selected.item, state_id, command_id, options)
                .await;
            batch.record(outcome);
        }

        timer.finish();
        Ok(self.conclude(batch))
    }

    /// Transition every item currently recorded in `state_id`
    pub async fn send_all(
        &self,
        workflow_id: &str,
        state_id: &str,
        command_id: &str,
    ) -> Result<BatchOutcome, EngineError> {
        let span = create_batch_span("send_all", workflow_id, &generate_correlation_id());
        self.send_all_inner(workflow_id, state_id, command_id)
            .instrument(span)
            .await
    }

    async fn send_all_inner(
        &self,
        workflow_id: &str,
        state_id: &str,
        command_id: &str,
    ) -> Result<BatchOutcome, EngineError> {
        let timer = OperationTimer::new("send_all");
        transition_metrics().record_batch();
        let workflow = self.workflow(workflow_id).await?;

        let items = self
            .index
            .items_in_state(workflow_id, state_id)
            .await
            .map_err(|cause| EngineError::StateIndex {
                workflow_id: workflow_id.to_string(),
                state_id: state_id.to_string(),
                cause,
            })?;
        info!(
            items = items.len(),
            state = state_id,
            command = command_id,
            "Sending all items in state"
        );

        let mut batch = BatchAccumulator::default();
        for item in &items {
            let options = ExecutionOptions {
                suppress_comment: true,
                notify_on_completion: self.notify_on_completion,
                ..Default::default()
            };
            let outcome = self
                .process_item(workflow.as_ref(), item, state_id, command_id, options)
                .await;
            batch.record(outcome);
        }

        timer.finish();
        Ok(self.conclude(batch))
    }

    async fn workflow(&self, workflow_id: &str) -> Result<Arc<dyn Workflow>, EngineError> {
        match self.provider.get_workflow(workflow_id).await {
            Some(workflow) => {
                debug!(workflow = workflow.id(), "Workflow loaded");
                Ok(workflow)
            }
            None => {
                warn!(workflow = workflow_id, "Unknown workflow");
                Err(EngineError::UnknownWorkflow(workflow_id.to_string()))
            }
        }
    }

    /// Resolve, re-validate and execute one item
    async fn process_item(
        &self,
        workflow: &dyn Workflow,
        item: &ItemRef,
        expected_state_id: &str,
        command_id: &str,
        options: ExecutionOptions,
    ) -> ItemOutcome {
        let snapshot =
            match resolve_expecting(self.resolver.as_ref(), item, Some(expected_state_id)).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    debug!(item = %item, reason = %e, "Skipping moved item");
                    return ItemOutcome::Moved;
                }
            };

        let Some(state) = valid_state(&snapshot, workflow, command_id).await else {
            return ItemOutcome::Moved;
        };

        let completion = options.notify_on_completion.then(|| {
            let signals = self.signals.clone();
            self.notifier
                .on_batch_complete(move || signals.request_refresh())
        });
        let args = TransitionArgs {
            comment: options.comment,
            suppress_comment: options.suppress_comment,
            expected_state_id: None,
            completion,
        };

        match executor::execute(&snapshot, workflow, command_id, &state.display_name, args).await {
            Err(e) if e.is_moved() => {
                debug!(item = %item, reason = %e, "Item moved between validation and execution");
                ItemOutcome::Moved
            }
            result => ItemOutcome::Executed(result),
        }
    }

    /// Finalize the batch and emit its signals
    fn conclude(&self, batch: BatchAccumulator) -> BatchOutcome {
        let outcome = BatchOutcome::decide(batch.finish());

        if let Some(alert) = outcome.alert {
            self.signals.alert(alert.message());
        }
        if outcome.refresh {
            self.signals.request_refresh();
        }

        info!(
            processed = outcome.result.processed_count,
            succeeded = outcome.result.succeeded_count,
            moved = outcome.result.item_was_moved,
            missing_next_step = outcome.result.missing_next_step,
            alert = ?outcome.alert,
            refresh = outcome.refresh,
            "Batch finished"
        );
        outcome
    }
}

impl std::fmt::Debug for TransitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionEngine")
            .field("notify_on_completion", &self.notify_on_completion)
            .field("notifier", &self.notifier)
            .finish()
    }
}
