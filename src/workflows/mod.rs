// Workflow transition engine
//
// Resolver -> validator -> executor, repeated per item by the batch processor.
// Collaborators are injected through traits so the engine can be driven by the
// in-memory store, a real content repository, or mocks.

pub mod errors;
pub mod executor;
pub mod fixture;
pub mod memory;
pub mod notifier;
pub mod processor;
pub mod resolver;
pub mod traits;
pub mod types;
pub mod validator;

#[cfg(test)]
pub mod mocks;


pub use errors::{EngineError, ParseItemRefError, WorkflowError};
pub use fixture::{CommandDefinition, Fixture, FixtureItem, StateDefinition, WorkflowDefinition};
pub use memory::{HistoryEntry, InMemoryWorkflowStore};
pub use notifier::{CompletionNotifier, CompletionSignal};
pub use processor::{TransitionAction, TransitionEngine};
pub use traits::{
    CommentPrompt, ItemResolver, NoComment, StateIndex, TransitionArgs, UiSignals, Workflow,
    WorkflowProvider,
};
pub use types::*;
