// Core types for workflow transitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::errors::ParseItemRefError;

pub type StateId = String;
pub type CommandId = String;

/// Logical pointer to one content revision
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: String,
    pub language: String,
    pub version: u32,
}

impl ItemRef {
    pub fn new(id: impl Into<String>, language: impl Into<String>, version: u32) -> Self {
        Self {
            id: id.into(),
            language: language.into(),
            version,
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.id, self.language, self.version)
    }
}

/// Parses the `id,language,version` form carried by a selection entry.
impl FromStr for ItemRef {
    type Err = ParseItemRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [id, language, version] if !id.is_empty() && !language.is_empty() => {
                let version = version
                    .parse::<u32>()
                    .map_err(|_| ParseItemRefError::InvalidVersion(version.to_string()))?;
                Ok(ItemRef::new(*id, *language, version))
            }
            _ => Err(ParseItemRefError::Malformed(s.to_string())),
        }
    }
}

/// Point-in-time view of an item's workflow position.
///
/// Created fresh for every transition attempt and dropped right after;
/// never reuse one across retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSnapshot {
    pub item: ItemRef,
    pub current_state_id: StateId,
}

/// One node of a workflow as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowState {
    pub id: StateId,
    pub display_name: String,
    /// Exactly the commands legally executable from this state
    pub available_commands: BTreeSet<CommandId>,
}

/// A single-item transition request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub target: ItemRef,
    pub command_id: CommandId,
    pub workflow_id: String,
    /// State the caller believed the item was in at selection time
    pub expected_state_id: Option<StateId>,
}

/// One entry of an explicit selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedItem {
    pub item: ItemRef,
    /// Falls back to the batch-level expected state when absent
    pub expected_state_id: Option<StateId>,
}

impl SelectedItem {
    pub fn new(item: ItemRef) -> Self {
        Self {
            item,
            expected_state_id: None,
        }
    }

    pub fn expecting(item: ItemRef, state_id: impl Into<StateId>) -> Self {
        Self {
            item,
            expected_state_id: Some(state_id.into()),
        }
    }
}

/// Parses `id,language,version` with an optional `@state` suffix.
impl FromStr for SelectedItem {
    type Err = ParseItemRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('@') {
            Some((item, state)) if !state.trim().is_empty() => {
                Ok(SelectedItem::expecting(item.parse()?, state.trim()))
            }
            Some(_) => Err(ParseItemRefError::Malformed(s.to_string())),
            None => Ok(SelectedItem::new(s.parse()?)),
        }
    }
}

/// Terminal summary of one batch invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// Executions attempted on items that had not moved
    pub processed_count: usize,
    /// Executions that produced a new state
    pub succeeded_count: usize,
    pub item_was_moved: bool,
    pub missing_next_step: bool,
}

/// User-facing alert raised once per batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Alert {
    ItemMoved,
    MissingNextStep,
    NoSelectedItems,
}

impl Alert {
    pub fn message(&self) -> &'static str {
        match self {
            Alert::ItemMoved => {
                "The item has been moved to a different workflow state. The view will therefore be reloaded."
            }
            Alert::MissingNextStep => {
                "One or more items could not be processed because their workflow state does not specify the next step."
            }
            Alert::NoSelectedItems => "There are no selected items.",
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// The batch summary together with the signals that were emitted for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub result: BatchResult,
    pub alert: Option<Alert>,
    pub refresh: bool,
}

impl BatchOutcome {
    /// Applies the post-loop decision rule to a finished batch
    pub fn decide(result: BatchResult) -> Self {
        let (alert, refresh) = if result.item_was_moved {
            (Some(Alert::ItemMoved), true)
        } else if result.missing_next_step {
            (Some(Alert::MissingNextStep), result.processed_count > 0)
        } else if result.processed_count == 0 {
            (Some(Alert::NoSelectedItems), false)
        } else {
            (None, true)
        };

        Self {
            result,
            alert,
            refresh,
        }
    }

    /// An action that ended without touching anything, e.g. a cancelled comment
    pub fn silent() -> Self {
        Self {
            result: BatchResult::default(),
            alert: None,
            refresh: false,
        }
    }
}

/// Result of the comment step that precedes a single-item transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentOutcome {
    Provided(String),
    Skipped,
    Cancelled,
}

/// What the comment dialog is asked about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRequest {
    pub item: ItemRef,
    pub workflow_id: String,
    pub command_id: CommandId,
    pub state_display_name: String,
}
