// Workflow definitions and the TOML document the in-memory store loads from

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::types::{CommandId, ItemRef, StateId, WorkflowState};

/// A command as authored in a workflow definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Destination state; leaving it out is an authoring defect reported at execution time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_state: Option<StateId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDefinition {
    pub display_name: String,
    #[serde(default)]
    pub commands: BTreeMap<CommandId, CommandDefinition>,
}

impl StateDefinition {
    pub fn to_workflow_state(&self, id: &str) -> WorkflowState {
        WorkflowState {
            id: id.to_string(),
            display_name: self.display_name.clone(),
            available_commands: self.commands.keys().cloned().collect::<BTreeSet<_>>(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    #[serde(default)]
    pub states: BTreeMap<StateId, StateDefinition>,
}

impl WorkflowDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            states: BTreeMap::new(),
        }
    }

    /// Add a state; returns self for chaining
    pub fn state(mut self, id: &str, display_name: &str) -> Self {
        self.states.insert(
            id.to_string(),
            StateDefinition {
                display_name: display_name.to_string(),
                commands: BTreeMap::new(),
            },
        );
        self
    }

    /// Add a command to an existing state. `next_state = None` models a missing next step.
    pub fn command(mut self, state_id: &str, command_id: &str, next_state: Option<&str>) -> Self {
        if let Some(state) = self.states.get_mut(state_id) {
            state.commands.insert(
                command_id.to_string(),
                CommandDefinition {
                    display_name: None,
                    next_state: next_state.map(str::to_string),
                },
            );
        }
        self
    }
}

/// An item and where it currently sits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureItem {
    pub id: String,
    pub language: String,
    pub version: u32,
    pub workflow: String,
    pub state: StateId,
}

impl FixtureItem {
    pub fn item_ref(&self) -> ItemRef {
        ItemRef::new(self.id.clone(), self.language.clone(), self.version)
    }
}

/// Serializable contents of a workflow store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub workflows: Vec<WorkflowDefinition>,
    #[serde(default)]
    pub items: Vec<FixtureItem>,
}

impl Fixture {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let fixture: Fixture = toml::from_str(content).context("Invalid workflow fixture")?;
        fixture.validate()?;
        Ok(fixture)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("Failed to write fixture {}", path.display()))?;
        Ok(())
    }

    /// Every item must sit in a defined state of a defined workflow
    pub fn validate(&self) -> Result<()> {
        let mut workflows = BTreeMap::new();
        for workflow in &self.workflows {
            if workflows.insert(workflow.id.as_str(), workflow).is_some() {
                bail!("Workflow '{}' is defined more than once", workflow.id);
            }
        }

        let mut seen = BTreeSet::new();
        for item in &self.items {
            let Some(workflow) = workflows.get(item.workflow.as_str()) else {
                bail!(
                    "Item {} refers to unknown workflow '{}'",
                    item.item_ref(),
                    item.workflow
                );
            };
            if !workflow.states.contains_key(&item.state) {
                bail!(
                    "Item {} is in state '{}' which workflow '{}' does not define",
                    item.item_ref(),
                    item.state,
                    item.workflow
                );
            }
            if !seen.insert(item.item_ref()) {
                bail!("Item {} is listed more than once", item.item_ref());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EDITORIAL: &str = r#"
[[workflows]]
id = "editorial"

[workflows.states.draft]
display_name = "Draft"

[workflows.states.draft.commands.submit]
next_state = "review"

[workflows.states.review]
display_name = "Awaiting Approval"

[workflows.states.review.commands.approve]
next_state = "done"

[workflows.states.review.commands.escalate]

[workflows.states.done]
display_name = "Done"

[[items]]
id = "home"
language = "en"
version = 1
workflow = "editorial"
state = "draft"
"#;

    #[test]
    fn test_parse_fixture() {
        let fixture = Fixture::from_toml_str(EDITORIAL).unwrap();

        assert_eq!(fixture.workflows.len(), 1);
        let workflow = &fixture.workflows[0];
        assert_eq!(workflow.states.len(), 3);
        assert_eq!(
            workflow.states["draft"].commands["submit"].next_state.as_deref(),
            Some("review")
        );
        assert_eq!(workflow.states["review"].commands["escalate"].next_state, None);

        assert_eq!(fixture.items.len(), 1);
        assert_eq!(fixture.items[0].item_ref(), ItemRef::new("home", "en", 1));
    }

    #[test]
    fn test_state_definition_exposes_commands() {
        let fixture = Fixture::from_toml_str(EDITORIAL).unwrap();
        let state = fixture.workflows[0].states["review"].to_workflow_state("review");

        assert_eq!(state.display_name, "Awaiting Approval");
        assert!(state.available_commands.contains("approve"));
        assert!(state.available_commands.contains("escalate"));
        assert!(!state.available_commands.contains("submit"));
    }

    #[test]
    fn test_item_in_unknown_state_is_rejected() {
        let content = EDITORIAL.replace("state = \"draft\"", "state = \"archived\"");
        let err = Fixture::from_toml_str(&content).unwrap_err();
        assert!(err.to_string().contains("archived"));
    }

    #[test]
    fn test_item_in_unknown_workflow_is_rejected() {
        let content = EDITORIAL.replace("workflow = \"editorial\"", "workflow = \"legal\"");
        assert!(Fixture::from_toml_str(&content).is_err());
    }

    #[test]
    fn test_save_and_load_preserves_contents() {
        let fixture = Fixture::from_toml_str(EDITORIAL).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workbox.toml");

        fixture.save_to_file(&path).unwrap();
        let loaded = Fixture::load(&path).unwrap();

        assert_eq!(loaded, fixture);
    }
}
