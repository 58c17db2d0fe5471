// Context sets shared by the team
//
// A context set is a named block of text agents read and write during a run.
// Turns mutate the collection through a ContextUpdate: new sets are appended
// and edits replace an existing set in place, located by its original name.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Named, visibility-scoped block of shared text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSet {
    /// Unique name within the run
    pub name: String,
    /// Body text
    #[serde(default)]
    pub text: String,
    /// Agents that must not see this set
    #[serde(default, alias = "hiddenFrom", skip_serializing_if = "Vec::is_empty")]
    pub hidden_from: Vec<String>,
    /// Disabled sets are kept but shown to nobody
    #[serde(default)]
    pub disabled: bool,
    /// Form schema used when the set backs a user-input request
    #[serde(default, alias = "formSchema", skip_serializing_if = "Option::is_none")]
    pub form_schema: Option<Value>,
}

impl ContextSet {
    /// Create a visible, enabled set
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            hidden_from: Vec::new(),
            disabled: false,
            form_schema: None,
        }
    }

    /// Hide the set from the given agents
    #[must_use]
    pub fn hidden_from<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden_from = agents.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the set disabled
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Attach a form schema
    #[must_use]
    pub fn with_form_schema(mut self, schema: Value) -> Self {
        self.form_schema = Some(schema);
        self
    }

    /// Whether `agent` may read this set
    pub fn is_visible_to(&self, agent: &str) -> bool {
        !self.disabled && !self.hidden_from.iter().any(|hidden| hidden == agent)
    }
}

/// Edit of an existing context set, located by its original name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEdit {
    /// Name of the set to edit
    pub original_set_name: String,
    /// New name, if the set is renamed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    /// Replacement text; an empty string empties the set, it never deletes it
    pub text: String,
    /// Replacement visibility list, if given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_from: Option<Vec<String>>,
}

impl ContextEdit {
    /// Replace the text of `original_set_name`
    pub fn new(original_set_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            original_set_name: original_set_name.into(),
            new_name: None,
            text: text.into(),
            hidden_from: None,
        }
    }

    /// Rename the set as part of the edit
    #[must_use]
    pub fn renamed(mut self, new_name: impl Into<String>) -> Self {
        self.new_name = Some(new_name.into());
        self
    }

    /// Replace the visibility list as part of the edit
    #[must_use]
    pub fn with_hidden_from<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden_from = Some(agents.into_iter().map(Into::into).collect());
        self
    }
}

/// Context mutations requested by one turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextUpdate {
    /// Sets to append
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_sets: Vec<ContextSet>,
    /// Edits to apply in place
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edits: Vec<ContextEdit>,
}

impl ContextUpdate {
    /// Whether the update requests no change
    pub fn is_empty(&self) -> bool {
        self.new_sets.is_empty() && self.edits.is_empty()
    }
}

/// What a merge did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Names of appended sets
    pub added: Vec<String>,
    /// Names (after rename) of edited sets
    pub edited: Vec<String>,
    /// Human-readable reasons for every dropped addition or edit
    pub dropped: Vec<String>,
}

impl MergeReport {
    /// Whether the collection changed
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.edited.is_empty()
    }
}

/// Merge a turn's update into the full collection
///
/// Sets the turn did not touch are kept untouched and in place. Additions
/// whose name already exists and edits whose target is missing (or whose
/// rename collides) are dropped with a warning; the collection never shrinks.
pub fn merge_context_sets(current: &mut Vec<ContextSet>, update: &ContextUpdate) -> MergeReport {
    let mut report = MergeReport::default();

    for set in &update.new_sets {
        if current.iter().any(|existing| existing.name == set.name) {
            warn!(context_set = %set.name, "New context set collides with an existing name, dropped");
            report.dropped.push(format!("context set '{}' already exists", set.name));
            continue;
        }
        current.push(set.clone());
        report.added.push(set.name.clone());
    }

    for edit in &update.edits {
        let Some(index) = current.iter().position(|set| set.name == edit.original_set_name) else {
            warn!(
                context_set = %edit.original_set_name,
                "Context edit targets a set that does not exist, dropped"
            );
            report.dropped.push(format!("context set '{}' not found", edit.original_set_name));
            continue;
        };

        if let Some(new_name) = &edit.new_name {
            let collides = new_name != &edit.original_set_name
                && current.iter().any(|set| &set.name == new_name);
            if collides {
                warn!(
                    context_set = %edit.original_set_name,
                    new_name = %new_name,
                    "Context edit rename collides with an existing set, dropped"
                );
                report.dropped.push(format!(
                    "cannot rename '{}' to existing '{}'",
                    edit.original_set_name, new_name
                ));
                continue;
            }
        }

        let target = &mut current[index];
        target.text.clone_from(&edit.text);
        if let Some(hidden_from) = &edit.hidden_from {
            target.hidden_from.clone_from(hidden_from);
        }
        if let Some(new_name) = &edit.new_name {
            target.name.clone_from(new_name);
        }
        report.edited.push(target.name.clone());
    }

    report
}
