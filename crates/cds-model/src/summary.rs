//! Name-index entries kept inside a project

use serde::{Deserialize, Serialize};

/// Project label, attachable to workflows
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
}

impl Label {
    /// Create label with a name and color
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            project_id: None,
        }
    }
}

/// Denormalized projection of a child entity
///
/// A project lists its children through these entries so that it can be
/// displayed without hydrating every entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
}

impl IdName {
    /// Entry carrying only a name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Overwrite identifying fields from an updated summary
    ///
    /// The id is only replaced when the update carries one, since creation
    /// paths may report an entity before the server assigned it.
    pub fn apply(&mut self, update: &IdName) {
        if update.id.is_some() {
            self.id = update.id;
        }
        self.name.clone_from(&update.name);
        self.description.clone_from(&update.description);
        self.icon.clone_from(&update.icon);
        self.labels.clone_from(&update.labels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_keeps_id_when_update_has_none() {
        let mut entry = IdName {
            id: Some(3),
            ..IdName::named("app1")
        };
        let update = IdName {
            description: Some("desc".to_string()),
            ..IdName::named("app1bis")
        };
        entry.apply(&update);

        assert_eq!(entry.id, Some(3));
        assert_eq!(entry.name, "app1bis");
        assert_eq!(entry.description.as_deref(), Some("desc"));
    }

    #[test]
    fn apply_is_idempotent() {
        let mut entry = IdName::named("wf");
        let update = IdName {
            icon: Some("icon".to_string()),
            ..IdName::named("wf2")
        };
        entry.apply(&update);
        let once = entry.clone();
        entry.apply(&update);
        assert_eq!(entry, once);
    }
}
