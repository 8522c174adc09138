//! Value types shared by several entities

use crate::summary::IdName;
use serde::{Deserialize, Serialize};

/// Named variable attached to a project, application or environment
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Variable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type", default = "default_variable_type")]
    pub var_type: String,
    #[serde(default)]
    pub value: String,
}

fn default_variable_type() -> String {
    "string".to_string()
}

impl Variable {
    /// String variable
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            var_type: default_variable_type(),
            value: value.into(),
        }
    }
}

/// User group
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
}

/// Group with a permission level
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupPermission {
    pub group: Group,
    pub permission: i32,
}

impl GroupPermission {
    pub const READ: i32 = 4;
    pub const READ_EXECUTE: i32 = 5;
    pub const READ_WRITE_EXECUTE: i32 = 7;

    /// Group permission by group name
    #[must_use]
    pub fn new(group: impl Into<String>, permission: i32) -> Self {
        Self {
            group: Group {
                id: None,
                name: group.into(),
            },
            permission,
        }
    }
}

/// SSH/PGP key
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Key {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub key_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<String>,
}

/// Where an entity is used
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflows: Option<Vec<IdName>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applications: Option<Vec<IdName>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipelines: Option<Vec<IdName>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<IdName>>,
}

/// Current user's rights on an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default)]
    pub readable: bool,
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub executable: bool,
}

/// Integration model (deployment, storage, hook...)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntegrationModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_default_config: Option<serde_json::Value>,
}

/// Integration configured on a project
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectIntegration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<IntegrationModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

/// Pending pull request opened by an as-code edition
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AsCodeEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pullrequest_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pullrequest_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Audit trail entry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Audit {
    pub id: i64,
    #[serde(default)]
    pub triggered_by: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_type_defaults_to_string() {
        let var: Variable = serde_json::from_str(r#"{"name":"foo","value":"bar"}"#).unwrap();
        assert_eq!(var.var_type, "string");
        assert_eq!(var, Variable::new("foo", "bar"));
    }

    #[test]
    fn group_permission_wire_shape() {
        let gp = GroupPermission::new("admins", GroupPermission::READ_WRITE_EXECUTE);
        let json = serde_json::to_value(&gp).unwrap();
        assert_eq!(json["group"]["name"], "admins");
        assert_eq!(json["permission"], 7);
    }
}
