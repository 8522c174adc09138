//! Shared behaviour of project children

use crate::error::ModelError;
use crate::kind::{EntityKind, ProjectKey};
use crate::project::Project;
use crate::summary::IdName;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A child entity of a project, cached by `(project key, name)`
///
/// Implementors describe how an update response is folded over the value
/// already held by the console.
pub trait Entity: Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Kind tag used for name indexes and logging
    const KIND: EntityKind;

    /// Name, unique within project and kind
    fn name(&self) -> &str;

    /// Replace the name
    fn set_name(&mut self, name: &str);

    /// Owning project, when the server reported it
    fn project_key(&self) -> Option<&ProjectKey>;

    /// Projection stored in the project's name index
    fn summary(&self) -> IdName;

    /// Hydrated collection of this kind inside a project
    fn hydrated_in(project: &mut Project) -> &mut Option<Vec<Self>>;

    /// Whether the entity is sourced from a repository
    fn from_repository(&self) -> bool {
        false
    }

    /// Restore fields the server never echoes back
    fn preserve_session_fields(&mut self, _prior: &Self) {}

    /// Normalize a value before it is cached
    fn sanitize(&mut self) {}

    /// Fold an update response over the previously cached value
    ///
    /// Fields present in `response` win; absent ones keep their prior value.
    ///
    /// # Errors
    /// Returns error if either value cannot be converted through JSON
    fn merge_response(prior: &Self, response: Self) -> Result<Self, ModelError> {
        let mut merged = overlay_response(Self::KIND.as_str(), prior, &response)?;
        merged.preserve_session_fields(prior);
        merged.sanitize();
        Ok(merged)
    }
}

/// Overlay the non-null top-level fields of `response` onto `prior`
///
/// # Errors
/// Returns error if either value does not encode to a JSON object or the
/// combined object does not decode back into `T`
pub fn overlay_response<T>(kind: &'static str, prior: &T, response: &T) -> Result<T, ModelError>
where
    T: Serialize + DeserializeOwned,
{
    let codec = |e| ModelError::codec(kind, e);
    let mut base = serde_json::to_value(prior).map_err(codec)?;
    let update = serde_json::to_value(response).map_err(codec)?;

    match (base.as_object_mut(), update) {
        (Some(base_fields), serde_json::Value::Object(update_fields)) => {
            for (field, value) in update_fields {
                if !value.is_null() {
                    base_fields.insert(field, value);
                }
            }
            serde_json::from_value(base).map_err(codec)
        }
        (_, update) => serde_json::from_value(update).map_err(codec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        history: Option<Vec<u32>>,
    }

    #[test]
    fn overlay_keeps_absent_fields() {
        let prior = Sample {
            name: "a".to_string(),
            description: Some("old".to_string()),
            history: Some(vec![1, 2]),
        };
        let response = Sample {
            name: "b".to_string(),
            description: Some("new".to_string()),
            history: None,
        };
        let merged = overlay_response("sample", &prior, &response).unwrap();

        assert_eq!(merged.name, "b");
        assert_eq!(merged.description.as_deref(), Some("new"));
        assert_eq!(merged.history, Some(vec![1, 2]));
    }

    #[test]
    fn overlay_replaces_lists_wholesale() {
        let prior = Sample {
            name: "a".to_string(),
            description: None,
            history: Some(vec![1, 2, 3]),
        };
        let response = Sample {
            name: "a".to_string(),
            description: None,
            history: Some(vec![9]),
        };
        let merged = overlay_response("sample", &prior, &response).unwrap();
        assert_eq!(merged.history, Some(vec![9]));
    }

    proptest! {
        #[test]
        fn prop_present_fields_win_absent_fields_survive(
            prior_desc in prop::option::of("[a-z]{0,6}"),
            next_desc in prop::option::of("[a-z]{0,6}"),
            prior_history in prop::option::of(prop::collection::vec(0u32..100, 0..4)),
            next_history in prop::option::of(prop::collection::vec(0u32..100, 0..4)),
        ) {
            let prior = Sample {
                name: "a".to_string(),
                description: prior_desc.clone(),
                history: prior_history.clone(),
            };
            let response = Sample {
                name: "b".to_string(),
                description: next_desc.clone(),
                history: next_history.clone(),
            };
            let merged = overlay_response("sample", &prior, &response).unwrap();

            prop_assert_eq!(merged.name, "b");
            prop_assert_eq!(merged.description, next_desc.or(prior_desc));
            prop_assert_eq!(merged.history, next_history.or(prior_history));
        }
    }
}
