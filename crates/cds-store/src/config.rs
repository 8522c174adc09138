//! Session configuration

use crate::error::{StoreError, StoreResult};
use cds_api::ApiConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings of one console session
///
/// ```toml
/// edit_repository_entities = true
///
/// [api]
/// base_url = "https://cds.example.com/api"
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Connection to the API
    pub api: ApiConfig,
    /// Whether repository-sourced entities open in edit mode when loaded
    pub edit_repository_entities: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            edit_repository_entities: true,
        }
    }
}

impl SessionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With API configuration
    #[inline]
    #[must_use]
    pub fn with_api(mut self, api: ApiConfig) -> Self {
        self.api = api;
        self
    }

    /// With edit mode for repository-sourced entities on or off
    #[inline]
    #[must_use]
    pub fn with_edit_repository_entities(mut self, enabled: bool) -> Self {
        self.edit_repository_entities = enabled;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns [`StoreError::Config`] if the text is not valid for this type
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        let mut config: Self = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.api = config.api.clone().with_base_url(config.api.base_url.clone());
        Ok(config)
    }

    /// Read from a TOML file, then apply environment overrides
    ///
    /// # Errors
    /// Returns [`StoreError::Config`] if the file cannot be read or parsed
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self::from_toml_str(&text)?.with_env_overrides())
    }

    /// Apply `CDS_API_URL` and `CDS_SESSION_TOKEN`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.api = self.api.with_env_overrides();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_api_table() {
        let config = SessionConfig::from_toml_str(
            r#"
            edit_repository_entities = false

            [api]
            base_url = "https://cds.example.com/api/"
            session_token = "abc"
            "#,
        )
        .unwrap();
        assert!(!config.edit_repository_entities);
        assert_eq!(config.api.base_url, "https://cds.example.com/api");
        assert_eq!(config.api.session_token.as_deref(), Some("abc"));
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(SessionConfig::from_toml_str("").unwrap(), SessionConfig::default());
    }
}
