//! API client configuration

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding the API URL
pub const ENV_API_URL: &str = "CDS_API_URL";
/// Environment variable overriding the session token
pub const ENV_SESSION_TOKEN: &str = "CDS_SESSION_TOKEN";

/// Connection settings for the CDS API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the API, without trailing slash
    pub base_url: String,
    /// Session token sent in the `Session-Token` header
    pub session_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent header
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            session_token: None,
            timeout_secs: 30,
            user_agent: format!("cds-console/{}", crate::VERSION),
        }
    }
}

impl ApiConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// With session token
    #[inline]
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// With timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the text is not valid TOML for this type
    pub fn from_toml_str(text: &str) -> ApiResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(config.with_base_url_normalized())
    }

    /// Read from a TOML file
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the file cannot be read or parsed
    pub fn load(path: &Path) -> ApiResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Apply `CDS_API_URL` and `CDS_SESSION_TOKEN` from the process environment
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.is_empty()) {
            self = self.with_base_url(url);
        }
        if let Some(token) = lookup(ENV_SESSION_TOKEN).filter(|t| !t.is_empty()) {
            self.session_token = Some(token);
        }
        self
    }

    fn with_base_url_normalized(mut self) -> Self {
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_partial_toml() {
        let config = ApiConfig::from_toml_str(
            r#"
            base_url = "https://cds.example.com/api/"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://cds.example.com/api");
        assert_eq!(config.timeout_secs, 5);
        assert!(config.session_token.is_none());
    }

    #[test]
    fn config_rejects_bad_toml() {
        assert!(matches!(
            ApiConfig::from_toml_str("timeout_secs = \"x\""),
            Err(ApiError::Config(_))
        ));
    }

    #[test]
    fn env_overrides_win() {
        let config = ApiConfig::new().with_overrides_from(|name| match name {
            ENV_API_URL => Some("http://cds:8081/".to_string()),
            ENV_SESSION_TOKEN => Some("tok".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url, "http://cds:8081");
        assert_eq!(config.session_token.as_deref(), Some("tok"));
    }
}
