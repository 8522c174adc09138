//! Transport seam between the client and the network

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::request::{ApiRequest, ApiResponse, Body, Method};
use async_trait::async_trait;
use std::time::Duration;

/// Sends one request and returns the raw response
///
/// Non-success statuses are returned as responses, not errors; the client
/// decides how to surface them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request
    async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse>;
}

/// Session token header understood by the API
pub const SESSION_TOKEN_HEADER: &str = "Session-Token";

/// [`Transport`] over HTTP using `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
}

impl HttpTransport {
    /// Build a transport from configuration
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the HTTP client cannot be built
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_token: config.session_token.clone(),
        })
    }

    fn builder(&self, request: &ApiRequest) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &self.session_token {
            builder = builder.header(SESSION_TOKEN_HEADER, token);
        }
        match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Yaml(text) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/x-yaml")
                .body(text.clone()),
            Body::Form(fields) => builder.form(fields),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let response = self
            .builder(&request)
            .send()
            .await
            .map_err(|e| ApiError::transport(request.method, &request.path, e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::transport(request.method, &request.path, e.to_string()))?;
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_targets_base_url() {
        let config = ApiConfig::new()
            .with_base_url("http://cds.local/api/")
            .with_session_token("tok");
        let transport = HttpTransport::new(&config).unwrap();
        let request = ApiRequest::get("/project/test1").with_query("withLabels", "true");

        let built = transport.builder(&request).build().unwrap();
        assert_eq!(
            built.url().as_str(),
            "http://cds.local/api/project/test1?withLabels=true"
        );
        assert_eq!(built.headers()[SESSION_TOKEN_HEADER], "tok");
    }

    #[test]
    fn yaml_body_sets_content_type() {
        let transport = HttpTransport::new(&ApiConfig::new()).unwrap();
        let request = ApiRequest::post("/project/a/preview/workflows").with_yaml("name: w");

        let built = transport.builder(&request).build().unwrap();
        assert_eq!(
            built.headers()[reqwest::header::CONTENT_TYPE],
            "application/x-yaml"
        );
    }
}
