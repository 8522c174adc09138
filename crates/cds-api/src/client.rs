//! Typed client over a [`Transport`]

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::request::{ApiRequest, ApiResponse};
use crate::transport::{HttpTransport, Transport};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// Client of the CDS API
///
/// Endpoint methods live in the `endpoints` module, one `impl` block per
/// entity kind. Every method performs exactly one request; no call is
/// retried.
#[derive(Clone)]
pub struct CdsClient {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for CdsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdsClient").finish_non_exhaustive()
    }
}

impl CdsClient {
    /// Create client over a transport
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Create client talking HTTP
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the HTTP client cannot be built
    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    /// Send a request and require a 2xx status
    pub(crate) async fn call(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let method = request.method;
        let path = request.path.clone();
        tracing::debug!(%method, path = %path, "api request");

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            tracing::debug!(%method, path = %path, status = response.status, "api request rejected");
            return Err(ApiError::status(
                method,
                path,
                response.status,
                error_message(&response.body),
            ));
        }
        Ok(response)
    }

    /// Send a request and decode a JSON body
    pub(crate) async fn json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let path = request.path.clone();
        self.call(request).await?.json(&path)
    }

    /// Send a request and ignore the body
    pub(crate) async fn unit(&self, request: ApiRequest) -> ApiResult<()> {
        self.call(request).await.map(|_| ())
    }

    /// Send a request and return the body as text
    pub(crate) async fn text(&self, request: ApiRequest) -> ApiResult<String> {
        self.call(request).await.map(|r| r.body)
    }
}

/// Best-effort message out of an error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Percent-encode one path segment
pub(crate) fn segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(byte));
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Reject a YAML payload before it reaches the server
pub(crate) fn validate_yaml(text: &str) -> ApiResult<()> {
    serde_yaml::from_str::<serde_yaml::Value>(text)
        .map(|_| ())
        .map_err(|e| ApiError::InvalidPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;
    use crate::transport::MockTransport;

    #[test]
    fn segment_encodes_reserved_bytes() {
        assert_eq!(segment("app1"), "app1");
        assert_eq!(segment("my app/1"), "my%20app%2F1");
    }

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(error_message(r#"{"message":"forbidden"}"#), "forbidden");
        assert_eq!(error_message(" plain \n"), "plain");
    }

    #[test]
    fn yaml_validation() {
        assert!(validate_yaml("name: w\nversion: v1.0\n").is_ok());
        assert!(matches!(
            validate_yaml("name: [unclosed"),
            Err(ApiError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn non_success_status_becomes_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(ApiResponse::new(403, r#"{"message":"forbidden"}"#)));
        let client = CdsClient::new(Arc::new(transport));

        let err = client.unit(ApiRequest::delete("/project/a")).await.unwrap_err();
        assert_eq!(err.status_code(), Some(403));
        assert!(matches!(err, ApiError::Status { method: Method::Delete, .. }));
    }

    #[tokio::test]
    async fn transport_error_is_passed_through() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|req| Err(ApiError::transport(req.method, req.path, "refused")));
        let client = CdsClient::new(Arc::new(transport));

        let err = client.text(ApiRequest::get("/project/a")).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
