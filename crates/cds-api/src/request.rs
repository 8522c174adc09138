//! Transport-neutral request and response values

use crate::error::{ApiError, ApiResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Uppercase method name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// No body
    Empty,
    /// JSON document
    Json(serde_json::Value),
    /// YAML document, sent as `application/x-yaml`
    Yaml(String),
    /// URL-encoded form
    Form(Vec<(String, String)>),
}

/// One call to the API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path below the API base URL, starting with `/`
    pub path: String,
    /// Query string pairs
    pub query: Vec<(String, String)>,
    /// Request body
    pub body: Body,
}

impl ApiRequest {
    /// Create request without query or body
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    /// GET request
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// POST request
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// PUT request
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// DELETE request
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Add a query pair
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a JSON body
    ///
    /// # Errors
    /// Returns error if `body` cannot be encoded
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> ApiResult<Self> {
        self.body = Body::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Set a YAML body
    #[must_use]
    pub fn with_yaml(mut self, body: impl Into<String>) -> Self {
        self.body = Body::Yaml(body.into());
        self
    }

    /// Set a form body
    #[must_use]
    pub fn with_form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Body::Form(fields);
        self
    }
}

/// Raw response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl ApiResponse {
    /// Response with a status and body
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 200 response carrying a JSON document
    #[must_use]
    pub fn json_ok(value: &serde_json::Value) -> Self {
        Self::new(200, value.to_string())
    }

    /// Whether the status is 2xx
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    ///
    /// # Errors
    /// Returns [`ApiError::Decode`] if the body does not match `T`
    pub fn json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::decode(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_query_and_body() {
        let req = ApiRequest::get("/project/test1")
            .with_query("withLabels", "true")
            .with_json(&serde_json::json!({"a": 1}))
            .unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.query, vec![("withLabels".to_string(), "true".to_string())]);
        assert_eq!(req.body, Body::Json(serde_json::json!({"a": 1})));
    }

    #[test]
    fn response_decode_error_names_path() {
        let resp = ApiResponse::new(200, "not json");
        let err = resp.json::<serde_json::Value>("/project/a").unwrap_err();
        assert!(err.to_string().contains("/project/a"));
        assert!(resp.is_success());
        assert!(!ApiResponse::new(404, "").is_success());
    }
}
