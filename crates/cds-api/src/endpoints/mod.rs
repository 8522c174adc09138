//! Endpoint methods of [`CdsClient`](crate::CdsClient), grouped by entity kind

mod application;
mod environment;
mod pipeline;
mod project;
mod workflow;

pub use project::Favorite;

use crate::client::segment;
use cds_model::ProjectKey;

/// `/project/{key}`
pub(crate) fn project_path(key: &ProjectKey) -> String {
    format!("/project/{}", segment(key.as_str()))
}

/// `/project/{key}/{collection}/{name}`
pub(crate) fn child_path(key: &ProjectKey, collection: &str, name: &str) -> String {
    format!("{}/{collection}/{}", project_path(key), segment(name))
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::request::{ApiRequest, ApiResponse};
    use crate::transport::MockTransport;
    use crate::CdsClient;
    use std::sync::{Arc, Mutex};

    /// Client answering every request with `body`, recording requests
    pub(crate) fn client_returning(
        body: serde_json::Value,
    ) -> (CdsClient, Arc<Mutex<Vec<ApiRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let mut transport = MockTransport::new();
        transport.expect_send().returning(move |req| {
            log.lock().unwrap().push(req);
            Ok(ApiResponse::json_ok(&body))
        });
        (CdsClient::new(Arc::new(transport)), seen)
    }

    pub(crate) fn key(raw: &str) -> cds_model::ProjectKey {
        cds_model::ProjectKey::new(raw).unwrap()
    }
}
