//! Virtual host and vhost limit API implementation

use super::common::api_path;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// GET /api/vhosts/{name}
#[derive(Debug, Clone, Deserialize)]
pub struct VhostInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_queue_type: Option<String>,
    #[serde(default)]
    pub tracing: bool,
}

/// PUT /api/vhosts/{name}
#[derive(Debug, Clone, Default, Serialize)]
pub struct VhostSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_queue_type: Option<String>,
    pub tracing: bool,
}

/// Limits keyed by broker name (`max-connections`, `max-queues`, ...)
pub type Limits = BTreeMap<String, i64>;

#[derive(Debug, Deserialize)]
pub(crate) struct LimitsEntry {
    #[serde(default)]
    pub value: Limits,
}

#[derive(Debug, Serialize)]
pub(crate) struct LimitValue {
    pub value: i64,
}

pub struct VhostsApi<'a> {
    client: &'a Client,
}

impl<'a> VhostsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/vhosts
    pub async fn list(&self) -> Result<Vec<VhostInfo>, ApiError> {
        self.client.get(&api_path("vhosts", &[])).await
    }

    /// GET /api/vhosts/{name}
    pub async fn get(&self, name: &str) -> Result<VhostInfo, ApiError> {
        self.client.get(&api_path("vhosts", &[name])).await
    }

    /// PUT /api/vhosts/{name}
    pub async fn put(&self, name: &str, settings: &VhostSettings) -> Result<(), ApiError> {
        self.client.put(&api_path("vhosts", &[name]), settings).await
    }

    /// DELETE /api/vhosts/{name}
    pub async fn delete(&self, name: &str) -> Result<(), ApiError> {
        self.client.delete(&api_path("vhosts", &[name])).await
    }

    /// GET /api/vhost-limits/{name}
    ///
    /// The broker answers with an empty list when no limit is set.
    pub async fn get_limits(&self, name: &str) -> Result<Limits, ApiError> {
        let entries: Vec<LimitsEntry> = self.client.get(&api_path("vhost-limits", &[name])).await?;
        Ok(entries.into_iter().next().map(|e| e.value).unwrap_or_default())
    }

    /// PUT /api/vhost-limits/{name}/{limit}
    pub async fn put_limit(&self, name: &str, limit: &str, value: i64) -> Result<(), ApiError> {
        self.client
            .put(&api_path("vhost-limits", &[name, limit]), &LimitValue { value })
            .await
    }

    /// DELETE /api/vhost-limits/{name}/{limit}
    pub async fn delete_limit(&self, name: &str, limit: &str) -> Result<(), ApiError> {
        self.client
            .delete(&api_path("vhost-limits", &[name, limit]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_helpers::test_client;
    use mockito::Matcher;

    #[tokio::test]
    async fn get_limits_unwraps_first_entry() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/vhost-limits/dev")
            .with_status(200)
            .with_body(r#"[{"vhost":"dev","value":{"max-connections":10,"max-queues":5}}]"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let limits = client.vhosts().get_limits("dev").await.unwrap();

        assert_eq!(limits.get("max-connections"), Some(&10));
        assert_eq!(limits.get("max-queues"), Some(&5));
    }

    #[tokio::test]
    async fn empty_limit_list_means_unlimited() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/vhost-limits/%2F")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = test_client(&server.url());
        assert!(client.vhosts().get_limits("/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn put_limit_sends_value_object() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/vhost-limits/dev/max-queues")
            .match_body(Matcher::Json(serde_json::json!({"value": 100})))
            .with_status(204)
            .create_async()
            .await;

        let client = test_client(&server.url());
        client
            .vhosts()
            .put_limit("dev", "max-queues", 100)
            .await
            .unwrap();

        mock.assert_async().await;
    }
}
