//! Queue API implementation

use super::common::{api_path, null_as_default, ArgumentTable};
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

/// GET /api/queues/{vhost}/{name}
#[derive(Debug, Clone, Deserialize)]
pub struct QueueInfo {
    pub name: String,
    pub vhost: String,
    pub durable: bool,
    pub auto_delete: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub arguments: ArgumentTable,
    /// classic, quorum or stream
    #[serde(rename = "type", default)]
    pub queue_type: Option<String>,
    /// running, idle, ... ; missing until the queue process reports in
    #[serde(rename = "state", default)]
    pub status: Option<String>,
}

/// PUT /api/queues/{vhost}/{name}
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueSettings {
    pub durable: bool,
    pub auto_delete: bool,
    pub arguments: ArgumentTable,
}

pub struct QueuesApi<'a> {
    client: &'a Client,
}

impl<'a> QueuesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/queues/{vhost}/{name}
    pub async fn get(&self, vhost: &str, name: &str) -> Result<QueueInfo, ApiError> {
        self.client.get(&api_path("queues", &[vhost, name])).await
    }

    /// PUT /api/queues/{vhost}/{name}
    pub async fn declare(
        &self,
        vhost: &str,
        name: &str,
        settings: &QueueSettings,
    ) -> Result<(), ApiError> {
        self.client
            .put(&api_path("queues", &[vhost, name]), settings)
            .await
    }

    /// DELETE /api/queues/{vhost}/{name}
    pub async fn delete(&self, vhost: &str, name: &str) -> Result<(), ApiError> {
        self.client.delete(&api_path("queues", &[vhost, name])).await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_helpers::test_client;

    #[tokio::test]
    async fn queue_type_and_state_are_optional() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/queues/%2F/jobs")
            .with_status(200)
            .with_body(
                r#"{"name":"jobs","vhost":"/","durable":true,"auto_delete":false,"arguments":{"x-max-length":1000}}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let queue = client.queues().get("/", "jobs").await.unwrap();

        assert_eq!(queue.queue_type, None);
        assert_eq!(queue.status, None);
        assert_eq!(queue.arguments["x-max-length"], serde_json::json!(1000));
    }
}
