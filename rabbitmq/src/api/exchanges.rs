//! Exchange API implementation

use super::common::{api_path, null_as_default, ArgumentTable};
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

/// GET /api/exchanges/{vhost}/{name}
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfo {
    pub name: String,
    pub vhost: String,
    #[serde(rename = "type")]
    pub exchange_type: String,
    pub durable: bool,
    pub auto_delete: bool,
    #[serde(default)]
    pub internal: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub arguments: ArgumentTable,
}

/// PUT /api/exchanges/{vhost}/{name}
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeSettings {
    #[serde(rename = "type")]
    pub exchange_type: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
    pub arguments: ArgumentTable,
}

pub struct ExchangesApi<'a> {
    client: &'a Client,
}

impl<'a> ExchangesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/exchanges/{vhost}/{name}
    pub async fn get(&self, vhost: &str, name: &str) -> Result<ExchangeInfo, ApiError> {
        self.client.get(&api_path("exchanges", &[vhost, name])).await
    }

    /// PUT /api/exchanges/{vhost}/{name}
    pub async fn declare(
        &self,
        vhost: &str,
        name: &str,
        settings: &ExchangeSettings,
    ) -> Result<(), ApiError> {
        self.client
            .put(&api_path("exchanges", &[vhost, name]), settings)
            .await
    }

    /// DELETE /api/exchanges/{vhost}/{name}
    pub async fn delete(&self, vhost: &str, name: &str) -> Result<(), ApiError> {
        self.client
            .delete(&api_path("exchanges", &[vhost, name]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_helpers::test_client;

    #[tokio::test]
    async fn null_arguments_read_as_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/exchanges/%2F/logs")
            .with_status(200)
            .with_body(
                r#"{"name":"logs","vhost":"/","type":"fanout","durable":true,"auto_delete":false,"internal":false,"arguments":null}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let exchange = client.exchanges().get("/", "logs").await.unwrap();

        assert_eq!(exchange.exchange_type, "fanout");
        assert!(exchange.arguments.is_empty());
    }
}
