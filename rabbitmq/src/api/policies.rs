//! Policy and operator policy API implementation

use super::common::{api_path, null_as_default, ArgumentTable};
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

/// Policies and operator policies share one shape under different paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Policy,
    OperatorPolicy,
}

impl PolicyKind {
    fn collection(self) -> &'static str {
        match self {
            PolicyKind::Policy => "policies",
            PolicyKind::OperatorPolicy => "operator-policies",
        }
    }
}

/// GET /api/policies/{vhost}/{name}
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyInfo {
    pub name: String,
    pub vhost: String,
    pub pattern: String,
    #[serde(rename = "apply-to")]
    pub apply_to: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub definition: ArgumentTable,
}

/// PUT /api/policies/{vhost}/{name}
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicySettings {
    pub pattern: String,
    #[serde(rename = "apply-to")]
    pub apply_to: String,
    pub priority: i64,
    pub definition: ArgumentTable,
}

pub struct PoliciesApi<'a> {
    client: &'a Client,
    kind: PolicyKind,
}

impl<'a> PoliciesApi<'a> {
    pub fn new(client: &'a Client, kind: PolicyKind) -> Self {
        Self { client, kind }
    }

    /// GET /api/{policies|operator-policies}/{vhost}/{name}
    pub async fn get(&self, vhost: &str, name: &str) -> Result<PolicyInfo, ApiError> {
        self.client
            .get(&api_path(self.kind.collection(), &[vhost, name]))
            .await
    }

    /// PUT /api/{policies|operator-policies}/{vhost}/{name}
    pub async fn put(
        &self,
        vhost: &str,
        name: &str,
        settings: &PolicySettings,
    ) -> Result<(), ApiError> {
        self.client
            .put(&api_path(self.kind.collection(), &[vhost, name]), settings)
            .await
    }

    /// DELETE /api/{policies|operator-policies}/{vhost}/{name}
    pub async fn delete(&self, vhost: &str, name: &str) -> Result<(), ApiError> {
        self.client
            .delete(&api_path(self.kind.collection(), &[vhost, name]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::test_client;
    use mockito::Matcher;

    #[tokio::test]
    async fn operator_policies_use_their_own_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/operator-policies/%2F/limits")
            .match_body(Matcher::Json(serde_json::json!({
                "pattern": ".*",
                "apply-to": "queues",
                "priority": 0,
                "definition": {"max-length": 1000}
            })))
            .with_status(201)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let mut definition = ArgumentTable::new();
        definition.insert("max-length".to_string(), serde_json::json!(1000));

        client
            .policies(PolicyKind::OperatorPolicy)
            .put(
                "/",
                "limits",
                &PolicySettings {
                    pattern: ".*".to_string(),
                    apply_to: "queues".to_string(),
                    priority: 0,
                    definition,
                },
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }
}
