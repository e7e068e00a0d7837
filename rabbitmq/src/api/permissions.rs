//! Permission and topic permission API implementation

use super::common::api_path;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

/// Regular expressions granting access within one vhost
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Permissions {
    pub configure: String,
    pub write: String,
    pub read: String,
}

/// Regular expressions applied to routing keys of one topic exchange
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicPermissions {
    pub exchange: String,
    pub write: String,
    pub read: String,
}

pub struct PermissionsApi<'a> {
    client: &'a Client,
}

impl<'a> PermissionsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/permissions/{vhost}/{user}
    pub async fn get(&self, vhost: &str, user: &str) -> Result<Permissions, ApiError> {
        self.client
            .get(&api_path("permissions", &[vhost, user]))
            .await
    }

    /// PUT /api/permissions/{vhost}/{user}
    pub async fn put(
        &self,
        vhost: &str,
        user: &str,
        permissions: &Permissions,
    ) -> Result<(), ApiError> {
        self.client
            .put(&api_path("permissions", &[vhost, user]), permissions)
            .await
    }

    /// DELETE /api/permissions/{vhost}/{user}
    pub async fn delete(&self, vhost: &str, user: &str) -> Result<(), ApiError> {
        self.client
            .delete(&api_path("permissions", &[vhost, user]))
            .await
    }
}

pub struct TopicPermissionsApi<'a> {
    client: &'a Client,
}

impl<'a> TopicPermissionsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/topic-permissions/{vhost}/{user}
    ///
    /// One entry per exchange; an empty list means no topic permissions.
    pub async fn list(&self, vhost: &str, user: &str) -> Result<Vec<TopicPermissions>, ApiError> {
        self.client
            .get(&api_path("topic-permissions", &[vhost, user]))
            .await
    }

    /// PUT /api/topic-permissions/{vhost}/{user}
    pub async fn put(
        &self,
        vhost: &str,
        user: &str,
        permissions: &TopicPermissions,
    ) -> Result<(), ApiError> {
        self.client
            .put(&api_path("topic-permissions", &[vhost, user]), permissions)
            .await
    }

    /// DELETE /api/topic-permissions/{vhost}/{user}
    ///
    /// Removes the permissions for every exchange at once.
    pub async fn delete(&self, vhost: &str, user: &str) -> Result<(), ApiError> {
        self.client
            .delete(&api_path("topic-permissions", &[vhost, user]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_helpers::test_client;

    #[tokio::test]
    async fn topic_permissions_ignore_extra_fields() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/topic-permissions/%2F/alice")
            .with_status(200)
            .with_body(
                r#"[{"user":"alice","vhost":"/","exchange":"amq.topic","write":"^a","read":".*"}]"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let perms = client
            .topic_permissions()
            .list("/", "alice")
            .await
            .unwrap();

        assert_eq!(perms.len(), 1);
        assert_eq!(perms[0].exchange, "amq.topic");
        assert_eq!(perms[0].write, "^a");
    }
}
