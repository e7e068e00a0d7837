//! User and user limit API implementation

use super::common::{api_path, deserialize_string_list};
use super::vhosts::{LimitValue, Limits, LimitsEntry};
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

/// GET /api/users/{name}
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub tags: Vec<String>,
}

/// PUT /api/users/{name}
///
/// Older brokers expect tags as one comma separated string.
#[derive(Debug, Clone, Serialize)]
pub struct UserSettings {
    pub password: String,
    pub tags: String,
}

impl UserSettings {
    pub fn new(password: &str, tags: &[String]) -> Self {
        Self {
            password: password.to_string(),
            tags: tags.join(","),
        }
    }
}

pub struct UsersApi<'a> {
    client: &'a Client,
}

impl<'a> UsersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/users/{name}
    pub async fn get(&self, name: &str) -> Result<UserInfo, ApiError> {
        self.client.get(&api_path("users", &[name])).await
    }

    /// PUT /api/users/{name}
    pub async fn put(&self, name: &str, settings: &UserSettings) -> Result<(), ApiError> {
        self.client.put(&api_path("users", &[name]), settings).await
    }

    /// DELETE /api/users/{name}
    pub async fn delete(&self, name: &str) -> Result<(), ApiError> {
        self.client.delete(&api_path("users", &[name])).await
    }

    /// GET /api/user-limits/{name}
    pub async fn get_limits(&self, name: &str) -> Result<Limits, ApiError> {
        let entries: Vec<LimitsEntry> = self.client.get(&api_path("user-limits", &[name])).await?;
        Ok(entries.into_iter().next().map(|e| e.value).unwrap_or_default())
    }

    /// PUT /api/user-limits/{name}/{limit}
    pub async fn put_limit(&self, name: &str, limit: &str, value: i64) -> Result<(), ApiError> {
        self.client
            .put(&api_path("user-limits", &[name, limit]), &LimitValue { value })
            .await
    }

    /// DELETE /api/user-limits/{name}/{limit}
    pub async fn delete_limit(&self, name: &str, limit: &str) -> Result<(), ApiError> {
        self.client
            .delete(&api_path("user-limits", &[name, limit]))
            .await
    }
}
