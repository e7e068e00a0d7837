//! Binding API implementation
//!
//! Bindings have no name. The broker identifies them by source, destination
//! and a properties key derived from the routing key and arguments.

use super::common::{null_as_default, segment, ArgumentTable};
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct BindingInfo {
    pub source: String,
    pub vhost: String,
    pub destination: String,
    /// `queue` or `exchange`
    pub destination_type: String,
    #[serde(default)]
    pub routing_key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub arguments: ArgumentTable,
    #[serde(default)]
    pub properties_key: String,
}

/// POST /api/bindings/{vhost}/e/{source}/{q|e}/{destination}
#[derive(Debug, Clone, Serialize)]
pub struct BindingSettings {
    pub routing_key: String,
    pub arguments: ArgumentTable,
}

fn destination_marker(destination_type: &str) -> &'static str {
    if destination_type == "exchange" {
        "e"
    } else {
        "q"
    }
}

fn between_path(vhost: &str, source: &str, destination: &str, destination_type: &str) -> String {
    format!(
        "/api/bindings/{}/e/{}/{}/{}",
        segment(vhost),
        segment(source),
        destination_marker(destination_type),
        segment(destination)
    )
}

/// Extracts the properties key from a binding `Location` header: the last
/// path segment, percent-decoded
pub fn properties_key_from_location(location: &str) -> String {
    let last = location.rsplit('/').next().unwrap_or_default();
    urlencoding::decode(last)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| last.to_string())
}

pub struct BindingsApi<'a> {
    client: &'a Client,
}

impl<'a> BindingsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/bindings/{vhost}
    pub async fn list_in_vhost(&self, vhost: &str) -> Result<Vec<BindingInfo>, ApiError> {
        self.client
            .get(&format!("/api/bindings/{}", segment(vhost)))
            .await
    }

    /// GET /api/bindings/{vhost}/e/{source}/{q|e}/{destination}
    pub async fn list_between(
        &self,
        vhost: &str,
        source: &str,
        destination: &str,
        destination_type: &str,
    ) -> Result<Vec<BindingInfo>, ApiError> {
        self.client
            .get(&between_path(vhost, source, destination, destination_type))
            .await
    }

    /// POST /api/bindings/{vhost}/e/{source}/{q|e}/{destination}
    ///
    /// Returns the properties key of the new binding.
    pub async fn declare(
        &self,
        vhost: &str,
        source: &str,
        destination: &str,
        destination_type: &str,
        settings: &BindingSettings,
    ) -> Result<String, ApiError> {
        let location = self
            .client
            .post(
                &between_path(vhost, source, destination, destination_type),
                settings,
            )
            .await?;

        location
            .as_deref()
            .map(properties_key_from_location)
            .ok_or_else(|| ApiError::ParseError("binding response has no Location header".to_string()))
    }

    /// DELETE /api/bindings/{vhost}/e/{source}/{q|e}/{destination}/{props}
    pub async fn delete(
        &self,
        vhost: &str,
        source: &str,
        destination: &str,
        destination_type: &str,
        properties_key: &str,
    ) -> Result<(), ApiError> {
        let path = format!(
            "{}/{}",
            between_path(vhost, source, destination, destination_type),
            segment(properties_key)
        );
        self.client.delete(&path).await
    }
}
