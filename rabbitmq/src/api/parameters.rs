//! Runtime parameter API implementation (federation upstreams, shovels)

use super::common::{api_path, deserialize_uri_list, ArgumentTable};
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// GET /api/parameters/{component}/{vhost}/{name}
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeParameter<D> {
    pub name: String,
    pub vhost: String,
    pub component: String,
    pub value: D,
}

#[derive(Debug, Serialize)]
struct ParameterValue<'d, D> {
    value: &'d D,
}

/// Value of a `federation-upstream` parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FederationDefinition {
    #[serde(default, deserialize_with = "deserialize_uri_list")]
    pub uri: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prefetch_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reconnect_delay: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ack_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trust_user_id: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_hops: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expires: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message_ttl: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub queue: Option<String>,
}

/// Value of a `shovel` parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShovelDefinition {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ack_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub add_forward_headers: Option<bool>,
    /// `never`, `queue-length` or a message count
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub delete_after: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dest_add_forward_headers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dest_add_timestamp_header: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dest_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dest_application_properties: Option<ArgumentTable>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dest_exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dest_exchange_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dest_properties: Option<ArgumentTable>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dest_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dest_publish_properties: Option<ArgumentTable>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dest_queue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dest_queue_args: Option<ArgumentTable>,
    #[serde(default, deserialize_with = "deserialize_uri_list")]
    pub dest_uri: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prefetch_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reconnect_delay: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub src_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub src_delete_after: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub src_exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub src_exchange_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub src_prefetch_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub src_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub src_queue: Option<String>,
    #[serde(default, deserialize_with = "deserialize_uri_list")]
    pub src_uri: Vec<String>,
}

/// Parameters of one component, typed by their value
pub struct ParametersApi<'a, D> {
    client: &'a Client,
    component: &'static str,
    _definition: PhantomData<D>,
}

impl<'a, D> ParametersApi<'a, D>
where
    D: Serialize + for<'de> Deserialize<'de>,
{
    pub fn new(client: &'a Client, component: &'static str) -> Self {
        Self {
            client,
            component,
            _definition: PhantomData,
        }
    }

    /// GET /api/parameters/{component}/{vhost}/{name}
    pub async fn get(&self, vhost: &str, name: &str) -> Result<RuntimeParameter<D>, ApiError> {
        self.client
            .get(&api_path("parameters", &[self.component, vhost, name]))
            .await
    }

    /// PUT /api/parameters/{component}/{vhost}/{name}
    pub async fn put(&self, vhost: &str, name: &str, definition: &D) -> Result<(), ApiError> {
        self.client
            .put(
                &api_path("parameters", &[self.component, vhost, name]),
                &ParameterValue { value: definition },
            )
            .await
    }

    /// DELETE /api/parameters/{component}/{vhost}/{name}
    pub async fn delete(&self, vhost: &str, name: &str) -> Result<(), ApiError> {
        self.client
            .delete(&api_path("parameters", &[self.component, vhost, name]))
            .await
    }
}
