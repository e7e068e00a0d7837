//! Shared setup for the resource adapter tests

#![allow(clippy::disallowed_methods)]

use crate::api::test_helpers::{init_test_logging, test_client};
use crate::RabbitMqProviderData;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{ConfigureDataSourceRequest, DataSourceWithConfigure};
use tfplug::resource::{ConfigureResourceRequest, ResourceWithConfigure};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

pub fn provider_data(url: &str) -> RabbitMqProviderData {
    RabbitMqProviderData::new(test_client(url))
}

/// A resource wired to the mock server at `url`
pub async fn configured<R>(url: &str) -> R
where
    R: ResourceWithConfigure + Default,
{
    configure(R::default(), url).await
}

/// Wires an already constructed resource to the mock server at `url`
pub async fn configure<R>(mut resource: R, url: &str) -> R
where
    R: ResourceWithConfigure,
{
    init_test_logging();
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: Some(Arc::new(provider_data(url))),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

/// A data source wired to the mock server at `url`
pub async fn configure_data_source<D>(mut data_source: D, url: &str) -> D
where
    D: DataSourceWithConfigure,
{
    init_test_logging();
    let response = data_source
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: Some(Arc::new(provider_data(url))),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    data_source
}

pub fn state(json: serde_json::Value) -> DynamicValue {
    DynamicValue::new(Dynamic::from_json(json))
}

pub fn string_at(state: &DynamicValue, name: &str) -> String {
    state.get_string(&AttributePath::new(name)).unwrap()
}
