//! Queue data source implementation

use super::lookup_failed;
use crate::api::queues::QueueInfo;
use crate::api::Client;
use crate::error::{Action, ProviderError, Result};
use crate::id::encode_resource_id;
use crate::resources::common::{
    not_configured, object, optional_value, provider_data_from, required_string, string_or,
    string_value,
};
use crate::RabbitMqProviderData;
use async_trait::async_trait;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::defaults::StaticDefault;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::DynamicValue;
use tfplug::validator::validate_config;

const KIND: &str = "queue";

/// How many times a queue without a reported status is fetched again
const STATUS_ATTEMPTS: usize = 10;

pub struct QueueDataSource {
    provider_data: Option<RabbitMqProviderData>,
    poll_interval: Duration,
}

impl Default for QueueDataSource {
    fn default() -> Self {
        Self {
            provider_data: None,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl QueueDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay between fetches while a freshly declared queue has no status yet
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Use this data source to access information about an existing queue.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The queue identifier, `name@vhost`")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the queue.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vhost", AttributeType::String)
                    .description("The vhost of the queue.")
                    .optional()
                    .default(StaticDefault::string("/"))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("The queue type: `classic`, `quorum` or `stream`.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description("The state of the queue process, e.g. `running`.")
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn fetch(&self, client: &Client, vhost: &str, name: &str) -> Result<QueueInfo> {
        client
            .queues()
            .get(vhost, name)
            .await
            .map_err(|e| ProviderError::api(Action::Reading, KIND, e))
    }

    /// The broker omits `state` until the queue process has started
    async fn fetch_with_status(
        &self,
        client: &Client,
        vhost: &str,
        name: &str,
    ) -> Result<QueueInfo> {
        let mut info = self.fetch(client, vhost, name).await?;
        for attempt in 1..STATUS_ATTEMPTS {
            if info.status.as_deref().is_some_and(|s| !s.is_empty()) {
                break;
            }
            tracing::debug!("Queue {}@{} has no status yet, attempt {}", name, vhost, attempt);
            tokio::time::sleep(self.poll_interval).await;
            info = self.fetch(client, vhost, name).await?;
        }
        Ok(info)
    }

    async fn read_queue(&self, client: &Client, name: &str, vhost: &str) -> Result<DynamicValue> {
        let info = self.fetch_with_status(client, vhost, name).await?;
        tracing::debug!("Queue retrieved {}@{}: {:?}", name, vhost, info);

        Ok(object([
            ("id", string_value(encode_resource_id(name, vhost))),
            ("name", string_value(info.name)),
            ("vhost", string_value(info.vhost)),
            ("type", optional_value(info.queue_type)),
            ("status", optional_value(info.status)),
        ]))
    }
}

#[async_trait]
impl DataSource for QueueDataSource {
    fn type_name(&self) -> &str {
        "rabbitmq_queue"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: validate_config(&Self::schema_static(), &request.config),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadDataSourceResponse::failed(request.config, not_configured());
        };

        let names = required_string(&request.config, "name")
            .and_then(|name| Ok((name, string_or(&request.config, "vhost", "/")?)));
        let (name, vhost) = match names {
            Ok(names) => names,
            Err(e) => {
                return ReadDataSourceResponse::failed(
                    request.config,
                    e.to_diagnostic("Invalid queue configuration"),
                )
            }
        };

        match self.read_queue(&provider_data.client, &name, &vhost).await {
            Ok(state) => ReadDataSourceResponse::ok(state),
            Err(e) => ReadDataSourceResponse::failed(
                request.config,
                lookup_failed(KIND, &encode_resource_id(&name, &vhost), e),
            ),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for QueueDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let (provider_data, diagnostics) = provider_data_from(request.provider_data);
        self.provider_data = provider_data;
        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
#[path = "./data_source_queue_test.rs"]
mod data_source_queue_test;
