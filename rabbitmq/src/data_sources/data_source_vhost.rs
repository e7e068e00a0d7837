//! Vhost data source implementation

use super::lookup_failed;
use crate::api::Client;
use crate::error::{Action, ProviderError, Result};
use crate::resources::common::{
    limit_state, not_configured, object, optional_value, provider_data_from, required_string,
    string_value,
};
use crate::resources::resource_vhost::VHOST_LIMITS;
use crate::RabbitMqProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{Dynamic, DynamicValue};
use tfplug::validator::validate_config;

const KIND: &str = "vhost";

#[derive(Default)]
pub struct VhostDataSource {
    provider_data: Option<RabbitMqProviderData>,
}

impl VhostDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        let computed_string = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .computed()
                .build()
        };

        SchemaBuilder::new()
            .version(0)
            .description("Use this data source to access information about an existing vhost.")
            .attribute(computed_string("id", "The vhost name"))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the vhost.")
                    .required()
                    .build(),
            )
            .attribute(computed_string("description", "The description of the vhost."))
            .attribute(computed_string(
                "default_queue_type",
                "The queue type used when a client does not ask for one.",
            ))
            .attribute(
                AttributeBuilder::new("tracing", AttributeType::Bool)
                    .description("Whether message tracing is enabled.")
                    .computed()
                    .build(),
            )
            .attribute(computed_string("max_connections", "The connection limit, if any."))
            .attribute(computed_string("max_queues", "The queue limit, if any."))
            .build()
    }

    async fn read_vhost(&self, client: &Client, name: &str) -> Result<DynamicValue> {
        let vhost = client
            .vhosts()
            .get(name)
            .await
            .map_err(|e| ProviderError::api(Action::Reading, KIND, e))?;
        let limits = client
            .vhosts()
            .get_limits(name)
            .await
            .map_err(|e| ProviderError::api(Action::Reading, "vhost limits", e))?;
        tracing::debug!("Vhost retrieved {}: {:?} {:?}", name, vhost, limits);

        let mut attributes = vec![
            ("id", string_value(name)),
            ("name", string_value(vhost.name)),
            ("description", optional_value(vhost.description)),
            ("default_queue_type", optional_value(vhost.default_queue_type)),
            ("tracing", Dynamic::Bool(vhost.tracing)),
        ];
        let no_prior = DynamicValue::null();
        for (attribute, limit) in VHOST_LIMITS {
            attributes.push((attribute, limit_state(&no_prior, attribute, &limits, limit)?));
        }
        Ok(object(attributes))
    }
}

#[async_trait]
impl DataSource for VhostDataSource {
    fn type_name(&self) -> &str {
        "rabbitmq_vhost"
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

        let name = match required_string(&request.config, "name") {
            Ok(name) => name,
            Err(e) => {
                return ReadDataSourceResponse::failed(
                    request.config,
                    e.to_diagnostic("Invalid vhost configuration"),
                )
            }
        };

        match self.read_vhost(&provider_data.client, &name).await {
            Ok(state) => ReadDataSourceResponse::ok(state),
            Err(e) => ReadDataSourceResponse::failed(
                request.config,
                lookup_failed(KIND, &name, e),
            ),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for VhostDataSource {
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
#[path = "./data_source_vhost_test.rs"]
mod data_source_vhost_test;
