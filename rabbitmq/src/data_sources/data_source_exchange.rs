//! Exchange data source with a `settings` block

use super::lookup_failed;
use crate::api::Client;
use crate::error::{Action, ProviderError, Result};
use crate::id::encode_resource_id;
use crate::resources::common::{
    not_configured, object, provider_data_from, required_string, string_or, string_value,
};
use crate::resources::resource_exchange::settings_block_value;
use crate::RabbitMqProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::defaults::StaticDefault;
use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, Schema, SchemaBuilder,
};
use tfplug::types::DynamicValue;
use tfplug::validator::validate_config;

const KIND: &str = "exchange";

#[derive(Default)]
pub struct ExchangeDataSource {
    provider_data: Option<RabbitMqProviderData>,
}

impl ExchangeDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        let computed = |name: &str, attribute_type: AttributeType| {
            AttributeBuilder::new(name, attribute_type).computed().build()
        };

        SchemaBuilder::new()
            .version(0)
            .description("Use this data source to access information about an existing exchange.")
            .attribute(computed("id", AttributeType::String))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the exchange.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vhost", AttributeType::String)
                    .description("The vhost of the exchange. Defaults to `/`.")
                    .optional()
                    .default(StaticDefault::string("/"))
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("settings", NestingMode::List)
                    .description("The settings of the exchange.")
                    .attribute(computed("type", AttributeType::String))
                    .attribute(computed("durable", AttributeType::Bool))
                    .attribute(computed("auto_delete", AttributeType::Bool))
                    .attribute(computed("internal", AttributeType::Bool))
                    .attribute(computed("alternate_exchange", AttributeType::String))
                    .attribute(computed(
                        "arguments",
                        AttributeType::Map(Box::new(AttributeType::String)),
                    ))
                    .build(),
            )
            .build()
    }

    async fn read_exchange(
        &self,
        client: &Client,
        name: &str,
        vhost: &str,
    ) -> Result<DynamicValue> {
        let info = client
            .exchanges()
            .get(vhost, name)
            .await
            .map_err(|e| ProviderError::api(Action::Reading, KIND, e))?;
        tracing::debug!("Exchange retrieved {}@{}: {:?}", name, vhost, info);

        Ok(object([
            ("id", string_value(encode_resource_id(name, vhost))),
            ("name", string_value(info.name.clone())),
            ("vhost", string_value(info.vhost.clone())),
            ("settings", settings_block_value(&info)),
        ]))
    }
}

#[async_trait]
impl DataSource for ExchangeDataSource {
    fn type_name(&self) -> &str {
        "rabbitmq_exchange"
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
                    e.to_diagnostic("Invalid exchange configuration"),
                )
            }
        };

        match self.read_exchange(&provider_data.client, &name, &vhost).await {
            Ok(state) => ReadDataSourceResponse::ok(state),
            Err(e) => ReadDataSourceResponse::failed(
                request.config,
                lookup_failed(KIND, &encode_resource_id(&name, &vhost), e),
            ),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ExchangeDataSource {
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
#[path = "./data_source_exchange_test.rs"]
mod data_source_exchange_test;
