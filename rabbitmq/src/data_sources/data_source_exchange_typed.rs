//! Typed exchange data sources, one per exchange kind

use super::lookup_failed;
use crate::api::Client;
use crate::error::{Action, ProviderError, Result};
use crate::id::encode_resource_id;
use crate::resources::common::{not_configured, provider_data_from, required_string, string_or};
use crate::resources::resource_exchange_typed::{argument_block, typed_exchange_state, ExchangeKind};
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
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::DynamicValue;
use tfplug::validator::validate_config;

const KIND: &str = "exchange";

pub struct TypedExchangeDataSource {
    kind: ExchangeKind,
    provider_data: Option<RabbitMqProviderData>,
}

impl TypedExchangeDataSource {
    pub fn new(kind: ExchangeKind) -> Self {
        Self {
            kind,
            provider_data: None,
        }
    }

    pub fn schema_for(kind: ExchangeKind) -> Schema {
        let description = format!(
            "Use this data source to access information about an existing _exchange_ of type '{}'.",
            kind.exchange_type()
        );
        let computed = |name: &str, attribute_type: AttributeType| {
            AttributeBuilder::new(name, attribute_type).computed().build()
        };

        let mut builder = SchemaBuilder::new()
            .version(0)
            .description(&description)
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
            .attribute(computed("type", AttributeType::String))
            .attribute(computed("durable", AttributeType::Bool))
            .attribute(computed("auto_delete", AttributeType::Bool))
            .attribute(computed("internal", AttributeType::Bool))
            .attribute(computed("alternate_exchange", AttributeType::String))
            .block(argument_block(true, kind.is_delayed()));

        if kind.is_delayed() {
            builder = builder.attribute(computed("delayed_type", AttributeType::String));
        }
        builder.build()
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

        if info.exchange_type != self.kind.exchange_type() {
            tracing::warn!(
                "Exchange {}@{} has type {}, expected {}",
                name,
                vhost,
                info.exchange_type,
                self.kind.exchange_type()
            );
        }
        Ok(typed_exchange_state(Some(self.kind), info))
    }
}

#[async_trait]
impl DataSource for TypedExchangeDataSource {
    fn type_name(&self) -> &str {
        self.kind.type_name()
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
            schema: Self::schema_for(self.kind),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: validate_config(&Self::schema_for(self.kind), &request.config),
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
impl DataSourceWithConfigure for TypedExchangeDataSource {
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
#[path = "./data_source_exchange_typed_test.rs"]
mod data_source_exchange_typed_test;
