//! User data source implementation

use super::lookup_failed;
use crate::api::Client;
use crate::error::{Action, ProviderError, Result};
use crate::resources::common::{
    limit_state, not_configured, object, provider_data_from, required_string, string_value,
};
use crate::resources::resource_user::USER_LIMITS;
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

const KIND: &str = "user";

#[derive(Default)]
pub struct UserDataSource {
    provider_data: Option<RabbitMqProviderData>,
}

impl UserDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Use this data source to access information about an existing user.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the user.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::List(Box::new(AttributeType::String)))
                    .description("The tags of the user.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_connections", AttributeType::String)
                    .description("How many connections the user can open, if limited.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_channels", AttributeType::String)
                    .description("How many channels the user can open, if limited.")
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn read_user(&self, client: &Client, name: &str) -> Result<DynamicValue> {
        let user = client
            .users()
            .get(name)
            .await
            .map_err(|e| ProviderError::api(Action::Reading, KIND, e))?;
        let limits = client
            .users()
            .get_limits(name)
            .await
            .map_err(|e| ProviderError::api(Action::Reading, "user limits", e))?;
        tracing::debug!("User retrieved {}: {:?} {:?}", name, user, limits);

        let tags = user
            .tags
            .into_iter()
            .filter(|t| !t.is_empty())
            .map(Dynamic::String)
            .collect();
        let mut attributes = vec![
            ("id", string_value(name)),
            ("name", string_value(user.name)),
            ("tags", Dynamic::List(tags)),
        ];
        let no_prior = DynamicValue::null();
        for (attribute, limit) in USER_LIMITS {
            attributes.push((attribute, limit_state(&no_prior, attribute, &limits, limit)?));
        }
        Ok(object(attributes))
    }
}

#[async_trait]
impl DataSource for UserDataSource {
    fn type_name(&self) -> &str {
        "rabbitmq_user"
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
                    e.to_diagnostic("Invalid user configuration"),
                )
            }
        };

        match self.read_user(&provider_data.client, &name).await {
            Ok(state) => ReadDataSourceResponse::ok(state),
            Err(e) => ReadDataSourceResponse::failed(
                request.config,
                lookup_failed(KIND, &name, e),
            ),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for UserDataSource {
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
#[path = "./data_source_user_test.rs"]
mod data_source_user_test;
