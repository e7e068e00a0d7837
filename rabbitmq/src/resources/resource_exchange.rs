//! Exchange resource with a `settings` block
//!
//! The older form of exchange declaration, kept for existing configurations.
//! New configurations use the typed exchange resources.

use super::common::{
    bool_or, ensure_absent, gone_on_not_found, ignore_not_found, import_by_read, not_configured,
    object, optional_string, optional_value, provider_data_from, required_string, single_block,
    state_id, string_map, string_or, string_value,
};
use super::resource_exchange_typed::ALTERNATE_EXCHANGE;
use crate::api::common::ArgumentTable;
use crate::api::exchanges::{ExchangeInfo, ExchangeSettings};
use crate::api::Client;
use crate::args::render_value;
use crate::error::{Action, ProviderError, Result};
use crate::id::{decode_resource_id, encode_resource_id};
use crate::RabbitMqProviderData;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, Schema, SchemaBuilder,
};
use tfplug::types::{Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{validate_config, OneOf};

const KIND: &str = "exchange";

pub(crate) const SETTINGS_TYPES: [&str; 4] = ["direct", "fanout", "headers", "topic"];

/// The `settings` block as the broker reports it
pub(crate) fn settings_block_value(info: &ExchangeInfo) -> Dynamic {
    let mut arguments = info.arguments.clone();
    let alternate_exchange = arguments.remove(ALTERNATE_EXCHANGE).map(|v| render_value(&v));

    let arguments: HashMap<String, Dynamic> = arguments
        .iter()
        .map(|(k, v)| (k.clone(), Dynamic::String(render_value(v))))
        .collect();

    let settings = object([
        ("type", string_value(info.exchange_type.clone())),
        ("durable", Dynamic::Bool(info.durable)),
        ("auto_delete", Dynamic::Bool(info.auto_delete)),
        ("internal", Dynamic::Bool(info.internal)),
        ("alternate_exchange", optional_value(alternate_exchange)),
        (
            "arguments",
            if arguments.is_empty() {
                Dynamic::Null
            } else {
                Dynamic::Map(arguments)
            },
        ),
    ]);
    Dynamic::List(vec![settings.value])
}

#[derive(Default)]
pub struct ExchangeResource {
    provider_data: Option<RabbitMqProviderData>,
}

impl ExchangeResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("The `rabbitmq_exchange` resource creates and manages an exchange.")
            .deprecated()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("`name@vhost`")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the exchange.")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vhost", AttributeType::String)
                    .description("The vhost to create the resource in. Defaults to `/`.")
                    .optional()
                    .default(StaticDefault::string("/"))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("settings", NestingMode::List)
                    .description("The settings of the exchange.")
                    .min_items(1)
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::new("type", AttributeType::String)
                            .description("The type of exchange: `direct`, `fanout`, `headers` or `topic`. Defaults to `direct`.")
                            .optional()
                            .default(StaticDefault::string("direct"))
                            .validator(OneOf::create(&SETTINGS_TYPES))
                            .plan_modifier(RequiresReplace::create())
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("durable", AttributeType::Bool)
                            .description("Whether the exchange survives server restarts. Defaults to `true`.")
                            .optional()
                            .default(StaticDefault::bool(true))
                            .plan_modifier(RequiresReplace::create())
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("auto_delete", AttributeType::Bool)
                            .description("Delete the exchange once its last binding is removed. Defaults to `false`.")
                            .optional()
                            .default(StaticDefault::bool(false))
                            .plan_modifier(RequiresReplace::create())
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("internal", AttributeType::Bool)
                            .description("If `true`, clients cannot publish to this exchange directly. Defaults to `false`.")
                            .optional()
                            .default(StaticDefault::bool(false))
                            .plan_modifier(RequiresReplace::create())
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("alternate_exchange", AttributeType::String)
                            .description("Exchange receiving messages this one cannot route.")
                            .optional()
                            .plan_modifier(RequiresReplace::create())
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new(
                            "arguments",
                            AttributeType::Map(Box::new(AttributeType::String)),
                        )
                        .description("Additional key/value settings for the exchange.")
                        .optional()
                        .plan_modifier(RequiresReplace::create())
                        .build(),
                    )
                    .build(),
            )
            .build()
    }

    async fn create_exchange(&self, client: &Client, planned: &DynamicValue) -> Result<DynamicValue> {
        let name = required_string(planned, "name")?;
        let vhost = string_or(planned, "vhost", "/")?;
        ensure_absent(client.exchanges().get(&vhost, &name).await, KIND, &name)?;

        let settings = settings_from(&single_block(planned, "settings")?)?;
        tracing::debug!("Declaring exchange {}@{}: {:?}", name, vhost, settings);
        client
            .exchanges()
            .declare(&vhost, &name, &settings)
            .await
            .map_err(|e| ProviderError::api(Action::Creating, KIND, e))?;

        let id = encode_resource_id(&name, &vhost);
        self.read_exchange(client, &id)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name: id })
    }

    async fn read_exchange(&self, client: &Client, id: &str) -> Result<Option<DynamicValue>> {
        let (name, vhost) = decode_resource_id(id)?;

        let Some(info) = gone_on_not_found(
            client
                .exchanges()
                .get(&vhost, &name)
                .await
                .map_err(|e| ProviderError::api(Action::Reading, KIND, e)),
        )?
        else {
            return Ok(None);
        };
        tracing::debug!("Exchange retrieved for {}: {:?}", id, info);

        Ok(Some(object([
            ("id", string_value(id)),
            ("name", string_value(info.name.clone())),
            ("vhost", string_value(info.vhost.clone())),
            ("settings", settings_block_value(&info)),
        ])))
    }

    async fn delete_exchange(&self, client: &Client, prior: &DynamicValue) -> Result<()> {
        let id = state_id(prior)?;
        let (name, vhost) = decode_resource_id(&id)?;

        tracing::debug!("Deleting exchange {}", id);
        ignore_not_found(
            client
                .exchanges()
                .delete(&vhost, &name)
                .await
                .map_err(|e| ProviderError::api(Action::Deleting, KIND, e)),
        )
    }
}

/// Map arguments are plain strings; no type coercion applies here
fn settings_from(settings: &DynamicValue) -> Result<ExchangeSettings> {
    let mut arguments: ArgumentTable = string_map(settings, "arguments")?
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    if let Some(alternate) = optional_string(settings, "alternate_exchange")?.filter(|s| !s.is_empty()) {
        arguments.insert(ALTERNATE_EXCHANGE.to_string(), Value::String(alternate));
    }

    Ok(ExchangeSettings {
        exchange_type: string_or(settings, "type", "direct")?,
        durable: bool_or(settings, "durable", true)?,
        auto_delete: bool_or(settings, "auto_delete", false)?,
        internal: bool_or(settings, "internal", false)?,
        arguments,
    })
}

#[async_trait]
impl Resource for ExchangeResource {
    fn type_name(&self) -> &str {
        "rabbitmq_exchange"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = validate_config(&Self::schema_static(), &request.config);
        diagnostics.push(Diagnostic::warning(
            "Deprecated resource",
            "Migrate this resource to a dedicated exchange resource such as rabbitmq_exchange_direct.",
        ));
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![not_configured()],
            };
        };

        match self
            .create_exchange(&provider_data.client, &request.planned_state)
            .await
        {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![e.to_diagnostic("Failed to create exchange")],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
            };
        };

        let result = match state_id(&request.current_state) {
            Ok(id) => self.read_exchange(&provider_data.client, &id).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![e.to_diagnostic("Failed to read exchange")],
            },
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.prior_state,
            diagnostics: vec![Diagnostic::error(
                "Update not supported",
                "Exchanges cannot be changed in place; every attribute forces replacement",
            )],
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let diagnostics = match self
            .delete_exchange(&provider_data.client, &request.prior_state)
            .await
        {
            Ok(()) => vec![],
            Err(e) => vec![e.to_diagnostic("Failed to delete exchange")],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for ExchangeResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let (provider_data, diagnostics) = provider_data_from(request.provider_data);
        self.provider_data = provider_data;
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for ExchangeResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_read(self, ctx, request, |id| decode_resource_id(id).map(|_| ())).await
    }
}

#[cfg(test)]
#[path = "./resource_exchange_test.rs"]
mod resource_exchange_test;
