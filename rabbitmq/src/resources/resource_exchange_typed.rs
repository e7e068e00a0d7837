//! Typed exchange resources
//!
//! `rabbitmq_exchange_direct`, `_fanout`, `_headers`, `_topic`, `_random`,
//! `_consistent_hash` and `_delayed_message` share one adapter; the kind
//! fixes the broker exchange type. Every attribute forces replacement, so
//! there is no in-place update.

use super::common::{
    blocks, bool_or, ensure_absent, gone_on_not_found, ignore_not_found, import_by_read,
    not_configured, object, optional_string, optional_value, provider_data_from, required_string,
    state_id, string_or, string_value,
};
use crate::api::exchanges::{ExchangeInfo, ExchangeSettings};
use crate::api::Client;
use crate::args::{from_arguments, take_marker, to_arguments, value_from_typed, ArgumentEntry, ArgumentType};
use crate::error::{Action, ProviderError, Result};
use crate::id::{decode_resource_id, encode_resource_id};
use crate::RabbitMqProviderData;
use async_trait::async_trait;
use serde_json::Value;
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

pub(crate) const ALTERNATE_EXCHANGE: &str = "alternate-exchange";
pub(crate) const DELAYED_TYPE: &str = "x-delayed-type";

pub(crate) const DELAYED_TYPES: [&str; 6] = [
    "direct",
    "fanout",
    "headers",
    "topic",
    "x-random",
    "x-consistent-hash",
];

/// The exchange type a typed resource declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Headers,
    Topic,
    Random,
    ConsistentHash,
    DelayedMessage,
}

impl ExchangeKind {
    pub const ALL: [ExchangeKind; 7] = [
        ExchangeKind::Direct,
        ExchangeKind::Fanout,
        ExchangeKind::Headers,
        ExchangeKind::Topic,
        ExchangeKind::Random,
        ExchangeKind::ConsistentHash,
        ExchangeKind::DelayedMessage,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            ExchangeKind::Direct => "rabbitmq_exchange_direct",
            ExchangeKind::Fanout => "rabbitmq_exchange_fanout",
            ExchangeKind::Headers => "rabbitmq_exchange_headers",
            ExchangeKind::Topic => "rabbitmq_exchange_topic",
            ExchangeKind::Random => "rabbitmq_exchange_random",
            ExchangeKind::ConsistentHash => "rabbitmq_exchange_consistent_hash",
            ExchangeKind::DelayedMessage => "rabbitmq_exchange_delayed_message",
        }
    }

    /// The `type` the broker reports for this kind
    pub fn exchange_type(self) -> &'static str {
        match self {
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
            ExchangeKind::Headers => "headers",
            ExchangeKind::Topic => "topic",
            ExchangeKind::Random => "x-random",
            ExchangeKind::ConsistentHash => "x-consistent-hash",
            ExchangeKind::DelayedMessage => "x-delayed-message",
        }
    }

    pub fn is_delayed(self) -> bool {
        self == ExchangeKind::DelayedMessage
    }
}

/// The `argument` set block; `computed_only` builds the data source form
pub(crate) fn argument_block(computed_only: bool, value_optional: bool) -> tfplug::schema::NestedBlock {
    let attribute = |name: &str, description: &str, required: bool| {
        let builder = AttributeBuilder::new(name, AttributeType::String).description(description);
        if computed_only {
            builder.computed().build()
        } else if required {
            builder
                .required()
                .plan_modifier(RequiresReplace::create())
                .build()
        } else {
            builder
                .optional()
                .plan_modifier(RequiresReplace::create())
                .build()
        }
    };

    let type_attribute = if computed_only {
        AttributeBuilder::new("type", AttributeType::String)
            .description("The value type: `string`, `numeric`, `boolean` or `list`.")
            .computed()
            .build()
    } else {
        AttributeBuilder::new("type", AttributeType::String)
            .description("The value type: `string`, `numeric`, `boolean` or `list`. Defaults to `string`.")
            .optional()
            .default(StaticDefault::string("string"))
            .validator(OneOf::create(&ArgumentType::LABELS))
            .plan_modifier(RequiresReplace::create())
            .build()
    };

    NestedBlockBuilder::new("argument", NestingMode::Set)
        .description("The custom argument of the exchange.")
        .attribute(attribute("key", "The argument key.", true))
        .attribute(attribute("value", "The argument value.", !value_optional))
        .attribute(type_attribute)
        .build()
}

/// Reads the `argument` set into typed entries
pub(crate) fn argument_entries(state: &DynamicValue) -> Result<Vec<ArgumentEntry>> {
    blocks(state, "argument")?
        .iter()
        .map(|block| {
            Ok(ArgumentEntry::new(
                required_string(block, "key")?,
                string_or(block, "value", "")?,
                ArgumentType::from_label(&string_or(block, "type", "string")?),
            ))
        })
        .collect()
}

pub(crate) fn argument_set_value(entries: &[ArgumentEntry]) -> Dynamic {
    Dynamic::List(
        entries
            .iter()
            .map(|entry| {
                object([
                    ("key", string_value(entry.key.clone())),
                    ("value", string_value(entry.value.clone())),
                    ("type", string_value(entry.r#type.label())),
                ])
                .value
            })
            .collect(),
    )
}

/// Coercion errors for argument entries whose values are already known
pub(crate) fn argument_diagnostics(config: &DynamicValue, summary: &str) -> Vec<Diagnostic> {
    let Ok(arguments) = blocks(config, "argument") else {
        return vec![];
    };
    arguments
        .iter()
        .filter_map(|block| {
            let key = optional_string(block, "key").ok()??;
            let value = optional_string(block, "value").ok()??;
            let label = optional_string(block, "type").ok()?.unwrap_or_default();
            let entry = ArgumentEntry::new(key, value, ArgumentType::from_label(&label));
            value_from_typed(&entry)
                .err()
                .map(|e| ProviderError::from(e).to_diagnostic(summary))
        })
        .collect()
}

/// Flat exchange state shared by the typed resources and data sources
pub(crate) fn typed_exchange_state(kind: Option<ExchangeKind>, info: ExchangeInfo) -> DynamicValue {
    let mut arguments = info.arguments;
    let alternate_exchange = take_marker(&mut arguments, ALTERNATE_EXCHANGE);
    let delayed_type = match kind {
        Some(kind) if kind.is_delayed() => take_marker(&mut arguments, DELAYED_TYPE),
        _ => None,
    };

    let mut attributes = vec![
        ("id", string_value(encode_resource_id(&info.name, &info.vhost))),
        ("name", string_value(info.name)),
        ("vhost", string_value(info.vhost)),
        ("type", string_value(info.exchange_type)),
        ("durable", Dynamic::Bool(info.durable)),
        ("auto_delete", Dynamic::Bool(info.auto_delete)),
        ("internal", Dynamic::Bool(info.internal)),
        ("alternate_exchange", optional_value(alternate_exchange)),
        ("argument", argument_set_value(&from_arguments(&arguments))),
    ];
    if kind.is_some_and(ExchangeKind::is_delayed) {
        attributes.push(("delayed_type", optional_value(delayed_type)));
    }
    object(attributes)
}

pub struct TypedExchangeResource {
    kind: ExchangeKind,
    provider_data: Option<RabbitMqProviderData>,
}

impl Default for TypedExchangeResource {
    fn default() -> Self {
        Self::new(ExchangeKind::default())
    }
}

impl TypedExchangeResource {
    pub fn new(kind: ExchangeKind) -> Self {
        Self {
            kind,
            provider_data: None,
        }
    }

    pub fn kind(&self) -> ExchangeKind {
        self.kind
    }

    pub fn schema_for(kind: ExchangeKind) -> Schema {
        let description = format!(
            "The `{}` resource creates and manages an _exchange_ of type '{}'.",
            kind.type_name(),
            kind.exchange_type()
        );

        let mut builder = SchemaBuilder::new()
            .version(0)
            .description(&description)
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
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("The exchange type.")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
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
                    .description("If `true`, the exchange deletes itself once it has had bindings and all of them are gone. Defaults to `false`.")
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
            .block(argument_block(false, kind.is_delayed()));

        if kind.is_delayed() {
            builder = builder.attribute(
                AttributeBuilder::new("delayed_type", AttributeType::String)
                    .description("The type of delayed exchange. Defaults to `direct`.")
                    .optional()
                    .default(StaticDefault::string("direct"))
                    .validator(OneOf::create(&DELAYED_TYPES))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            );
        }

        builder.build()
    }

    fn settings_from(&self, planned: &DynamicValue) -> Result<ExchangeSettings> {
        let mut arguments = to_arguments(&argument_entries(planned)?)?;
        if let Some(alternate) = optional_string(planned, "alternate_exchange")?.filter(|s| !s.is_empty()) {
            arguments.insert(ALTERNATE_EXCHANGE.to_string(), Value::String(alternate));
        }
        if self.kind.is_delayed() {
            arguments.insert(
                DELAYED_TYPE.to_string(),
                Value::String(string_or(planned, "delayed_type", "direct")?),
            );
        }

        Ok(ExchangeSettings {
            exchange_type: self.kind.exchange_type().to_string(),
            durable: bool_or(planned, "durable", true)?,
            auto_delete: bool_or(planned, "auto_delete", false)?,
            internal: bool_or(planned, "internal", false)?,
            arguments,
        })
    }

    async fn create_exchange(&self, client: &Client, planned: &DynamicValue) -> Result<DynamicValue> {
        let name = required_string(planned, "name")?;
        let vhost = string_or(planned, "vhost", "/")?;
        ensure_absent(client.exchanges().get(&vhost, &name).await, KIND, &name)?;

        let settings = self.settings_from(planned)?;
        tracing::debug!("Declaring {} exchange {}@{}", settings.exchange_type, name, vhost);
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

        let info = gone_on_not_found(
            client
                .exchanges()
                .get(&vhost, &name)
                .await
                .map_err(|e| ProviderError::api(Action::Reading, KIND, e)),
        )?;
        Ok(info.map(|info| {
            if info.exchange_type != self.kind.exchange_type() {
                tracing::warn!(
                    "Exchange {} has type {}, expected {}",
                    id,
                    info.exchange_type,
                    self.kind.exchange_type()
                );
            }
            typed_exchange_state(Some(self.kind), info)
        }))
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

#[async_trait]
impl Resource for TypedExchangeResource {
    fn type_name(&self) -> &str {
        self.kind.type_name()
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
            schema: Self::schema_for(self.kind),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = validate_config(&Self::schema_for(self.kind), &request.config);
        diagnostics.extend(argument_diagnostics(&request.config, "Invalid exchange argument"));
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
impl ResourceWithConfigure for TypedExchangeResource {
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
impl ResourceWithImportState for TypedExchangeResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_read(self, ctx, request, |id| decode_resource_id(id).map(|_| ())).await
    }
}

#[cfg(test)]
#[path = "./resource_exchange_typed_test.rs"]
mod resource_exchange_typed_test;
