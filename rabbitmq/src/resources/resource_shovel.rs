//! Dynamic shovel resource implementation
//!
//! A shovel is a runtime parameter; every write replaces the whole `info`
//! definition.

use super::common::{
    changed, ensure_absent, gone_on_not_found, ignore_not_found, import_by_read, not_configured,
    object, optional_i64, optional_string, optional_value, provider_data_from, required_string,
    single_block, state_id, string_map, string_value,
};
use crate::api::common::ArgumentTable;
use crate::api::parameters::ShovelDefinition;
use crate::api::Client;
use crate::args::render_value;
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
    Attribute, AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, Schema,
    SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{validate_config, OneOf};

const KIND: &str = "shovel";

const ACK_MODES: &[&str] = &["on-confirm", "on-publish", "no-ack"];
const PROTOCOLS: &[&str] = &["amqp091", "amqp10"];

/// Pairs of `info` attributes that cannot both be set
const CONFLICTS: &[(&str, &str)] = &[
    ("add_forward_headers", "destination_add_forward_headers"),
    ("delete_after", "source_delete_after"),
    ("prefetch_count", "source_prefetch_count"),
    ("destination_exchange", "destination_queue"),
    ("source_exchange", "source_queue"),
];

fn string_attribute(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .build()
}

fn map_attribute(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::Map(Box::new(AttributeType::String)))
        .description(description)
        .optional()
        .build()
}

#[derive(Default)]
pub struct ShovelResource {
    provider_data: Option<RabbitMqProviderData>,
}

impl ShovelResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("The `rabbitmq_shovel` resource creates and manages a dynamic shovel.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("`name@vhost`")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The shovel name.")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vhost", AttributeType::String)
                    .description("The vhost to create the resource in.")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("info", NestingMode::List)
                    .description("The settings of the dynamic shovel.")
                    .min_items(1)
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::new("source_uri", AttributeType::String)
                            .description("The AMQP URI of the source.")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("destination_uri", AttributeType::String)
                            .description("The AMQP URI of the destination.")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("ack_mode", AttributeType::String)
                            .description("How the shovel acknowledges messages: `on-confirm`, `on-publish` or `no-ack`. Defaults to `on-confirm`.")
                            .optional()
                            .default(StaticDefault::string("on-confirm"))
                            .validator(OneOf::create(ACK_MODES))
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("reconnect_delay", AttributeType::Number)
                            .description("Seconds to wait before reconnecting to a broker. Defaults to `1`.")
                            .optional()
                            .default(StaticDefault::number(1.0))
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("source_protocol", AttributeType::String)
                            .description("Protocol used for the source: `amqp091` or `amqp10`. Defaults to `amqp091`.")
                            .optional()
                            .default(StaticDefault::string("amqp091"))
                            .validator(OneOf::create(PROTOCOLS))
                            .build(),
                    )
                    .attribute(string_attribute("source_queue", "The queue to consume from. Conflicts with `source_exchange`."))
                    .attribute(string_attribute("source_exchange", "The exchange to consume from. Conflicts with `source_queue`."))
                    .attribute(string_attribute("source_exchange_key", "The routing key when using `source_exchange`."))
                    .attribute(string_attribute("source_address", "AMQP 1.0 only: the source link address."))
                    .attribute(
                        AttributeBuilder::new("source_prefetch_count", AttributeType::Number)
                            .description("Maximum number of unacknowledged messages copied at once.")
                            .optional()
                            .build(),
                    )
                    .attribute(string_attribute(
                        "source_delete_after",
                        "When the shovel deletes itself: `never`, `queue-length` or a message count.",
                    ))
                    .attribute(
                        AttributeBuilder::new("destination_protocol", AttributeType::String)
                            .description("Protocol used for the destination: `amqp091` or `amqp10`. Defaults to `amqp091`.")
                            .optional()
                            .default(StaticDefault::string("amqp091"))
                            .validator(OneOf::create(PROTOCOLS))
                            .build(),
                    )
                    .attribute(string_attribute("destination_queue", "The queue to publish to. Conflicts with `destination_exchange`."))
                    .attribute(string_attribute("destination_exchange", "The exchange to publish to. Conflicts with `destination_queue`."))
                    .attribute(string_attribute("destination_exchange_key", "The routing key when using `destination_exchange`."))
                    .attribute(string_attribute("destination_address", "AMQP 1.0 only: the destination link address."))
                    .attribute(
                        AttributeBuilder::new("destination_add_forward_headers", AttributeType::Bool)
                            .description("Whether to add `x-shovelled` headers to shovelled messages.")
                            .optional()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("destination_add_timestamp_header", AttributeType::Bool)
                            .description("Whether to add `x-shovelled-timestamp` headers to shovelled messages. Defaults to `false`.")
                            .optional()
                            .default(StaticDefault::bool(false))
                            .build(),
                    )
                    .attribute(map_attribute(
                        "destination_application_properties",
                        "AMQP 1.0 only: application properties set on shovelled messages.",
                    ))
                    .attribute(map_attribute(
                        "destination_properties",
                        "AMQP 1.0 only: properties overwritten on shovelled messages.",
                    ))
                    .attribute(map_attribute(
                        "destination_publish_properties",
                        "Properties overwritten on shovelled messages.",
                    ))
                    .attribute(map_attribute(
                        "destination_queue_arguments",
                        "Arguments of the destination queue declared by the shovel.",
                    ))
                    .attribute(
                        AttributeBuilder::new("add_forward_headers", AttributeType::Bool)
                            .description("Use `destination_add_forward_headers` instead.")
                            .optional()
                            .deprecated()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("delete_after", AttributeType::String)
                            .description("Use `source_delete_after` instead.")
                            .optional()
                            .deprecated()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("prefetch_count", AttributeType::Number)
                            .description("Use `source_prefetch_count` instead.")
                            .optional()
                            .deprecated()
                            .build(),
                    )
                    .build(),
            )
            .build()
    }

    async fn create_shovel(&self, client: &Client, planned: &DynamicValue) -> Result<DynamicValue> {
        let name = required_string(planned, "name")?;
        let vhost = required_string(planned, "vhost")?;
        ensure_absent(client.shovels().get(&vhost, &name).await, KIND, &name)?;

        let definition = definition_from(planned)?;
        tracing::debug!("Declaring shovel {} in vhost {}", name, vhost);
        client
            .shovels()
            .put(&vhost, &name, &definition)
            .await
            .map_err(|e| ProviderError::api(Action::Creating, KIND, e))?;

        let id = encode_resource_id(&name, &vhost);
        self.read_shovel(client, &id)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name: id })
    }

    async fn read_shovel(&self, client: &Client, id: &str) -> Result<Option<DynamicValue>> {
        let (name, vhost) = decode_resource_id(id)?;

        let Some(shovel) = gone_on_not_found(
            client
                .shovels()
                .get(&vhost, &name)
                .await
                .map_err(|e| ProviderError::api(Action::Reading, KIND, e)),
        )?
        else {
            return Ok(None);
        };
        tracing::debug!("Shovel retrieved: vhost={} name={}", vhost, name);

        Ok(Some(object([
            ("id", string_value(id)),
            ("name", string_value(shovel.name)),
            ("vhost", string_value(shovel.vhost)),
            ("info", Dynamic::List(vec![info_state(shovel.value).value])),
        ])))
    }

    async fn update_shovel(
        &self,
        client: &Client,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue> {
        let id = state_id(prior)?;
        let (name, vhost) = decode_resource_id(&id)?;

        if changed(prior, planned, "info") {
            tracing::debug!("Redeclaring shovel {}", id);
            client
                .shovels()
                .put(&vhost, &name, &definition_from(planned)?)
                .await
                .map_err(|e| ProviderError::api(Action::Updating, KIND, e))?;
        }

        self.read_shovel(client, &id)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name: id })
    }

    async fn delete_shovel(&self, client: &Client, prior: &DynamicValue) -> Result<()> {
        let id = state_id(prior)?;
        let (name, vhost) = decode_resource_id(&id)?;

        tracing::debug!("Deleting shovel {}", id);
        // shovels with delete_after remove themselves
        ignore_not_found(
            client
                .shovels()
                .delete(&vhost, &name)
                .await
                .map_err(|e| ProviderError::api(Action::Deleting, KIND, e)),
        )
    }
}

fn non_empty(info: &DynamicValue, name: &str) -> Result<Option<String>> {
    Ok(optional_string(info, name)?.filter(|s| !s.is_empty()))
}

fn optional_bool(info: &DynamicValue, name: &str) -> Result<Option<bool>> {
    info.get_optional_bool(&AttributePath::new(name))
        .map_err(|e| ProviderError::invalid_attribute(name, e))
}

fn table(info: &DynamicValue, name: &str) -> Result<Option<ArgumentTable>> {
    let map = string_map(info, name)?;
    if map.is_empty() {
        return Ok(None);
    }
    Ok(Some(
        map.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
    ))
}

/// `never` and `queue-length` stay strings, counts are sent as numbers
fn delete_after(info: &DynamicValue, name: &str) -> Result<Option<Value>> {
    Ok(non_empty(info, name)?.map(|v| match v.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(v),
    }))
}

fn definition_from(state: &DynamicValue) -> Result<ShovelDefinition> {
    let info = single_block(state, "info")?;
    Ok(ShovelDefinition {
        ack_mode: non_empty(&info, "ack_mode")?,
        add_forward_headers: optional_bool(&info, "add_forward_headers")?,
        delete_after: delete_after(&info, "delete_after")?,
        dest_add_forward_headers: optional_bool(&info, "destination_add_forward_headers")?,
        dest_add_timestamp_header: optional_bool(&info, "destination_add_timestamp_header")?,
        dest_address: non_empty(&info, "destination_address")?,
        dest_application_properties: table(&info, "destination_application_properties")?,
        dest_exchange: non_empty(&info, "destination_exchange")?,
        dest_exchange_key: non_empty(&info, "destination_exchange_key")?,
        dest_properties: table(&info, "destination_properties")?,
        dest_protocol: non_empty(&info, "destination_protocol")?,
        dest_publish_properties: table(&info, "destination_publish_properties")?,
        dest_queue: non_empty(&info, "destination_queue")?,
        dest_queue_args: table(&info, "destination_queue_arguments")?,
        dest_uri: vec![required_string(&info, "destination_uri")?],
        prefetch_count: optional_i64(&info, "prefetch_count")?,
        reconnect_delay: optional_i64(&info, "reconnect_delay")?,
        src_address: non_empty(&info, "source_address")?,
        src_delete_after: delete_after(&info, "source_delete_after")?,
        src_exchange: non_empty(&info, "source_exchange")?,
        src_exchange_key: non_empty(&info, "source_exchange_key")?,
        src_prefetch_count: optional_i64(&info, "source_prefetch_count")?,
        src_protocol: non_empty(&info, "source_protocol")?,
        src_queue: non_empty(&info, "source_queue")?,
        src_uri: vec![required_string(&info, "source_uri")?],
    })
}

fn info_state(definition: ShovelDefinition) -> DynamicValue {
    let number = |n: Option<i64>| n.map_or(Dynamic::Null, |n| Dynamic::Number(n as f64));
    let flag = |b: Option<bool>| b.map_or(Dynamic::Null, Dynamic::Bool);
    let rendered = |v: Option<Value>| v.map_or(Dynamic::Null, |v| Dynamic::String(render_value(&v)));
    let map = |t: Option<ArgumentTable>| match t {
        Some(t) if !t.is_empty() => Dynamic::Map(
            t.iter()
                .map(|(k, v)| (k.clone(), Dynamic::String(render_value(v))))
                .collect(),
        ),
        _ => Dynamic::Null,
    };

    object([
        ("source_uri", optional_value(definition.src_uri.into_iter().next())),
        ("destination_uri", optional_value(definition.dest_uri.into_iter().next())),
        ("ack_mode", optional_value(definition.ack_mode)),
        ("reconnect_delay", number(definition.reconnect_delay)),
        ("source_protocol", optional_value(definition.src_protocol)),
        ("source_queue", optional_value(definition.src_queue)),
        ("source_exchange", optional_value(definition.src_exchange)),
        ("source_exchange_key", optional_value(definition.src_exchange_key)),
        ("source_address", optional_value(definition.src_address)),
        ("source_prefetch_count", number(definition.src_prefetch_count)),
        ("source_delete_after", rendered(definition.src_delete_after)),
        ("destination_protocol", optional_value(definition.dest_protocol)),
        ("destination_queue", optional_value(definition.dest_queue)),
        ("destination_exchange", optional_value(definition.dest_exchange)),
        ("destination_exchange_key", optional_value(definition.dest_exchange_key)),
        ("destination_address", optional_value(definition.dest_address)),
        ("destination_add_forward_headers", flag(definition.dest_add_forward_headers)),
        ("destination_add_timestamp_header", flag(definition.dest_add_timestamp_header)),
        ("destination_application_properties", map(definition.dest_application_properties)),
        ("destination_properties", map(definition.dest_properties)),
        ("destination_publish_properties", map(definition.dest_publish_properties)),
        ("destination_queue_arguments", map(definition.dest_queue_args)),
        ("add_forward_headers", flag(definition.add_forward_headers)),
        ("delete_after", rendered(definition.delete_after)),
        ("prefetch_count", number(definition.prefetch_count)),
    ])
}

fn conflict_diagnostics(config: &DynamicValue) -> Vec<Diagnostic> {
    let info = AttributePath::new("info").index(0);
    let is_set = |name: &str| {
        config
            .get(&info.clone().attribute(name))
            .is_some_and(|v| !v.is_null())
    };

    CONFLICTS
        .iter()
        .filter(|&&(a, b)| is_set(a) && is_set(b))
        .map(|&(a, b)| {
            Diagnostic::error(
                "Conflicting configuration arguments",
                format!("Only one of `{}` or `{}` can be set", a, b),
            )
            .with_attribute(info.clone().attribute(b))
        })
        .collect()
}

#[async_trait]
impl Resource for ShovelResource {
    fn type_name(&self) -> &str {
        "rabbitmq_shovel"
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
        diagnostics.extend(conflict_diagnostics(&request.config));
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
            .create_shovel(&provider_data.client, &request.planned_state)
            .await
        {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![e.to_diagnostic("Failed to create shovel")],
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
            Ok(id) => self.read_shovel(&provider_data.client, &id).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![e.to_diagnostic("Failed to read shovel")],
            },
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![not_configured()],
            };
        };

        match self
            .update_shovel(
                &provider_data.client,
                &request.prior_state,
                &request.planned_state,
            )
            .await
        {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![e.to_diagnostic("Failed to update shovel")],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let diagnostics = match self
            .delete_shovel(&provider_data.client, &request.prior_state)
            .await
        {
            Ok(()) => vec![],
            Err(e) => vec![e.to_diagnostic("Failed to delete shovel")],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for ShovelResource {
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
impl ResourceWithImportState for ShovelResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_read(self, ctx, request, |id| decode_resource_id(id).map(|_| ())).await
    }
}

#[cfg(test)]
#[path = "./resource_shovel_test.rs"]
mod resource_shovel_test;
