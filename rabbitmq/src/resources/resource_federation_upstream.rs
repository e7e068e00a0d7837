//! Federation upstream resource implementation

use super::common::{
    bool_or, changed, ensure_absent, gone_on_not_found, ignore_not_found, import_by_read,
    not_configured, object, optional_i64, optional_string, optional_value, provider_data_from,
    required_string, single_block, state_id, string_value,
};
use crate::api::parameters::FederationDefinition;
use crate::api::Client;
use crate::error::{Action, ProviderError, Result};
use crate::id::{decode_resource_id, encode_resource_id};
use crate::RabbitMqProviderData;
use async_trait::async_trait;
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
use tfplug::types::{Dynamic, DynamicValue};
use tfplug::validator::{validate_config, OneOf};

const KIND: &str = "federation upstream";

const ACK_MODES: &[&str] = &["on-confirm", "on-publish", "no-ack"];

#[derive(Default)]
pub struct FederationUpstreamResource {
    provider_data: Option<RabbitMqProviderData>,
}

impl FederationUpstreamResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("The `rabbitmq_federation_upstream` resource creates and manages a federation upstream parameter.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("`name@vhost`")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the federation upstream.")
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
            .attribute(
                AttributeBuilder::new("component", AttributeType::String)
                    .description("Set to `federation-upstream` by the broker.")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("definition", NestingMode::List)
                    .description("The configuration of the federation upstream.")
                    .min_items(1)
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::new("uri", AttributeType::String)
                            .description("The AMQP URI of the upstream. It may contain a password.")
                            .required()
                            .sensitive()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("prefetch_count", AttributeType::Number)
                            .description("Maximum number of unacknowledged messages in flight over a federation link. Defaults to `1000`.")
                            .optional()
                            .default(StaticDefault::number(1000.0))
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("reconnect_delay", AttributeType::Number)
                            .description("Seconds to wait after a link goes down before reconnecting. Defaults to `5`.")
                            .optional()
                            .default(StaticDefault::number(5.0))
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("ack_mode", AttributeType::String)
                            .description("How the link acknowledges messages: `on-confirm`, `on-publish` or `no-ack`. Defaults to `on-confirm`.")
                            .optional()
                            .default(StaticDefault::string("on-confirm"))
                            .validator(OneOf::create(ACK_MODES))
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("trust_user_id", AttributeType::Bool)
                            .description("Whether federation trusts the validated user-id of messages. Defaults to `false`.")
                            .optional()
                            .default(StaticDefault::bool(false))
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("exchange", AttributeType::String)
                            .description("Federated exchanges only: the name of the upstream exchange.")
                            .optional()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("max_hops", AttributeType::Number)
                            .description("Federated exchanges only: how many federation links a message may traverse. Defaults to `1`.")
                            .optional()
                            .default(StaticDefault::number(1.0))
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("expires", AttributeType::Number)
                            .description("Federated exchanges only: milliseconds after which a disconnected upstream queue may be deleted.")
                            .optional()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("message_ttl", AttributeType::Number)
                            .description("Federated exchanges only: expiry in milliseconds for messages in the upstream queue.")
                            .optional()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("queue", AttributeType::String)
                            .description("Federated queues only: the name of the upstream queue.")
                            .optional()
                            .build(),
                    )
                    .build(),
            )
            .build()
    }

    async fn create_upstream(&self, client: &Client, planned: &DynamicValue) -> Result<DynamicValue> {
        let name = required_string(planned, "name")?;
        let vhost = required_string(planned, "vhost")?;
        ensure_absent(
            client.federation_upstreams().get(&vhost, &name).await,
            KIND,
            &name,
        )?;

        let definition = definition_from(planned)?;
        tracing::debug!("Declaring federation upstream {}@{}", name, vhost);
        client
            .federation_upstreams()
            .put(&vhost, &name, &definition)
            .await
            .map_err(|e| ProviderError::api(Action::Creating, KIND, e))?;

        let id = encode_resource_id(&name, &vhost);
        self.read_upstream(client, &id)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name: id })
    }

    async fn read_upstream(&self, client: &Client, id: &str) -> Result<Option<DynamicValue>> {
        let (name, vhost) = decode_resource_id(id)?;

        let Some(upstream) = gone_on_not_found(
            client
                .federation_upstreams()
                .get(&vhost, &name)
                .await
                .map_err(|e| ProviderError::api(Action::Reading, KIND, e)),
        )?
        else {
            return Ok(None);
        };
        // the definition carries the upstream URI, which may hold a password
        tracing::debug!(
            "Federation upstream retrieved for {}: component={}",
            id,
            upstream.component
        );

        let definition = upstream.value;
        let number = |n: Option<i64>| n.map_or(Dynamic::Null, |n| Dynamic::Number(n as f64));
        let block = object([
            ("uri", optional_value(definition.uri.into_iter().next())),
            ("prefetch_count", number(definition.prefetch_count)),
            ("reconnect_delay", number(definition.reconnect_delay)),
            ("ack_mode", optional_value(definition.ack_mode)),
            (
                "trust_user_id",
                definition.trust_user_id.map_or(Dynamic::Null, Dynamic::Bool),
            ),
            ("exchange", optional_value(definition.exchange)),
            ("max_hops", number(definition.max_hops)),
            ("expires", number(definition.expires)),
            ("message_ttl", number(definition.message_ttl)),
            ("queue", optional_value(definition.queue)),
        ]);

        Ok(Some(object([
            ("id", string_value(id)),
            ("name", string_value(upstream.name)),
            ("vhost", string_value(upstream.vhost)),
            ("component", string_value(upstream.component)),
            ("definition", Dynamic::List(vec![block.value])),
        ])))
    }

    async fn update_upstream(
        &self,
        client: &Client,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue> {
        let id = state_id(prior)?;
        let (name, vhost) = decode_resource_id(&id)?;

        if changed(prior, planned, "definition") {
            tracing::debug!("Updating federation upstream {}", id);
            client
                .federation_upstreams()
                .put(&vhost, &name, &definition_from(planned)?)
                .await
                .map_err(|e| ProviderError::api(Action::Updating, KIND, e))?;
        }

        self.read_upstream(client, &id)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name: id })
    }

    async fn delete_upstream(&self, client: &Client, prior: &DynamicValue) -> Result<()> {
        let id = state_id(prior)?;
        let (name, vhost) = decode_resource_id(&id)?;

        tracing::debug!("Deleting federation upstream {}", id);
        ignore_not_found(
            client
                .federation_upstreams()
                .delete(&vhost, &name)
                .await
                .map_err(|e| ProviderError::api(Action::Deleting, KIND, e)),
        )
    }
}

fn definition_from(state: &DynamicValue) -> Result<FederationDefinition> {
    let block = single_block(state, "definition")?;
    Ok(FederationDefinition {
        uri: vec![required_string(&block, "uri")?],
        prefetch_count: optional_i64(&block, "prefetch_count")?,
        reconnect_delay: optional_i64(&block, "reconnect_delay")?,
        ack_mode: optional_string(&block, "ack_mode")?,
        trust_user_id: Some(bool_or(&block, "trust_user_id", false)?),
        exchange: optional_string(&block, "exchange")?.filter(|s| !s.is_empty()),
        max_hops: optional_i64(&block, "max_hops")?,
        expires: optional_i64(&block, "expires")?,
        message_ttl: optional_i64(&block, "message_ttl")?,
        queue: optional_string(&block, "queue")?.filter(|s| !s.is_empty()),
    })
}

#[async_trait]
impl Resource for FederationUpstreamResource {
    fn type_name(&self) -> &str {
        "rabbitmq_federation_upstream"
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
        ValidateResourceConfigResponse {
            diagnostics: validate_config(&Self::schema_static(), &request.config),
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![not_configured()],
            };
        };

        match self
            .create_upstream(&provider_data.client, &request.planned_state)
            .await
        {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![e.to_diagnostic("Failed to create federation upstream")],
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
            Ok(id) => self.read_upstream(&provider_data.client, &id).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![e.to_diagnostic("Failed to read federation upstream")],
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
            .update_upstream(
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
                diagnostics: vec![e.to_diagnostic("Failed to update federation upstream")],
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
            .delete_upstream(&provider_data.client, &request.prior_state)
            .await
        {
            Ok(()) => vec![],
            Err(e) => vec![e.to_diagnostic("Failed to delete federation upstream")],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for FederationUpstreamResource {
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
impl ResourceWithImportState for FederationUpstreamResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_read(self, ctx, request, |id| decode_resource_id(id).map(|_| ())).await
    }
}

#[cfg(test)]
#[path = "./resource_federation_upstream_test.rs"]
mod resource_federation_upstream_test;
