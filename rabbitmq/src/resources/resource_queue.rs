//! Queue resource implementation

use super::common::{
    arguments_from, arguments_state, bool_or, conflicting_arguments, ensure_absent,
    gone_on_not_found, ignore_not_found, import_by_read, not_configured, object, optional_value,
    provider_data_from, required_string, single_block, state_id, string_or, string_value,
};
use crate::api::queues::{QueueInfo, QueueSettings};
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
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{validate_config, JsonString};

const KIND: &str = "queue";

/// Set by the broker from the vhost default; only tracked when configured
const QUEUE_TYPE_ARGUMENT: &str = "x-queue-type";

#[derive(Default)]
pub struct QueueResource {
    provider_data: Option<RabbitMqProviderData>,
}

impl QueueResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("The `rabbitmq_queue` resource creates and manages a queue.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("`name@vhost`")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the queue.")
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
                    .description("The queue type created: `classic`, `quorum` or `stream`.")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("settings", NestingMode::List)
                    .description("The settings of the queue.")
                    .min_items(1)
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::new("durable", AttributeType::Bool)
                            .description("Whether the queue survives server restarts. Defaults to `false`.")
                            .optional()
                            .default(StaticDefault::bool(false))
                            .plan_modifier(RequiresReplace::create())
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("auto_delete", AttributeType::Bool)
                            .description("Whether the queue deletes itself once its last consumer unsubscribes. Defaults to `false`.")
                            .optional()
                            .default(StaticDefault::bool(false))
                            .plan_modifier(RequiresReplace::create())
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new(
                            "arguments",
                            AttributeType::Map(Box::new(AttributeType::String)),
                        )
                        .description("Additional key/value settings, all sent as strings. Conflicts with `arguments_json`.")
                        .optional()
                        .plan_modifier(RequiresReplace::create())
                        .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("arguments_json", AttributeType::String)
                            .description("A JSON object of additional settings, for non-string values. Conflicts with `arguments`.")
                            .optional()
                            .validator(JsonString::create())
                            .plan_modifier(RequiresReplace::create())
                            .build(),
                    )
                    .build(),
            )
            .build()
    }

    async fn create_queue(&self, client: &Client, planned: &DynamicValue) -> Result<DynamicValue> {
        let name = required_string(planned, "name")?;
        let vhost = string_or(planned, "vhost", "/")?;
        ensure_absent(client.queues().get(&vhost, &name).await, KIND, &name)?;

        let settings = settings_from(&single_block(planned, "settings")?)?;
        tracing::debug!("Declaring queue {}@{}: {:?}", name, vhost, settings);
        client
            .queues()
            .declare(&vhost, &name, &settings)
            .await
            .map_err(|e| ProviderError::api(Action::Creating, KIND, e))?;

        let id = encode_resource_id(&name, &vhost);
        let mut state = planned.clone();
        state.set_string(&AttributePath::new("id"), id.clone())?;
        self.read_queue(client, &state)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name: id })
    }

    async fn read_queue(&self, client: &Client, prior: &DynamicValue) -> Result<Option<DynamicValue>> {
        let id = state_id(prior)?;
        let (name, vhost) = decode_resource_id(&id)?;

        let Some(info) = gone_on_not_found(
            client
                .queues()
                .get(&vhost, &name)
                .await
                .map_err(|e| ProviderError::api(Action::Reading, KIND, e)),
        )?
        else {
            return Ok(None);
        };
        tracing::debug!("Queue retrieved for {}: {:?}", id, info);

        let prior_settings = single_block(prior, "settings")?;
        Ok(Some(object([
            ("id", string_value(id)),
            ("name", string_value(info.name.clone())),
            ("vhost", string_value(info.vhost.clone())),
            ("type", optional_value(info.queue_type.clone())),
            ("settings", settings_state(info, &prior_settings)?),
        ])))
    }

    async fn delete_queue(&self, client: &Client, prior: &DynamicValue) -> Result<()> {
        let id = state_id(prior)?;
        let (name, vhost) = decode_resource_id(&id)?;

        tracing::debug!("Deleting queue {}", id);
        // auto-delete queues may already be gone
        ignore_not_found(
            client
                .queues()
                .delete(&vhost, &name)
                .await
                .map_err(|e| ProviderError::api(Action::Deleting, KIND, e)),
        )
    }
}

const ARGUMENTS_JSON: &str = "settings.arguments_json";

fn settings_from(settings: &DynamicValue) -> Result<QueueSettings> {
    Ok(QueueSettings {
        durable: bool_or(settings, "durable", false)?,
        auto_delete: bool_or(settings, "auto_delete", false)?,
        arguments: arguments_from(settings, ARGUMENTS_JSON)?,
    })
}

/// Builds the `settings` block, keeping the argument form used in `prior`
fn settings_state(info: QueueInfo, prior: &DynamicValue) -> Result<Dynamic> {
    let queue_type_configured = arguments_from(prior, ARGUMENTS_JSON)
        .is_ok_and(|configured| configured.contains_key(QUEUE_TYPE_ARGUMENT));

    let mut arguments = info.arguments;
    if !queue_type_configured {
        arguments.remove(QUEUE_TYPE_ARGUMENT);
    }
    let (arguments, arguments_json) = arguments_state(arguments, prior, ARGUMENTS_JSON)?;

    let settings = object([
        ("durable", Dynamic::Bool(info.durable)),
        ("auto_delete", Dynamic::Bool(info.auto_delete)),
        ("arguments", arguments),
        ("arguments_json", arguments_json),
    ]);
    Ok(Dynamic::List(vec![settings.value]))
}

#[async_trait]
impl Resource for QueueResource {
    fn type_name(&self) -> &str {
        "rabbitmq_queue"
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

        diagnostics.extend(conflicting_arguments(
            &request.config,
            AttributePath::new("settings").index(0),
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
            .create_queue(&provider_data.client, &request.planned_state)
            .await
        {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![e.to_diagnostic("Failed to create queue")],
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

        match self
            .read_queue(&provider_data.client, &request.current_state)
            .await
        {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![e.to_diagnostic("Failed to read queue")],
            },
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.prior_state,
            diagnostics: vec![Diagnostic::error(
                "Update not supported",
                "Queues cannot be changed in place; every attribute forces replacement",
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
            .delete_queue(&provider_data.client, &request.prior_state)
            .await
        {
            Ok(()) => vec![],
            Err(e) => vec![e.to_diagnostic("Failed to delete queue")],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for QueueResource {
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
impl ResourceWithImportState for QueueResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_read(self, ctx, request, |id| decode_resource_id(id).map(|_| ())).await
    }
}

#[cfg(test)]
#[path = "./resource_queue_test.rs"]
mod resource_queue_test;
