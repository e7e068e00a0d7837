//! Binding resource implementation
//!
//! Bindings are looked up by listing every binding between a source and a
//! destination; the properties key from the id picks the right one.

use super::common::{
    arguments_from, arguments_state, conflicting_arguments, gone_on_not_found, ignore_not_found,
    import_by_read, not_configured, object, provider_data_from, required_string, state_id,
    string_or, string_value,
};
use crate::api::bindings::{BindingInfo, BindingSettings};
use crate::api::Client;
use crate::error::{Action, ProviderError, Result};
use crate::id::{decode_binding_id, encode_binding_id, BindingId};
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
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{validate_config, JsonString, OneOf};

const KIND: &str = "binding";

#[derive(Default)]
pub struct BindingResource {
    provider_data: Option<RabbitMqProviderData>,
}

impl BindingResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("The `rabbitmq_binding` resource creates and manages a binding relationship between a queue and an exchange.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("`vhost/source/destination/destination_type/properties_key` with `/` in the vhost percent-encoded")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("source", AttributeType::String)
                    .description("The source exchange.")
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
                AttributeBuilder::new("destination", AttributeType::String)
                    .description("The destination queue or exchange.")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("destination_type", AttributeType::String)
                    .description("The type of destination: `queue` or `exchange`.")
                    .required()
                    .validator(OneOf::create(&["queue", "exchange"]))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("properties_key", AttributeType::String)
                    .description("A unique key to refer to the binding.")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("routing_key", AttributeType::String)
                    .description("A routing key for the binding.")
                    .optional()
                    .default(StaticDefault::string(""))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("arguments", AttributeType::Map(Box::new(AttributeType::String)))
                    .description("Additional key/value arguments for the binding. Conflicts with `arguments_json`.")
                    .optional()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("arguments_json", AttributeType::String)
                    .description("A JSON object of arguments, for non-string values. Conflicts with `arguments`.")
                    .optional()
                    .validator(JsonString::create())
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .build()
    }

    async fn create_binding(&self, client: &Client, planned: &DynamicValue) -> Result<DynamicValue> {
        let vhost = required_string(planned, "vhost")?;
        let source = required_string(planned, "source")?;
        let destination = required_string(planned, "destination")?;
        let destination_type = required_string(planned, "destination_type")?;
        let settings = BindingSettings {
            routing_key: string_or(planned, "routing_key", "")?,
            arguments: arguments_from(planned, "arguments_json")?,
        };

        let existing = gone_on_not_found(
            client
                .bindings()
                .list_between(&vhost, &source, &destination, &destination_type)
                .await
                .map_err(|e| ProviderError::api(Action::Reading, KIND, e)),
        )?
        .unwrap_or_default();
        if existing
            .iter()
            .any(|b| b.routing_key == settings.routing_key && b.arguments == settings.arguments)
        {
            return Err(ProviderError::AlreadyExists {
                kind: KIND,
                name: format!("{} -> {} ({})", source, destination, settings.routing_key),
            });
        }

        tracing::debug!(
            "Declaring binding: vhost={} source={} destination={} destination_type={}",
            vhost,
            source,
            destination,
            destination_type
        );
        let properties_key = client
            .bindings()
            .declare(&vhost, &source, &destination, &destination_type, &settings)
            .await
            .map_err(|e| ProviderError::api(Action::Creating, KIND, e))?;
        tracing::debug!("Binding properties key: {}", properties_key);

        let id = encode_binding_id(&BindingId {
            vhost,
            source,
            destination,
            destination_type,
            properties_key,
        });
        let mut state = planned.clone();
        state.set_string(&AttributePath::new("id"), id.clone())?;
        self.read_binding(client, &state)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name: id })
    }

    async fn read_binding(&self, client: &Client, prior: &DynamicValue) -> Result<Option<DynamicValue>> {
        let id = state_id(prior)?;
        let binding_id = decode_binding_id(&id)?;
        tracing::debug!("Looking up binding {:?}", binding_id);

        let bindings = match binding_id.destination_type.as_str() {
            "queue" | "exchange" => {
                client
                    .bindings()
                    .list_between(
                        &binding_id.vhost,
                        &binding_id.source,
                        &binding_id.destination,
                        &binding_id.destination_type,
                    )
                    .await
            }
            _ => client.bindings().list_in_vhost(&binding_id.vhost).await,
        };
        let Some(bindings) = gone_on_not_found(
            bindings.map_err(|e| ProviderError::api(Action::Reading, KIND, e)),
        )?
        else {
            return Ok(None);
        };

        let Some(binding) = bindings.into_iter().find(|b| matches(b, &binding_id)) else {
            tracing::debug!("Binding {} not found", id);
            return Ok(None);
        };

        let (arguments, arguments_json) = arguments_state(binding.arguments, prior, "arguments_json")?;
        Ok(Some(object([
            ("id", string_value(id)),
            ("vhost", string_value(binding.vhost)),
            ("source", string_value(binding.source)),
            ("destination", string_value(binding.destination)),
            ("destination_type", string_value(binding.destination_type)),
            ("routing_key", string_value(binding.routing_key)),
            ("properties_key", string_value(binding.properties_key)),
            ("arguments", arguments),
            ("arguments_json", arguments_json),
        ])))
    }

    async fn delete_binding(&self, client: &Client, prior: &DynamicValue) -> Result<()> {
        let id = state_id(prior)?;
        let binding_id = decode_binding_id(&id)?;

        tracing::debug!("Deleting binding {:?}", binding_id);
        ignore_not_found(
            client
                .bindings()
                .delete(
                    &binding_id.vhost,
                    &binding_id.source,
                    &binding_id.destination,
                    &binding_id.destination_type,
                    &binding_id.properties_key,
                )
                .await
                .map_err(|e| ProviderError::api(Action::Deleting, KIND, e)),
        )
    }
}

fn matches(binding: &BindingInfo, id: &BindingId) -> bool {
    binding.source == id.source
        && binding.destination == id.destination
        && binding.destination_type == id.destination_type
        && binding.properties_key == id.properties_key
}

#[async_trait]
impl Resource for BindingResource {
    fn type_name(&self) -> &str {
        "rabbitmq_binding"
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
        diagnostics.extend(conflicting_arguments(&request.config, AttributePath::root()));
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
            .create_binding(&provider_data.client, &request.planned_state)
            .await
        {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![e.to_diagnostic("Failed to create binding")],
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
            .read_binding(&provider_data.client, &request.current_state)
            .await
        {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![e.to_diagnostic("Failed to read binding")],
            },
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.prior_state,
            diagnostics: vec![Diagnostic::error(
                "Update not supported",
                "Bindings cannot be changed in place; every attribute forces replacement",
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
            .delete_binding(&provider_data.client, &request.prior_state)
            .await
        {
            Ok(()) => vec![],
            Err(e) => vec![e.to_diagnostic("Failed to delete binding")],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for BindingResource {
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
impl ResourceWithImportState for BindingResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_read(self, ctx, request, |id| decode_binding_id(id).map(|_| ())).await
    }
}

#[cfg(test)]
#[path = "./resource_binding_test.rs"]
mod resource_binding_test;
