//! Virtual host resource implementation

use super::common::{
    bool_or, changed, ensure_absent, gone_on_not_found, ignore_not_found, import_by_read, limit_state,
    not_configured, object, optional_string, optional_value, parse_limit, provider_data_from,
    required_string, state_id, string_or, string_value,
};
use crate::api::vhosts::{Limits, VhostSettings};
use crate::api::Client;
use crate::error::{Action, ProviderError, Result};
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
use tfplug::types::{AttributePath, Dynamic, DynamicValue};
use tfplug::validator::{validate_config, OneOf};

const KIND: &str = "vhost";

/// Terraform attribute and broker limit name
pub(crate) const VHOST_LIMITS: [(&str, &str); 2] = [
    ("max_connections", "max-connections"),
    ("max_queues", "max-queues"),
];

#[derive(Default)]
pub struct VhostResource {
    provider_data: Option<RabbitMqProviderData>,
}

impl VhostResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("The `rabbitmq_vhost` resource creates and manages a vhost.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The vhost name")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the vhost.")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("A friendly description.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("default_queue_type", AttributeType::String)
                    .description("Default queue type for new queues: `classic`, `quorum` or `stream`.")
                    .optional()
                    .default(StaticDefault::string("classic"))
                    .validator(OneOf::create(&["classic", "quorum", "stream"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tracing", AttributeType::Bool)
                    .description("To enable/disable tracing.")
                    .optional()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_connections", AttributeType::String)
                    .description("To limit the total number of concurrent client connections in vhost.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_queues", AttributeType::String)
                    .description("To limit the total number of queues in vhost.")
                    .optional()
                    .build(),
            )
            .build()
    }

    async fn create_vhost(&self, client: &Client, planned: &DynamicValue) -> Result<DynamicValue> {
        let name = required_string(planned, "name")?;
        ensure_absent(client.vhosts().get(&name).await, KIND, &name)?;

        let settings = VhostSettings {
            description: optional_string(planned, "description")?.filter(|d| !d.is_empty()),
            default_queue_type: Some(string_or(planned, "default_queue_type", "classic")?),
            tracing: bool_or(planned, "tracing", false)?,
        };
        let limits = limits_from(planned)?;

        tracing::debug!("Creating vhost {}", name);
        client
            .vhosts()
            .put(&name, &settings)
            .await
            .map_err(|e| ProviderError::api(Action::Creating, KIND, e))?;

        for (limit, value) in &limits {
            client
                .vhosts()
                .put_limit(&name, limit, *value)
                .await
                .map_err(|e| ProviderError::api(Action::Creating, "vhost limits", e))?;
        }

        let mut state = planned.clone();
        state.set_string(&AttributePath::new("id"), name.clone())?;
        self.read_vhost(client, &state)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name })
    }

    async fn read_vhost(
        &self,
        client: &Client,
        prior: &DynamicValue,
    ) -> Result<Option<DynamicValue>> {
        let id = state_id(prior)?;

        let Some(vhost) = gone_on_not_found(
            client
                .vhosts()
                .get(&id)
                .await
                .map_err(|e| ProviderError::api(Action::Reading, KIND, e)),
        )?
        else {
            return Ok(None);
        };
        let Some(limits) = gone_on_not_found(
            client
                .vhosts()
                .get_limits(&id)
                .await
                .map_err(|e| ProviderError::api(Action::Reading, "vhost limits", e)),
        )?
        else {
            return Ok(None);
        };

        let default_queue_type = match vhost.default_queue_type {
            Some(t) if !t.is_empty() && t != "undefined" => t,
            _ => string_or(prior, "default_queue_type", "classic")?,
        };

        let mut attributes = vec![
            ("id", string_value(id)),
            ("name", string_value(vhost.name)),
            (
                "description",
                optional_value(vhost.description.filter(|d| !d.is_empty())),
            ),
            ("default_queue_type", string_value(default_queue_type)),
            ("tracing", Dynamic::Bool(vhost.tracing)),
        ];
        for (attribute, limit) in VHOST_LIMITS {
            attributes.push((attribute, limit_state(prior, attribute, &limits, limit)?));
        }

        Ok(Some(object(attributes)))
    }

    async fn update_vhost(
        &self,
        client: &Client,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<Option<DynamicValue>> {
        let name = state_id(prior)?;
        let Some(current) = gone_on_not_found(
            client
                .vhosts()
                .get(&name)
                .await
                .map_err(|e| ProviderError::api(Action::Updating, KIND, e)),
        )?
        else {
            tracing::warn!("Vhost {} no longer exists, removing it from state", name);
            return Ok(None);
        };

        let settings = VhostSettings {
            description: if changed(prior, planned, "description") {
                optional_string(planned, "description")?.filter(|d| !d.is_empty())
            } else {
                current.description
            },
            default_queue_type: if changed(prior, planned, "default_queue_type") {
                optional_string(planned, "default_queue_type")?
            } else {
                current.default_queue_type
            },
            tracing: if changed(prior, planned, "tracing") {
                bool_or(planned, "tracing", false)?
            } else {
                current.tracing
            },
        };
        let limits = limits_from(planned)?;

        tracing::debug!("Updating vhost {}", name);
        client
            .vhosts()
            .put(&name, &settings)
            .await
            .map_err(|e| ProviderError::api(Action::Updating, KIND, e))?;

        for (_, limit) in VHOST_LIMITS {
            ignore_not_found(
                client
                    .vhosts()
                    .delete_limit(&name, limit)
                    .await
                    .map_err(|e| ProviderError::api(Action::Updating, "vhost limits", e)),
            )?;
        }
        for (limit, value) in &limits {
            client
                .vhosts()
                .put_limit(&name, limit, *value)
                .await
                .map_err(|e| ProviderError::api(Action::Updating, "vhost limits", e))?;
        }

        let mut state = planned.clone();
        state.set_string(&AttributePath::new("id"), name.clone())?;
        self.read_vhost(client, &state)
            .await?
            .map(Some)
            .ok_or(ProviderError::Vanished { kind: KIND, name })
    }

    async fn delete_vhost(&self, client: &Client, prior: &DynamicValue) -> Result<()> {
        let name = state_id(prior)?;
        tracing::debug!("Deleting vhost {}", name);
        ignore_not_found(
            client
                .vhosts()
                .delete(&name)
                .await
                .map_err(|e| ProviderError::api(Action::Deleting, KIND, e)),
        )
    }
}

fn limits_from(state: &DynamicValue) -> Result<Limits> {
    let mut limits = Limits::new();
    for (attribute, limit) in VHOST_LIMITS {
        if let Some(value) = parse_limit(attribute, optional_string(state, attribute)?.as_deref())? {
            limits.insert(limit.to_string(), value);
        }
    }
    Ok(limits)
}

#[async_trait]
impl Resource for VhostResource {
    fn type_name(&self) -> &str {
        "rabbitmq_vhost"
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

        for (attribute, _) in VHOST_LIMITS {
            if let Ok(Some(value)) = optional_string(&request.config, attribute) {
                if let Err(e) = parse_limit(attribute, Some(&value)) {
                    diagnostics.push(e.to_diagnostic("Invalid vhost limit"));
                }
            }
        }

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
            .create_vhost(&provider_data.client, &request.planned_state)
            .await
        {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![e.to_diagnostic("Failed to create vhost")],
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
            .read_vhost(&provider_data.client, &request.current_state)
            .await
        {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![e.to_diagnostic("Failed to read vhost")],
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
            .update_vhost(
                &provider_data.client,
                &request.prior_state,
                &request.planned_state,
            )
            .await
        {
            Ok(new_state) => UpdateResourceResponse {
                new_state: new_state.unwrap_or_else(DynamicValue::null),
                diagnostics: vec![],
            },
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![e.to_diagnostic("Failed to update vhost")],
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
            .delete_vhost(&provider_data.client, &request.prior_state)
            .await
        {
            Ok(()) => vec![],
            Err(e) => vec![e.to_diagnostic("Failed to delete vhost")],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for VhostResource {
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
impl ResourceWithImportState for VhostResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_read(self, ctx, request, |_| Ok(())).await
    }
}

#[cfg(test)]
#[path = "./resource_vhost_test.rs"]
mod resource_vhost_test;
