//! User resource implementation

use super::common::{
    ensure_absent, gone_on_not_found, ignore_not_found, import_by_read, limit_state,
    not_configured, object, optional_string, parse_limit, provider_data_from, required_string,
    state_id, string_list, string_value,
};
use crate::api::users::UserSettings;
use crate::api::vhosts::Limits;
use crate::api::Client;
use crate::error::{Action, ProviderError, Result};
use crate::RabbitMqProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
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
use tfplug::validator::validate_config;

const KIND: &str = "user";

pub(crate) const USER_LIMITS: [(&str, &str); 2] = [
    ("max_connections", "max-connections"),
    ("max_channels", "max-channels"),
];

#[derive(Default)]
pub struct UserResource {
    provider_data: Option<RabbitMqProviderData>,
}

impl UserResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("The `rabbitmq_user` resource creates and manages a user.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the user.")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("password", AttributeType::String)
                    .description("The password of the user. The value is stored in plain text in state.")
                    .required()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::List(Box::new(AttributeType::String)))
                    .description("Permission model tags: `management`, `policymaker`, `monitoring`, `administrator`.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_connections", AttributeType::String)
                    .description("To limit how many connection a user can open.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_channels", AttributeType::String)
                    .description("To limit how many channels, in total, a user can open.")
                    .optional()
                    .build(),
            )
            .build()
    }

    async fn create_user(&self, client: &Client, planned: &DynamicValue) -> Result<DynamicValue> {
        let name = required_string(planned, "name")?;
        ensure_absent(client.users().get(&name).await, KIND, &name)?;

        let settings = UserSettings::new(
            &required_string(planned, "password")?,
            &string_list(planned, "tags")?,
        );
        let limits = limits_from(planned)?;

        tracing::debug!("Creating user {}", name);
        client
            .users()
            .put(&name, &settings)
            .await
            .map_err(|e| ProviderError::api(Action::Creating, KIND, e))?;
        put_limits(client, &name, &limits, Action::Creating).await?;

        let mut state = planned.clone();
        state.set_string(&AttributePath::new("id"), name.clone())?;
        self.read_user(client, &state)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name })
    }

    async fn read_user(
        &self,
        client: &Client,
        prior: &DynamicValue,
    ) -> Result<Option<DynamicValue>> {
        let id = state_id(prior)?;

        let Some(user) = gone_on_not_found(
            client
                .users()
                .get(&id)
                .await
                .map_err(|e| ProviderError::api(Action::Reading, KIND, e)),
        )?
        else {
            return Ok(None);
        };
        let Some(limits) = gone_on_not_found(
            client
                .users()
                .get_limits(&id)
                .await
                .map_err(|e| ProviderError::api(Action::Reading, "user limits", e)),
        )?
        else {
            return Ok(None);
        };

        let tags: Vec<Dynamic> = user
            .tags
            .into_iter()
            .filter(|t| !t.is_empty())
            .map(Dynamic::String)
            .collect();
        let tags = if tags.is_empty() && prior.get(&AttributePath::new("tags")).map_or(true, Dynamic::is_null) {
            Dynamic::Null
        } else {
            Dynamic::List(tags)
        };

        // The broker only keeps a password hash
        let password = prior
            .get(&AttributePath::new("password"))
            .cloned()
            .unwrap_or(Dynamic::Null);

        let mut attributes = vec![
            ("id", string_value(id)),
            ("name", string_value(user.name)),
            ("password", password),
            ("tags", tags),
        ];
        for (attribute, limit) in USER_LIMITS {
            attributes.push((attribute, limit_state(prior, attribute, &limits, limit)?));
        }

        Ok(Some(object(attributes)))
    }

    async fn update_user(
        &self,
        client: &Client,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue> {
        let name = state_id(prior)?;
        let settings = UserSettings::new(
            &required_string(planned, "password")?,
            &string_list(planned, "tags")?,
        );
        let limits = limits_from(planned)?;

        tracing::debug!("Updating user {}", name);
        client
            .users()
            .put(&name, &settings)
            .await
            .map_err(|e| ProviderError::api(Action::Updating, KIND, e))?;

        delete_limits(client, &name, Action::Updating).await?;
        put_limits(client, &name, &limits, Action::Updating).await?;

        let mut state = planned.clone();
        state.set_string(&AttributePath::new("id"), name.clone())?;
        self.read_user(client, &state)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name })
    }

    async fn delete_user(&self, client: &Client, prior: &DynamicValue) -> Result<()> {
        let name = state_id(prior)?;
        tracing::debug!("Deleting user {}", name);

        delete_limits(client, &name, Action::Deleting).await?;
        ignore_not_found(
            client
                .users()
                .delete(&name)
                .await
                .map_err(|e| ProviderError::api(Action::Deleting, KIND, e)),
        )
    }
}

fn limits_from(state: &DynamicValue) -> Result<Limits> {
    let mut limits = Limits::new();
    for (attribute, limit) in USER_LIMITS {
        if let Some(value) = parse_limit(attribute, optional_string(state, attribute)?.as_deref())? {
            limits.insert(limit.to_string(), value);
        }
    }
    Ok(limits)
}

async fn put_limits(client: &Client, name: &str, limits: &Limits, action: Action) -> Result<()> {
    for (limit, value) in limits {
        client
            .users()
            .put_limit(name, limit, *value)
            .await
            .map_err(|e| ProviderError::api(action, "user limits", e))?;
    }
    Ok(())
}

async fn delete_limits(client: &Client, name: &str, action: Action) -> Result<()> {
    for (_, limit) in USER_LIMITS {
        ignore_not_found(
            client
                .users()
                .delete_limit(name, limit)
                .await
                .map_err(|e| ProviderError::api(action, "user limits", e)),
        )?;
    }
    Ok(())
}

#[async_trait]
impl Resource for UserResource {
    fn type_name(&self) -> &str {
        "rabbitmq_user"
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

        for (attribute, _) in USER_LIMITS {
            if let Ok(Some(value)) = optional_string(&request.config, attribute) {
                if let Err(e) = parse_limit(attribute, Some(&value)) {
                    diagnostics.push(e.to_diagnostic("Invalid user limit"));
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
            .create_user(&provider_data.client, &request.planned_state)
            .await
        {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![e.to_diagnostic("Failed to create user")],
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
            .read_user(&provider_data.client, &request.current_state)
            .await
        {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![e.to_diagnostic("Failed to read user")],
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
            .update_user(
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
                diagnostics: vec![e.to_diagnostic("Failed to update user")],
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
            .delete_user(&provider_data.client, &request.prior_state)
            .await
        {
            Ok(()) => vec![],
            Err(e) => vec![e.to_diagnostic("Failed to delete user")],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for UserResource {
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
impl ResourceWithImportState for UserResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_read(self, ctx, request, |_| Ok(())).await
    }
}

#[cfg(test)]
#[path = "./resource_user_test.rs"]
mod resource_user_test;
