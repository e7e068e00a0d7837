//! Topic permissions resource implementation

use super::common::{
    blocks, changed, gone_on_not_found, ignore_not_found, import_by_read, not_configured, object,
    provider_data_from, required_string, state_id, string_or, string_value,
};
use crate::api::permissions::TopicPermissions;
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
use tfplug::validator::validate_config;

const KIND: &str = "topic permissions";

#[derive(Default)]
pub struct TopicPermissionsResource {
    provider_data: Option<RabbitMqProviderData>,
}

impl TopicPermissionsResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("The `rabbitmq_topic_permissions` resource creates and manages a user's set of topic permissions.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("`user@vhost`")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user", AttributeType::String)
                    .description("The user to apply the permissions to.")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vhost", AttributeType::String)
                    .description("The vhost to create the resource in.")
                    .optional()
                    .default(StaticDefault::string("/"))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("permissions", NestingMode::List)
                    .description("One entry per topic exchange.")
                    .min_items(1)
                    .attribute(
                        AttributeBuilder::new("exchange", AttributeType::String)
                            .description("The exchange to set the permissions for.")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("write", AttributeType::String)
                            .description("The _write_ ACL")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("read", AttributeType::String)
                            .description("The _read_ ACL")
                            .required()
                            .build(),
                    )
                    .build(),
            )
            .build()
    }

    async fn create_topic_permissions(
        &self,
        client: &Client,
        planned: &DynamicValue,
    ) -> Result<DynamicValue> {
        let user = required_string(planned, "user")?;
        let vhost = string_or(planned, "vhost", "/")?;
        let id = encode_resource_id(&user, &vhost);

        // An empty list is how the broker reports "none set"
        match client.topic_permissions().list(&vhost, &user).await {
            Ok(existing) if !existing.is_empty() => {
                return Err(ProviderError::AlreadyExists { kind: KIND, name: id });
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(ProviderError::api(Action::Reading, KIND, e)),
        }

        tracing::debug!("Setting topic permissions for {}", id);
        put_all(client, &vhost, &user, &topic_permissions_from(planned)?, Action::Creating).await?;

        self.read_topic_permissions(client, &id)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name: id })
    }

    async fn read_topic_permissions(
        &self,
        client: &Client,
        id: &str,
    ) -> Result<Option<DynamicValue>> {
        let (user, vhost) = decode_resource_id(id)?;

        let Some(permissions) = gone_on_not_found(
            client
                .topic_permissions()
                .list(&vhost, &user)
                .await
                .map_err(|e| ProviderError::api(Action::Reading, KIND, e)),
        )?
        else {
            return Ok(None);
        };
        if permissions.is_empty() {
            return Ok(None);
        }
        tracing::debug!("Topic permissions retrieved for {}: {:?}", id, permissions);

        let entries = permissions
            .into_iter()
            .map(|p| {
                object([
                    ("exchange", string_value(p.exchange)),
                    ("write", string_value(p.write)),
                    ("read", string_value(p.read)),
                ])
                .value
            })
            .collect();

        Ok(Some(object([
            ("id", string_value(id)),
            ("user", string_value(user)),
            ("vhost", string_value(vhost)),
            ("permissions", Dynamic::List(entries)),
        ])))
    }

    async fn update_topic_permissions(
        &self,
        client: &Client,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue> {
        let id = state_id(prior)?;
        let (user, vhost) = decode_resource_id(&id)?;

        if changed(prior, planned, "permissions") {
            tracing::debug!("Updating topic permissions for {}", id);
            // Exchanges dropped from the list would otherwise keep their grants
            ignore_not_found(
                client
                    .topic_permissions()
                    .delete(&vhost, &user)
                    .await
                    .map_err(|e| ProviderError::api(Action::Updating, KIND, e)),
            )?;
            put_all(client, &vhost, &user, &topic_permissions_from(planned)?, Action::Updating)
                .await?;
        }

        self.read_topic_permissions(client, &id)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name: id })
    }

    async fn delete_topic_permissions(&self, client: &Client, prior: &DynamicValue) -> Result<()> {
        let id = state_id(prior)?;
        let (user, vhost) = decode_resource_id(&id)?;

        tracing::debug!("Deleting topic permissions for {}", id);
        ignore_not_found(
            client
                .topic_permissions()
                .delete(&vhost, &user)
                .await
                .map_err(|e| ProviderError::api(Action::Deleting, KIND, e)),
        )
    }
}

fn topic_permissions_from(state: &DynamicValue) -> Result<Vec<TopicPermissions>> {
    blocks(state, "permissions")?
        .iter()
        .map(|block| {
            Ok(TopicPermissions {
                exchange: required_string(block, "exchange")?,
                write: required_string(block, "write")?,
                read: required_string(block, "read")?,
            })
        })
        .collect()
}

async fn put_all(
    client: &Client,
    vhost: &str,
    user: &str,
    permissions: &[TopicPermissions],
    action: Action,
) -> Result<()> {
    for permission in permissions {
        client
            .topic_permissions()
            .put(vhost, user, permission)
            .await
            .map_err(|e| ProviderError::api(action, KIND, e))?;
    }
    Ok(())
}

#[async_trait]
impl Resource for TopicPermissionsResource {
    fn type_name(&self) -> &str {
        "rabbitmq_topic_permissions"
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
            .create_topic_permissions(&provider_data.client, &request.planned_state)
            .await
        {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![e.to_diagnostic("Failed to set topic permissions")],
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
            Ok(id) => self.read_topic_permissions(&provider_data.client, &id).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![e.to_diagnostic("Failed to read topic permissions")],
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
            .update_topic_permissions(
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
                diagnostics: vec![e.to_diagnostic("Failed to update topic permissions")],
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
            .delete_topic_permissions(&provider_data.client, &request.prior_state)
            .await
        {
            Ok(()) => vec![],
            Err(e) => vec![e.to_diagnostic("Failed to delete topic permissions")],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for TopicPermissionsResource {
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
impl ResourceWithImportState for TopicPermissionsResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_read(self, ctx, request, |id| decode_resource_id(id).map(|_| ())).await
    }
}

#[cfg(test)]
#[path = "./resource_topic_permissions_test.rs"]
mod resource_topic_permissions_test;
