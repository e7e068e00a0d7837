//! Permissions resource implementation

use super::common::{
    changed, ensure_absent, gone_on_not_found, ignore_not_found, import_by_read, not_configured,
    object, provider_data_from, required_string, single_block, state_id, string_or, string_value,
};
use crate::api::permissions::Permissions;
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

const KIND: &str = "permissions";

#[derive(Default)]
pub struct PermissionsResource {
    provider_data: Option<RabbitMqProviderData>,
}

impl PermissionsResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("The `rabbitmq_permissions` resource creates and manages a user's set of permissions.")
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
                    .description("The configure, write and read ACLs.")
                    .min_items(1)
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::new("configure", AttributeType::String)
                            .description("The _configure_ ACL")
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

    async fn create_permissions(
        &self,
        client: &Client,
        planned: &DynamicValue,
    ) -> Result<DynamicValue> {
        let user = required_string(planned, "user")?;
        let vhost = string_or(planned, "vhost", "/")?;
        let id = encode_resource_id(&user, &vhost);
        ensure_absent(client.permissions().get(&vhost, &user).await, KIND, &id)?;

        tracing::debug!("Setting permissions for {}", id);
        client
            .permissions()
            .put(&vhost, &user, &permissions_from(planned)?)
            .await
            .map_err(|e| ProviderError::api(Action::Creating, KIND, e))?;

        self.read_permissions(client, &id)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name: id })
    }

    async fn read_permissions(&self, client: &Client, id: &str) -> Result<Option<DynamicValue>> {
        let (user, vhost) = decode_resource_id(id)?;

        let Some(permissions) = gone_on_not_found(
            client
                .permissions()
                .get(&vhost, &user)
                .await
                .map_err(|e| ProviderError::api(Action::Reading, KIND, e)),
        )?
        else {
            return Ok(None);
        };
        tracing::debug!("Permissions retrieved for {}: {:?}", id, permissions);

        let block = object([
            ("configure", string_value(permissions.configure)),
            ("write", string_value(permissions.write)),
            ("read", string_value(permissions.read)),
        ]);
        Ok(Some(object([
            ("id", string_value(id)),
            ("user", string_value(user)),
            ("vhost", string_value(vhost)),
            ("permissions", Dynamic::List(vec![block.value])),
        ])))
    }

    async fn update_permissions(
        &self,
        client: &Client,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue> {
        let id = state_id(prior)?;
        let (user, vhost) = decode_resource_id(&id)?;

        if changed(prior, planned, "permissions") {
            tracing::debug!("Updating permissions for {}", id);
            client
                .permissions()
                .put(&vhost, &user, &permissions_from(planned)?)
                .await
                .map_err(|e| ProviderError::api(Action::Updating, KIND, e))?;
        }

        self.read_permissions(client, &id)
            .await?
            .ok_or(ProviderError::Vanished { kind: KIND, name: id })
    }

    async fn delete_permissions(&self, client: &Client, prior: &DynamicValue) -> Result<()> {
        let id = state_id(prior)?;
        let (user, vhost) = decode_resource_id(&id)?;

        tracing::debug!("Deleting permissions for {}", id);
        ignore_not_found(
            client
                .permissions()
                .delete(&vhost, &user)
                .await
                .map_err(|e| ProviderError::api(Action::Deleting, KIND, e)),
        )
    }
}

fn permissions_from(state: &DynamicValue) -> Result<Permissions> {
    let block = single_block(state, "permissions")?;
    Ok(Permissions {
        configure: required_string(&block, "configure")?,
        write: required_string(&block, "write")?,
        read: required_string(&block, "read")?,
    })
}

#[async_trait]
impl Resource for PermissionsResource {
    fn type_name(&self) -> &str {
        "rabbitmq_permissions"
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
            .create_permissions(&provider_data.client, &request.planned_state)
            .await
        {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![e.to_diagnostic("Failed to set permissions")],
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
            Ok(id) => self.read_permissions(&provider_data.client, &id).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![e.to_diagnostic("Failed to read permissions")],
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
            .update_permissions(
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
                diagnostics: vec![e.to_diagnostic("Failed to update permissions")],
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
            .delete_permissions(&provider_data.client, &request.prior_state)
            .await
        {
            Ok(()) => vec![],
            Err(e) => vec![e.to_diagnostic("Failed to delete permissions")],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for PermissionsResource {
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
impl ResourceWithImportState for PermissionsResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_read(self, ctx, request, |id| decode_resource_id(id).map(|_| ())).await
    }
}

#[cfg(test)]
#[path = "./resource_permissions_test.rs"]
mod resource_permissions_test;
