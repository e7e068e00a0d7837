//! Policy and operator policy resource implementation
//!
//! Both kinds share a schema and lifecycle; only the type name and the API
//! collection differ.

use super::common::{
    changed, ensure_absent, gone_on_not_found, ignore_not_found, import_by_read, not_configured,
    object, optional_i64, provider_data_from, required_string, single_block, state_id,
    string_map, string_value,
};
use crate::api::common::ArgumentTable;
use crate::api::policies::{PolicyInfo, PolicyKind, PolicySettings};
use crate::api::Client;
use crate::args::render_value;
use crate::error::{Action, ProviderError, Result};
use crate::id::{decode_resource_id, encode_resource_id};
use crate::RabbitMqProviderData;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
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
use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, Schema, SchemaBuilder,
};
use tfplug::types::{Dynamic, DynamicValue};
use tfplug::validator::validate_config;

pub struct PolicyResource {
    kind: PolicyKind,
    provider_data: Option<RabbitMqProviderData>,
}

impl Default for PolicyResource {
    fn default() -> Self {
        Self::policy()
    }
}

impl PolicyResource {
    pub fn policy() -> Self {
        Self {
            kind: PolicyKind::Policy,
            provider_data: None,
        }
    }

    pub fn operator_policy() -> Self {
        Self {
            kind: PolicyKind::OperatorPolicy,
            provider_data: None,
        }
    }

    fn label(&self) -> &'static str {
        match self.kind {
            PolicyKind::Policy => "policy",
            PolicyKind::OperatorPolicy => "operator policy",
        }
    }

    pub fn schema_for(kind: PolicyKind) -> Schema {
        let (description, apply_to) = match kind {
            PolicyKind::Policy => (
                "The `rabbitmq_policy` resource creates and manages policies for exchanges and queues.",
                "Can either be `exchanges`, `queues`, or `all`.",
            ),
            PolicyKind::OperatorPolicy => (
                "The `rabbitmq_operator_policy` resource creates and manages operator policies for queues.",
                "Can be `queues`, `classic_queues`, `quorum_queues` or `streams`.",
            ),
        };

        SchemaBuilder::new()
            .version(0)
            .description(description)
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("`name@vhost`")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the policy.")
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
                NestedBlockBuilder::new("policy", NestingMode::List)
                    .description("The settings of the policy.")
                    .min_items(1)
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::new("pattern", AttributeType::String)
                            .description("A pattern to match an exchange or queue name.")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("priority", AttributeType::Number)
                            .description("The policy with the greater priority is applied first.")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("apply_to", AttributeType::String)
                            .description(apply_to)
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new(
                            "definition",
                            AttributeType::Map(Box::new(AttributeType::String)),
                        )
                        .description("Key/value pairs of the policy definition.")
                        .required()
                        .build(),
                    )
                    .build(),
            )
            .build()
    }

    async fn create_policy(&self, client: &Client, planned: &DynamicValue) -> Result<DynamicValue> {
        let name = required_string(planned, "name")?;
        let vhost = required_string(planned, "vhost")?;
        let api = client.policies(self.kind);
        ensure_absent(api.get(&vhost, &name).await, self.label(), &name)?;

        let settings = settings_from(planned)?;
        tracing::debug!("Declaring {} {}@{}: {:?}", self.label(), name, vhost, settings);
        api.put(&vhost, &name, &settings)
            .await
            .map_err(|e| ProviderError::api(Action::Creating, self.label(), e))?;

        let id = encode_resource_id(&name, &vhost);
        self.read_policy(client, &id)
            .await?
            .ok_or(ProviderError::Vanished {
                kind: self.label(),
                name: id,
            })
    }

    async fn read_policy(&self, client: &Client, id: &str) -> Result<Option<DynamicValue>> {
        let (name, vhost) = decode_resource_id(id)?;

        let Some(policy) = gone_on_not_found(
            client
                .policies(self.kind)
                .get(&vhost, &name)
                .await
                .map_err(|e| ProviderError::api(Action::Reading, self.label(), e)),
        )?
        else {
            return Ok(None);
        };
        tracing::debug!("{} retrieved for {}: {:?}", self.label(), id, policy);

        Ok(Some(policy_state(id, policy)))
    }

    async fn update_policy(
        &self,
        client: &Client,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue> {
        let id = state_id(prior)?;
        let (name, vhost) = decode_resource_id(&id)?;

        if changed(prior, planned, "policy") {
            let settings = settings_from(planned)?;
            tracing::debug!("Updating {} {}: {:?}", self.label(), id, settings);
            client
                .policies(self.kind)
                .put(&vhost, &name, &settings)
                .await
                .map_err(|e| ProviderError::api(Action::Updating, self.label(), e))?;
        }

        self.read_policy(client, &id)
            .await?
            .ok_or(ProviderError::Vanished {
                kind: self.label(),
                name: id,
            })
    }

    async fn delete_policy(&self, client: &Client, prior: &DynamicValue) -> Result<()> {
        let id = state_id(prior)?;
        let (name, vhost) = decode_resource_id(&id)?;

        tracing::debug!("Deleting {} {}", self.label(), id);
        ignore_not_found(
            client
                .policies(self.kind)
                .delete(&vhost, &name)
                .await
                .map_err(|e| ProviderError::api(Action::Deleting, self.label(), e)),
        )
    }
}

fn settings_from(state: &DynamicValue) -> Result<PolicySettings> {
    let block = single_block(state, "policy")?;
    Ok(PolicySettings {
        pattern: required_string(&block, "pattern")?,
        apply_to: required_string(&block, "apply_to")?,
        priority: optional_i64(&block, "priority")?.unwrap_or_default(),
        definition: definition_to_api(string_map(&block, "definition")?),
    })
}

fn policy_state(id: &str, policy: PolicyInfo) -> DynamicValue {
    let block = object([
        ("pattern", string_value(policy.pattern)),
        ("priority", Dynamic::Number(policy.priority as f64)),
        ("apply_to", string_value(policy.apply_to)),
        ("definition", definition_from_api(&policy.definition)),
    ]);
    object([
        ("id", string_value(id)),
        ("name", string_value(policy.name)),
        ("vhost", string_value(policy.vhost)),
        ("policy", Dynamic::List(vec![block.value])),
    ])
}

/// Configured definitions are all strings; the broker wants typed values
///
/// Integer strings become numbers, and with `ha-mode = nodes` the
/// comma-separated `ha-params` becomes a list of node names.
pub(crate) fn definition_to_api(definition: BTreeMap<String, String>) -> ArgumentTable {
    let ha_nodes = definition.get("ha-mode").is_some_and(|mode| mode == "nodes");

    definition
        .into_iter()
        .map(|(key, value)| {
            let value = if ha_nodes && key == "ha-params" {
                Value::Array(value.split(',').map(|n| Value::String(n.to_string())).collect())
            } else if let Ok(n) = value.parse::<i64>() {
                Value::from(n)
            } else {
                Value::String(value)
            };
            (key, value)
        })
        .collect()
}

/// Inverse of [`definition_to_api`]: numbers render without trailing zeros,
/// lists of strings join with `,`
pub(crate) fn definition_from_api(definition: &ArgumentTable) -> Dynamic {
    let map: HashMap<String, Dynamic> = definition
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
                other => render_value(other),
            };
            (key.clone(), Dynamic::String(rendered))
        })
        .collect();
    Dynamic::Map(map)
}

#[async_trait]
impl Resource for PolicyResource {
    fn type_name(&self) -> &str {
        match self.kind {
            PolicyKind::Policy => "rabbitmq_policy",
            PolicyKind::OperatorPolicy => "rabbitmq_operator_policy",
        }
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
        ValidateResourceConfigResponse {
            diagnostics: validate_config(&Self::schema_for(self.kind), &request.config),
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
            .create_policy(&provider_data.client, &request.planned_state)
            .await
        {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![e.to_diagnostic(&format!("Failed to create {}", self.label()))],
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
            Ok(id) => self.read_policy(&provider_data.client, &id).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![e.to_diagnostic(&format!("Failed to read {}", self.label()))],
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
            .update_policy(
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
                diagnostics: vec![e.to_diagnostic(&format!("Failed to update {}", self.label()))],
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
            .delete_policy(&provider_data.client, &request.prior_state)
            .await
        {
            Ok(()) => vec![],
            Err(e) => vec![e.to_diagnostic(&format!("Failed to delete {}", self.label()))],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for PolicyResource {
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
impl ResourceWithImportState for PolicyResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_read(self, ctx, request, |id| decode_resource_id(id).map(|_| ())).await
    }
}

#[cfg(test)]
#[path = "./resource_policy_test.rs"]
mod resource_policy_test;
