#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::data_source::DataSourceFactory;
use tfplug::provider::*;
use tfplug::resource::*;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::{Context, Provider};
use tokio::sync::RwLock;

type Store = Arc<RwLock<HashMap<String, String>>>;

#[derive(Default)]
struct MemoryProvider {
    store: Store,
}

#[async_trait]
impl Provider for MemoryProvider {
    fn type_name(&self) -> &str {
        "memory"
    }

    async fn metadata(&self, _: Context, _: ProviderMetadataRequest) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "memory".to_string(),
        }
    }

    async fn schema(&self, _: Context, _: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new().build(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _: Context,
        _: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(self.store.clone())),
        }
    }

    async fn validate(
        &self,
        _: Context,
        _: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            "memory_item".to_string(),
            Box::new(|| Box::new(ItemResource::default()) as Box<dyn ProviderResource>),
        );
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        HashMap::new()
    }
}

#[derive(Default)]
struct ItemResource {
    store: Option<Store>,
}

impl ItemResource {
    fn state(name: &str, value: &str) -> DynamicValue {
        let mut state = DynamicValue::object();
        state
            .set_string(&AttributePath::new("id"), name.to_string())
            .unwrap();
        state
            .set_string(&AttributePath::new("value"), value.to_string())
            .unwrap();
        state
    }
}

#[async_trait]
impl Resource for ItemResource {
    fn type_name(&self) -> &str {
        "memory_item"
    }

    async fn metadata(&self, _: Context, _: ResourceMetadataRequest) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(&self, _: Context, _: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("id", AttributeType::String)
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("value", AttributeType::String)
                        .optional()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _: Context,
        _: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(&self, _: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let Some(store) = &self.store else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![Diagnostic::error("Provider not configured", "")],
            };
        };
        let id = request
            .planned_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        let value = request
            .planned_state
            .get_string(&AttributePath::new("value"))
            .unwrap();
        store.write().await.insert(id, value);
        CreateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let id = request
            .current_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        let store = self.store.as_ref().unwrap().read().await;
        ReadResourceResponse {
            new_state: store.get(&id).map(|v| Self::state(&id, v)),
            diagnostics: vec![],
        }
    }

    async fn update(&self, _: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        self.store.as_ref().unwrap().write().await.remove(&id);
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ItemResource {
    async fn configure(
        &mut self,
        _: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match request
            .provider_data
            .as_ref()
            .and_then(|data| data.downcast_ref::<Store>())
        {
            Some(store) => self.store = Some(store.clone()),
            None => diagnostics.push(Diagnostic::error("Invalid provider data", "")),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for ItemResource {
    async fn import_state(
        &self,
        _: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut state = DynamicValue::object();
        state
            .set_string(&AttributePath::new("id"), request.id)
            .unwrap();
        ImportResourceStateResponse {
            imported_resources: vec![ImportedResource {
                type_name: request.type_name,
                state,
            }],
            diagnostics: vec![],
        }
    }
}

async fn configured_resource(provider: &mut MemoryProvider) -> Box<dyn ProviderResource> {
    let configured = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: DynamicValue::object(),
            },
        )
        .await;
    assert!(configured.diagnostics.is_empty());

    let factories = provider.resources();
    let mut resource = (factories["memory_item"])();
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: configured.provider_data,
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

#[tokio::test]
async fn factory_resources_share_provider_data() {
    let mut provider = MemoryProvider::default();
    let resource = configured_resource(&mut provider).await;

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "memory_item".to_string(),
                planned_state: ItemResource::state("a", "1"),
                config: ItemResource::state("a", "1"),
            },
        )
        .await;
    assert!(created.diagnostics.is_empty());
    assert_eq!(provider.store.read().await.get("a"), Some(&"1".to_string()));

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "memory_item".to_string(),
                current_state: created.new_state,
            },
        )
        .await;
    assert_eq!(read.new_state, Some(ItemResource::state("a", "1")));
}

#[tokio::test]
async fn read_after_delete_reports_resource_gone() {
    let mut provider = MemoryProvider::default();
    provider
        .store
        .write()
        .await
        .insert("b".to_string(), "2".to_string());
    let resource = configured_resource(&mut provider).await;

    resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "memory_item".to_string(),
                prior_state: ItemResource::state("b", "2"),
            },
        )
        .await;

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "memory_item".to_string(),
                current_state: ItemResource::state("b", "2"),
            },
        )
        .await;
    assert!(read.new_state.is_none());
}

#[tokio::test]
async fn import_then_read_fills_state() {
    let mut provider = MemoryProvider::default();
    provider
        .store
        .write()
        .await
        .insert("c".to_string(), "3".to_string());
    let resource = configured_resource(&mut provider).await;

    let imported = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "memory_item".to_string(),
                id: "c".to_string(),
            },
        )
        .await;
    assert_eq!(imported.imported_resources.len(), 1);

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "memory_item".to_string(),
                current_state: imported.imported_resources[0].state.clone(),
            },
        )
        .await;
    assert_eq!(read.new_state, Some(ItemResource::state("c", "3")));
}

#[tokio::test]
async fn unconfigured_resource_reports_diagnostic() {
    let provider = MemoryProvider::default();
    let resource = (provider.resources()["memory_item"])();

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "memory_item".to_string(),
                planned_state: ItemResource::state("d", "4"),
                config: ItemResource::state("d", "4"),
            },
        )
        .await;
    assert_eq!(created.diagnostics.len(), 1);
    assert_eq!(created.diagnostics[0].summary, "Provider not configured");
}

#[tokio::test]
async fn concurrent_resource_creation() {
    let mut provider = MemoryProvider::default();
    let resource: Arc<dyn ProviderResource> = Arc::from(configured_resource(&mut provider).await);
    let mut handles = vec![];

    for i in 0..5 {
        let resource = resource.clone();
        handles.push(tokio::spawn(async move {
            let name = format!("item-{}", i);
            resource
                .create(
                    Context::new(),
                    CreateResourceRequest {
                        type_name: "memory_item".to_string(),
                        planned_state: ItemResource::state(&name, "x"),
                        config: ItemResource::state(&name, "x"),
                    },
                )
                .await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().diagnostics.is_empty());
    }
    assert_eq!(provider.store.read().await.len(), 5);
}
