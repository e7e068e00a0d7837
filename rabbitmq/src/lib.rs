//! Terraform provider for the RabbitMQ management HTTP API

pub mod api;
pub mod args;
pub mod data_sources;
pub mod error;
pub mod id;
pub mod provider_data;
pub mod resources;

pub use provider_data::RabbitMqProviderData;

use crate::api::{Client, ClientConfig};
use crate::data_sources::{
    ExchangeDataSource, QueueDataSource, TypedExchangeDataSource, UserDataSource, VhostDataSource,
};
use crate::resources::common::{optional_string, string_map};
use crate::resources::{
    BindingResource, ExchangeKind, ExchangeResource, FederationUpstreamResource,
    PermissionsResource, PolicyResource, QueueResource, ShovelResource, TopicPermissionsResource,
    TypedExchangeResource, UserResource, VhostResource,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{DataSourceFactory, DataSourceWithConfigure};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, Provider, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse,
    ValidateProviderConfigRequest, ValidateProviderConfigResponse,
};
use tfplug::resource::{ProviderResource, ResourceFactory};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::validate_config;

const ENDPOINT_ENV: &str = "RABBITMQ_ENDPOINT";
const USERNAME_ENV: &str = "RABBITMQ_USERNAME";
const PASSWORD_ENV: &str = "RABBITMQ_PASSWORD";
const INSECURE_ENV: &str = "RABBITMQ_INSECURE";
const CACERT_ENV: &str = "RABBITMQ_CACERT";
const CLIENTCERT_ENV: &str = "RABBITMQ_CLIENTCERT";
const CLIENTKEY_ENV: &str = "RABBITMQ_CLIENTKEY";
const PROXY_ENV: &str = "RABBITMQ_PROXY";

#[derive(Default)]
pub struct RabbitMqProvider {
    provider_data: Option<RabbitMqProviderData>,
}

impl RabbitMqProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// The client shared with every resource and data source once configured
    pub fn provider_data(&self) -> Option<&RabbitMqProviderData> {
        self.provider_data.as_ref()
    }

    pub fn schema_static() -> Schema {
        let string = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
                .build()
        };

        SchemaBuilder::new()
            .version(0)
            .attribute(string(
                "endpoint",
                "The HTTP URL of the management plugin, e.g. `http://127.0.0.1:15672`. Can also be set with RABBITMQ_ENDPOINT.",
            ))
            .attribute(string(
                "username",
                "Username for the management API. Can also be set with RABBITMQ_USERNAME.",
            ))
            .attribute(
                AttributeBuilder::new("password", AttributeType::String)
                    .description("Password for the management API. Can also be set with RABBITMQ_PASSWORD.")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("insecure", AttributeType::Bool)
                    .description("Skip TLS certificate verification. Can also be set with RABBITMQ_INSECURE.")
                    .optional()
                    .build(),
            )
            .attribute(string(
                "cacert_file",
                "Path to a PEM encoded CA bundle. Can also be set with RABBITMQ_CACERT.",
            ))
            .attribute(string(
                "clientcert_file",
                "Path to a PEM encoded client certificate. Can also be set with RABBITMQ_CLIENTCERT.",
            ))
            .attribute(string(
                "clientkey_file",
                "Path to the PEM encoded key of the client certificate. Can also be set with RABBITMQ_CLIENTKEY.",
            ))
            .attribute(string(
                "proxy",
                "URL of a proxy for management API requests. Can also be set with RABBITMQ_PROXY.",
            ))
            .attribute(
                AttributeBuilder::new("headers", AttributeType::Map(Box::new(AttributeType::String)))
                    .description("Extra HTTP headers sent with every request.")
                    .optional()
                    .build(),
            )
            .build()
    }
}

/// Config value, then environment variable; empty strings count as unset
fn setting(
    config: &DynamicValue,
    attribute: &str,
    env: &str,
    diags: &mut Vec<Diagnostic>,
) -> Option<String> {
    let configured = match optional_string(config, attribute) {
        Ok(value) => value,
        Err(e) => {
            diags.push(e.to_diagnostic("Invalid provider configuration"));
            None
        }
    };
    configured
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var(env).ok().filter(|s| !s.is_empty()))
}

fn required_setting(
    config: &DynamicValue,
    attribute: &str,
    env: &str,
    diags: &mut Vec<Diagnostic>,
) -> Option<String> {
    let value = setting(config, attribute, env, diags);
    if value.is_none() {
        diags.push(
            Diagnostic::error(
                format!(
                    "{} is required (set in provider config or {} env var)",
                    attribute, env
                ),
                "",
            )
            .with_attribute(AttributePath::new(attribute)),
        );
    }
    value
}

fn insecure_setting(config: &DynamicValue, diags: &mut Vec<Diagnostic>) -> bool {
    match config.get_optional_bool(&AttributePath::new("insecure")) {
        Ok(Some(insecure)) => return insecure,
        Ok(None) => {}
        Err(e) => diags.push(Diagnostic::error("Invalid provider configuration", e.to_string())),
    }
    match std::env::var(INSECURE_ENV) {
        Ok(value) => value.parse::<bool>().unwrap_or_else(|_| {
            diags.push(Diagnostic::error(
                format!("Invalid {} value", INSECURE_ENV),
                format!("expected true or false, got '{}'", value),
            ));
            false
        }),
        Err(_) => false,
    }
}

fn endpoint_diagnostic(endpoint: &str) -> Option<Diagnostic> {
    let problem = match url::Url::parse(endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => return None,
        Ok(url) => format!("unsupported scheme '{}'", url.scheme()),
        Err(e) => e.to_string(),
    };
    Some(
        Diagnostic::error(
            "Invalid endpoint",
            format!("'{}' is not a valid management API URL: {}", endpoint, problem),
        )
        .with_attribute(AttributePath::new("endpoint")),
    )
}

fn read_pem(attribute: &str, path: &str, diags: &mut Vec<Diagnostic>) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(pem) => Some(pem),
        Err(e) => {
            diags.push(
                Diagnostic::error(
                    format!("Failed to read {}", attribute),
                    format!("{}: {}", path, e),
                )
                .with_attribute(AttributePath::new(attribute)),
            );
            None
        }
    }
}

/// Collects every problem with the provider block before giving up
fn client_config(config: &DynamicValue) -> Result<ClientConfig, Vec<Diagnostic>> {
    let mut diags = Vec::new();

    let endpoint = required_setting(config, "endpoint", ENDPOINT_ENV, &mut diags);
    let username = required_setting(config, "username", USERNAME_ENV, &mut diags);
    let password = required_setting(config, "password", PASSWORD_ENV, &mut diags);
    let insecure = insecure_setting(config, &mut diags);

    if let Some(diag) = endpoint.as_deref().and_then(endpoint_diagnostic) {
        diags.push(diag);
    }

    let ca_cert_pem = setting(config, "cacert_file", CACERT_ENV, &mut diags)
        .and_then(|path| read_pem("cacert_file", &path, &mut diags));

    let client_cert = setting(config, "clientcert_file", CLIENTCERT_ENV, &mut diags);
    let client_key = setting(config, "clientkey_file", CLIENTKEY_ENV, &mut diags);
    let client_identity_pem = match (client_cert, client_key) {
        (Some(cert), Some(key)) => {
            let cert = read_pem("clientcert_file", &cert, &mut diags);
            let key = read_pem("clientkey_file", &key, &mut diags);
            cert.zip(key).map(|(mut cert, key)| {
                cert.push(b'\n');
                cert.extend(key);
                cert
            })
        }
        (None, None) => None,
        _ => {
            diags.push(Diagnostic::error(
                "Incomplete client certificate",
                "clientcert_file and clientkey_file must be set together",
            ));
            None
        }
    };

    let proxy = setting(config, "proxy", PROXY_ENV, &mut diags);
    let headers = match string_map(config, "headers") {
        Ok(headers) => headers.into_iter().collect::<HashMap<_, _>>(),
        Err(e) => {
            diags.push(e.to_diagnostic("Invalid provider configuration"));
            HashMap::new()
        }
    };

    match (endpoint, username, password) {
        (Some(endpoint), Some(username), Some(password)) if diags.is_empty() => {
            let mut client_config = ClientConfig::new(&endpoint, &username, &password);
            client_config.insecure = insecure;
            client_config.ca_cert_pem = ca_cert_pem;
            client_config.client_identity_pem = client_identity_pem;
            client_config.proxy = proxy;
            client_config.headers = headers;
            Ok(client_config)
        }
        _ => Err(diags),
    }
}

/// Registers a factory under the type name its resources report
fn insert_resource<F, R>(factories: &mut HashMap<String, ResourceFactory>, make: F)
where
    F: Fn() -> R + Send + Sync + 'static,
    R: ProviderResource + 'static,
{
    let type_name = make().type_name().to_string();
    factories.insert(
        type_name,
        Box::new(move || Box::new(make()) as Box<dyn ProviderResource>),
    );
}

fn insert_data_source<F, D>(factories: &mut HashMap<String, DataSourceFactory>, make: F)
where
    F: Fn() -> D + Send + Sync + 'static,
    D: DataSourceWithConfigure + 'static,
{
    let type_name = make().type_name().to_string();
    factories.insert(
        type_name,
        Box::new(move || Box::new(make()) as Box<dyn DataSourceWithConfigure>),
    );
}

#[async_trait]
impl Provider for RabbitMqProvider {
    fn type_name(&self) -> &str {
        "rabbitmq"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let client_config = match client_config(&request.config) {
            Ok(client_config) => client_config,
            Err(diagnostics) => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        tracing::debug!(
            "Configuring RabbitMQ provider for {} as {}",
            client_config.endpoint,
            client_config.username
        );
        match Client::new(client_config) {
            Ok(client) => {
                let provider_data = RabbitMqProviderData::new(client);
                self.provider_data = Some(provider_data.clone());
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(Arc::new(provider_data)),
                }
            }
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error(
                    "Failed to create API client",
                    e.to_string(),
                )],
                provider_data: None,
            },
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = validate_config(&Self::schema_static(), &request.config);
        if let Ok(Some(endpoint)) = optional_string(&request.config, "endpoint") {
            diagnostics.extend(endpoint_diagnostic(&endpoint));
        }
        ValidateProviderConfigResponse { diagnostics }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        insert_resource(&mut factories, VhostResource::new);
        insert_resource(&mut factories, UserResource::new);
        insert_resource(&mut factories, PermissionsResource::new);
        insert_resource(&mut factories, TopicPermissionsResource::new);
        insert_resource(&mut factories, ExchangeResource::new);
        for kind in ExchangeKind::ALL {
            insert_resource(&mut factories, move || TypedExchangeResource::new(kind));
        }
        insert_resource(&mut factories, QueueResource::new);
        insert_resource(&mut factories, BindingResource::new);
        insert_resource(&mut factories, PolicyResource::policy);
        insert_resource(&mut factories, PolicyResource::operator_policy);
        insert_resource(&mut factories, FederationUpstreamResource::new);
        insert_resource(&mut factories, ShovelResource::new);
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        insert_data_source(&mut factories, VhostDataSource::new);
        insert_data_source(&mut factories, UserDataSource::new);
        insert_data_source(&mut factories, QueueDataSource::new);
        insert_data_source(&mut factories, ExchangeDataSource::new);
        for kind in ExchangeKind::ALL {
            insert_data_source(&mut factories, move || TypedExchangeDataSource::new(kind));
        }
        factories
    }
}
