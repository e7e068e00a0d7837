//! Resource implementations

pub(crate) mod common;
pub mod resource_binding;
pub mod resource_exchange;
pub mod resource_exchange_typed;
pub mod resource_federation_upstream;
pub mod resource_permissions;
pub mod resource_policy;
pub mod resource_queue;
pub mod resource_shovel;
pub mod resource_topic_permissions;
pub mod resource_user;
pub mod resource_vhost;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use resource_binding::BindingResource;
pub use resource_exchange::ExchangeResource;
pub use resource_exchange_typed::{ExchangeKind, TypedExchangeResource};
pub use resource_federation_upstream::FederationUpstreamResource;
pub use resource_permissions::PermissionsResource;
pub use resource_policy::PolicyResource;
pub use resource_queue::QueueResource;
pub use resource_shovel::ShovelResource;
pub use resource_topic_permissions::TopicPermissionsResource;
pub use resource_user::UserResource;
pub use resource_vhost::VhostResource;
