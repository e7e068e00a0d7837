//! RabbitMQ management HTTP API client

pub mod bindings;
pub mod client;
pub mod common;
pub mod error;
pub mod exchanges;
pub mod parameters;
pub mod permissions;
pub mod policies;
pub mod queues;
pub mod users;
pub mod vhosts;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use client::{Client, ClientConfig};
pub use error::ApiError;
