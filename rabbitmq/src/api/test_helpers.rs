//! Test helpers for the RabbitMQ API

#![allow(clippy::disallowed_methods)]

use super::{Client, ClientConfig};

pub fn test_client(url: &str) -> Client {
    Client::new(ClientConfig::new(url, "guest", "guest")).unwrap()
}

/// Routes `tracing` output through the test harness; safe to call repeatedly
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
