//! Data source implementations

pub mod data_source_exchange;
pub mod data_source_exchange_typed;
pub mod data_source_queue;
pub mod data_source_user;
pub mod data_source_vhost;

pub use data_source_exchange::ExchangeDataSource;
pub use data_source_exchange_typed::TypedExchangeDataSource;
pub use data_source_queue::QueueDataSource;
pub use data_source_user::UserDataSource;
pub use data_source_vhost::VhostDataSource;

use crate::error::ProviderError;
use tfplug::types::Diagnostic;

/// Data sources report a missing object as an error rather than clearing state
pub(crate) fn lookup_failed(kind: &str, name: &str, error: ProviderError) -> Diagnostic {
    let summary = format!("Failed to read {}", kind);
    if error.is_not_found() {
        tracing::debug!("{} '{}' lookup: {}", kind, name, error);
        Diagnostic::error(summary, format!("{} '{}' is not found", kind, name))
    } else {
        error.to_diagnostic(&summary)
    }
}
