//! Provider error taxonomy
//!
//! Every failure a lifecycle operation can report is one of these variants;
//! adapters convert them into diagnostics at the trait boundary.

use crate::api::ApiError;
use crate::args::ArgumentError;
use std::fmt;
use thiserror::Error;
use tfplug::types::Diagnostic;

/// What the adapter was doing when the API call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Creating,
    Reading,
    Updating,
    Deleting,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Creating => "creating",
            Action::Reading => "reading",
            Action::Updating => "updating",
            Action::Deleting => "deleting",
        })
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("error {action} RabbitMQ {kind}: {source}")]
    Api {
        action: Action,
        kind: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("RabbitMQ {kind} '{name}' not found after it was written")]
    Vanished { kind: &'static str, name: String },

    #[error("{reason}: {id}")]
    MalformedIdentifier { id: String, reason: &'static str },

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error("invalid value for {attribute}: {message}")]
    InvalidAttribute { attribute: String, message: String },
}

impl ProviderError {
    pub fn api(action: Action, kind: &'static str, source: ApiError) -> Self {
        ProviderError::Api {
            action,
            kind,
            source,
        }
    }

    pub fn invalid_attribute(attribute: impl Into<String>, message: impl fmt::Display) -> Self {
        ProviderError::InvalidAttribute {
            attribute: attribute.into(),
            message: message.to_string(),
        }
    }

    /// True for API failures caused by a missing remote object
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::Api { source, .. } if source.is_not_found())
    }

    /// Converts into an error diagnostic; the detail carries the full chain
    pub fn to_diagnostic(&self, summary: &str) -> Diagnostic {
        let mut detail = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            let text = cause.to_string();
            if !detail.contains(&text) {
                detail.push_str(": ");
                detail.push_str(&text);
            }
            source = cause.source();
        }
        Diagnostic::error(summary, detail)
    }
}

impl From<tfplug::TfplugError> for ProviderError {
    fn from(e: tfplug::TfplugError) -> Self {
        ProviderError::InvalidAttribute {
            attribute: "state".to_string(),
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
