use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid client configuration: {0}")]
    ConfigError(String),
}

impl ApiError {
    /// The management API answers 404 for every missing vhost, user,
    /// exchange, queue, binding, policy and parameter
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::ApiError { status: 404, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ApiError { status, .. } => Some(*status),
            ApiError::RequestError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_classified_by_status() {
        let err = ApiError::ApiError {
            status: 404,
            message: r#"{"error":"Object Not Found","reason":"Not Found"}"#.to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));

        let err = ApiError::ApiError {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn parse_errors_are_not_not_found() {
        let err = ApiError::ParseError("bad json".to_string());
        assert!(!err.is_not_found());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Failed to parse response: bad json");
    }
}
