//! Error types shared by the pricing, storage and HTTP layers.

use thiserror::Error;

/// Errors surfaced by cost calculation and the usage store
#[derive(Debug, Error)]
pub enum Error {
    /// Model identifier is not in the price table
    #[error("Unknown model: {model}. Available: {}", .known.join(", "))]
    UnknownModel { model: String, known: Vec<String> },

    /// Caller supplied a value outside the accepted range
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Backing database could not be opened, read or written
    #[error("storage unavailable: {0}")]
    UnavailableStorage(String),
}

impl Error {
    /// True for errors caused by the request rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::UnknownModel { .. } | Error::InvalidInput(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::UnavailableStorage(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::UnavailableStorage(err.to_string())
    }
}

/// Result alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_message_lists_known_models() {
        let err = Error::UnknownModel {
            model: "fake-model".to_string(),
            known: vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Unknown model: fake-model"));
        assert!(msg.contains("gpt-4o, gpt-4o-mini"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_storage_errors_are_not_client_errors() {
        let err: Error = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, Error::UnavailableStorage(_)));
        assert!(!err.is_client_error());
    }
}
