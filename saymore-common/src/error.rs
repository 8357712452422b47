//! Common error types for SayMore

use thiserror::Error;

/// Common result type for SayMore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the SayMore crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Settings or sidecar metadata could not be read or written
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File system notification could not be set up
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Flatten an error and all of its sources into one message
///
/// Used where failures are surfaced to the user as text rather than propagated.
pub fn error_chain_message(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = inner.source();
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_message_includes_io_error() {
        let err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "access denied",
        ));
        let message = error_chain_message(&err);
        assert!(message.contains("access denied"));
        assert_eq!(message.lines().count(), 1, "duplicate source text is folded");
    }

    #[test]
    fn test_toml_error_maps_to_serialization() {
        let parse: std::result::Result<toml::Value, _> = toml::from_str("= broken");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
