//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigError::Io(
            PathBuf::from("lectern.toml"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(err.to_string(), "IO error when reading `lectern.toml`");

        let err = ConfigError::Validation("`serve.port` and `serve.ws_port` are equal".into());
        assert!(err.to_string().starts_with("Config validation error:"));
    }

    #[test]
    fn test_toml_error_has_source() {
        let toml_err = toml::from_str::<toml::Value>("[broken").unwrap_err();
        let err = ConfigError::from(toml_err);
        assert!(std::error::Error::source(&err).is_some());
    }
}
