//! Error types for Redcast

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RedcastError>;

#[derive(Error, Debug)]
pub enum RedcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl RedcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RedcastError::Platform(PlatformError::Authentication(_)) => 2,
            RedcastError::Platform(_) => 1,
            RedcastError::Config(_) => 1,
            RedcastError::Persistence(_) => 1,
            RedcastError::Runtime(_) => 1,
        }
    }

    /// True for errors that abort a run before anything was posted
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            RedcastError::Config(_) | RedcastError::Platform(PlatformError::Authentication(_))
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Stats unavailable: {0}")]
    Stats(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Content validation failed: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_runtime_error() {
        let error = RedcastError::Runtime("Signal setup failed: EINVAL".to_string());
        assert_eq!(error.exit_code(), 1);
        assert!(!error.is_fatal_to_run());
    }

    #[test]
    fn test_exit_code_authentication_error() {
        let error = RedcastError::Platform(PlatformError::Authentication(
            "invalid_grant".to_string(),
        ));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_errors() {
        let submission = RedcastError::Platform(PlatformError::Submission("nope".to_string()));
        assert_eq!(submission.exit_code(), 1);

        let config = RedcastError::Config(ConfigError::MissingEnvVar(
            "REDDIT_CLIENT_ID".to_string(),
        ));
        assert_eq!(config.exit_code(), 1);

        let persistence = RedcastError::Persistence(PersistenceError::Io {
            path: PathBuf::from("logs/x.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        assert_eq!(persistence.exit_code(), 1);
    }

    #[test]
    fn test_fatal_to_run() {
        assert!(RedcastError::Config(ConfigError::Invalid("no title".to_string())).is_fatal_to_run());
        assert!(
            RedcastError::Platform(PlatformError::Authentication("bad".to_string()))
                .is_fatal_to_run()
        );
        assert!(
            !RedcastError::Platform(PlatformError::Network("timeout".to_string()))
                .is_fatal_to_run()
        );
    }

    #[test]
    fn test_error_message_formatting() {
        let error = RedcastError::Platform(PlatformError::Submission(
            "Reddit API error posting to r/rust: SUBREDDIT_NOEXIST".to_string(),
        ));
        assert_eq!(
            error.to_string(),
            "Platform error: Submission failed: Reddit API error posting to r/rust: SUBREDDIT_NOEXIST"
        );

        let config = ConfigError::InvalidEnvVar {
            var: "POST_TIME".to_string(),
            reason: "expected HH:MM".to_string(),
        };
        assert_eq!(config.to_string(), "Invalid value for POST_TIME: expected HH:MM");
    }

    #[test]
    fn test_error_conversion_from_config_error() {
        let error: RedcastError = ConfigError::MissingEnvVar("REDDIT_PASSWORD".to_string()).into();
        match error {
            RedcastError::Config(ConfigError::MissingEnvVar(var)) => {
                assert_eq!(var, "REDDIT_PASSWORD")
            }
            other => panic!("Expected RedcastError::Config, got {other:?}"),
        }
    }

    #[test]
    fn test_platform_error_clone() {
        let original = PlatformError::Network("Connection failed".to_string());
        let cloned = original.clone();
        assert_eq!(original.to_string(), cloned.to_string());
    }

    #[test]
    fn test_read_error_includes_path() {
        let error = ConfigError::Read {
            path: PathBuf::from("config/subreddits.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        };
        let message = error.to_string();
        assert!(message.contains("config/subreddits.txt"));
        assert!(message.contains("No such file"));
    }
}
