//! Error types for the alert relay.

/// Top-level error type for a relay invocation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingVars(Vec<String>),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    /// Names of the missing variables, if this is a missing-variable error.
    pub fn missing(&self) -> &[String] {
        match self {
            Self::MissingVars(names) => names,
            Self::InvalidValue { .. } => &[],
        }
    }
}

/// The inbound event could not be turned into an email.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Event has no Records[0].Sns.Message string")]
    MissingSnsMessage,

    #[error("SNS message is not a valid SES notification: {0}")]
    InvalidNotification(#[from] serde_json::Error),

    #[error("SES notification is missing field: {0}")]
    MissingNotificationField(&'static str),

    #[error("Email content is not a parseable MIME message")]
    UnparseableMime,

    #[error("Email has no text/plain body")]
    MissingPlainBody,
}

/// Failures talking to the social network.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Authentication failed for {identifier}: {reason}")]
    AuthFailed { identifier: String, reason: String },

    #[error("Client has no active session; call login first")]
    NotLoggedIn,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
