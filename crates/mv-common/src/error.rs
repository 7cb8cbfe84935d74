/// Convenient Result alias.
pub type ClientResult<T> = Result<T, ClientError>;

/// Client error taxonomy.
///
/// Transport and protocol failures below this level are handled locally
/// (reconnect, drop-and-continue); what surfaces here is what a caller can
/// meaningfully react to.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    /// True when the failure is an authentication problem the caller can
    /// fix by logging in again.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}
