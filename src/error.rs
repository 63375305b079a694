use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconnectError>;

#[derive(Error, Debug)]
pub enum ReconnectError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dial to {addr} failed: {reason}")]
    Dial { addr: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReconnectError {
    pub fn dial(addr: impl ToString, reason: impl ToString) -> Self {
        ReconnectError::Dial {
            addr: addr.to_string(),
            reason: reason.to_string(),
        }
    }
}
