use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("Link is not open")]
    LinkDown,
    #[error("WebSocket handshake with {0} timed out")]
    HandshakeTimeout(String),
    #[error("Cannot resolve {0}")]
    Unresolved(String),
    #[error("Scanner event loop is not running")]
    ClientStopped,
    #[error("Failed to spawn {0} thread")]
    Thread(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScannerError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        ScannerError::Config(message.into())
    }
}
