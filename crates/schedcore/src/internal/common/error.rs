use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Protocol error: {0}")]
    ProtocolError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Error: {0}")]
    GenericError(String),
}

impl From<bincode::Error> for SchedError {
    fn from(e: bincode::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for SchedError {
    fn from(e: toml::de::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<String> for SchedError {
    fn from(e: String) -> Self {
        Self::GenericError(e)
    }
}

impl From<&str> for SchedError {
    fn from(e: &str) -> Self {
        Self::GenericError(e.to_string())
    }
}
