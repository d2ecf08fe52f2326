use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CorrelationError {
    #[error("Correlation error, unsupported metadata value (key: {key}): {reason}")]
    UnsupportedValue { key: String, reason: String },

    #[error("Correlation error, unable to read resource mapping file ({path}): {reason}")]
    MappingFile { path: String, reason: String },

    #[error("Correlation error, invalid resource mapping document ({path}): {reason}")]
    MappingFormat { path: String, reason: String },

    #[error("Correlation error, invalid endpoint ({0})")]
    InvalidEndpoint(String),

    #[error("Correlation error, failed to connect to correlation service ({0})")]
    TransportFailedToConnect(String),

    #[error("Correlation error, call to correlation service timed out")]
    TransportTimeout,

    #[error("Correlation error, call to correlation service failed: {0}")]
    TransportCallFailed(String),

    #[error("Correlation error, correlation server failed: {0}")]
    ServerFailed(String),

    #[error("Correlation error, unexpected response from correlation API")]
    UnexpectedResponse,
}
