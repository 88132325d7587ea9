use thiserror::Error;

/// Failures talking to the upload/chat server.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS, ...).
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    /// Non-OK status. `message` is the server's `error` field when present.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// OK status but the body was not what the endpoint promises.
    #[error("Failed to parse server response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Invalid chart data: {0}")]
    Invalid(String),

    #[error("Unsupported chart type: {0}")]
    UnsupportedType(String),

    #[error("Chart has no data to draw")]
    Empty,

    #[error("Failed to draw chart: {0}")]
    Draw(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings database error: {0}")]
    Database(#[from] rusqlite::Error),
}
