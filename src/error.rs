use serde::Deserialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong talking to the platform.
///
/// Update payloads are never a source of errors: malformed or unrecognized
/// events decode to a sentinel variant instead (see [`crate::updates::Update`]),
/// so a single bad event cannot take down a stream.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-level failure (connect, TLS, read, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Structured error body returned by the platform on a non-2xx response.
    #[error("api error: code={code} message={message}")]
    Api { code: String, message: String },

    /// A 2xx response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Config file could not be read.
    #[error("config read error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Error body the platform sends with non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: String,
    pub message: String,
}
