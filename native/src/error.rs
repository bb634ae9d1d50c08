use std::io;
use thiserror::Error;

/// Errors surfaced by the bridge to the caller of a query.
///
/// Transport read/write failures are not represented here: they are reported
/// as `false`/`None` by the transport and become an absent result.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Pipe '{name}' still busy after {attempts} attempts")]
    ChannelUnavailable { name: String, attempts: u32 },

    #[error("Could not open pipe '{name}': {source}")]
    ChannelOpen {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Pipe is not open")]
    PipeNotReady,

    #[error("Handshake failed: expected GO_AHEAD but received {received:?}")]
    HandshakeFailed { received: String },

    #[error("Target process not found: {0}")]
    ProcessNotFound(String),

    #[error("Process locator error: {0}")]
    Locator(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to create pipe runtime: {0}")]
    Runtime(#[source] io::Error),
}

impl BridgeError {
    /// Whether retrying the whole query later can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, BridgeError::ChannelUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
