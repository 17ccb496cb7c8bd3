//! Protocol error types.

use thiserror::Error;

/// Errors from encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Text frame was not a valid JSON event envelope.
    #[error("invalid JSON message: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary frame was not a valid CBOR event envelope.
    #[error("invalid CBOR message: {reason}")]
    CborDecode {
        /// Description of the decode failure.
        reason: String,
    },

    /// Message could not be encoded as CBOR.
    #[error("CBOR encoding failed: {reason}")]
    CborEncode {
        /// Description of the encode failure.
        reason: String,
    },
}

impl ProtocolError {
    /// Returns true if the error was caused by malformed peer input.
    ///
    /// Malformed input is dropped and logged; encode failures are bugs.
    pub fn is_peer_fault(&self) -> bool {
        match self {
            Self::Json(e) => !e.is_io(),
            Self::CborDecode { .. } => true,
            Self::CborEncode { .. } => false,
        }
    }
}
