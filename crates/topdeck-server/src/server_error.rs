//! Driver error types.

use thiserror::Error;
use topdeck_core::SessionId;

/// Errors returned by [`ServerDriver::process_event`](crate::ServerDriver::process_event).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// An event named a connection the driver never accepted.
    #[error("unknown connection {0:016x}")]
    UnknownConnection(SessionId),

    /// A connection id was accepted twice.
    #[error("connection {0:016x} already registered")]
    DuplicateConnection(SessionId),

    /// Accepting the connection would exceed `max_connections`.
    #[error("connection limit of {max} reached")]
    ConnectionLimit {
        /// Configured limit
        max: usize,
    },
}
