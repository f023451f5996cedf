//! Error types for the stream link.
//!
//! Every failure the link can hit terminates at most the current connect
//! attempt or session. None of them take the manager down, and none are
//! retried automatically: reconnecting is always a caller decision.
//!
//! ## Error Categories
//!
//! - **Peer lookup**: no bonded peer carries the configured name
//! - **Connect**: the transport refused, could not reach, or timed out
//! - **Framing**: the stream ended mid-frame, or a frame did not split into
//!   six fields
//! - **I/O**: the stream failed after a successful connect
//!
//! ## Recovery
//!
//! ```rust
//! use coolmon::{ErrorKind, LinkError};
//!
//! let error = LinkError::connect_failed("peer unreachable");
//! assert_eq!(error.kind(), ErrorKind::ConnectFailed);
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type alias for link operations.
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

/// What exactly was wrong with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingFault {
    /// The stream closed after delivering only part of a frame.
    ShortFrame { received: usize },
    /// A frame handed to the decoder was not exactly one record wide.
    FrameLength { len: usize },
    /// The frame split into the wrong number of comma-separated fields.
    FieldCount { found: usize },
}

impl std::fmt::Display for FramingFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FramingFault::ShortFrame { received } => {
                write!(f, "stream closed after {} of {} frame bytes", received, crate::RECORD_SIZE)
            }
            FramingFault::FrameLength { len } => {
                write!(f, "frame is {} bytes, expected {}", len, crate::RECORD_SIZE)
            }
            FramingFault::FieldCount { found } => {
                write!(f, "frame has {} fields, expected {}", found, crate::FIELD_COUNT)
            }
        }
    }
}

/// Coarse classification of a [`LinkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PeerNotFound,
    AdapterUnavailable,
    ConnectFailed,
    FramingError,
    IoError,
    Config,
}

/// Main error type for link operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LinkError {
    #[error("No bonded peer named '{name}'")]
    PeerNotFound { name: String },

    #[error("Radio adapter is unavailable or switched off")]
    AdapterUnavailable,

    #[error("Failed to connect to peer: {reason}")]
    ConnectFailed {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Connect timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Framing error: {fault}")]
    Framing { fault: FramingFault },

    #[error("Link I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl LinkError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkError::PeerNotFound { .. } => ErrorKind::PeerNotFound,
            LinkError::AdapterUnavailable => ErrorKind::AdapterUnavailable,
            LinkError::ConnectFailed { .. } | LinkError::Timeout { .. } => {
                ErrorKind::ConnectFailed
            }
            LinkError::Framing { .. } => ErrorKind::FramingError,
            LinkError::Io { .. } => ErrorKind::IoError,
            LinkError::Config { .. } => ErrorKind::Config,
        }
    }

    /// Returns whether re-issuing the connect has a chance of succeeding
    /// without the operator changing anything first.
    pub fn is_retryable(&self) -> bool {
        match self {
            LinkError::ConnectFailed { .. } => true,
            LinkError::Timeout { .. } => true,
            LinkError::Io { .. } => true,
            LinkError::Framing { .. } => true,
            LinkError::PeerNotFound { .. } => false,
            LinkError::AdapterUnavailable => false,
            LinkError::Config { .. } => false,
        }
    }

    /// Returns suggested operator actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LinkError::PeerNotFound { .. } => vec![
                "Pair the rig's radio module with this device",
                "Check the configured target name matches the module name exactly",
            ],
            LinkError::AdapterUnavailable => {
                vec!["Switch the radio on", "Check this device has a radio adapter"]
            }
            LinkError::ConnectFailed { .. } => vec![
                "Check the rig is powered and in range",
                "Verify the service token matches what the module expects",
                "Retry the connection",
            ],
            LinkError::Timeout { .. } => {
                vec!["Move closer to the rig", "Increase connect_timeout_ms", "Retry the connection"]
            }
            LinkError::Framing { .. } => vec![
                "Check the rig firmware sends 26-byte records",
                "Reconnect to resynchronise on a frame boundary",
            ],
            LinkError::Io { .. } => {
                vec!["Check the rig is still powered and in range", "Reconnect"]
            }
            LinkError::Config { .. } => {
                vec!["Fix the configuration file", "Remove the file to fall back to defaults"]
            }
        }
    }

    /// Helper constructor for connect failures.
    pub fn connect_failed(reason: impl Into<String>) -> Self {
        LinkError::ConnectFailed { reason: reason.into(), source: None }
    }

    /// Helper constructor for connect failures with source.
    pub fn connect_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        LinkError::ConnectFailed { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for peer lookup failures.
    pub fn peer_not_found(name: impl Into<String>) -> Self {
        LinkError::PeerNotFound { name: name.into() }
    }

    /// Helper constructor for framing errors.
    pub fn framing(fault: FramingFault) -> Self {
        LinkError::Framing { fault }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        LinkError::Config { reason: reason.into() }
    }
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Io { source: err }
    }
}
