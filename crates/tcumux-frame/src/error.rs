use std::time::Duration;

/// Errors that can occur while writing framed data to the link.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The link stayed unwritable after the single retry.
    #[error("link still not writable after retrying once ({delay:?} delay): {source}")]
    RetryExhausted {
        delay: Duration,
        source: std::io::Error,
    },

    /// A non-transient I/O error occurred while writing.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link accepted zero bytes.
    #[error("connection closed (link accepted no bytes)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// Non-fatal anomalies seen while decoding the link.
///
/// These are reported and decoding carries on with the next byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolWarning {
    /// An escape was followed by a byte that is neither a tag nor a command.
    #[error("unrecognized command byte {0:#04x}")]
    UnknownCommand(u8),

    /// Payload arrived before any console was selected.
    #[error("{len} byte(s) received with no console selected")]
    Unrouted { len: usize },
}

impl ProtocolWarning {
    /// Payload bytes lost to this anomaly.
    pub fn dropped_bytes(&self) -> usize {
        match self {
            Self::UnknownCommand(_) => 0,
            Self::Unrouted { len } => *len,
        }
    }
}
