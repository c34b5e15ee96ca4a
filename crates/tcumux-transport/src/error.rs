use std::path::PathBuf;

/// Errors that can occur while setting up or driving the link descriptors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The requested baud rate is not supported by the combined UART.
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    /// Failed to apply line settings (raw mode, speed) to the device.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Another process already holds the exclusive lock on the device.
    #[error("{path} is locked by another process")]
    Busy { path: PathBuf },

    /// Failed to allocate a pseudo terminal pair.
    #[error("failed to allocate pseudo terminal: {0}")]
    Pty(std::io::Error),
}

impl TransportError {
    /// Whether this error belongs to the startup configuration class
    /// (bad path, unsupported speed, line settings rejected).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Open { .. } | Self::UnsupportedBaudRate(_) | Self::Configure { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
