use tcumux_frame::FrameError;
use tcumux_transport::TransportError;

/// Errors that stop the demultiplexer.
///
/// Protocol anomalies never show up here; they are logged and counted in
/// [`DemuxStats`](crate::DemuxStats) while every other console keeps running.
#[derive(Debug, thiserror::Error)]
pub enum DemuxError {
    /// Setting up the link or a console descriptor failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Writing to the link failed, including after the single retry.
    #[error("link write failed: {0}")]
    Frame(#[from] FrameError),

    /// The link could not be read.
    #[error("link read failed: {0}")]
    LinkRead(std::io::Error),

    /// The link reported hangup or an error condition.
    #[error("link hung up")]
    LinkHangup,

    /// A console descriptor failed.
    #[error("console {name} failed: {source}")]
    Channel {
        name: &'static str,
        source: std::io::Error,
    },

    /// Waiting for readiness failed.
    #[error("poll failed: {0}")]
    Poll(std::io::Error),
}

impl DemuxError {
    /// Whether the link itself is unusable and the engine must be torn down.
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            Self::Frame(_) | Self::LinkRead(_) | Self::LinkHangup
        )
    }
}

pub type Result<T> = std::result::Result<T, DemuxError>;
