use std::fmt;
use std::io;

use tcumux_demux::DemuxError;
use tcumux_frame::FrameError;
use tcumux_transport::TransportError;

// Exit codes; the 64+ range follows sysexits.h.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const USAGE: i32 = 64;
pub const BUSY: i32 = 69;
pub const CONFIG: i32 = 78;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::Open { source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
            PERMISSION_DENIED
        }
        TransportError::Open { .. } | TransportError::Configure { .. } => CONFIG,
        TransportError::UnsupportedBaudRate(_) => USAGE,
        TransportError::Busy { .. } => BUSY,
        TransportError::Pty(_) => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
}

pub fn demux_error(context: &str, err: DemuxError) -> CliError {
    match err {
        DemuxError::Transport(err) => transport_error(context, err),
        DemuxError::Frame(err) => frame_error(context, err),
        DemuxError::LinkRead(_) | DemuxError::LinkHangup => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        DemuxError::Channel { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
