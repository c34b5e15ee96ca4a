use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg, OFlag};
use nix::sys::termios::BaudRate;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::termios;

/// The only line speed the combined UART runs at.
pub const SUPPORTED_BAUD_RATE: u32 = 115_200;

/// Line settings requested for the serial link.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Requested baud rate. Anything other than 115200 is rejected.
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: SUPPORTED_BAUD_RATE,
        }
    }
}

/// The shared serial link carrying every console.
///
/// Opened read-write, without becoming the controlling terminal, in
/// non-blocking raw mode, and held under an exclusive advisory lock for
/// as long as the value lives. Dropping it releases the lock.
pub struct SerialPort {
    file: Flock<File>,
    path: PathBuf,
    baud_rate: u32,
}

impl SerialPort {
    /// Open, lock and configure the serial device at `path`.
    ///
    /// The lock is taken before any line setting is touched, so a second
    /// instance fails with [`TransportError::Busy`] without disturbing the
    /// owner's line.
    pub fn open(path: impl AsRef<Path>, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = baud_constant(config.baud_rate)
            .ok_or(TransportError::UnsupportedBaudRate(config.baud_rate))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags((OFlag::O_NOCTTY | OFlag::O_NONBLOCK).bits())
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;

        let file = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(locked) => locked,
            Err((_, Errno::EAGAIN | Errno::EACCES)) => return Err(TransportError::Busy { path }),
            Err((_, errno)) => {
                return Err(TransportError::Configure {
                    path,
                    source: errno.into(),
                })
            }
        };
        debug!(?path, "serial device locked");

        termios::make_raw(file.as_fd(), Some(speed)).map_err(|e| TransportError::Configure {
            path: path.clone(),
            source: e,
        })?;

        info!(?path, baud = config.baud_rate, "opened serial link");

        Ok(Self {
            file,
            path,
            baud_rate: config.baud_rate,
        })
    }

    /// Device path this link was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured line speed.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

fn baud_constant(baud_rate: u32) -> Option<BaudRate> {
    match baud_rate {
        SUPPORTED_BAUD_RATE => Some(BaudRate::B115200),
        _ => None,
    }
}

impl fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("baud_rate", &self.baud_rate)
            .field("fd", &self.as_fd())
            .finish()
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (*self.file).read(buf)
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        (*self.file).write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        (*self.file).flush()
    }
}

impl AsFd for SerialPort {
    fn as_fd(&self) -> BorrowedFd<'_> {
        (*self.file).as_fd()
    }
}
