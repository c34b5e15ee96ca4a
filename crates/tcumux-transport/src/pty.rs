use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::fcntl::OFlag;
use nix::pty::{grantpt, posix_openpt, unlockpt, PtyMaster};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::termios;

/// A pseudo terminal pair backing one console.
///
/// The demultiplexer reads and writes the internal (master) side. The peer
/// (slave) side is kept open for the lifetime of the pair so the master never
/// reports end-of-stream while no terminal emulator is attached; its path is
/// what users attach to.
///
/// The pair is switched to raw mode at creation. With echo enabled, console
/// output written to the master would come straight back as console input.
#[derive(Debug)]
pub struct Pty {
    master: PtyMaster,
    _peer: File,
    peer_path: PathBuf,
}

impl Pty {
    /// Allocate a new pseudo terminal pair.
    pub fn open() -> Result<Self> {
        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).map_err(pty_error)?;
        grantpt(&master).map_err(pty_error)?;
        unlockpt(&master).map_err(pty_error)?;

        let peer_path = peer_name(&master).map_err(pty_error)?;

        let peer = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlag::O_NOCTTY.bits())
            .open(&peer_path)
            .map_err(TransportError::Pty)?;

        termios::make_raw(peer.as_fd(), None).map_err(TransportError::Pty)?;
        termios::set_nonblocking(master.as_fd()).map_err(TransportError::Pty)?;

        debug!(path = ?peer_path, "allocated pseudo terminal");

        Ok(Self {
            master,
            _peer: peer,
            peer_path,
        })
    }

    /// Path of the peer side, for terminal emulators to attach to.
    pub fn peer_path(&self) -> &Path {
        &self.peer_path
    }
}

fn pty_error(errno: nix::errno::Errno) -> TransportError {
    TransportError::Pty(errno.into())
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn peer_name(master: &PtyMaster) -> nix::Result<PathBuf> {
    nix::pty::ptsname_r(master).map(PathBuf::from)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn peer_name(master: &PtyMaster) -> nix::Result<PathBuf> {
    // SAFETY: pseudo terminals are only allocated from `Pty::open`, and the
    // name is copied out before returning, so no other ptsname call can
    // overwrite the static buffer in between.
    unsafe { nix::pty::ptsname(master) }.map(PathBuf::from)
}

impl Read for Pty {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.master.read(buf)
    }
}

impl Write for Pty {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.master.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.master.flush()
    }
}

impl AsFd for Pty {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.master.as_fd()
    }
}
