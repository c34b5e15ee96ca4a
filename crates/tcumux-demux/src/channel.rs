use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::path::Path;

use tcumux_frame::Tag;
use tcumux_transport::{Pty, Result};
use tracing::{debug, warn};

/// One console, backed by a pseudo terminal pair.
///
/// Created once per tag when the engine starts and closed with it.
#[derive(Debug)]
pub struct Channel {
    tag: Tag,
    pty: Pty,
    dropping: bool,
}

impl Channel {
    pub(crate) fn open(tag: Tag) -> Result<Self> {
        let pty = Pty::open()?;
        Ok(Self {
            tag,
            pty,
            dropping: false,
        })
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn name(&self) -> &'static str {
        self.tag.name()
    }

    /// Path a terminal emulator attaches to.
    pub fn peer_path(&self) -> &Path {
        self.pty.peer_path()
    }

    /// Whether the last delivery to this console lost bytes.
    pub fn is_dropping(&self) -> bool {
        self.dropping
    }

    /// Non-blocking read of console input. `Ok(0)` means nothing to read.
    pub(crate) fn read_input(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            match self.pty.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(0),
                Err(err) => return Err(err),
            }
        }
    }

    /// Hand decoded console output to the terminal.
    ///
    /// There is no queueing: whatever the terminal buffer cannot take right
    /// now is dropped. Returns the number of bytes dropped.
    ///
    /// Consoles nobody is attached to fill up and stay full, so only the
    /// first loss of a run is a warning. The run ends with the first
    /// delivery that goes through whole.
    pub(crate) fn deliver(&mut self, mut bytes: &[u8]) -> usize {
        let mut failure = None;
        while !bytes.is_empty() {
            match self.pty.write(bytes) {
                Ok(0) => break,
                Ok(n) => bytes = &bytes[n..],
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        let dropped = bytes.len();
        let reason = failure
            .filter(|err| err.kind() != ErrorKind::WouldBlock)
            .map(|err| err.to_string());

        match (dropped, self.dropping) {
            (0, false) => {}
            (0, true) => {
                self.dropping = false;
                debug!(console = %self.tag, "terminal draining again");
            }
            (_, false) => {
                self.dropping = true;
                warn!(
                    console = %self.tag,
                    dropped,
                    error = reason.as_deref().unwrap_or("terminal buffer full"),
                    "console output dropped until the terminal drains"
                );
            }
            (_, true) => {
                debug!(console = %self.tag, dropped, "still dropping console output");
            }
        }

        dropped
    }
}

impl AsFd for Channel {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.pty.as_fd()
    }
}
