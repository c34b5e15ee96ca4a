//! Readiness polling over the link and the consoles.

use std::io::{Read, Write};
use std::os::fd::AsFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tcumux_frame::Tag;
use tracing::{debug, info};

use crate::engine::Demux;
use crate::error::{DemuxError, Result};

/// How often [`run`] rechecks its stop flag when nothing is happening.
const IDLE_TICK: Duration = Duration::from_millis(250);

/// A descriptor the engine wants readiness events for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The shared serial link.
    Transport,
    /// The internal side of a console's terminal.
    Channel(Tag),
}

/// `poll(2)` over every descriptor a [`Demux`] exposes.
///
/// The descriptor set is borrowed from the engine for the duration of each
/// wait only, so the engine stays free for dispatching in between.
#[derive(Debug, Default)]
pub struct Poller {
    ready: Vec<Source>,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for readiness, returning the sources to dispatch, link first.
    ///
    /// `None` waits indefinitely; timeouts are capped at 65535 ms. A signal
    /// interrupting the wait yields an empty set. Hangup or error on the link
    /// is fatal; on a console it is reported as readable so the handler sees
    /// the underlying error.
    pub fn wait<T: AsFd>(
        &mut self,
        demux: &Demux<T>,
        timeout: Option<Duration>,
    ) -> Result<&[Source]> {
        self.ready.clear();

        let sources = demux.sources();
        let mut fds: Vec<PollFd<'_>> = sources
            .iter()
            .map(|&(_, fd)| PollFd::new(fd, PollFlags::POLLIN))
            .collect();

        let timeout = match timeout {
            Some(t) => PollTimeout::from(u16::try_from(t.as_millis()).unwrap_or(u16::MAX)),
            None => PollTimeout::NONE,
        };

        match poll(&mut fds, timeout) {
            Ok(_) => {}
            Err(Errno::EINTR) => return Ok(&self.ready),
            Err(errno) => return Err(DemuxError::Poll(errno.into())),
        }

        let failure = PollFlags::POLLERR | PollFlags::POLLHUP | PollFlags::POLLNVAL;
        for (pfd, &(source, _)) in fds.iter().zip(&sources) {
            let revents = pfd.revents().unwrap_or_else(PollFlags::empty);
            if revents.is_empty() {
                continue;
            }
            match source {
                Source::Transport if revents.intersects(failure) => {
                    return Err(DemuxError::LinkHangup);
                }
                _ => self.ready.push(source),
            }
        }

        Ok(&self.ready)
    }
}

/// Drive `demux` until `running` is cleared or a fatal error surfaces.
pub fn run<T>(demux: &mut Demux<T>, running: &AtomicBool) -> Result<()>
where
    T: Read + Write + AsFd,
{
    let mut poller = Poller::new();
    info!("demultiplexer running");

    while running.load(Ordering::SeqCst) {
        for &source in poller.wait(demux, Some(IDLE_TICK))? {
            demux.dispatch(source)?;
        }
    }

    debug!("stop requested");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;
    use std::os::unix::fs::OpenOptionsExt;
    use std::os::unix::net::UnixStream;
    use std::sync::Arc;
    use std::time::Instant;

    use nix::fcntl::OFlag;

    use super::*;
    use crate::engine::DemuxConfig;

    fn linked_demux() -> (Demux<UnixStream>, UnixStream) {
        let (local, remote) = UnixStream::pair().unwrap();
        local.set_nonblocking(true).unwrap();
        remote
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let demux = Demux::with_transport(local, DemuxConfig::default()).unwrap();
        (demux, remote)
    }

    fn open_terminal(path: &std::path::Path) -> std::fs::File {
        OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlag::O_NOCTTY.bits())
            .open(path)
            .unwrap()
    }

    fn pump_until<T>(demux: &mut Demux<T>, mut done: impl FnMut(&Demux<T>) -> bool)
    where
        T: Read + Write + AsFd,
    {
        let mut poller = Poller::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done(&*demux) {
            assert!(Instant::now() < deadline, "timed out pumping events");
            let ready: Vec<Source> = poller
                .wait(demux, Some(Duration::from_millis(50)))
                .unwrap()
                .to_vec();
            for source in ready {
                demux.dispatch(source).unwrap();
            }
        }
    }

    #[test]
    fn sources_cover_link_and_every_console() {
        let (demux, _remote) = linked_demux();
        let sources: Vec<Source> = demux.sources().into_iter().map(|(s, _)| s).collect();

        assert_eq!(sources[0], Source::Transport);
        assert_eq!(sources.len(), 1 + Tag::ALL.len());
        for tag in Tag::ALL {
            assert!(sources.contains(&Source::Channel(tag)));
        }
    }

    #[test]
    fn link_readiness_dispatches_inbound() {
        let (mut demux, mut remote) = linked_demux();
        let mut terminal = open_terminal(demux.channel(Tag::Ccplex).peer_path());

        remote.write_all(&[0xff, 0xe1, b'h', b'i']).unwrap();
        pump_until(&mut demux, |d| d.stats().bytes_from_link == 4);

        let mut buf = [0u8; 2];
        terminal.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hi");
    }

    #[test]
    fn console_readiness_dispatches_outbound() {
        let (mut demux, mut remote) = linked_demux();
        let mut terminal = open_terminal(demux.channel(Tag::Bpmp).peer_path());

        terminal.write_all(b"reboot\r").unwrap();
        pump_until(&mut demux, |d| d.stats().bytes_to_link == 7);

        let mut buf = [0u8; 9];
        remote.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"\xff\xe2reboot\r");
    }

    #[test]
    fn wait_times_out_with_nothing_ready() {
        let (demux, _remote) = linked_demux();
        let mut poller = Poller::new();
        let ready = poller.wait(&demux, Some(Duration::from_millis(10))).unwrap();
        assert!(ready.is_empty());
    }

    #[test]
    fn link_hangup_is_fatal() {
        let (demux, remote) = linked_demux();
        drop(remote);

        let mut poller = Poller::new();
        let err = poller.wait(&demux, Some(Duration::from_secs(1))).unwrap_err();
        assert!(matches!(err, DemuxError::LinkHangup));
    }

    #[test]
    fn run_serves_until_stopped() {
        let (mut demux, mut remote) = linked_demux();
        let path = demux.channel(Tag::Rce).peer_path().to_path_buf();
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let running = Arc::clone(&running);
            std::thread::spawn(move || {
                let result = run(&mut demux, &running);
                (result, demux.stats())
            })
        };

        let mut terminal = open_terminal(&path);
        remote.write_all(&[0xff, 0xe5, b'o', b'k']).unwrap();
        let mut buf = [0u8; 2];
        terminal.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ok");

        running.store(false, Ordering::SeqCst);
        let (result, stats) = handle.join().unwrap();
        assert!(result.is_ok());
        assert_eq!(stats.bytes_from_link, 4);
    }

    #[test]
    fn run_returns_immediately_when_already_stopped() {
        let (mut demux, _remote) = linked_demux();
        let running = AtomicBool::new(false);
        assert!(run(&mut demux, &running).is_ok());
    }
}
