use std::collections::BTreeMap;
use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tcumux_frame::{
    Decoded, Decoder, FrameWriter, ParserState, RetryPolicy, Tag, DEFAULT_RETRY_DELAY, TAG_COUNT,
};
use tcumux_transport::{SerialConfig, SerialPort};
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::dispatch::Source;
use crate::error::{DemuxError, Result};

/// Bytes pulled from a descriptor per readiness event.
pub const DEFAULT_READ_CHUNK: usize = 4096;

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct DemuxConfig {
    /// Maximum bytes read from the link or a console per event.
    pub read_chunk: usize,
    /// Pause before the single retry of a refused link write.
    pub retry_delay: Duration,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            read_chunk: DEFAULT_READ_CHUNK,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Running counters, mostly for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DemuxStats {
    /// Bytes read from the link.
    pub bytes_from_link: u64,
    /// Console bytes framed onto the link (prefixes not included).
    pub bytes_to_link: u64,
    /// Payload bytes discarded because no console was selected.
    pub unrouted_bytes: u64,
    /// Protocol warnings raised while decoding.
    pub warnings: u64,
    /// Reset commands received from the remote side.
    pub resets_received: u64,
    /// Transient link write failures that were retried.
    pub write_retries: u64,
    /// Console output lost to full terminal buffers.
    pub dropped_bytes: u64,
}

/// The combined UART demultiplexer.
///
/// Owns the link and the six consoles. All routing state lives here and is
/// only touched from [`Demux::dispatch`] and the handlers it calls, so a
/// single thread drives everything and the link never has two writers.
pub struct Demux<T> {
    writer: FrameWriter<T>,
    decoder: Decoder,
    channels: [Channel; TAG_COUNT],
    read_buf: Box<[u8]>,
    stats: DemuxStats,
}

impl Demux<SerialPort> {
    /// Open the serial device and create one pseudo terminal per console.
    pub fn open(
        device: impl AsRef<Path>,
        serial: &SerialConfig,
        config: DemuxConfig,
    ) -> Result<Self> {
        let port = SerialPort::open(device, serial)?;
        Self::with_transport(port, config)
    }
}

impl<T: Read + Write> Demux<T> {
    /// Build the engine around an already configured link.
    pub fn with_transport(transport: T, config: DemuxConfig) -> Result<Self> {
        let channels = [
            Channel::open(Tag::Spe)?,
            Channel::open(Tag::Ccplex)?,
            Channel::open(Tag::Bpmp)?,
            Channel::open(Tag::Sce)?,
            Channel::open(Tag::Tz)?,
            Channel::open(Tag::Rce)?,
        ];
        debug_assert!(channels
            .iter()
            .enumerate()
            .all(|(i, channel)| channel.tag().index() == i));

        for channel in &channels {
            info!(console = %channel.tag(), path = ?channel.peer_path(), "console ready");
        }

        Ok(Self {
            writer: FrameWriter::with_policy(transport, RetryPolicy::new(config.retry_delay)),
            decoder: Decoder::new(),
            channels,
            read_buf: vec![0u8; config.read_chunk.max(1)].into_boxed_slice(),
            stats: DemuxStats::default(),
        })
    }

    /// Handle one readiness event.
    pub fn dispatch(&mut self, source: Source) -> Result<usize> {
        match source {
            Source::Transport => self.on_transport_readable(),
            Source::Channel(tag) => self.on_channel_readable(tag),
        }
    }

    /// Decode whatever the link has and route it to the consoles.
    ///
    /// Returns the number of link bytes consumed. A read that yields nothing
    /// is not end-of-stream; it just means there was no data this time.
    pub fn on_transport_readable(&mut self) -> Result<usize> {
        let n = loop {
            match self.writer.get_mut().read(&mut self.read_buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(0),
                Err(err) => return Err(DemuxError::LinkRead(err)),
            }
        };
        if n == 0 {
            return Ok(0);
        }
        self.stats.bytes_from_link += n as u64;

        for item in self.decoder.feed(&self.read_buf[..n]) {
            match item {
                Decoded::Payload { tag, bytes } => {
                    let dropped = self.channels[tag.index()].deliver(bytes);
                    self.stats.dropped_bytes += dropped as u64;
                }
                Decoded::Select(tag) => {
                    debug!(console = %tag, "link output switched");
                }
                Decoded::Reset => {
                    self.writer.forget_active();
                    self.stats.resets_received += 1;
                    info!("remote requested reset, routing state cleared");
                }
                Decoded::Warning(warning) => {
                    self.stats.warnings += 1;
                    self.stats.unrouted_bytes += warning.dropped_bytes() as u64;
                    warn!(%warning, "protocol warning");
                }
            }
        }

        Ok(n)
    }

    /// Frame pending input from `tag`'s terminal onto the link.
    ///
    /// Returns the number of console bytes forwarded.
    pub fn on_channel_readable(&mut self, tag: Tag) -> Result<usize> {
        let channel = &mut self.channels[tag.index()];
        let n = channel
            .read_input(&mut self.read_buf)
            .map_err(|source| DemuxError::Channel {
                name: tag.name(),
                source,
            })?;
        if n == 0 {
            return Ok(0);
        }

        self.writer.send(tag, &self.read_buf[..n])?;
        self.stats.bytes_to_link += n as u64;
        Ok(n)
    }

    /// Ask the remote side to resynchronize.
    ///
    /// Writes `{0xff, 0xfd}` whatever the current routing state.
    pub fn request_reset(&mut self) -> Result<()> {
        self.writer.send_reset()?;
        info!("reset requested");
        Ok(())
    }

    /// Drop all routing state: no console selected in either direction and
    /// no pending escape.
    pub fn resynchronize(&mut self) {
        self.decoder.reset();
        self.writer.forget_active();
    }

    /// Close the link and every console.
    pub fn close(self) {
        info!(stats = ?self.stats(), "closing demultiplexer");
    }
}

impl<T> Demux<T> {
    /// Console currently receiving decoded link output.
    pub fn active_output(&self) -> Option<Tag> {
        self.decoder.active_output()
    }

    /// Console whose input was most recently framed onto the link.
    pub fn active_input(&self) -> Option<Tag> {
        self.writer.active_input()
    }

    pub fn parser_state(&self) -> ParserState {
        self.decoder.state()
    }

    pub fn stats(&self) -> DemuxStats {
        DemuxStats {
            write_retries: self.writer.retries(),
            ..self.stats
        }
    }

    pub fn channel(&self, tag: Tag) -> &Channel {
        &self.channels[tag.index()]
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    /// Console name to attachable terminal path, for every console.
    pub fn registry(&self) -> BTreeMap<&'static str, PathBuf> {
        self.channels
            .iter()
            .map(|channel| (channel.name(), channel.peer_path().to_path_buf()))
            .collect()
    }

    /// Borrow the link.
    pub fn transport(&self) -> &T {
        self.writer.get_ref()
    }

    /// Mutably borrow the link.
    pub fn transport_mut(&mut self) -> &mut T {
        self.writer.get_mut()
    }
}

impl<T: AsFd> Demux<T> {
    /// Every descriptor to watch for readability, link first.
    pub fn sources(&self) -> Vec<(Source, BorrowedFd<'_>)> {
        std::iter::once((Source::Transport, self.writer.get_ref().as_fd()))
            .chain(
                self.channels
                    .iter()
                    .map(|channel| (Source::Channel(channel.tag()), channel.as_fd())),
            )
            .collect()
    }
}
