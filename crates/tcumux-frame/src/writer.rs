use std::io::{ErrorKind, Write};
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tracing::{debug, warn};

use crate::codec::{select_prefix, RESET_REQUEST};
use crate::error::{FrameError, Result};
use crate::tag::Tag;

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024 + 2;

/// Pause before the single retry of a write the link refused as busy.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How a refused link write is retried.
///
/// Only `WouldBlock` counts as transient. It is retried once after `delay`;
/// a second refusal is fatal.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAY)
    }
}

/// Writes console data onto the link, announcing the console only when it
/// changes.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    active: Option<Tag>,
    policy: RetryPolicy,
    retries: u64,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with the default retry policy.
    pub fn new(inner: T) -> Self {
        Self::with_policy(inner, RetryPolicy::default())
    }

    /// Create a new frame writer with an explicit retry policy.
    pub fn with_policy(inner: T, policy: RetryPolicy) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            active: None,
            policy,
            retries: 0,
        }
    }

    /// Send a chunk of console input for `tag`.
    ///
    /// The `{0xff, tag}` prefix is written only if `tag` is not the console
    /// that wrote last. Prefix and payload go out as one staged write, and the
    /// active console is only updated once that write has fully succeeded.
    pub fn send(&mut self, tag: Tag, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            return Ok(());
        }

        let switching = self.active != Some(tag);

        self.buf.clear();
        if switching {
            self.buf.put_slice(&select_prefix(tag));
        }
        self.buf.put_slice(payload);

        self.write_staged()?;

        if switching {
            debug!(console = %tag, previous = ?self.active.map(Tag::name), "link input switched");
            self.active = Some(tag);
        }
        Ok(())
    }

    /// Ask the other side to resynchronize.
    ///
    /// Writes exactly `{0xff, 0xfd}`. The next chunk re-announces its console.
    pub fn send_reset(&mut self) -> Result<()> {
        self.buf.clear();
        self.buf.put_slice(&RESET_REQUEST);
        self.write_staged()?;
        self.active = None;
        Ok(())
    }

    fn write_staged(&mut self) -> Result<()> {
        let mut offset = 0usize;
        let mut retried = false;

        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    if retried {
                        return Err(FrameError::RetryExhausted {
                            delay: self.policy.delay,
                            source: err,
                        });
                    }
                    warn!(
                        delay = ?self.policy.delay,
                        pending = self.buf.len() - offset,
                        "link not writable, retrying once"
                    );
                    retried = true;
                    self.retries += 1;
                    std::thread::sleep(self.policy.delay);
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying link.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }
}

impl<T> FrameWriter<T> {
    /// Console whose bytes were most recently framed onto the link.
    pub fn active_input(&self) -> Option<Tag> {
        self.active
    }

    /// Forget the active console so the next chunk carries a prefix.
    pub fn forget_active(&mut self) {
        self.active = None;
    }

    /// Number of transient write failures retried so far.
    pub fn retries(&self) -> u64 {
        self.retries
    }

    /// Current retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner link.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
