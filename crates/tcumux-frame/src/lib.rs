//! Escape-byte framing for the Tegra Combined UART.
//!
//! All consoles share one byte stream. A console is selected in-band with a
//! two-byte escape sequence:
//! - `0xff` followed by a tag byte `0xe0..=0xe5` routes every following
//!   byte to that console
//! - `0xff 0xfd` asks the other side to resynchronize
//!
//! Payload bytes are never escaped; the selection prefix is only emitted when
//! the console changes.

pub mod codec;
pub mod error;
pub mod tag;
pub mod writer;

pub use codec::{select_prefix, Decoded, Decoder, Feed, ParserState, ESCAPE, RESET, RESET_REQUEST};
pub use error::{FrameError, ProtocolWarning, Result};
pub use tag::{Tag, UnknownTag, TAG_COUNT};
pub use writer::{FrameWriter, RetryPolicy, DEFAULT_RETRY_DELAY};
