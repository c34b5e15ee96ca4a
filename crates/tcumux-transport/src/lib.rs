//! Link descriptors for the Tegra Combined UART.
//!
//! Two kinds of descriptors feed the demultiplexer:
//! - the shared serial link ([`SerialPort`]), opened raw, locked and
//!   non-blocking;
//! - one pseudo terminal pair per console ([`Pty`]), whose peer path is
//!   what a terminal emulator attaches to.
//!
//! This is the lowest layer of tcumux. Nothing here knows about framing.

pub mod error;

#[cfg(unix)]
pub mod pty;
#[cfg(unix)]
pub mod serial;
#[cfg(unix)]
mod termios;

pub use error::{Result, TransportError};

#[cfg(unix)]
pub use pty::Pty;
#[cfg(unix)]
pub use serial::{SerialConfig, SerialPort, SUPPORTED_BAUD_RATE};
