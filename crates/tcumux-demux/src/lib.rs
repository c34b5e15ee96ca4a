//! Demultiplexing engine for the Tegra Combined UART.
//!
//! [`Demux`] owns the serial link and one pseudo terminal per console. It
//! does not own an event loop: [`Demux::sources`] lists the descriptors to
//! watch and [`Demux::dispatch`] handles one ready source. [`run`] is the
//! stock single-threaded loop built on `poll(2)`.

pub mod channel;
pub mod dispatch;
pub mod engine;
pub mod error;

pub use channel::Channel;
pub use dispatch::{run, Poller, Source};
pub use engine::{Demux, DemuxConfig, DemuxStats, DEFAULT_READ_CHUNK};
pub use error::{DemuxError, Result};
