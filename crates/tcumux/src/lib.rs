//! Tegra Combined UART demultiplexer.
//!
//! One serial link carries the text consoles of every on-chip processor.
//! tcumux splits it back into one pseudo terminal per console and frames
//! whatever is typed into those terminals back onto the link.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial link and pseudo terminal descriptors
//! - [`frame`]: Tags, escape-byte decoder and framing writer
//! - [`demux`]: The engine and its poll loop

/// Re-export transport types.
pub mod transport {
    pub use tcumux_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use tcumux_frame::*;
}

/// Re-export engine types.
pub mod demux {
    pub use tcumux_demux::*;
}
