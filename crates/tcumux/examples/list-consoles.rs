//! Open a combined UART and print where each console can be attached.
//!
//! Run with:
//!   cargo run --example list-consoles -- /dev/ttyUSB3

use std::sync::atomic::AtomicBool;

use tcumux::demux::{run, Demux, DemuxConfig};
use tcumux::transport::SerialConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let device = std::env::args()
        .nth(1)
        .ok_or("usage: list-consoles <DEVICE>")?;

    let mut demux = Demux::open(&device, &SerialConfig::default(), DemuxConfig::default())?;
    for (name, path) in demux.registry() {
        println!("{name:<8} {}", path.display());
    }

    // Serve until the link fails; interrupt to quit.
    let running = AtomicBool::new(true);
    run(&mut demux, &running)?;
    Ok(())
}
