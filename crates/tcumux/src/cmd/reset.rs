use tcumux_frame::FrameWriter;
use tcumux_transport::{SerialConfig, SerialPort};
use tracing::info;

use crate::cmd::ResetArgs;
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};

pub fn run(args: ResetArgs) -> CliResult<i32> {
    let serial = SerialConfig {
        baud_rate: args.baud,
    };
    let port = SerialPort::open(&args.device, &serial)
        .map_err(|err| transport_error("open failed", err))?;

    let mut writer = FrameWriter::new(port);
    writer
        .send_reset()
        .map_err(|err| frame_error("reset failed", err))?;

    info!(device = ?args.device, "reset requested");
    Ok(SUCCESS)
}
