use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tcumux_demux::{Demux, DemuxConfig};
use tcumux_transport::SerialConfig;
use tracing::info;

use crate::cmd::RunArgs;
use crate::exit::{demux_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_registry, registry_rows, OutputFormat};

/// Longest accepted retry pause. Every console stalls while the retry waits.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let retry_delay = parse_retry_delay(&args.retry_delay)?;
    let serial = SerialConfig {
        baud_rate: args.baud,
    };
    let config = DemuxConfig {
        retry_delay,
        ..DemuxConfig::default()
    };

    let mut demux = Demux::open(&args.device, &serial, config)
        .map_err(|err| demux_error("open failed", err))?;

    // Armed before the registry goes out, so an immediate interrupt still
    // closes the link cleanly.
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    print_registry(&args.device, &registry_rows(&demux), format);

    if args.reset {
        demux
            .request_reset()
            .map_err(|err| demux_error("reset failed", err))?;
    }

    let result = tcumux_demux::run(&mut demux, &running);
    let stats = demux.stats();
    demux.close();
    result.map_err(|err| demux_error("link failed", err))?;

    info!(
        from_link = stats.bytes_from_link,
        to_link = stats.bytes_to_link,
        warnings = stats.warnings,
        dropped = stats.dropped_bytes,
        "stopped"
    );
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Parse `--retry-delay`: whole or fractional seconds (`2`, `1.5s`) or whole
/// milliseconds (`250ms`). Zero retries without pausing.
fn parse_retry_delay(input: &str) -> CliResult<Duration> {
    let text = input.trim();
    let invalid = || {
        CliError::new(
            USAGE,
            format!("invalid retry delay {input:?} (expected e.g. 1s, 1.5s, 250ms)"),
        )
    };

    let delay = match text.strip_suffix("ms") {
        Some(millis) => Duration::from_millis(millis.parse().map_err(|_| invalid())?),
        None => {
            let secs: f64 = text
                .strip_suffix('s')
                .unwrap_or(text)
                .parse()
                .map_err(|_| invalid())?;
            Duration::try_from_secs_f64(secs).map_err(|_| invalid())?
        }
    };

    if delay > MAX_RETRY_DELAY {
        return Err(CliError::new(
            USAGE,
            format!("retry delay {delay:?} exceeds the {MAX_RETRY_DELAY:?} limit"),
        ));
    }
    Ok(delay)
}
