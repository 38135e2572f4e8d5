//! mpt-status-exporter - Prometheus exporter for `mpt-status` output.
//!
//! Performs one probe -> fetch-all -> parse-all -> print cycle and exits.
//! Metrics go to stdout; diagnostics go to stderr with `ERROR:` (non-fatal,
//! line skipped) or `FATAL:` (run aborted, exit code 1) prefixes.

use std::time::Duration;

use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

use raid_exporter::exec::run_command;
use raid_exporter::metric::MetricSet;
use raid_exporter::mpt;

/// Prometheus exporter for mpt-status RAID controllers.
#[derive(Parser)]
#[command(name = "mpt-status-exporter", about = "Exports mpt-status RAID state as Prometheus metrics", version)]
struct Args {
    /// Path to the mpt-status binary.
    #[arg(long, default_value = "mpt-status")]
    command: String,

    /// Timeout for each external command, in seconds.
    #[arg(long, default_value_t = raid_exporter::exec::CMD_TIMEOUT.as_secs())]
    timeout: u64,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber. Logs go to stderr; stdout carries
/// only the exposition stream.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn error(msg: impl AsRef<str>) {
    eprintln!("ERROR: {}", msg.as_ref());
}

fn fatal(msg: impl AsRef<str>) -> ! {
    eprintln!("FATAL: {}", msg.as_ref());
    std::process::exit(1);
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);
    let timeout = Duration::from_secs(args.timeout);

    let probe_out = match run_command(&args.command, &["-p"], timeout) {
        Ok(out) => out,
        Err(e) => fatal(format!("Failed to probe controllers: {}", e)),
    };
    let device_ids = mpt::parse_probe_output(&probe_out);
    if device_ids.is_empty() {
        fatal("No devices were found");
    }
    debug!(devices = device_ids.len(), "probe finished");

    let mut metrics = MetricSet::new();
    for id in &device_ids {
        let status_out = match run_command(&args.command, &["-n", "-i", id], timeout) {
            Ok(out) => out,
            Err(e) => fatal(format!("Failed to check status for device {}: {}", id, e)),
        };
        for (num, line) in status_out.lines().enumerate() {
            if mpt::is_progress_line(line) {
                continue;
            }
            match mpt::DeviceLine::parse(line) {
                Some(record) => metrics.extend(record.metrics()),
                None => error(format!("Can't recognize line #{}: {}", num, line)),
            }
        }
    }

    if metrics.is_empty() {
        fatal("No metrics were parsed");
    }
    print!("{}", metrics.render());
}
