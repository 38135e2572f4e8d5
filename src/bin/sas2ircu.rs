//! sas2ircu-exporter - Prometheus exporter for `sas2ircu` output.
//!
//! Performs one probe -> fetch-all -> parse-all -> print cycle and exits.
//! A structural parse failure on any controller's DISPLAY dump aborts the
//! whole run; this tool's section layout is fixed and a mismatch means the
//! output cannot be trusted.

use std::time::Duration;

use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

use raid_exporter::exec::run_command;
use raid_exporter::metric::MetricSet;
use raid_exporter::sas2ircu;

/// Prometheus exporter for sas2ircu SAS2 controllers.
#[derive(Parser)]
#[command(name = "sas2ircu-exporter", about = "Exports sas2ircu RAID state as Prometheus metrics", version)]
struct Args {
    /// Path to the sas2ircu binary.
    #[arg(long, default_value = "sas2ircu")]
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

fn fatal(msg: impl AsRef<str>) -> ! {
    eprintln!("FATAL: {}", msg.as_ref());
    std::process::exit(1);
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);
    let timeout = Duration::from_secs(args.timeout);

    let probe_out = match run_command(&args.command, &["LIST"], timeout) {
        Ok(out) => out,
        Err(e) => fatal(format!("Failed to probe controllers: {}", e)),
    };
    let controller_ids = sas2ircu::parse_probe_output(&probe_out);
    if controller_ids.is_empty() {
        fatal("No controllers were found");
    }
    debug!(controllers = controller_ids.len(), "probe finished");

    let mut metrics = MetricSet::new();
    for id in &controller_ids {
        let display_out = match run_command(&args.command, &[id, "DISPLAY"], timeout) {
            Ok(out) => out,
            Err(e) => fatal(format!("Failed to check status for device {}: {}", id, e)),
        };
        match sas2ircu::parse_display(id, &display_out) {
            Ok(parsed) => metrics.extend(parsed),
            Err(e) => fatal(format!("Failed to parse controller #{} display: {}", id, e)),
        }
    }

    if metrics.is_empty() {
        fatal("No metrics were parsed");
    }
    print!("{}", metrics.render());
}
