//! schedload: generate CPU/I/O scheduler pressure, then dump the scheduler's
//! statistics for this process.
//!
//! ```text
//! schedload <MODE> [OPTIONS]
//!
//!   cpu              spin on the current thread until SIGQUIT
//!   io               one I/O kernel on the current thread
//!   cpu-threaded     one CPU worker per logical CPU
//!   io-threaded      one I/O worker per logical CPU
//!   mixed-threaded   CPU on even slots, I/O on odd slots
//!   serial           N bounded CPU units back to back
//!   anything else    same as io-threaded
//! ```
//!
//! On completion, or as soon as `SIGQUIT` arrives, stdout receives
//! `/proc/<pid>/schedstat`, `::::::::::`, `/proc/<pid>/stat`, `::::::::::`,
//! `/proc/<pid>/sched` and the process exits 0. Usage errors, pool spawn
//! failures and unreadable statistics exit 1.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use schedload::{CancelToken, Dispatcher, LoadConfig, Mode, SchedulerProbe, SharedSink, Trigger};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "schedload",
    version,
    about = "Generate CPU/I/O scheduler pressure and dump scheduler statistics",
    long_about = "
schedload runs a synthetic workload selected by MODE and, when the run
completes or the process receives SIGQUIT, writes its /proc schedstat, stat
and sched entries to stdout separated by '::::::::::' lines.

Example:
    schedload cpu & sleep 5; kill -QUIT $!
    schedload mixed-threaded --bounded --work-unit 50000000
    schedload cpu-threaded --duration 10
"
)]
struct Cli {
    /// Run profile: cpu, io, cpu-threaded, io-threaded, mixed-threaded,
    /// serial. Unrecognized values run io-threaded.
    mode: String,

    // ========================================================================
    // Workload Shape
    // ========================================================================
    /// Pool size (default: logical CPU count)
    #[arg(long)]
    workers: Option<usize>,

    /// Iterations of one bounded CPU work unit
    #[arg(long)]
    work_unit: Option<u64>,

    /// Pooled CPU workers run one work unit and return instead of spinning
    #[arg(long)]
    bounded: bool,

    /// Write/flush/seek cycles per I/O kernel
    #[arg(long)]
    io_iterations: Option<usize>,

    /// Forward seek per I/O cycle, in bytes
    #[arg(long)]
    io_seek: Option<i64>,

    // ========================================================================
    // Output Control
    // ========================================================================
    /// Sink file for bounded CPU results (default: anonymous scratch file)
    #[arg(long)]
    sink: Option<PathBuf>,

    /// Copy the sink to stdout after all workers join
    #[arg(long)]
    dump_sink: bool,

    /// Write a JSON run summary here on completion
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Fire the probe after this many seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Verbose output
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    /// Layer CLI flags over `config`.
    fn apply(&self, mut config: LoadConfig) -> LoadConfig {
        if let Some(n) = self.workers {
            config = config.workers(n);
        }
        if let Some(n) = self.work_unit {
            config = config.work_unit(n);
        }
        if self.bounded {
            config = config.bounded_workers(true);
        }
        if let Some(n) = self.io_iterations {
            config = config.io_iterations(n);
        }
        if let Some(n) = self.io_seek {
            config = config.io_forward_seek(n);
        }
        if let Some(path) = &self.sink {
            config = config.sink_path(path);
        }
        if self.dump_sink {
            config = config.dump_sink(true);
        }
        if let Some(path) = &self.summary {
            config = config.summary_path(path);
        }
        if let Some(secs) = self.duration {
            config = config.duration(Duration::from_secs(secs));
        }
        if self.verbose {
            config = config.verbose(true);
        }
        config
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };
    let config = cli.apply(LoadConfig::from_env());
    init_tracing(config.verbose);

    if let Err(err) = run(&cli.mode, config) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("SCHEDLOAD_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Only returns on error; success ends inside the probe.
fn run(token: &str, config: LoadConfig) -> Result<()> {
    let mode = Mode::parse(token);
    if mode == Mode::Default && token != Mode::Default.name() {
        tracing::warn!(token, "unrecognized mode, running the io-threaded plan");
    }

    let probe = Arc::new(SchedulerProbe::for_current_process());
    let missing = probe.missing_sources();
    if !missing.is_empty() {
        tracing::warn!(
            missing = ?missing,
            "scheduler statistics unavailable; the probe will exit 1 without output"
        );
    }

    // Before any other thread exists, so they all inherit the blocked mask.
    let cancel = CancelToken::new();
    let trigger = Trigger::install(Arc::clone(&probe), cancel.clone())?;
    if let Some(duration) = config.duration {
        trigger.arm_deadline(duration)?;
    }

    let sink = SharedSink::open(config.sink_path.as_deref())?;
    Dispatcher::new(config).run(mode, sink, cancel, &mut std::io::stdout())?;

    probe.fire()
}
