//! Drives a run: mode → plan → kernels → join → sink.

use std::io::{Read, Seek, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::config::LoadConfig;
use crate::context::{CancelToken, RunContext};
use crate::kernel::{self, cpu, io, IoPattern, KernelOutcome};
use crate::mode::{KernelKind, Mode, Plan, WorkerSlot};
use crate::pool::WorkerPool;
use crate::report::{MultiReporter, Reporter};
use crate::result::{epoch_millis, RunSummary, WorkerReport};
use crate::sink::SharedSink;

/// Runs one mode to completion.
///
/// # Example
///
/// ```rust,no_run
/// use schedload::{CancelToken, Dispatcher, LoadConfig, Mode, SharedSink};
///
/// let dispatcher = Dispatcher::new(LoadConfig::from_env());
/// let sink = SharedSink::open(None).unwrap();
/// let summary = dispatcher
///     .run(Mode::IoThreaded, sink, CancelToken::new(), &mut std::io::stdout())
///     .unwrap();
/// assert_eq!(summary.failures(), 0);
/// ```
pub struct Dispatcher<R = MultiReporter> {
    config: LoadConfig,
    reporter: R,
}

impl Dispatcher {
    /// Dispatcher with the reporters `config` asks for.
    pub fn new(config: LoadConfig) -> Self {
        let reporter = MultiReporter::for_config(&config);
        Self { config, reporter }
    }
}

impl<R: Reporter> Dispatcher<R> {
    pub fn with_reporter(config: LoadConfig, reporter: R) -> Self {
        Self { config, reporter }
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Plan `mode` against this run's pool size.
    pub fn plan(&self, mode: Mode) -> Plan {
        Plan::for_mode(mode, self.config.worker_count())
    }

    /// Carry out `mode`, then flush the sink and, if configured, copy it to
    /// `out`.
    ///
    /// Errors only if the pool cannot be fully spawned or the sink cannot be
    /// flushed; kernel failures end up in the summary. Inline CPU and
    /// unbounded pooled CPU workers return only once `cancel` is set.
    pub fn run<W, O>(
        &self,
        mode: Mode,
        sink: SharedSink<W>,
        cancel: CancelToken,
        out: &mut O,
    ) -> Result<RunSummary>
    where
        W: Read + Write + Seek + Send + 'static,
        O: Write,
    {
        let plan = self.plan(mode);
        tracing::info!(
            %mode,
            workers = self.config.worker_count(),
            cpu = plan.cpu_workers(),
            io = plan.io_workers(),
            "dispatching"
        );
        self.reporter.run_start(mode, &plan, &self.config);

        let ctx = Arc::new(RunContext::new(self.config.clone(), sink, cancel));
        let started_at = epoch_millis();
        let start = Instant::now();

        let reports = match &plan {
            Plan::Inline(kernel) => {
                let slot = WorkerSlot {
                    index: 0,
                    kernel: *kernel,
                };
                let result = match kernel {
                    KernelKind::Cpu => {
                        Ok(KernelOutcome::Cpu(cpu::spin_until_cancelled(&ctx.cancel)))
                    }
                    KernelKind::Io => io::churn_scratch(&IoPattern::from_config(&ctx.config))
                        .map(KernelOutcome::Io),
                };
                let report = WorkerReport::from_result(slot, result);
                self.reporter.worker_end(&report);
                vec![report]
            }
            Plan::Serial { units } => (0..*units)
                .map(|index| {
                    let slot = WorkerSlot {
                        index,
                        kernel: KernelKind::Cpu,
                    };
                    let result = kernel::bounded_cpu(index, &ctx).map(KernelOutcome::Cpu);
                    let report = WorkerReport::from_result(slot, result);
                    self.reporter.worker_end(&report);
                    report
                })
                .collect(),
            Plan::Pool(slots) => {
                let reports = WorkerPool::spawn(slots, &ctx)?.join_all();
                for report in &reports {
                    self.reporter.worker_end(report);
                }
                reports
            }
        };
        let elapsed = start.elapsed();

        let sink = ctx.sink();
        sink.flush().context("failed to flush sink")?;
        if self.config.dump_sink {
            sink.dump(out).context("failed to dump sink")?;
            out.flush().context("failed to flush sink dump")?;
        }

        let summary = RunSummary {
            mode,
            workers: self.config.worker_count(),
            reports,
            sink_lines: sink.lines(),
            elapsed,
            started_at,
        };
        tracing::info!(
            elapsed_ms = summary.elapsed.as_millis() as u64,
            failures = summary.failures(),
            sink_lines = summary.sink_lines,
            "run complete"
        );
        self.reporter.run_end(&summary);
        Ok(summary)
    }
}
