//! Pluggable reporters for run progress.
//!
//! Reporters never touch stdout, which belongs to the probe report. Errors
//! are logged and never propagate.

use crate::config::LoadConfig;
use crate::mode::{KernelKind, Mode, Plan};
use crate::result::{RunSummary, WorkerReport};
use std::path::PathBuf;

/// Trait for run reporters.
pub trait Reporter: Send + Sync {
    /// Called once the plan is chosen, before any kernel runs.
    fn run_start(&self, _mode: Mode, _plan: &Plan, _config: &LoadConfig) {}

    /// Called as each worker or serial unit finishes.
    fn worker_end(&self, _report: &WorkerReport) {}

    /// Called when the run completes, before the probe fires.
    fn run_end(&self, _summary: &RunSummary) {}
}

/// Console reporter that prints progress to stderr.
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    fn format_duration(d: std::time::Duration) -> String {
        if d.as_secs() > 0 {
            format!("{:.2}s", d.as_secs_f64())
        } else if d.as_millis() > 0 {
            format!("{:.2}ms", d.as_secs_f64() * 1000.0)
        } else {
            format!("{:.2}µs", d.as_secs_f64() * 1_000_000.0)
        }
    }

    fn format_plan(plan: &Plan) -> String {
        match plan {
            Plan::Inline(kernel) => format!("inline {kernel} kernel"),
            Plan::Serial { units } => format!("{units} serial cpu units"),
            Plan::Pool(slots) => format!(
                "pool of {} ({} cpu, {} io)",
                slots.len(),
                plan.cpu_workers(),
                plan.io_workers()
            ),
        }
    }

    fn format_report(report: &WorkerReport) -> String {
        let detail = match &report.error {
            Some(error) => format!("FAILED: {error}"),
            None if report.short_writes() > 0 => format!(
                "{} cycles, {} short writes",
                report.io_cycles(),
                report.short_writes()
            ),
            None => match report.kernel {
                KernelKind::Cpu => format!("{} iterations", report.cpu_iterations()),
                KernelKind::Io => format!("{} cycles", report.io_cycles()),
            },
        };
        format!("  slot {:>3} [{}] {}", report.slot, report.kernel, detail)
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn run_start(&self, mode: Mode, plan: &Plan, config: &LoadConfig) {
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("  Mode: {} ({})", mode, Self::format_plan(plan));
        eprintln!(
            "  Work unit: {}, I/O cycles: {}, pid: {}",
            config.work_unit,
            config.io_iterations,
            std::process::id()
        );
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    fn worker_end(&self, report: &WorkerReport) {
        eprintln!("{}", Self::format_report(report));
    }

    fn run_end(&self, summary: &RunSummary) {
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!(
            "  Completed {} workers in {} ({} failed, {} sink lines)",
            summary.reports.len(),
            Self::format_duration(summary.elapsed),
            summary.failures(),
            summary.sink_lines
        );
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
}

/// JSON reporter that writes the run summary to a file.
pub struct JsonReporter {
    path: PathBuf,
}

impl JsonReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Reporter for JsonReporter {
    fn run_end(&self, summary: &RunSummary) {
        if let Err(e) = write_json_summary(&self.path, summary) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write JSON summary");
        }
    }
}

fn write_json_summary(path: &PathBuf, summary: &RunSummary) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(summary).map_err(std::io::Error::other)?;
    std::fs::write(path, json)?;
    tracing::info!(path = %path.display(), "summary written");
    Ok(())
}

/// Combines multiple reporters.
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }

    /// The reporters a run's config asks for.
    pub fn for_config(config: &LoadConfig) -> Self {
        let mut reporters: Vec<Box<dyn Reporter>> = Vec::new();
        if config.verbose {
            reporters.push(Box::new(ConsoleReporter::new()));
        }
        if let Some(path) = &config.summary_path {
            reporters.push(Box::new(JsonReporter::new(path.clone())));
        }
        Self::new(reporters)
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Reporter for MultiReporter {
    fn run_start(&self, mode: Mode, plan: &Plan, config: &LoadConfig) {
        for r in &self.reporters {
            r.run_start(mode, plan, config);
        }
    }

    fn worker_end(&self, report: &WorkerReport) {
        for r in &self.reporters {
            r.worker_end(report);
        }
    }

    fn run_end(&self, summary: &RunSummary) {
        for r in &self.reporters {
            r.run_end(summary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{IoOutcome, KernelOutcome};
    use std::time::Duration;

    fn io_report(short_writes: usize) -> WorkerReport {
        WorkerReport {
            slot: 1,
            kernel: KernelKind::Io,
            outcome: Some(KernelOutcome::Io(IoOutcome {
                cycles: 100,
                short_writes,
                errors: 0,
            })),
            error: None,
        }
    }

    #[test]
    fn should_format_duration_in_appropriate_units() {
        assert!(ConsoleReporter::format_duration(Duration::from_secs(2)).ends_with('s'));
        assert!(ConsoleReporter::format_duration(Duration::from_millis(500)).contains("ms"));
        assert!(ConsoleReporter::format_duration(Duration::from_micros(100)).contains("µs"));
    }

    #[test]
    fn should_describe_pool_split_when_mixed() {
        let plan = Plan::for_mode(Mode::MixedThreaded, 4);
        assert_eq!(ConsoleReporter::format_plan(&plan), "pool of 4 (2 cpu, 2 io)");
        assert_eq!(
            ConsoleReporter::format_plan(&Plan::for_mode(Mode::Cpu, 4)),
            "inline cpu kernel"
        );
    }

    #[test]
    fn should_mention_short_writes_when_any() {
        assert_eq!(ConsoleReporter::format_report(&io_report(0)), "  slot   1 [io] 100 cycles");
        assert_eq!(
            ConsoleReporter::format_report(&io_report(3)),
            "  slot   1 [io] 100 cycles, 3 short writes"
        );
    }

    #[test]
    fn should_write_summary_when_run_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("summary.json");
        let summary = RunSummary {
            mode: Mode::Io,
            workers: 1,
            reports: vec![io_report(0)],
            sink_lines: 0,
            elapsed: Duration::from_millis(3),
            started_at: "1".to_string(),
        };

        JsonReporter::new(&path).run_end(&summary);

        let loaded = RunSummary::load(&path).unwrap();
        assert_eq!(loaded.mode, Mode::Io);
        assert_eq!(loaded.total_io_cycles(), 100);
    }

    #[test]
    fn should_pick_reporters_from_config() {
        assert!(MultiReporter::for_config(&LoadConfig::new()).is_empty());
        let cfg = LoadConfig::new().verbose(true).summary_path("out.json");
        assert_eq!(MultiReporter::for_config(&cfg).len(), 2);
    }
}
