//! Run result types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::kernel::KernelOutcome;
use crate::mode::{KernelKind, Mode, WorkerSlot};

/// What one worker (or one serial unit) did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    /// Slot index (serial unit index for serial runs)
    pub slot: usize,
    /// Kernel the slot ran
    pub kernel: KernelKind,
    /// Kernel tally, absent if the kernel failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<KernelOutcome>,
    /// Why the kernel failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerReport {
    /// Report for `slot` from its kernel's result.
    pub fn from_result(slot: WorkerSlot, result: anyhow::Result<KernelOutcome>) -> Self {
        let (outcome, error) = match result {
            Ok(outcome) => (Some(outcome), None),
            Err(err) => (None, Some(format!("{err:#}"))),
        };
        Self {
            slot: slot.index,
            kernel: slot.kernel,
            outcome,
            error,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn cpu_iterations(&self) -> u64 {
        match self.outcome {
            Some(KernelOutcome::Cpu(cpu)) => cpu.iterations,
            _ => 0,
        }
    }

    pub fn io_cycles(&self) -> usize {
        match self.outcome {
            Some(KernelOutcome::Io(io)) => io.cycles,
            _ => 0,
        }
    }

    pub fn short_writes(&self) -> usize {
        match self.outcome {
            Some(KernelOutcome::Io(io)) => io.short_writes,
            _ => 0,
        }
    }
}

/// Summary of a run that reached completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Mode the run was started with
    pub mode: Mode,
    /// Pool size N for this run
    pub workers: usize,
    /// Per-slot reports, in slot order
    pub reports: Vec<WorkerReport>,
    /// Lines appended to the sink
    pub sink_lines: usize,
    /// Wall time from dispatch to the last join
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    /// Milliseconds since the epoch when dispatch began
    pub started_at: String,
}

impl RunSummary {
    pub fn total_cpu_iterations(&self) -> u64 {
        self.reports.iter().map(WorkerReport::cpu_iterations).sum()
    }

    pub fn total_io_cycles(&self) -> usize {
        self.reports.iter().map(WorkerReport::io_cycles).sum()
    }

    pub fn total_short_writes(&self) -> usize {
        self.reports.iter().map(WorkerReport::short_writes).sum()
    }

    pub fn failures(&self) -> usize {
        self.reports.iter().filter(|r| !r.succeeded()).count()
    }

    /// Load a summary from a JSON file.
    pub fn load(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

pub(crate) fn epoch_millis() -> String {
    let since = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", since.as_millis())
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_nanos().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let nanos = u128::deserialize(d)?;
        Ok(Duration::from_nanos(nanos as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{CpuOutcome, IoOutcome};

    fn summary() -> RunSummary {
        RunSummary {
            mode: Mode::MixedThreaded,
            workers: 3,
            reports: vec![
                WorkerReport {
                    slot: 0,
                    kernel: KernelKind::Cpu,
                    outcome: Some(KernelOutcome::Cpu(CpuOutcome {
                        iterations: 500,
                        value: 3.0,
                    })),
                    error: None,
                },
                WorkerReport {
                    slot: 1,
                    kernel: KernelKind::Io,
                    outcome: Some(KernelOutcome::Io(IoOutcome {
                        cycles: 100,
                        short_writes: 2,
                        errors: 0,
                    })),
                    error: None,
                },
                WorkerReport {
                    slot: 2,
                    kernel: KernelKind::Cpu,
                    outcome: None,
                    error: Some("worker panicked".to_string()),
                },
            ],
            sink_lines: 1,
            elapsed: Duration::from_millis(1500),
            started_at: "0".to_string(),
        }
    }

    #[test]
    fn should_total_work_when_reports_mixed() {
        let s = summary();
        assert_eq!(s.total_cpu_iterations(), 500);
        assert_eq!(s.total_io_cycles(), 100);
        assert_eq!(s.total_short_writes(), 2);
        assert_eq!(s.failures(), 1);
    }

    #[test]
    fn should_serialize_mode_and_elapsed_when_written_as_json() {
        let json = serde_json::to_value(summary()).unwrap();
        assert_eq!(json["mode"], "mixed-threaded");
        assert_eq!(json["elapsed"], 1_500_000_000u64);
        assert_eq!(json["reports"][0]["outcome"]["kernel"], "cpu");
        assert_eq!(json["reports"][1]["outcome"]["short_writes"], 2);
        assert!(json["reports"][0].get("error").is_none());
        assert_eq!(json["reports"][2]["error"], "worker panicked");
    }

    #[test]
    fn should_load_summary_when_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        std::fs::write(&path, serde_json::to_string_pretty(&summary()).unwrap()).unwrap();

        let loaded = RunSummary::load(&path).unwrap();
        assert_eq!(loaded.mode, Mode::MixedThreaded);
        assert_eq!(loaded.reports, summary().reports);
        assert_eq!(loaded.elapsed, Duration::from_millis(1500));
    }
}
