//! Run modes and the worker-assignment plans they select.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level selection for a run. Parsed once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Cpu,
    Io,
    CpuThreaded,
    IoThreaded,
    MixedThreaded,
    Serial,
    Default,
}

impl Mode {
    /// Every mode, in CLI listing order.
    pub const ALL: [Mode; 7] = [
        Mode::Cpu,
        Mode::Io,
        Mode::CpuThreaded,
        Mode::IoThreaded,
        Mode::MixedThreaded,
        Mode::Serial,
        Mode::Default,
    ];

    /// Map a mode token to a mode. Tokens match exactly; anything
    /// unrecognized selects [`Mode::Default`].
    pub fn parse(token: &str) -> Mode {
        match token {
            "cpu" => Mode::Cpu,
            "io" => Mode::Io,
            "cpu-threaded" => Mode::CpuThreaded,
            "io-threaded" => Mode::IoThreaded,
            "mixed-threaded" => Mode::MixedThreaded,
            "serial" => Mode::Serial,
            _ => Mode::Default,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Cpu => "cpu",
            Mode::Io => "io",
            Mode::CpuThreaded => "cpu-threaded",
            Mode::IoThreaded => "io-threaded",
            Mode::MixedThreaded => "mixed-threaded",
            Mode::Serial => "serial",
            Mode::Default => "default",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which workload kernel a worker runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    Cpu,
    Io,
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelKind::Cpu => f.write_str("cpu"),
            KernelKind::Io => f.write_str("io"),
        }
    }
}

/// One pool position and the kernel assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSlot {
    pub index: usize,
    pub kernel: KernelKind,
}

/// How a run is carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// The current thread runs one kernel; no pool.
    Inline(KernelKind),
    /// The current thread runs `units` bounded CPU invocations back to back.
    Serial { units: usize },
    /// A full pool, one worker per slot.
    Pool(Vec<WorkerSlot>),
}

impl Plan {
    /// Build the plan for `mode` over a pool of `workers` slots.
    pub fn for_mode(mode: Mode, workers: usize) -> Plan {
        match mode {
            Mode::Cpu => Plan::Inline(KernelKind::Cpu),
            Mode::Io => Plan::Inline(KernelKind::Io),
            Mode::Serial => Plan::Serial { units: workers },
            Mode::CpuThreaded => Plan::uniform(KernelKind::Cpu, workers),
            Mode::IoThreaded | Mode::Default => Plan::uniform(KernelKind::Io, workers),
            Mode::MixedThreaded => Plan::Pool(
                (0..workers)
                    .map(|index| WorkerSlot {
                        index,
                        kernel: if index % 2 == 0 {
                            KernelKind::Cpu
                        } else {
                            KernelKind::Io
                        },
                    })
                    .collect(),
            ),
        }
    }

    fn uniform(kernel: KernelKind, workers: usize) -> Plan {
        Plan::Pool(
            (0..workers)
                .map(|index| WorkerSlot { index, kernel })
                .collect(),
        )
    }

    /// Pool slots; empty for non-pooled plans.
    pub fn slots(&self) -> &[WorkerSlot] {
        match self {
            Plan::Pool(slots) => slots,
            _ => &[],
        }
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self, Plan::Pool(_))
    }

    /// Pool workers running the CPU kernel.
    pub fn cpu_workers(&self) -> usize {
        self.count(KernelKind::Cpu)
    }

    /// Pool workers running the I/O kernel.
    pub fn io_workers(&self) -> usize {
        self.count(KernelKind::Io)
    }

    fn count(&self, kernel: KernelKind) -> usize {
        self.slots().iter().filter(|s| s.kernel == kernel).count()
    }
}
