//! Workload kernels and the glue that runs one for a worker slot.

pub mod cpu;
pub mod io;

use std::io::Write;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::context::RunContext;
use crate::mode::{KernelKind, WorkerSlot};
use crate::sink::SinkRecord;

pub use cpu::CpuOutcome;
pub use io::{IoOutcome, IoPattern};

/// Result of one kernel invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kernel", rename_all = "lowercase")]
pub enum KernelOutcome {
    Cpu(CpuOutcome),
    Io(IoOutcome),
}

/// Run the kernel assigned to `slot`.
///
/// CPU slots spin until cancelled unless the run makes pooled workers
/// bounded, in which case they run one work unit and record it in the sink.
pub fn run_slot<W: Write>(slot: WorkerSlot, ctx: &RunContext<W>) -> Result<KernelOutcome> {
    match slot.kernel {
        KernelKind::Cpu if ctx.config.bounded_workers => {
            bounded_cpu(slot.index, ctx).map(KernelOutcome::Cpu)
        }
        KernelKind::Cpu => Ok(KernelOutcome::Cpu(cpu::spin_until_cancelled(&ctx.cancel))),
        KernelKind::Io => {
            io::churn_scratch(&IoPattern::from_config(&ctx.config)).map(KernelOutcome::Io)
        }
    }
}

/// One bounded CPU work unit, recorded in the sink under `slot`.
pub fn bounded_cpu<W: Write>(slot: usize, ctx: &RunContext<W>) -> Result<CpuOutcome> {
    let outcome = cpu::spin_bounded(ctx.config.work_unit);
    ctx.sink
        .append(SinkRecord {
            slot,
            iterations: outcome.iterations,
            value: outcome.value,
        })
        .with_context(|| format!("slot {slot} failed to append to sink"))?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadConfig;
    use crate::context::CancelToken;
    use crate::sink::SharedSink;

    fn ctx(config: LoadConfig) -> RunContext<std::io::Cursor<Vec<u8>>> {
        RunContext::new(config, SharedSink::in_memory(), CancelToken::new())
    }

    #[test]
    fn should_record_in_sink_when_cpu_slot_is_bounded() {
        let ctx = ctx(LoadConfig::new().bounded_workers(true).work_unit(1000));
        let slot = WorkerSlot {
            index: 4,
            kernel: KernelKind::Cpu,
        };

        let outcome = run_slot(slot, &ctx).unwrap();
        match outcome {
            KernelOutcome::Cpu(cpu) => assert_eq!(cpu.iterations, 1000),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(ctx.sink().lines(), 1);
        let text = String::from_utf8(ctx.sink().contents()).unwrap();
        assert!(text.starts_with("slot=4 iterations=1000 "));
    }

    #[test]
    fn should_stop_when_unbounded_cpu_slot_is_cancelled() {
        let ctx = ctx(LoadConfig::new());
        ctx.cancel_token().cancel();
        let slot = WorkerSlot {
            index: 0,
            kernel: KernelKind::Cpu,
        };

        assert_eq!(
            run_slot(slot, &ctx).unwrap(),
            KernelOutcome::Cpu(CpuOutcome::default())
        );
        assert_eq!(ctx.sink().lines(), 0);
    }

    #[test]
    fn should_churn_without_touching_sink_when_io_slot() {
        let ctx = ctx(LoadConfig::new().io_iterations(5).io_forward_seek(64));
        let slot = WorkerSlot {
            index: 1,
            kernel: KernelKind::Io,
        };

        match run_slot(slot, &ctx).unwrap() {
            KernelOutcome::Io(io) => assert_eq!(io.cycles, 5),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(ctx.sink().lines(), 0);
    }
}
