//! Fixed-size pool of OS threads, one per worker slot.

use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};

use crate::context::RunContext;
use crate::kernel::{self, KernelOutcome};
use crate::mode::WorkerSlot;
use crate::result::WorkerReport;

/// Workers spawned for one plan, awaiting [`WorkerPool::join_all`].
pub struct WorkerPool {
    workers: Vec<(WorkerSlot, JoinHandle<Result<KernelOutcome>>)>,
}

impl WorkerPool {
    /// Spawn one worker per slot. Every worker runs `body` with its slot and
    /// the shared context.
    ///
    /// Fails on the first worker that cannot be created; workers already
    /// started are left running, the caller is expected to abort the process.
    pub fn spawn_with<W, F>(
        slots: &[WorkerSlot],
        ctx: &Arc<RunContext<W>>,
        body: F,
    ) -> Result<Self>
    where
        W: Send + 'static,
        F: Fn(WorkerSlot, &RunContext<W>) -> Result<KernelOutcome>
            + Send
            + Sync
            + Clone
            + 'static,
    {
        let mut workers = Vec::with_capacity(slots.len());
        for &slot in slots {
            let ctx = Arc::clone(ctx);
            let body = body.clone();
            let handle = thread::Builder::new()
                .name(format!("schedload-{}", slot.index))
                .spawn(move || {
                    tracing::debug!(slot = slot.index, kernel = %slot.kernel, "worker started");
                    body(slot, &ctx)
                })
                .with_context(|| format!("failed to spawn worker {}", slot.index))?;
            workers.push((slot, handle));
        }
        Ok(Self { workers })
    }

    /// Spawn one worker per slot running the slot's kernel.
    pub fn spawn<W>(slots: &[WorkerSlot], ctx: &Arc<RunContext<W>>) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        Self::spawn_with(slots, ctx, kernel::run_slot::<W>)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Block until every worker has returned, in slot order.
    ///
    /// A kernel error or a panic becomes a failed report; it does not stop
    /// the remaining joins.
    pub fn join_all(self) -> Vec<WorkerReport> {
        self.workers
            .into_iter()
            .map(|(slot, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow!("worker panicked")));
                let report = WorkerReport::from_result(slot, result);
                match &report.error {
                    Some(error) => tracing::error!(
                        slot = slot.index,
                        kernel = %slot.kernel,
                        %error,
                        "worker failed"
                    ),
                    None => {
                        tracing::debug!(slot = slot.index, kernel = %slot.kernel, "worker finished")
                    }
                }
                report
            })
            .collect()
    }
}
