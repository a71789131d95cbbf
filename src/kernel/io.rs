//! I/O-bound kernel: small writes to a private scratch file, each flushed and
//! followed by a short backward and a long forward seek so that every write
//! lands somewhere read-ahead and the page cache did not predict.

use std::io::{Seek, SeekFrom, Write};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::LoadConfig;

/// Shape of one I/O kernel invocation.
#[derive(Debug, Clone, Copy)]
pub struct IoPattern<'a> {
    pub iterations: usize,
    pub payload: &'a [u8],
    pub back_seek: i64,
    pub forward_seek: i64,
}

impl<'a> IoPattern<'a> {
    pub fn from_config(config: &'a LoadConfig) -> Self {
        Self {
            iterations: config.io_iterations,
            payload: &config.io_payload,
            back_seek: config.io_back_seek,
            forward_seek: config.io_forward_seek,
        }
    }
}

/// Tally of one I/O kernel invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoOutcome {
    /// Completed write+flush+seek cycles.
    pub cycles: usize,
    /// Writes that accepted fewer bytes than offered.
    pub short_writes: usize,
    /// Failed write, flush or seek calls.
    pub errors: usize,
}

/// Run the pattern against `file`. Nothing here aborts the loop: short
/// writes and failed calls are logged and counted.
pub fn churn<F: Write + Seek>(file: &mut F, pattern: &IoPattern<'_>) -> IoOutcome {
    let mut outcome = IoOutcome::default();

    for cycle in 0..pattern.iterations {
        match file.write(pattern.payload) {
            Ok(n) if n < pattern.payload.len() => {
                tracing::warn!(
                    cycle,
                    written = n,
                    wanted = pattern.payload.len(),
                    "short write"
                );
                outcome.short_writes += 1;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(cycle, error = %err, "write failed");
                outcome.errors += 1;
            }
        }
        if let Err(err) = file.flush() {
            tracing::warn!(cycle, error = %err, "flush failed");
            outcome.errors += 1;
        }
        if let Err(err) = file.seek(SeekFrom::Current(-pattern.back_seek)) {
            tracing::warn!(cycle, error = %err, "backward seek failed");
            outcome.errors += 1;
        }
        if let Err(err) = file.seek(SeekFrom::Current(pattern.forward_seek)) {
            tracing::warn!(cycle, error = %err, "forward seek failed");
            outcome.errors += 1;
        }
        outcome.cycles += 1;
    }

    outcome
}

/// Run the pattern against a fresh anonymous scratch file, which is gone
/// once this returns.
pub fn churn_scratch(pattern: &IoPattern<'_>) -> Result<IoOutcome> {
    let mut file = tempfile::tempfile().context("failed to create I/O scratch file")?;
    Ok(churn(&mut file, pattern))
}
