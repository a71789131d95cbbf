//! Configuration for a load run.

use std::path::PathBuf;
use std::time::Duration;

/// Payload written by every I/O kernel cycle.
pub const DEFAULT_IO_PAYLOAD: &[u8] = b"deadbeef";

/// Forward seek after each I/O cycle: five 4 MiB strides.
pub const DEFAULT_IO_FORWARD_SEEK: i64 = 4096 * 1024 * 5;

/// Configuration for a load run.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Pool size. `None` uses the detected logical CPU count.
    pub workers: Option<usize>,
    /// Iterations of one bounded CPU kernel invocation.
    pub work_unit: u64,
    /// Pooled CPU workers run the bounded variant and then return.
    pub bounded_workers: bool,
    /// Write/flush/seek cycles per I/O kernel invocation.
    pub io_iterations: usize,
    /// Bytes written per I/O cycle.
    pub io_payload: Vec<u8>,
    /// Backward seek after each flush.
    pub io_back_seek: i64,
    /// Forward seek after the backward one.
    pub io_forward_seek: i64,
    /// Sink file. `None` uses an anonymous scratch file.
    pub sink_path: Option<PathBuf>,
    /// Copy the sink to stdout once every worker has joined.
    pub dump_sink: bool,
    /// Fire the probe on our own after this long.
    pub duration: Option<Duration>,
    /// Write a JSON run summary here on completion.
    pub summary_path: Option<PathBuf>,
    /// Print progress to stderr.
    pub verbose: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            workers: None,
            work_unit: 10_000_000,
            bounded_workers: false,
            io_iterations: 100,
            io_payload: DEFAULT_IO_PAYLOAD.to_vec(),
            io_back_seek: 3,
            io_forward_seek: DEFAULT_IO_FORWARD_SEEK,
            sink_path: None,
            dump_sink: false,
            duration: None,
            summary_path: None,
            verbose: false,
        }
    }
}

impl LoadConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from environment variables.
    ///
    /// Supported variables:
    /// - `SCHEDLOAD_WORKERS`: pool size override
    /// - `SCHEDLOAD_WORK_UNIT`: bounded CPU kernel iterations (default: 10000000)
    /// - `SCHEDLOAD_BOUNDED`: pooled CPU workers are bounded (default: false)
    /// - `SCHEDLOAD_IO_ITERATIONS`: I/O kernel cycles (default: 100)
    /// - `SCHEDLOAD_IO_SEEK`: forward seek in bytes (default: 20 MiB)
    /// - `SCHEDLOAD_SINK`: sink file path
    /// - `SCHEDLOAD_DUMP_SINK`: dump the sink to stdout after join
    /// - `SCHEDLOAD_DURATION_SECS`: self-trigger deadline in seconds
    /// - `SCHEDLOAD_SUMMARY`: JSON summary path
    /// - `SCHEDLOAD_VERBOSE`: progress output (default: false)
    ///
    /// Values that do not parse are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(n) = lookup("SCHEDLOAD_WORKERS").and_then(|v| v.parse().ok()) {
            cfg.workers = Some(n);
        }
        if let Some(n) = lookup("SCHEDLOAD_WORK_UNIT").and_then(|v| v.parse().ok()) {
            cfg.work_unit = n;
        }
        if let Some(v) = lookup("SCHEDLOAD_BOUNDED") {
            cfg.bounded_workers = flag(&v);
        }
        if let Some(n) = lookup("SCHEDLOAD_IO_ITERATIONS").and_then(|v| v.parse().ok()) {
            cfg.io_iterations = n;
        }
        if let Some(n) = lookup("SCHEDLOAD_IO_SEEK").and_then(|v| v.parse().ok()) {
            cfg.io_forward_seek = n;
        }
        if let Some(v) = lookup("SCHEDLOAD_SINK") {
            cfg.sink_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("SCHEDLOAD_DUMP_SINK") {
            cfg.dump_sink = flag(&v);
        }
        if let Some(secs) = lookup("SCHEDLOAD_DURATION_SECS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.duration = Some(Duration::from_secs(secs));
        }
        if let Some(v) = lookup("SCHEDLOAD_SUMMARY") {
            cfg.summary_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("SCHEDLOAD_VERBOSE") {
            cfg.verbose = flag(&v);
        }

        cfg
    }

    /// Pool size for this run: the override if set, else the logical CPU
    /// count, never less than one.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Set the pool size.
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = Some(n);
        self
    }

    /// Set the bounded CPU kernel iteration count.
    pub fn work_unit(mut self, n: u64) -> Self {
        self.work_unit = n;
        self
    }

    /// Make pooled CPU workers bounded.
    pub fn bounded_workers(mut self, v: bool) -> Self {
        self.bounded_workers = v;
        self
    }

    /// Set the I/O kernel cycle count.
    pub fn io_iterations(mut self, n: usize) -> Self {
        self.io_iterations = n;
        self
    }

    /// Set the forward seek of each I/O cycle.
    pub fn io_forward_seek(mut self, bytes: i64) -> Self {
        self.io_forward_seek = bytes;
        self
    }

    /// Set the sink file path.
    pub fn sink_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sink_path = Some(path.into());
        self
    }

    /// Dump the sink to stdout after join.
    pub fn dump_sink(mut self, v: bool) -> Self {
        self.dump_sink = v;
        self
    }

    /// Set the self-trigger deadline.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the JSON summary path.
    pub fn summary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary_path = Some(path.into());
        self
    }

    /// Set verbose output.
    pub fn verbose(mut self, v: bool) -> Self {
        self.verbose = v;
        self
    }
}

fn flag(v: &str) -> bool {
    v != "0" && !v.eq_ignore_ascii_case("false")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn should_use_defaults_when_env_not_set() {
        let cfg = LoadConfig::from_lookup(|_| None);
        assert_eq!(cfg.workers, None);
        assert_eq!(cfg.io_iterations, 100);
        assert_eq!(cfg.io_payload, b"deadbeef");
        assert_eq!(cfg.io_back_seek, 3);
        assert_eq!(cfg.io_forward_seek, 20 * 1024 * 1024);
        assert!(!cfg.bounded_workers);
        assert!(!cfg.dump_sink);
    }

    #[test]
    fn should_read_values_when_env_set() {
        let env: HashMap<&str, &str> = [
            ("SCHEDLOAD_WORKERS", "3"),
            ("SCHEDLOAD_WORK_UNIT", "500"),
            ("SCHEDLOAD_BOUNDED", "1"),
            ("SCHEDLOAD_DURATION_SECS", "7"),
            ("SCHEDLOAD_DUMP_SINK", "false"),
        ]
        .into_iter()
        .collect();
        let cfg = LoadConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.workers, Some(3));
        assert_eq!(cfg.work_unit, 500);
        assert!(cfg.bounded_workers);
        assert_eq!(cfg.duration, Some(Duration::from_secs(7)));
        assert!(!cfg.dump_sink);
    }

    #[test]
    fn should_ignore_env_when_unparseable() {
        let cfg = LoadConfig::from_lookup(|k| {
            (k == "SCHEDLOAD_IO_ITERATIONS").then(|| "lots".to_string())
        });
        assert_eq!(cfg.io_iterations, 100);
    }

    #[test]
    fn should_clamp_worker_count_when_zero() {
        assert_eq!(LoadConfig::new().workers(0).worker_count(), 1);
        assert_eq!(LoadConfig::new().workers(6).worker_count(), 6);
        assert!(LoadConfig::new().worker_count() >= 1);
    }

    #[test]
    fn should_build_config_with_builder() {
        let cfg = LoadConfig::new()
            .work_unit(42)
            .io_iterations(5)
            .bounded_workers(true)
            .verbose(true);

        assert_eq!(cfg.work_unit, 42);
        assert_eq!(cfg.io_iterations, 5);
        assert!(cfg.bounded_workers);
        assert!(cfg.verbose);
    }
}
