//! Scheduler statistics capture.
//!
//! The probe streams three per-process procfs files to an output, verbatim
//! and in a fixed order, separated by [`SEPARATOR`]:
//!
//! 1. `/proc/<pid>/schedstat`: time on CPU, time waiting on a runqueue,
//!    timeslices run.
//! 2. `/proc/<pid>/stat`: the process status line.
//! 3. `/proc/<pid>/sched`: per-entity scheduler detail.
//!
//! It runs at most once per process. Whichever trigger gets there first
//! (the signal thread or the end of the run) owns it, and the process exits
//! as soon as it is done: 0 if all three sources were streamed, 1 if any
//! could not be opened or read. Nothing is written for sources after a
//! failing one.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};

use anyhow::{ensure, Context, Result};

/// Line written between sources.
pub const SEPARATOR: &str = "::::::::::\n";

/// Where the probe is in its one-shot lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProbeState {
    Idle = 0,
    Capturing = 1,
    Emitting = 2,
    Terminated = 3,
}

impl ProbeState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ProbeState::Idle,
            1 => ProbeState::Capturing,
            2 => ProbeState::Emitting,
            _ => ProbeState::Terminated,
        }
    }
}

/// One statistics file read by the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSource {
    pub label: &'static str,
    pub path: PathBuf,
}

/// Captures the scheduler's accounting for a process.
#[derive(Debug)]
pub struct SchedulerProbe {
    sources: [ProbeSource; 3],
    state: AtomicU8,
}

impl SchedulerProbe {
    /// Probe the procfs entries of `pid`.
    pub fn for_process(pid: u32) -> Self {
        let proc_dir = PathBuf::from(format!("/proc/{pid}"));
        Self::with_sources([
            proc_dir.join("schedstat"),
            proc_dir.join("stat"),
            proc_dir.join("sched"),
        ])
    }

    pub fn for_current_process() -> Self {
        Self::for_process(std::process::id())
    }

    /// Probe arbitrary files, in the order schedstat, stat, sched.
    pub fn with_sources(paths: [PathBuf; 3]) -> Self {
        let [schedstat, stat, sched] = paths;
        Self {
            sources: [
                ProbeSource {
                    label: "schedstat",
                    path: schedstat,
                },
                ProbeSource {
                    label: "stat",
                    path: stat,
                },
                ProbeSource {
                    label: "sched",
                    path: sched,
                },
            ],
            state: AtomicU8::new(ProbeState::Idle as u8),
        }
    }

    pub fn sources(&self) -> &[ProbeSource] {
        &self.sources
    }

    /// Sources that do not exist right now. Non-empty on platforms without
    /// procfs or on kernels built without scheduler statistics; a probe in
    /// that state will exit 1 without output when it fires.
    pub fn missing_sources(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .map(|s| s.path.as_path())
            .filter(|p| !p.exists())
            .collect()
    }

    pub fn state(&self) -> ProbeState {
        ProbeState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Claim the probe: Idle → Capturing. Only the first caller gets `true`.
    pub fn trigger(&self) -> bool {
        self.state
            .compare_exchange(
                ProbeState::Idle as u8,
                ProbeState::Capturing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Claim the probe and stream every source into `out`.
    ///
    /// Fails without writing anything if the probe was already claimed.
    pub fn capture<O: Write>(&self, out: &mut O) -> Result<()> {
        ensure!(self.trigger(), "scheduler probe already triggered");
        self.emit(out)
    }

    fn emit<O: Write>(&self, out: &mut O) -> Result<()> {
        let result = self.stream_all(out);
        self.set_state(ProbeState::Terminated);
        result
    }

    fn stream_all<O: Write>(&self, out: &mut O) -> Result<()> {
        for (i, source) in self.sources.iter().enumerate() {
            let mut file = File::open(&source.path).with_context(|| {
                format!("failed to open {} source {}", source.label, source.path.display())
            })?;
            if i == 0 {
                self.set_state(ProbeState::Emitting);
            } else {
                out.write_all(SEPARATOR.as_bytes())
                    .context("failed to write separator")?;
            }
            io::copy(&mut file, out).with_context(|| {
                format!("failed to stream {} source {}", source.label, source.path.display())
            })?;
        }
        out.flush().context("failed to flush probe output")
    }

    fn set_state(&self, state: ProbeState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Claim the probe, stream to stdout and exit the process.
    ///
    /// A caller that loses the race to claim the probe parks until the
    /// winner exits the process.
    pub fn fire(&self) -> ! {
        if !self.trigger() {
            loop {
                std::thread::park();
            }
        }

        let stdout = io::stdout();
        let result = self.emit(&mut stdout.lock());
        if let Err(err) = &result {
            tracing::error!(error = %format!("{err:#}"), "scheduler probe failed");
        }
        std::process::exit(exit_code(&result))
    }
}

/// Exit status for a finished capture.
pub fn exit_code(result: &Result<()>) -> i32 {
    if result.is_ok() {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Sources {
        _dir: tempfile::TempDir,
        paths: [PathBuf; 3],
    }

    fn sources(contents: [Option<&str>; 3]) -> Sources {
        let dir = tempfile::tempdir().unwrap();
        let paths = ["schedstat", "stat", "sched"].map(|name| dir.path().join(name));
        for (path, content) in paths.iter().zip(contents) {
            if let Some(content) = content {
                fs::write(path, content).unwrap();
            }
        }
        Sources { _dir: dir, paths }
    }

    #[test]
    fn should_emit_sources_in_order_with_separators_when_all_readable() {
        let s = sources([
            Some("123 456 7\n"),
            Some("42 (schedload) R 1\n"),
            Some("schedload (42, #threads: 1)\nse.nr_migrations : 0\n"),
        ]);
        let probe = SchedulerProbe::with_sources(s.paths.clone());

        let mut out = Vec::new();
        let result = probe.capture(&mut out);
        assert!(result.is_ok());
        assert_eq!(exit_code(&result), 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "123 456 7\n\
             ::::::::::\n\
             42 (schedload) R 1\n\
             ::::::::::\n\
             schedload (42, #threads: 1)\nse.nr_migrations : 0\n"
        );
        assert_eq!(probe.state(), ProbeState::Terminated);
    }

    #[test]
    fn should_emit_nothing_when_first_source_missing() {
        let s = sources([None, Some("stat\n"), Some("sched\n")]);
        let probe = SchedulerProbe::with_sources(s.paths.clone());

        let mut out = Vec::new();
        let result = probe.capture(&mut out);
        assert!(result.is_err());
        assert_eq!(exit_code(&result), 1);
        assert!(out.is_empty());
        assert_eq!(probe.state(), ProbeState::Terminated);
    }

    #[test]
    fn should_stop_before_later_sources_when_middle_source_missing() {
        let s = sources([Some("a\n"), None, Some("c\n")]);
        let probe = SchedulerProbe::with_sources(s.paths.clone());

        let mut out = Vec::new();
        let err = probe.capture(&mut out).unwrap_err();
        assert!(format!("{err:#}").contains("stat source"));
        assert_eq!(out, b"a\n");
    }

    #[test]
    fn should_run_only_once_when_triggered_twice() {
        let s = sources([Some("a\n"), Some("b\n"), Some("c\n")]);
        let probe = SchedulerProbe::with_sources(s.paths.clone());

        let mut first = Vec::new();
        probe.capture(&mut first).unwrap();

        let mut second = Vec::new();
        assert!(probe.capture(&mut second).is_err());
        assert!(second.is_empty());
    }

    #[test]
    fn should_move_from_idle_to_capturing_when_claimed() {
        let probe = SchedulerProbe::with_sources(sources([None, None, None]).paths);
        assert_eq!(probe.state(), ProbeState::Idle);
        assert!(probe.trigger());
        assert_eq!(probe.state(), ProbeState::Capturing);
        assert!(!probe.trigger());
    }

    #[test]
    fn should_list_missing_sources_when_absent() {
        let s = sources([Some("a\n"), None, Some("c\n")]);
        let probe = SchedulerProbe::with_sources(s.paths.clone());
        assert_eq!(probe.missing_sources(), vec![s.paths[1].as_path()]);
    }

    #[test]
    fn should_point_at_procfs_when_built_for_pid() {
        let probe = SchedulerProbe::for_process(42);
        let paths: Vec<_> = probe.sources().iter().map(|s| s.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/proc/42/schedstat"),
                PathBuf::from("/proc/42/stat"),
                PathBuf::from("/proc/42/sched"),
            ]
        );
    }
}
