//! # schedload
//!
//! A synthetic load generator for exercising the OS thread scheduler with
//! CPU-bound, I/O-bound or mixed workloads, and capturing the scheduler's
//! own accounting for the generating process.
//!
//! A run picks one [`Mode`], which maps to a [`Plan`]: a kernel on the
//! current thread, a serial sequence of bounded CPU units, or a pool of one
//! worker per logical CPU. When the run completes, or earlier when the
//! process receives `SIGQUIT`, the [`SchedulerProbe`] streams the process's
//! `schedstat`, `stat` and `sched` procfs entries to stdout and exits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use schedload::{CancelToken, Dispatcher, LoadConfig, Mode, SchedulerProbe, SharedSink, Trigger};
//!
//! let probe = Arc::new(SchedulerProbe::for_current_process());
//! let cancel = CancelToken::new();
//! let _trigger = Trigger::install(Arc::clone(&probe), cancel.clone()).unwrap();
//!
//! let dispatcher = Dispatcher::new(LoadConfig::from_env());
//! let sink = SharedSink::open(None).unwrap();
//! dispatcher
//!     .run(Mode::MixedThreaded, sink, cancel, &mut std::io::stdout())
//!     .unwrap();
//!
//! probe.fire();
//! ```

mod config;
mod context;
mod dispatch;
pub mod kernel;
mod mode;
mod pool;
pub mod probe;
mod report;
mod result;
mod sink;
mod trigger;

pub use config::LoadConfig;
pub use context::{CancelToken, RunContext};
pub use dispatch::Dispatcher;
pub use kernel::{CpuOutcome, IoOutcome, IoPattern, KernelOutcome};
pub use mode::{KernelKind, Mode, Plan, WorkerSlot};
pub use pool::WorkerPool;
pub use probe::{ProbeState, SchedulerProbe, SEPARATOR};
pub use report::{ConsoleReporter, JsonReporter, MultiReporter, Reporter};
pub use result::{RunSummary, WorkerReport};
pub use sink::{SharedSink, SinkRecord};
pub use trigger::Trigger;
