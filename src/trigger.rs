//! External trigger: `SIGQUIT` sends the process down the probe path.
//!
//! The signal is never handled in signal context. It is blocked on the
//! thread that installs the trigger, every thread spawned afterwards
//! inherits that mask, and a dedicated thread picks it up with `sigwait`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::context::CancelToken;
use crate::probe::SchedulerProbe;

/// Handle to the installed trigger.
pub struct Trigger {
    _listener: Option<std::thread::JoinHandle<()>>,
}

impl Trigger {
    /// Install the trigger. Call before spawning any other thread, or those
    /// threads may take the signal with its default disposition.
    ///
    /// When the signal arrives the listener cancels `cancel` and fires
    /// `probe`, which exits the process.
    #[cfg(unix)]
    pub fn install(probe: Arc<SchedulerProbe>, cancel: CancelToken) -> Result<Self> {
        use anyhow::Context;
        use nix::sys::signal::{SigSet, Signal};

        let mut mask = SigSet::empty();
        mask.add(Signal::SIGQUIT);
        mask.thread_block().context("failed to block SIGQUIT")?;

        let listener = std::thread::Builder::new()
            .name("schedload-trigger".to_string())
            .spawn(move || match mask.wait() {
                Ok(signal) => {
                    tracing::info!(%signal, "trigger received");
                    cancel.cancel();
                    probe.fire()
                }
                Err(err) => tracing::error!(error = %err, "waiting for trigger failed"),
            })
            .context("failed to spawn trigger thread")?;

        Ok(Self {
            _listener: Some(listener),
        })
    }

    #[cfg(not(unix))]
    pub fn install(_probe: Arc<SchedulerProbe>, _cancel: CancelToken) -> Result<Self> {
        tracing::warn!("no external trigger on this platform; only run completion fires the probe");
        Ok(Self { _listener: None })
    }

    /// Send the trigger to ourselves after `after`, so a deadline takes the
    /// same path as an operator's signal.
    #[cfg(unix)]
    pub fn arm_deadline(&self, after: Duration) -> Result<()> {
        use anyhow::Context;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        std::thread::Builder::new()
            .name("schedload-deadline".to_string())
            .spawn(move || {
                std::thread::sleep(after);
                tracing::info!(after_secs = after.as_secs_f64(), "deadline reached");
                if let Err(err) = kill(Pid::this(), Signal::SIGQUIT) {
                    tracing::error!(error = %err, "failed to deliver deadline trigger");
                }
            })
            .context("failed to spawn deadline thread")?;
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn arm_deadline(&self, _after: Duration) -> Result<()> {
        anyhow::bail!("deadlines need the signal trigger, which this platform lacks")
    }
}
