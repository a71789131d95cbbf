//! Shared state handed to every worker.

use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::LoadConfig;
use crate::sink::SharedSink;

/// Cooperative cancellation flag polled by unbounded kernels.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Context shared by reference among the workers of one run.
///
/// Owns the sink for the lifetime of the run; workers only ever borrow it.
pub struct RunContext<W = File> {
    pub(crate) config: LoadConfig,
    pub(crate) sink: SharedSink<W>,
    pub(crate) cancel: CancelToken,
}

impl<W> RunContext<W> {
    pub fn new(config: LoadConfig, sink: SharedSink<W>, cancel: CancelToken) -> Self {
        Self {
            config,
            sink,
            cancel,
        }
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn sink(&self) -> &SharedSink<W> {
        &self.sink
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_share_cancellation_when_cloned() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn should_expose_config_when_built() {
        let ctx = RunContext::new(
            LoadConfig::new().work_unit(9),
            SharedSink::in_memory(),
            CancelToken::new(),
        );
        assert_eq!(ctx.config().work_unit, 9);
        assert!(!ctx.cancel_token().is_cancelled());
        assert_eq!(ctx.sink().lines(), 0);
    }
}
