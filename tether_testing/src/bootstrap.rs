//! Counting bootstrap with scripted failures.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tether::bootstrap::{Bootstrap, BootstrapError};
use tokio::sync::Semaphore;

#[derive(Default)]
struct Counters {
    calls: AtomicUsize,
    failures_left: AtomicUsize,
}

/// [`Bootstrap`] resolving a fixed endpoint.
///
/// Clones share their counters, so a test can keep one clone for assertions
/// while the client owns another.
#[derive(Clone)]
pub struct ScriptedBootstrap {
    endpoint: String,
    always_fail: bool,
    counters: Arc<Counters>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedBootstrap {
    /// Resolve `endpoint` on every call.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            always_fail: false,
            counters: Arc::default(),
            gate: None,
        }
    }

    /// Fail every call.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::new(String::new())
        }
    }

    /// Fail the first `count` calls, then resolve normally.
    #[must_use]
    pub fn failing_first(self, count: usize) -> Self {
        self.counters.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Hold every call until [`release`](Self::release) lets it through.
    #[must_use]
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `count` held calls complete. No effect unless [`gated`](Self::gated).
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    /// Number of `resolve` calls so far, including held ones.
    #[must_use]
    pub fn calls(&self) -> usize { self.counters.calls.load(Ordering::SeqCst) }
}

#[async_trait]
impl Bootstrap for ScriptedBootstrap {
    async fn resolve(&self) -> Result<String, BootstrapError> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| BootstrapError::msg("bootstrap gate closed"))?
                .forget();
        }
        let scripted_failure = self
            .counters
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if self.always_fail || scripted_failure {
            return Err(BootstrapError::msg("scripted bootstrap failure"));
        }
        Ok(self.endpoint.clone())
    }
}
