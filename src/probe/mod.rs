//! Probe capability and general-purpose probe adapters.
//!
//! A probe reads exactly one environment signal. Probes never depend on each
//! other and never touch shared mutable state, which is what lets the
//! generator run them side by side.

pub mod host;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ProbeError;

#[async_trait]
pub trait Probe: Send + Sync {
    /// Unique name within one probe list
    fn name(&self) -> &str;

    /// Upper bound on `run`. `None` falls back to the generator default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Read the signal and return its canonical string form.
    ///
    /// Anything the probe allocates must be owned by this future so that it
    /// is released when the future is dropped on timeout.
    async fn run(&self) -> Result<String, ProbeError>;
}

/// Probe with a value decided up front.
///
/// Lets the host hand in signals it measured itself, e.g. display geometry
/// reported by a UI layer.
pub struct FixedProbe {
    name: String,
    value: Result<String, ProbeError>,
}

impl FixedProbe {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Ok(value.into()),
        }
    }

    pub fn failing(name: impl Into<String>, error: ProbeError) -> Self {
        Self {
            name: name.into(),
            value: Err(error),
        }
    }
}

#[async_trait]
impl Probe for FixedProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<String, ProbeError> {
        self.value.clone()
    }
}

/// Probe backed by a synchronous closure.
///
/// The closure runs on the blocking pool so a slow read cannot stall the
/// executor and the generator's timeout still fires.
pub struct FnProbe<F> {
    name: String,
    timeout: Option<Duration>,
    read: Arc<F>,
}

impl<F> FnProbe<F>
where
    F: Fn() -> Result<String, ProbeError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, read: F) -> Self {
        Self {
            name: name.into(),
            timeout: None,
            read: Arc::new(read),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl<F> Probe for FnProbe<F>
where
    F: Fn() -> Result<String, ProbeError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn run(&self) -> Result<String, ProbeError> {
        let read = self.read.clone();
        tokio::task::spawn_blocking(move || (*read)())
            .await
            .map_err(|e| ProbeError::Faulted(format!("read task panicked: {}", e)))?
    }
}

/// Wraps another probe and holds its result back for `delay`.
pub struct DelayedProbe {
    inner: Arc<dyn Probe>,
    delay: Duration,
    timeout: Option<Duration>,
}

impl DelayedProbe {
    pub fn new(inner: Arc<dyn Probe>, delay: Duration) -> Self {
        let timeout = inner.timeout();
        Self {
            inner,
            delay,
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Probe for DelayedProbe {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn run(&self) -> Result<String, ProbeError> {
        tokio::time::sleep(self.delay).await;
        self.inner.run().await
    }
}
