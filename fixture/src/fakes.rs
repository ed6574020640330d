//! In-process stand-ins for the container runtime and pool library.

use crate::connection::ConnectionConfiguration;
use crate::pool::{PoolConnector, PoolHandle};
use crate::runtime::{ContainerRuntime, LaunchSpec, RunningInstance};
use async_trait::async_trait;
use errors::{StartupError, TeardownError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::time::Duration;

/// Counts launches and hands out a fresh port per launch. `threads` records
/// the thread each start and stop ran on.
pub struct FakeRuntime {
    pub starts: AtomicUsize,
    pub threads: Arc<Mutex<Vec<String>>>,
    pub stops: Arc<AtomicUsize>,
    pub fail_next_starts: AtomicUsize,
    pub fail_stop: Arc<AtomicBool>,
    pub start_delay: Duration,
    next_port: AtomicU16
}

impl FakeRuntime {
    pub const FIRST_PORT: u16 = 49152;

    pub fn with_start_delay(start_delay: Duration) -> Self {
        Self {
            start_delay,
            ..Self::default()
        }
    }
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self {
            starts: AtomicUsize::new(0),
            threads: Arc::new(Mutex::new(Vec::new())),
            stops: Arc::new(AtomicUsize::new(0)),
            fail_next_starts: AtomicUsize::new(0),
            fail_stop: Arc::new(AtomicBool::new(false)),
            start_delay: Duration::ZERO,
            next_port: AtomicU16::new(Self::FIRST_PORT)
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn start(&self, spec: &LaunchSpec) -> Result<Box<dyn RunningInstance>, StartupError> {
        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }
        let should_fail = self
            .fail_next_starts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(StartupError::ContainerStart {
                image: spec.image_ref(),
                reason: "simulated failure".to_string()
            });
        }

        self.starts.fetch_add(1, Ordering::SeqCst);
        self.threads.lock().push(current_thread("start"));
        Ok(Box::new(FakeInstance {
            threads: self.threads.clone(),
            port: self.next_port.fetch_add(1, Ordering::SeqCst),
            stops: self.stops.clone(),
            fail_stop: self.fail_stop.clone()
        }))
    }
}

struct FakeInstance {
    threads: Arc<Mutex<Vec<String>>>,
    port: u16,
    stops: Arc<AtomicUsize>,
    fail_stop: Arc<AtomicBool>
}

#[async_trait]
impl RunningInstance for FakeInstance {
    async fn reachable_host(&self) -> Result<String, StartupError> {
        Ok("127.0.0.1".to_string())
    }

    async fn mapped_port(&self, _internal_port: u16) -> Result<u16, StartupError> {
        Ok(self.port)
    }

    async fn stop(self: Box<Self>) -> Result<(), TeardownError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.threads.lock().push(current_thread("stop"));
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(TeardownError::InstanceStop {
                reason: "simulated stop failure".to_string()
            });
        }
        Ok(())
    }
}

fn current_thread(event: &str) -> String {
    let thread = std::thread::current();
    format!("{event}@{}", thread.name().unwrap_or("unnamed"))
}

/// Records opens and closes of pools.
#[derive(Default)]
pub struct FakeConnector {
    pub opens: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    pub fail_next_opens: AtomicUsize,
    pub fail_close: Arc<AtomicBool>
}

#[derive(Clone)]
pub struct FakePool {
    pub id: usize,
    pub port: u16,
    closes: Arc<AtomicUsize>,
    fail_close: Arc<AtomicBool>
}

#[async_trait]
impl PoolHandle for FakePool {
    async fn close(&self) -> Result<(), TeardownError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(TeardownError::PoolClose {
                reason: "simulated close failure".to_string()
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PoolConnector for FakeConnector {
    type Pool = FakePool;

    async fn open(&self, config: &ConnectionConfiguration) -> Result<FakePool, StartupError> {
        let should_fail = self
            .fail_next_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(StartupError::PoolOpen {
                host: config.host.clone(),
                port: config.port,
                reason: "simulated connection refused".to_string()
            });
        }

        let id = self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(FakePool {
            id,
            port: config.port,
            closes: self.closes.clone(),
            fail_close: self.fail_close.clone()
        })
    }
}
