use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use hostbridge_di::DynError;
use tokio::task::JoinHandle;

use crate::{cancel::CancellationToken, host::HostedService};

/// Logs a heartbeat right after start and then once per interval until stopped
pub struct HeartbeatService {
    interval: Duration,
    beats: Arc<AtomicU64>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for HeartbeatService {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatService {
    pub const INTERVAL: Duration = Duration::from_secs(15);
    /// Shortest interval accepted; `tokio::time::interval` rejects zero
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    pub fn new() -> Self {
        Self::with_interval(Self::INTERVAL)
    }

    /// Intervals below [Self::MIN_INTERVAL] are raised to it
    pub fn with_interval(interval: Duration) -> Self {
        if interval < Self::MIN_INTERVAL {
            tracing::warn!(
                ?interval,
                "Heartbeat interval too short, using {:?}",
                Self::MIN_INTERVAL
            );
        }
        HeartbeatService {
            interval: interval.max(Self::MIN_INTERVAL),
            beats: Arc::new(AtomicU64::new(0)),
            ticker: Mutex::new(None),
        }
    }

    /// Number of heartbeats logged so far
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn halt(&self) {
        let ticker = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(ticker) = ticker {
            ticker.abort();
        }
    }
}

#[async_trait]
impl HostedService for HeartbeatService {
    fn name(&self) -> &str {
        "HeartbeatService"
    }

    async fn start(&self, _token: &CancellationToken) -> Result<(), DynError> {
        let interval = self.interval;
        let beats = self.beats.clone();
        let ticker = tokio::spawn(async move {
            // The first tick completes immediately
            let mut timer = tokio::time::interval(interval);
            loop {
                timer.tick().await;
                let beat = beats.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::info!(beat, "hb");
            }
        });

        let previous = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(ticker);
        if let Some(previous) = previous {
            previous.abort();
        }
        Ok(())
    }

    async fn stop(&self, _token: &CancellationToken) -> Result<(), DynError> {
        self.halt();
        Ok(())
    }
}

impl Drop for HeartbeatService {
    fn drop(&mut self) {
        self.halt();
    }
}
