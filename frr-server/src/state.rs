//! Application state management

use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use frr_core::provider::RaceDataProvider;
use frr_core::replay::{Replay, ReplayFrame};
use frr_core::scrubber::{FrameClock, MonotonicClock};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// All registered data providers, in registration order
    pub providers: Arc<RwLock<Vec<Arc<dyn RaceDataProvider>>>>,

    /// The hosted replay (empty until a session is loaded)
    pub replay: Arc<RwLock<Replay>>,

    /// Broadcast channel for assembled frames
    /// Every SSE client subscribes to receive frames
    pub frame_tx: broadcast::Sender<Arc<ReplayFrame>>,

    /// Progress of the most recent session load
    pub load_status: Arc<RwLock<LoadStatus>>,

    /// Cancellation token for the playback task
    pub playback_cancel: Arc<RwLock<Option<CancellationToken>>>,

    /// Period of the playback frame clock
    pub frame_interval: Duration,

    /// Time source handed to the scrubber on every tick
    pub clock: Arc<dyn FrameClock>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadStatus {
    pub loading: bool,
    pub error: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_frame_interval(ServerConfig::default().frame_interval)
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::with_frame_interval(config.frame_interval)
    }

    pub fn with_frame_interval(frame_interval: Duration) -> Self {
        // Create broadcast channel with capacity for 100 frames
        let (frame_tx, _) = broadcast::channel(100);

        Self {
            providers: Arc::new(RwLock::new(Vec::new())),
            replay: Arc::new(RwLock::new(Replay::new())),
            frame_tx,
            load_status: Arc::new(RwLock::new(LoadStatus::default())),
            playback_cancel: Arc::new(RwLock::new(None)),
            frame_interval,
            clock: Arc::new(MonotonicClock::new()),
        }
    }

    /// Register a provider; lookups return the first match for a key
    pub async fn register_provider(&self, provider: Arc<dyn RaceDataProvider>) {
        let mut providers = self.providers.write().await;
        tracing::info!(key = provider.key(), "Registered data provider");
        providers.push(provider);
    }

    /// Provider by key, or the first registered one when no key is given
    pub async fn provider(&self, key: Option<&str>) -> Option<Arc<dyn RaceDataProvider>> {
        let providers = self.providers.read().await;
        match key {
            Some(key) => providers.iter().find(|p| p.key() == key).cloned(),
            None => providers.first().cloned(),
        }
    }

    /// Subscribe to replay frames
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ReplayFrame>> {
        self.frame_tx.subscribe()
    }

    /// Push the frame at the current index to every subscriber
    pub async fn broadcast_current_frame(&self) {
        let frame = self.replay.read().await.frame();
        if let Some(frame) = frame {
            // No subscribers is fine
            let _ = self.frame_tx.send(Arc::new(frame));
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
