//! Seam to the background process that fetches and caches weather data.
//!
//! The trigger is fire-and-forget: the fetcher reports back only by writing
//! a new record into the store.

use tokio::sync::mpsc;

pub trait RefreshTrigger: Send + Sync {
    fn fetch_and_cache_weather_data(&self);
}

impl<F> RefreshTrigger for F
where
    F: Fn() + Send + Sync,
{
    fn fetch_and_cache_weather_data(&self) {
        self()
    }
}

/// A request for the background worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshRequest {
    /// Wall-clock ms when the cache asked for the refresh
    pub requested_at: i64,
}

/// Posts refresh requests to a worker over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelRefreshTrigger {
    tx: mpsc::UnboundedSender<RefreshRequest>,
}

impl ChannelRefreshTrigger {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RefreshRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RefreshTrigger for ChannelRefreshTrigger {
    fn fetch_and_cache_weather_data(&self) {
        let request = RefreshRequest {
            requested_at: chrono::Utc::now().timestamp_millis(),
        };
        if self.tx.send(request).is_err() {
            tracing::warn!("Refresh worker is gone; weather will not be refreshed");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_closure_trigger() {
        let calls = AtomicUsize::new(0);
        let trigger = || {
            calls.fetch_add(1, Ordering::SeqCst);
        };
        trigger.fetch_and_cache_weather_data();
        trigger.fetch_and_cache_weather_data();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_channel_trigger_delivers_request() {
        let (trigger, mut rx) = ChannelRefreshTrigger::new();
        trigger.fetch_and_cache_weather_data();
        assert!(rx.try_recv().unwrap().requested_at > 0);
    }

    #[test]
    fn test_channel_trigger_survives_dropped_worker() {
        let (trigger, rx) = ChannelRefreshTrigger::new();
        drop(rx);
        trigger.fetch_and_cache_weather_data();
    }
}
