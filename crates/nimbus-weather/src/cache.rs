//! Freshness cache for the single weather record.
//!
//! The durable copy lives in a [`StoreAdapter`]; this cache keeps the
//! in-memory view, classifies it against the wall clock, and tells listeners
//! what (if anything) may be shown as current weather. Store notifications
//! and explicit load requests go through one FIFO queue drained by a single
//! caller at a time, so listeners never observe interleaved classifications.
//! A listener or refresh trigger that loads again only enqueues.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::error::RecvError;

use crate::clock::{Clock, SystemClock};
use crate::latch::Latch;
use crate::refresh::RefreshTrigger;
use crate::store::{StorageArea, StoreAdapter, WEATHER_DATA_KEY};
use crate::sun::{self, SunInfo};
use crate::types::{CacheState, DataLoad, WeatherError, WeatherRecord};

pub type DataLoadListener = Arc<dyn Fn(&DataLoad) + Send + Sync>;

/// Cheap to clone; all clones share one cache.
#[derive(Clone)]
pub struct FreshnessCache {
    inner: Arc<Inner>,
}

pub struct FreshnessCacheBuilder {
    store: Arc<dyn StoreAdapter>,
    refresh: Arc<dyn RefreshTrigger>,
    clock: Arc<dyn Clock>,
    location_permitted: bool,
}

impl FreshnessCacheBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Whether refreshes may use location access (default: permitted)
    pub fn location_permitted(mut self, permitted: bool) -> Self {
        self.location_permitted = permitted;
        self
    }

    pub fn build(self) -> FreshnessCache {
        FreshnessCache {
            inner: Arc::new(Inner {
                store: self.store,
                refresh: self.refresh,
                clock: self.clock,
                location_permitted: self.location_permitted,
                stale: RwLock::new(None),
                current: RwLock::new(None),
                listeners: Mutex::new(Vec::new()),
                dispatch: Mutex::new(DispatchQueue::default()),
                cache_loaded: Latch::new(),
                initial_load: Latch::new(),
                initialized: AtomicBool::new(false),
                load_requested: AtomicBool::new(false),
                refresh_pending: AtomicBool::new(false),
            }),
        }
    }
}

struct Inner {
    store: Arc<dyn StoreAdapter>,
    refresh: Arc<dyn RefreshTrigger>,
    clock: Arc<dyn Clock>,
    location_permitted: bool,
    /// Last record read from the store, expired or not
    stale: RwLock<Option<Arc<WeatherRecord>>>,
    /// Last record dispatched as current
    current: RwLock<Option<Arc<WeatherRecord>>>,
    listeners: Mutex<Vec<DataLoadListener>>,
    dispatch: Mutex<DispatchQueue>,
    /// Settled after the first store read
    cache_loaded: Latch,
    /// Settled when a fresh record is first observed
    initial_load: Latch,
    initialized: AtomicBool,
    load_requested: AtomicBool,
    refresh_pending: AtomicBool,
}

/// Raw store values waiting to be classified
#[derive(Default)]
struct DispatchQueue {
    pending: VecDeque<Option<String>>,
    draining: bool,
}

/// Releases the drain if a listener panics, so later loads still run.
struct DrainGuard<'a>(&'a Mutex<DispatchQueue>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut queue = self.0.lock();
            queue.pending.clear();
            queue.draining = false;
        }
    }
}

impl FreshnessCache {
    pub fn builder(
        store: Arc<dyn StoreAdapter>,
        refresh: Arc<dyn RefreshTrigger>,
    ) -> FreshnessCacheBuilder {
        FreshnessCacheBuilder {
            store,
            refresh,
            clock: Arc::new(SystemClock),
            location_permitted: true,
        }
    }

    /// Start the first store read and follow store changes.
    ///
    /// Calling it again is a no-op. Must run inside a tokio runtime.
    pub fn initialize(&self) -> Result<(), WeatherError> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| WeatherError::NoRuntime)?;

        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Subscribe before reading so no write can slip between the two.
        let mut changes = self.inner.store.subscribe();
        let inner = self.inner.clone();

        handle.spawn(async move {
            let raw = inner.read_raw();
            inner.set_stale(parse_record(raw.as_deref()).map(Arc::new));
            tracing::debug!("Weather cache loaded from store");

            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if change.area == StorageArea::Local && change.key == WEATHER_DATA_KEY {
                            inner.handle_weather_data_load(change.new_value);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Missed {} store notifications; re-reading weather record",
                            skipped
                        );
                        inner.handle_weather_data_load(inner.read_raw());
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("Store notifications closed");
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    /// Make sure the stored record has been classified once, triggering a
    /// refresh if it is absent or soft-expired.
    ///
    /// The work happens on call; the returned future resolves once a fresh
    /// record has been observed. Fails with `CapabilityUnavailable` when
    /// location access is not permitted.
    pub fn request_load(&self) -> impl Future<Output = Result<(), WeatherError>> + Send + 'static {
        let outcome = self.begin_load();
        let inner = self.inner.clone();
        async move {
            outcome?;
            inner.initial_load.wait().await;
            Ok(())
        }
    }

    fn begin_load(&self) -> Result<(), WeatherError> {
        if !self.inner.location_permitted {
            return Err(WeatherError::CapabilityUnavailable(
                "location access is not permitted".to_string(),
            ));
        }

        if !self.inner.load_requested.swap(true, Ordering::SeqCst) {
            tracing::info!("Loading weather");
            self.inner.handle_weather_data_load(self.inner.read_raw());
        }
        Ok(())
    }

    /// Register a listener for every processed notification.
    /// Listeners run synchronously, in registration order.
    pub fn on_data_load<F>(&self, listener: F)
    where
        F: Fn(&DataLoad) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().push(Arc::new(listener));
    }

    /// Whatever record is known, expired or absent, once the store has been read
    pub async fn stale_snapshot(&self) -> Option<Arc<WeatherRecord>> {
        self.inner.cache_loaded.wait().await;
        self.inner.stale.read().clone()
    }

    /// Sun boundaries for `given`, falling back to the stale snapshot.
    pub async fn sun_info(&self, given: Option<&WeatherRecord>) -> SunInfo {
        match given {
            Some(record) => sun::sun_info(Some(record), self.inner.clock.as_ref()),
            None => {
                let stale = self.stale_snapshot().await;
                sun::sun_info(stale.as_deref(), self.inner.clock.as_ref())
            }
        }
    }

    /// Classification of the known record right now
    pub fn state(&self) -> CacheState {
        let now = self.inner.clock.now_ms();
        CacheState::classify(self.inner.stale.read().as_deref(), now)
    }

    /// The record last dispatched as current. It may have expired since.
    pub fn current(&self) -> Option<Arc<WeatherRecord>> {
        self.inner.current.read().clone()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.inner.clock.clone()
    }
}

impl Inner {
    fn read_raw(&self) -> Option<String> {
        match self.store.get(StorageArea::Local, WEATHER_DATA_KEY) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to read weather record: {}", e);
                None
            }
        }
    }

    fn set_stale(&self, record: Option<Arc<WeatherRecord>>) {
        *self.stale.write() = record;
        self.cache_loaded.settle();
    }

    /// Queue `raw` for classification and drain the queue unless another
    /// call is already draining it. No lock is held while listeners or
    /// the refresh trigger run.
    fn handle_weather_data_load(&self, raw: Option<String>) {
        {
            let mut queue = self.dispatch.lock();
            queue.pending.push_back(raw);
            if queue.draining {
                return;
            }
            queue.draining = true;
        }

        let _guard = DrainGuard(&self.dispatch);
        loop {
            let next = {
                let mut queue = self.dispatch.lock();
                match queue.pending.pop_front() {
                    Some(raw) => raw,
                    None => {
                        queue.draining = false;
                        return;
                    }
                }
            };
            self.process(next.as_deref());
        }
    }

    /// Parse, classify, stage, dispatch, then trigger a refresh if due.
    fn process(&self, raw: Option<&str>) {
        let record = parse_record(raw).map(Arc::new);
        self.set_stale(record.clone());

        let now = self.clock.now_ms();
        let event = match &record {
            Some(data) if data.is_fresh_at(now) => {
                self.initial_load.settle();
                DataLoad::Current(data.clone())
            }
            _ => DataLoad::NoCurrentData,
        };
        tracing::debug!(
            "Weather record classified as {:?}",
            CacheState::classify(record.as_deref(), now)
        );

        *self.current.write() = match &event {
            DataLoad::Current(data) => Some(data.clone()),
            DataLoad::NoCurrentData => None,
        };
        self.dispatch(&event);

        let refresh_due = record.as_ref().map_or(true, |data| data.needs_refresh_at(now));
        if refresh_due {
            if self.refresh_pending.swap(true, Ordering::SeqCst) {
                tracing::debug!("Weather refresh already pending");
            } else {
                tracing::info!("Weather data absent or past refresh horizon; requesting refresh");
                self.refresh.fetch_and_cache_weather_data();
            }
        } else {
            self.refresh_pending.store(false, Ordering::SeqCst);
        }
    }

    fn dispatch(&self, event: &DataLoad) {
        // Snapshot so listeners may register more listeners.
        let listeners: Vec<DataLoadListener> = self.listeners.lock().clone();
        for listener in &listeners {
            listener(event);
        }
    }
}

/// A blank or unparsable value is treated as no record.
fn parse_record(raw: Option<&str>) -> Option<WeatherRecord> {
    let raw = raw?.trim();
    if raw.is_empty() || raw == "null" {
        return None;
    }
    match WeatherRecord::parse(raw) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!("{}; treating as absent", e);
            None
        }
    }
}
