//! Weather widget core for Nimbus
//!
//! Keeps a persisted, time-tiered cache of a single weather record and
//! renders it as an icon, tooltip and temperature. Fetching is left to a
//! background worker reached through [`RefreshTrigger`].

pub mod cache;
pub mod clock;
pub mod icon;
pub mod latch;
pub mod refresh;
pub mod store;
pub mod sun;
pub mod temperature;
pub mod types;
pub mod widget;

pub use cache::FreshnessCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use refresh::{ChannelRefreshTrigger, RefreshRequest, RefreshTrigger};
pub use store::{
    ingest_payload, write_record, SqliteStore, StorageArea, StoreAdapter, StoreChange,
    WEATHER_DATA_KEY,
};
pub use sun::SunInfo;
pub use types::*;
pub use widget::{WeatherView, WeatherWidget};
