use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use nimbus_core::{StorageError, WeatherConfig};
use serde::{Deserialize, Serialize};

/// Temperature display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "celsius" | "c" => Ok(Self::Celsius),
            "fahrenheit" | "f" => Ok(Self::Fahrenheit),
            _ => Err(WeatherError::UnrecognizedUnit(s.to_string())),
        }
    }
}

/// One provider condition entry (OpenWeatherMap `weather[]` item)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: i64,
    pub description: String,
}

/// Provider `main` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainReadings {
    /// Celsius as written by the fetcher. Untrusted: coerce before use.
    pub temp: serde_json::Value,
}

/// Provider `sys` block, Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: i64,
    pub sunset: i64,
}

/// The single cached weather record, as persisted in the store.
///
/// Expirations are absolute Unix milliseconds and are evaluated against the
/// wall clock at read time, so classification can change without a write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherRecord {
    pub main: MainReadings,
    pub weather: Vec<Condition>,
    pub sys: SunTimes,
    pub hard_expiration: i64,
    pub fresh_expiration: i64,
    pub sun_expiration: i64,
}

impl WeatherRecord {
    /// Parse a stored value, rejecting records that break the model invariants.
    pub fn parse(raw: &str) -> Result<Self, WeatherError> {
        let record: WeatherRecord = serde_json::from_str(raw)
            .map_err(|e| WeatherError::MalformedRecord(e.to_string()))?;

        if record.weather.is_empty() {
            return Err(WeatherError::MalformedRecord(
                "record has no weather conditions".to_string(),
            ));
        }

        if record.fresh_expiration > record.hard_expiration {
            return Err(WeatherError::MalformedRecord(format!(
                "freshExpiration {} is after hardExpiration {}",
                record.fresh_expiration, record.hard_expiration
            )));
        }

        Ok(record)
    }

    pub fn to_json(&self) -> Result<String, WeatherError> {
        serde_json::to_string(self).map_err(|e| WeatherError::MalformedRecord(e.to_string()))
    }

    /// Eligible for live display
    pub fn is_fresh_at(&self, now_ms: i64) -> bool {
        now_ms < self.hard_expiration
    }

    /// Past the soft horizon; a background refresh is due
    pub fn needs_refresh_at(&self, now_ms: i64) -> bool {
        now_ms >= self.fresh_expiration
    }

    pub fn sun_valid_at(&self, now_ms: i64) -> bool {
        now_ms < self.sun_expiration
    }

    pub fn primary_condition(&self) -> Option<&Condition> {
        self.weather.first()
    }
}

/// A provider response as fetched, before expirations are stamped
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeatherPayload {
    pub main: MainReadings,
    pub weather: Vec<Condition>,
    pub sys: SunTimes,
}

impl WeatherPayload {
    pub fn parse(raw: &str) -> Result<Self, WeatherError> {
        let payload: WeatherPayload = serde_json::from_str(raw)
            .map_err(|e| WeatherError::MalformedRecord(e.to_string()))?;
        if payload.weather.is_empty() {
            return Err(WeatherError::MalformedRecord(
                "payload has no weather conditions".to_string(),
            ));
        }
        Ok(payload)
    }
}

/// How long a freshly fetched record stays in each tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationPolicy {
    pub fresh: Duration,
    pub hard: Duration,
    pub sun: Duration,
}

impl ExpirationPolicy {
    pub fn from_config(config: &WeatherConfig) -> Self {
        let minutes = |m: u32| Duration::from_secs(u64::from(m) * 60);
        Self {
            fresh: minutes(config.fresh_minutes),
            hard: minutes(config.hard_minutes),
            sun: minutes(config.sun_minutes),
        }
    }

    /// Turn a fetched payload into a record expiring relative to `fetched_at_ms`
    pub fn apply(&self, payload: WeatherPayload, fetched_at_ms: i64) -> WeatherRecord {
        let record = WeatherRecord {
            main: payload.main,
            weather: payload.weather,
            sys: payload.sys,
            hard_expiration: 0,
            fresh_expiration: 0,
            sun_expiration: 0,
        };
        self.stamp(record, fetched_at_ms)
    }

    /// Set the record's expirations relative to when it was fetched.
    ///
    /// The refresh horizon is clamped to the hard expiration.
    pub fn stamp(&self, mut record: WeatherRecord, fetched_at_ms: i64) -> WeatherRecord {
        let after = |d: Duration| fetched_at_ms.saturating_add(d.as_millis() as i64);
        record.hard_expiration = after(self.hard);
        record.fresh_expiration = after(self.fresh).min(record.hard_expiration);
        record.sun_expiration = after(self.sun);
        record
    }
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self::from_config(&WeatherConfig::default())
    }
}

/// Freshness tier of the cached record at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No record has been read yet, or the store holds none
    Uninitialized,
    /// A record is known but past its hard expiration
    StaleOnly,
    Fresh,
}

impl CacheState {
    pub fn classify(record: Option<&WeatherRecord>, now_ms: i64) -> Self {
        match record {
            None => Self::Uninitialized,
            Some(r) if r.is_fresh_at(now_ms) => Self::Fresh,
            Some(_) => Self::StaleOnly,
        }
    }
}

/// Payload of the data-loaded notification
#[derive(Debug, Clone, PartialEq)]
pub enum DataLoad {
    Current(Arc<WeatherRecord>),
    /// Nothing may be shown as the live condition
    NoCurrentData,
}

impl DataLoad {
    pub fn record(&self) -> Option<&WeatherRecord> {
        match self {
            Self::Current(record) => Some(record.as_ref()),
            Self::NoCurrentData => None,
        }
    }
}

/// Weather widget errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Location capability unavailable: {0}")]
    CapabilityUnavailable(String),
    #[error("Unrecognized temperature unit: {0}")]
    UnrecognizedUnit(String),
    #[error("Unrecognized weather condition code: {0}")]
    UnrecognizedConditionCode(i64),
    #[error("Malformed weather record: {0}")]
    MalformedRecord(String),
    #[error("Store error: {0}")]
    Store(#[from] StorageError),
    #[error("No async runtime available")]
    NoRuntime,
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::CapabilityUnavailable(_) => "Location access is needed to load the weather.",
            Self::UnrecognizedUnit(_) => "Unknown temperature unit. Check your settings.",
            Self::UnrecognizedConditionCode(_) => "Weather condition not recognized.",
            Self::MalformedRecord(_) => "Cached weather data was unreadable.",
            Self::Store(e) => e.user_message(),
            Self::NoRuntime => "Weather service not initialized.",
        }
    }
}
