//! Renders the cache's data-load events into what the page shows.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::cache::FreshnessCache;
use crate::clock::Clock;
use crate::icon::{icon_class, icon_name};
use crate::sun;
use crate::temperature::format_temperature_setting;
use crate::types::{Condition, DataLoad, WeatherRecord};

/// Display state of the widget; all empty when there is no current data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeatherView {
    pub icon_class: String,
    pub tooltip: String,
    pub temperature: String,
}

impl WeatherView {
    pub fn is_empty(&self) -> bool {
        self.icon_class.is_empty() && self.tooltip.is_empty() && self.temperature.is_empty()
    }
}

pub struct WeatherWidget {
    cache: FreshnessCache,
    state: Arc<WidgetState>,
}

struct WidgetState {
    clock: Arc<dyn Clock>,
    unit: RwLock<String>,
    data: RwLock<Option<Arc<WeatherRecord>>>,
    view: watch::Sender<WeatherView>,
}

impl WeatherWidget {
    /// Attach a widget to `cache`. `unit` is the temperature unit setting as text.
    pub fn new(cache: FreshnessCache, unit: impl Into<String>) -> Self {
        let (view, _) = watch::channel(WeatherView::default());
        let state = Arc::new(WidgetState {
            clock: cache.clock(),
            unit: RwLock::new(unit.into()),
            data: RwLock::new(None),
            view,
        });

        let listener = state.clone();
        cache.on_data_load(move |event| listener.on_data_load(event));

        Self { cache, state }
    }

    pub fn cache(&self) -> &FreshnessCache {
        &self.cache
    }

    pub fn view(&self) -> WeatherView {
        self.state.view.borrow().clone()
    }

    /// Follow view updates
    pub fn subscribe(&self) -> watch::Receiver<WeatherView> {
        self.state.view.subscribe()
    }

    pub fn set_temperature_unit(&self, unit: &str) {
        *self.state.unit.write() = unit.to_string();
        self.state.render();
    }
}

impl WidgetState {
    fn on_data_load(&self, event: &DataLoad) {
        *self.data.write() = match event {
            DataLoad::Current(record) => Some(record.clone()),
            DataLoad::NoCurrentData => None,
        };
        self.render();
    }

    fn render(&self) {
        let data = self.data.read().clone();
        let view = match data {
            Some(record) => render_view(&record, &self.unit.read(), self.clock.as_ref()),
            None => WeatherView::default(),
        };
        self.view.send_replace(view);
    }
}

/// Icon, tooltip and temperature for a current record
pub fn render_view(record: &WeatherRecord, unit: &str, clock: &dyn Clock) -> WeatherView {
    let is_day = sun::sun_info(Some(record), clock).is_day;
    let icon = record
        .primary_condition()
        .map(|condition| icon_name(condition.id, is_day))
        .unwrap_or("");

    WeatherView {
        icon_class: icon_class(icon),
        tooltip: describe(&record.weather),
        temperature: format_temperature_setting(&record.main.temp, unit),
    }
}

/// Condition descriptions joined and Title Cased, e.g. "Light Rain, Mist"
pub fn describe(conditions: &[Condition]) -> String {
    let joined = conditions
        .iter()
        .map(|c| c.description.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    title_case(&joined)
}

/// Capitalize each word. A word starts at an ASCII letter, digit or `_`
/// and runs to the next whitespace, so "über" becomes "üBer".
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            in_word = false;
            out.push(ch);
        } else if in_word {
            out.extend(ch.to_lowercase());
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            in_word = true;
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{write_record, SqliteStore};
    use crate::types::{MainReadings, SunTimes};
    use std::time::Duration;

    const NOON: i64 = 1_699_963_200_000; // 2023-11-14T12:00:00Z
    const HOUR: i64 = 3_600_000;

    fn record(code: i64, temp: serde_json::Value, hard_expiration: i64) -> WeatherRecord {
        WeatherRecord {
            main: MainReadings { temp },
            weather: vec![
                Condition {
                    id: code,
                    description: "clear SKY".into(),
                },
                Condition {
                    id: 701,
                    description: "mist".into(),
                },
            ],
            sys: SunTimes {
                sunrise: (NOON - 5 * HOUR) / 1000,
                sunset: (NOON + 5 * HOUR) / 1000,
            },
            hard_expiration,
            fresh_expiration: hard_expiration,
            sun_expiration: NOON + 24 * HOUR,
        }
    }

    fn attached_widget(unit: &str) -> (Arc<SqliteStore>, WeatherWidget) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let cache = FreshnessCache::builder(store.clone(), Arc::new(|| {}))
            .clock(Arc::new(ManualClock::new(NOON)))
            .build();
        (store, WeatherWidget::new(cache, unit))
    }

    async fn changed(rx: &mut watch::Receiver<WeatherView>) -> WeatherView {
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        let view = rx.borrow_and_update().clone();
        view
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("light rain, OVERCAST clouds"), "Light Rain, Overcast Clouds");
        assert_eq!(title_case("(heavy) snow"), "(Heavy) Snow");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_title_case_words_start_on_ascii() {
        assert_eq!(title_case("über rain"), "üBer Rain");
        assert_eq!(title_case("ÉCLAIRCIES x-ray"), "ÉClaircies X-ray");
    }

    #[test]
    fn test_render_view_day_and_night() {
        let data = record(800, serde_json::json!(18.4), NOON + HOUR);

        let day = render_view(&data, "celsius", &ManualClock::new(NOON));
        assert_eq!(day.icon_class, "wi wi-day-sunny");
        assert_eq!(day.tooltip, "Clear Sky, Mist");
        assert_eq!(day.temperature, "18 °C");

        let night = render_view(&data, "fahrenheit", &ManualClock::new(NOON + 8 * HOUR));
        assert_eq!(night.icon_class, "wi wi-night-clear");
        assert_eq!(night.temperature, "65 °F");
    }

    #[test]
    fn test_render_view_degrades_on_bad_input() {
        let data = record(999, serde_json::json!("warm"), NOON + HOUR);
        let view = render_view(&data, "kelvin", &ManualClock::new(NOON));
        assert_eq!(view.icon_class, "");
        assert_eq!(view.temperature, "");
        assert_eq!(view.tooltip, "Clear Sky, Mist");
    }

    #[tokio::test]
    async fn test_widget_follows_cache() {
        let (store, widget) = attached_widget("celsius");
        let mut rx = widget.subscribe();
        widget.cache().initialize().unwrap();

        write_record(store.as_ref(), &record(800, serde_json::json!(21), NOON + HOUR)).unwrap();
        let view = changed(&mut rx).await;
        assert_eq!(view.icon_class, "wi wi-day-sunny");
        assert_eq!(view.temperature, "21 °C");

        widget.set_temperature_unit("fahrenheit");
        assert_eq!(widget.view().temperature, "70 °F");

        // Past its hard expiration: nothing is shown as current
        write_record(store.as_ref(), &record(800, serde_json::json!(21), NOON)).unwrap();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|view| view.is_empty()))
            .await
            .unwrap()
            .unwrap();

        // A unit change does not resurrect it
        widget.set_temperature_unit("celsius");
        assert!(widget.view().is_empty());
    }
}
