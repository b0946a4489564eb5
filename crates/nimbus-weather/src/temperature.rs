//! Temperature display from the record's untrusted `main.temp`.

use serde_json::Value;

use crate::types::TemperatureUnit;

/// Coerce an arbitrary JSON value to a number.
///
/// Strings are parsed after trimming (blank is zero), booleans are 1/0,
/// null is zero; anything else is NaN.
///
/// Strings go through `f64::from_str`, which accepts "inf" and "NaN" but not
/// hex such as "0x10". Both kinds of odd input end up as an empty display,
/// never an error.
pub fn coerce_number(raw: &Value) -> f64 {
    match raw {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Render `raw` Celsius in `unit`, rounded to a whole degree.
///
/// Returns an empty string when the value is not a finite number.
pub fn format_temperature(raw: &Value, unit: TemperatureUnit) -> String {
    let celsius = coerce_number(raw);
    let value = match unit {
        TemperatureUnit::Celsius => celsius,
        TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(celsius),
    };

    if !value.is_finite() {
        tracing::warn!("Ignoring non-numeric temperature in cached weather data");
        return String::new();
    }

    format!("{} {}", value.round() as i64, unit.symbol())
}

/// Same as [`format_temperature`] with the unit as stored in settings.
/// An unknown unit is logged and renders empty.
pub fn format_temperature_setting(raw: &Value, unit: &str) -> String {
    match unit.parse::<TemperatureUnit>() {
        Ok(unit) => format_temperature(raw, unit),
        Err(e) => {
            tracing::error!("{}", e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_celsius_from_string() {
        assert_eq!(format_temperature(&json!("20"), TemperatureUnit::Celsius), "20 °C");
    }

    #[test]
    fn test_fahrenheit_conversion() {
        assert_eq!(format_temperature(&json!("20"), TemperatureUnit::Fahrenheit), "68 °F");
        assert_eq!(format_temperature(&json!(-40), TemperatureUnit::Fahrenheit), "-40 °F");
    }

    #[test]
    fn test_rounds_after_conversion() {
        assert_eq!(format_temperature(&json!(21.6), TemperatureUnit::Celsius), "22 °C");
        // 21.6 °C is 70.88 °F
        assert_eq!(format_temperature(&json!(21.6), TemperatureUnit::Fahrenheit), "71 °F");
        assert_eq!(format_temperature(&json!(-0.4), TemperatureUnit::Celsius), "0 °C");
    }

    #[test]
    fn test_non_numeric_input_renders_empty() {
        assert_eq!(
            format_temperature(&json!("<img src=x onerror=alert(1)>"), TemperatureUnit::Celsius),
            ""
        );
        assert_eq!(format_temperature(&json!({"v": 1}), TemperatureUnit::Fahrenheit), "");
    }

    #[test]
    fn test_coercion_rules() {
        assert_eq!(coerce_number(&json!(" 12.5 ")), 12.5);
        assert_eq!(coerce_number(&json!("")), 0.0);
        assert_eq!(coerce_number(&json!(true)), 1.0);
        assert_eq!(coerce_number(&Value::Null), 0.0);
        assert!(coerce_number(&json!([1])).is_nan());
    }

    #[test]
    fn test_special_number_strings_render_empty() {
        assert!(coerce_number(&json!("inf")).is_infinite());
        assert!(coerce_number(&json!("0x10")).is_nan());
        assert_eq!(format_temperature(&json!("inf"), TemperatureUnit::Celsius), "");
        assert_eq!(format_temperature(&json!("NaN"), TemperatureUnit::Celsius), "");
        assert_eq!(format_temperature(&json!("0x10"), TemperatureUnit::Celsius), "");
    }

    #[test]
    fn test_unknown_unit_setting_renders_empty() {
        assert_eq!(format_temperature_setting(&json!(20), "kelvin"), "");
        assert_eq!(format_temperature_setting(&json!(20), "fahrenheit"), "68 °F");
    }
}
