//! Condition code to Weather Icons name.
//! Codes: https://openweathermap.org/weather-conditions

use crate::types::WeatherError;

/// Look up the icon for a condition code, `None` if the code is unknown.
pub fn lookup_icon(code: i64, is_day: bool) -> Option<&'static str> {
    let icon = match code {
        // Thunderstorm
        200 | 201 | 202 => "thunderstorm",
        210 | 211 | 212 | 221 => "lightning",
        230 | 231 | 232 => "storm-showers",
        // Drizzle
        300 | 301 | 302 | 310 | 311 | 312 => "sprinkle",
        313 | 314 | 321 => "showers",
        // Rain
        500 | 501 | 502 | 503 | 504 | 511 => "rain",
        520 | 521 | 522 | 531 => "showers",
        // Snow
        600 | 601 | 602 => "snow",
        611 | 612 => "sleet",
        615 | 616 | 620 | 621 | 622 => "rain-mix",
        // Atmosphere
        701 | 741 => "fog",
        711 => "smoke",
        721 | 761 => "dust",
        731 | 751 => "sandstorm",
        762 => "volcano",
        771 | 905 | 955 | 956 => "strong-wind",
        781 | 900 => "tornado",
        // Clear and clouds
        800 | 951 | 952 | 953 => {
            if is_day {
                "day-sunny"
            } else {
                "night-clear"
            }
        }
        801 => {
            if is_day {
                "day-sunny-overcast"
            } else {
                "night-alt-partly-cloudy"
            }
        }
        802 | 803 => {
            if is_day {
                "day-cloudy"
            } else {
                "night-alt-cloudy"
            }
        }
        804 => "cloudy",
        // Extreme and additional
        901 | 902 | 962 => "hurricane",
        903 => "snowflake-cold",
        904 => "hot",
        906 => "hail",
        957 | 958 | 959 => "gale-warning",
        960 | 961 => "storm-warning",
        _ => return None,
    };
    Some(icon)
}

/// Icon name for display. Unknown codes log an error and yield `""` so the
/// widget renders without an icon.
pub fn icon_name(code: i64, is_day: bool) -> &'static str {
    match lookup_icon(code, is_day) {
        Some(icon) => icon,
        None => {
            tracing::error!("{}", WeatherError::UnrecognizedConditionCode(code));
            ""
        }
    }
}

/// CSS class list for an icon name; empty when there is no icon
pub fn icon_class(icon: &str) -> String {
    if icon.is_empty() {
        String::new()
    } else {
        format!("wi wi-{}", icon)
    }
}
