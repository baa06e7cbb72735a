//! Terminal rendering for telemetry frames.

use owo_colors::OwoColorize;
use serde_json::Value;

use groundlink_config::GpsFormat;
use groundlink_core::TopicUpdate;
use groundlink_proto::topics;

/// Arrays longer than this are elided when payloads are dumped raw --
/// image frames carry thousands of bytes nobody wants on a terminal.
const ARRAY_ELIDE_THRESHOLD: usize = 16;

/// Format a latitude/longitude pair per the user's preference.
pub fn format_lat_long(latitude: f64, longitude: f64, format: GpsFormat) -> String {
    match format {
        GpsFormat::Decimal => format!("{latitude:.6}, {longitude:.6}"),
        GpsFormat::Dms => format!(
            "{} {}",
            dms(latitude, 'N', 'S'),
            dms(longitude, 'E', 'W')
        ),
    }
}

fn dms(value: f64, positive: char, negative: char) -> String {
    let hemisphere = if value < 0.0 { negative } else { positive };
    let value = value.abs();
    let degrees = value.trunc();
    let minutes = (value - degrees) * 60.0;
    let seconds = (minutes - minutes.trunc()) * 60.0;
    format!(
        "{}\u{b0}{:02}'{:04.1}\"{}",
        degrees as i64,
        minutes.trunc() as i64,
        seconds,
        hemisphere
    )
}

/// One line per inbound frame: local time, topic, payload summary.
pub fn render_update(update: &TopicUpdate, gps_format: GpsFormat) -> String {
    let time = chrono::Local::now().format("%H:%M:%S");
    format!(
        "{} {} {}",
        time.to_string().dimmed(),
        update.topic.cyan(),
        summarize(update, gps_format)
    )
}

fn summarize(update: &TopicUpdate, gps_format: GpsFormat) -> String {
    let frame = &update.frame;
    match update.topic.as_str() {
        topics::GPS => {
            let position = match (number(frame, "latitude"), number(frame, "longitude")) {
                (Some(lat), Some(lon)) => format_lat_long(lat, lon, gps_format),
                _ => "?".into(),
            };
            format!(
                "{position}  fix {}  satellites {}",
                field(frame, "gps_fix"),
                field(frame, "satellites")
            )
        }
        topics::POSITION => format!(
            "origin ({}, {}, {}rad)  global ({}, {})",
            fixed(frame, "x", 4),
            fixed(frame, "y", 4),
            fixed(frame, "theta", 4),
            fixed(frame, "latitude", 8),
            fixed(frame, "longitude", 8),
        ),
        topics::MOTOR_INPUT => format!(
            "forward {}  angular {}",
            fixed(frame, "forward_velocity", 3),
            fixed(frame, "angular_velocity", 3),
        ),
        topics::MOTOR_FEEDBACK => format!(
            "delta ({}, {}, {})",
            fixed(frame, "delta_x", 4),
            fixed(frame, "delta_y", 4),
            fixed(frame, "delta_theta", 4),
        ),
        topics::IMU => format!(
            "accel ({}, {}, {})  angular ({}, {}, {})",
            fixed(frame, "accel_x", 3),
            fixed(frame, "accel_y", 3),
            fixed(frame, "accel_z", 3),
            fixed(frame, "angular_x", 3),
            fixed(frame, "angular_y", 3),
            fixed(frame, "angular_z", 3),
        ),
        topics::DEVICE_STATE => {
            format!("{} -> {}", field(frame, "device"), field(frame, "state"))
        }
        topics::LOGGING => format!("[{}] {}", field(frame, "node"), field(frame, "data")),
        _ => compact_payload(frame),
    }
}

fn compact_payload(frame: &groundlink_proto::DataFrame) -> String {
    let parts: Vec<String> = frame
        .payload
        .iter()
        .map(|(key, value)| format!("{key}={}", compact_value(value)))
        .collect();
    parts.join(" ")
}

fn compact_value(value: &Value) -> String {
    match value {
        Value::Array(items) if items.len() > ARRAY_ELIDE_THRESHOLD => {
            format!("[{} values]", items.len())
        }
        other => other.to_string(),
    }
}

fn number(frame: &groundlink_proto::DataFrame, key: &str) -> Option<f64> {
    frame.field(key)?.as_f64()
}

fn fixed(frame: &groundlink_proto::DataFrame, key: &str, decimals: usize) -> String {
    number(frame, key).map_or_else(|| "?".into(), |v| format!("{v:.decimals$}"))
}

fn field(frame: &groundlink_proto::DataFrame, key: &str) -> String {
    frame.field(key).map_or_else(
        || "?".into(),
        |value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decimal_format_is_six_places() {
        let formatted = format_lat_long(35.210716, -97.441692, GpsFormat::Decimal);
        assert_eq!(formatted, "35.210716, -97.441692");
    }

    #[test]
    fn dms_format_carries_hemispheres() {
        let formatted = format_lat_long(35.210716, -97.441692, GpsFormat::Dms);
        assert!(formatted.contains('N'), "{formatted}");
        assert!(formatted.contains('W'), "{formatted}");
        assert!(formatted.contains("35\u{b0}"), "{formatted}");
        assert!(formatted.contains("97\u{b0}"), "{formatted}");
    }

    #[test]
    fn southern_western_hemispheres() {
        let formatted = format_lat_long(-33.8688, 151.2093, GpsFormat::Dms);
        assert!(formatted.contains('S'), "{formatted}");
        assert!(formatted.contains('E'), "{formatted}");
    }

    #[test]
    fn long_arrays_are_elided() {
        let value = Value::Array(vec![Value::from(0u8); 5000]);
        assert_eq!(compact_value(&value), "[5000 values]");

        let short = serde_json::json!([1, 2, 3]);
        assert_eq!(compact_value(&short), "[1,2,3]");
    }
}
