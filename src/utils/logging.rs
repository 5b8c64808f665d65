// Logger bootstrap for console and JSON output
use crate::settings::LoggingSettings;
use chrono::{DateTime, SecondsFormat, Utc};
use log::Level;
use std::io::Write;

/// Install the global logger according to `settings`
///
/// The filter string uses the `RUST_LOG` syntax, e.g. `info` or
/// `info,oathkeeper_login::session=debug`.
///
/// # Errors
///
/// Returns an error if a global logger is already installed
pub fn init_logger(settings: &LoggingSettings) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&settings.level);

    if settings.format.eq_ignore_ascii_case("json") {
        builder.format(|buf, record| {
            let line = json_line(
                Utc::now(),
                record.level(),
                record.target(),
                &record.args().to_string(),
            );
            writeln!(buf, "{line}")
        });
    } else {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {} > {}",
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                record.level(),
                record.target(),
                record.args()
            )
        });
    }

    builder.try_init()
}

/// Render one structured log line
#[must_use]
pub fn json_line(time: DateTime<Utc>, level: Level, target: &str, message: &str) -> String {
    serde_json::json!({
        "time": time.to_rfc3339_opts(SecondsFormat::Millis, true),
        "level": level.as_str().to_ascii_lowercase(),
        "logger": target,
        "message": message,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_json_line_fields() {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let line = json_line(
            time,
            Level::Warn,
            "oathkeeper_login::session::resolver",
            "session cache hit but decode failed",
        );
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["time"], "2024-05-01T12:00:00.000Z");
        assert_eq!(value["level"], "warn");
        assert_eq!(value["logger"], "oathkeeper_login::session::resolver");
        assert_eq!(value["message"], "session cache hit but decode failed");
    }
}
