use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Result, TracelensError};

/// Accepts RFC3339, a relative duration ("5m" ago) or epoch milliseconds.
pub fn parse_time_or_relative(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(ms) = input.parse::<i64>() {
        return from_epoch_ms(ms);
    }

    if let Ok(duration) = humantime::parse_duration(input) {
        return Ok(Utc::now()
            - chrono::Duration::from_std(duration).map_err(|e| {
                TracelensError::Parse(format!("failed to parse duration to chrono: {e}"))
            })?);
    }

    Err(TracelensError::Parse(format!(
        "expected RFC3339 time, epoch millis or duration, got {input}"
    )))
}

pub fn parse_duration_ms(input: &str) -> Result<i64> {
    let duration = humantime::parse_duration(input)
        .map_err(|e| TracelensError::Parse(format!("invalid duration {input}: {e}")))?;
    i64::try_from(duration.as_millis())
        .map_err(|_| TracelensError::Parse(format!("duration out of range: {input}")))
}

pub fn from_epoch_ms(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| TracelensError::Parse(format!("timestamp out of range: {ms}")))
}

/// Fractional epoch seconds, as span searches report them, to epoch ms.
pub fn precise_seconds_to_ms(seconds: f64) -> f64 {
    seconds * 1000.0
}

/// Human duration for labels: `350ms`, `1.25s`, `2.50min`, `1.10hr`.
pub fn format_duration_ms(ms: f64) -> String {
    let ms = ms.max(0.0);
    if ms < 1000.0 {
        return format!("{}ms", trim_float(ms, 2));
    }
    if ms < 60_000.0 {
        return format!("{:.2}s", ms / 1000.0);
    }
    if ms < 3_600_000.0 {
        return format!("{:.2}min", ms / 60_000.0);
    }
    if ms < 86_400_000.0 {
        return format!("{:.2}hr", ms / 3_600_000.0);
    }
    format!("{:.2}d", ms / 86_400_000.0)
}

fn trim_float(v: f64, precision: usize) -> String {
    let s = format!("{v:.precision$}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}
