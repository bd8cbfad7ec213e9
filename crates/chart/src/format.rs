use std::collections::HashMap;

use tracelens_core::model::series::Series;
use tracelens_core::time::format_duration_ms;

const COUNT_OPERATIONS: &[&str] = &[
    "count",
    "count_unique",
    "count_if",
    "cardinality",
    "epm",
    "eps",
    "spm",
    "sps",
];

/// Formats a metric value for display according to its unit and the
/// aggregate operation that produced it.
pub fn format_value(value: f64, unit: &str, operation: &str) -> String {
    if COUNT_OPERATIONS.contains(&operation) {
        return abbreviate_number(value);
    }

    if let Some(ms) = duration_to_ms(value, unit) {
        return format_duration_ms(ms);
    }

    if let Some(bytes) = information_to_bytes(value, unit) {
        let binary = unit.ends_with("ibyte");
        return format_bytes(bytes, binary);
    }

    match unit {
        "ratio" => format!("{}%", trim_float(value * 100.0, 2)),
        "percent" => format!("{}%", trim_float(value, 2)),
        _ => abbreviate_number(value),
    }
}

fn duration_to_ms(value: f64, unit: &str) -> Option<f64> {
    let factor = match unit {
        "nanosecond" => 1e-6,
        "microsecond" => 1e-3,
        "millisecond" => 1.0,
        "second" => 1_000.0,
        "minute" => 60_000.0,
        "hour" => 3_600_000.0,
        "day" => 86_400_000.0,
        "week" => 604_800_000.0,
        _ => return None,
    };
    Some(value * factor)
}

fn information_to_bytes(value: f64, unit: &str) -> Option<f64> {
    let factor = match unit {
        "bit" => 0.125,
        "byte" => 1.0,
        "kilobyte" => 1e3,
        "megabyte" => 1e6,
        "gigabyte" => 1e9,
        "terabyte" => 1e12,
        "kibibyte" => 1024.0,
        "mebibyte" => 1024.0 * 1024.0,
        "gibibyte" => 1024.0 * 1024.0 * 1024.0,
        "tebibyte" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some(value * factor)
}

fn format_bytes(bytes: f64, binary: bool) -> String {
    let (base, units): (f64, [&str; 5]) = if binary {
        (1024.0, ["B", "KiB", "MiB", "GiB", "TiB"])
    } else {
        (1000.0, ["B", "KB", "MB", "GB", "TB"])
    };
    let mut v = bytes;
    let mut idx = 0;
    while v.abs() >= base && idx < units.len() - 1 {
        v /= base;
        idx += 1;
    }
    format!("{} {}", trim_float(v, 1), units[idx])
}

pub fn abbreviate_number(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e9 {
        (value / 1e9, "b")
    } else if abs >= 1e6 {
        (value / 1e6, "m")
    } else if abs >= 1e3 {
        (value / 1e3, "k")
    } else {
        return trim_float(value, 2);
    };
    format!("{}{suffix}", trim_float(scaled, 1))
}

fn trim_float(v: f64, precision: usize) -> String {
    let s = format!("{v:.precision$}");
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    };
    if s == "-0" { "0".to_string() } else { s }
}

/// Value formatter keyed by series name, so every series in a tooltip is
/// rendered with its own unit and operation.
#[derive(Debug, Clone, Default)]
pub struct SeriesFormatter {
    by_name: HashMap<String, (String, String)>,
}

impl SeriesFormatter {
    pub fn from_series(series: &[Series]) -> Self {
        let mut by_name = HashMap::new();
        for s in series {
            by_name
                .entry(s.name.clone())
                .or_insert_with(|| (s.unit.clone(), s.operation.clone()));
        }
        Self { by_name }
    }

    pub fn format(&self, series_name: &str, value: f64) -> String {
        match self.by_name.get(series_name) {
            Some((unit, op)) => format_value(value, unit, op),
            None => abbreviate_number(value),
        }
    }
}
