//! Small formatting helpers for terminal output.

use chrono::{DateTime, Local, Utc};

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Single-line progress output that overwrites itself.
pub fn progress_line(text: &str) {
    use std::io::Write;
    print!("\r\x1b[2K{text}");
    let _ = std::io::stdout().flush();
}
