//! Duration parsing and formatting for option values

use std::time::Duration;

/// Parse a duration option
///
/// Accepts a plain number of milliseconds (`500`) or a compound of
/// unit-suffixed parts (`1h30m`, `5s`, `250ms`, `2d`).
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(millis) = s.parse::<u64>() {
        return Some(Duration::from_millis(millis));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let value: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let millis = match unit {
            "ms" => value,
            "s" => value.checked_mul(1_000)?,
            "m" => value.checked_mul(60_000)?,
            "h" => value.checked_mul(3_600_000)?,
            "d" => value.checked_mul(86_400_000)?,
            "w" => value.checked_mul(604_800_000)?,
            _ => return None,
        };
        total = total.checked_add(Duration::from_millis(millis))?;
    }

    Some(total)
}

/// Format a duration in the short form used in outcome messages
pub fn format_duration(duration: Duration) -> String {
    let total_millis = duration.as_millis();
    if total_millis < 1_000 {
        return format!("{}ms", total_millis);
    }

    // Round up so a remaining 1.2s never shows as 1s
    let mut secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3_600;
    secs %= 3_600;
    let minutes = secs / 60;
    secs %= 60;

    let parts: Vec<String> = [(days, "d"), (hours, "h"), (minutes, "m"), (secs, "s")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect();
    parts.join(" ")
}
