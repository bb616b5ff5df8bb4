//! Byte-size and duration parsing for block-cutting and raft form inputs.
//!
//! Inputs arrive in whatever shape the user or the backend used (`"10 MB"`,
//! `"10485760"`, `"2s"`, `"2000"`), so comparisons against a baseline always go
//! through these parsers first.

const BYTE_UNITS: [(&str, u64); 6] = [
    ("pb", 1 << 50),
    ("tb", 1 << 40),
    ("gb", 1 << 30),
    ("mb", 1 << 20),
    ("kb", 1 << 10),
    ("b", 1),
];

/// Parses `"10MB"`, `"512 kb"`, `"1.5GB"` or a plain byte count. Units are binary.
pub fn parse_byte_size(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    let number_end = lower
        .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
        .unwrap_or(lower.len());
    let (number, unit) = lower.split_at(number_end);
    let value = number.parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let unit = unit.trim();
    if unit.is_empty() {
        return Some(value.floor() as u64);
    }
    let (_, factor) = BYTE_UNITS.iter().find(|(name, _)| *name == unit)?;
    Some((value * *factor as f64).floor() as u64)
}

/// Formats a byte count with the largest fitting binary unit, e.g. `10485760` -> `"10MB"`.
pub fn format_byte_size(value: u64) -> String {
    for (name, factor) in BYTE_UNITS {
        if factor > 1 && value >= factor {
            let scaled = value as f64 / factor as f64;
            let rounded = (scaled * 100.0).round() / 100.0;
            let text = format!("{rounded:.2}");
            let text = text.trim_end_matches('0').trim_end_matches('.');
            return format!("{text}{}", name.to_ascii_uppercase());
        }
    }
    format!("{value}B")
}

fn duration_unit_ms(unit: &str) -> Option<f64> {
    let ms = match unit {
        "ns" | "nsec" => 1e-6,
        "us" | "µs" | "usec" => 1e-3,
        "" | "ms" | "msec" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1_000.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000.0,
        "d" | "day" | "days" => 86_400_000.0,
        "w" | "wk" | "week" | "weeks" => 604_800_000.0,
        _ => return None,
    };
    Some(ms)
}

/// Parses `"2s"`, `"500ms"`, `"1m30s"` or `"1h 5m"`. A bare number is milliseconds.
pub fn parse_duration_ms(raw: &str) -> Option<u64> {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    let mut total = 0.0_f64;
    let mut rest = lower.as_str();
    while !rest.is_empty() {
        rest = rest.trim_start();
        let number_end = rest
            .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
            .unwrap_or(rest.len());
        if number_end == 0 {
            return None;
        }
        let value = rest[..number_end].parse::<f64>().ok()?;
        rest = rest[number_end..].trim_start();
        let unit_end = rest
            .find(|ch: char| ch.is_ascii_digit() || ch == '.' || ch.is_whitespace())
            .unwrap_or(rest.len());
        total += value * duration_unit_ms(&rest[..unit_end])?;
        rest = &rest[unit_end..];
    }
    Some(total.round() as u64)
}

/// Leading-integer parse used for payload numbers: `"500"` -> 500, `"10MB"` -> 10.
pub fn parse_leading_integer(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let end = trimmed
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_sizes_normalize_formatting_differences() {
        assert_eq!(parse_byte_size("10MB"), Some(10 * 1024 * 1024));
        assert_eq!(parse_byte_size("10 mb"), Some(10 * 1024 * 1024));
        assert_eq!(parse_byte_size("10485760"), Some(10 * 1024 * 1024));
        assert_eq!(parse_byte_size("1.5KB"), Some(1536));
        assert_eq!(parse_byte_size("12 parsecs"), None);
        assert_eq!(parse_byte_size(""), None);
    }

    #[test]
    fn byte_sizes_format_with_largest_unit() {
        assert_eq!(format_byte_size(10 * 1024 * 1024), "10MB");
        assert_eq!(format_byte_size(1536), "1.5KB");
        assert_eq!(format_byte_size(12), "12B");
    }

    #[test]
    fn durations_accept_compound_and_bare_values() {
        assert_eq!(parse_duration_ms("2s"), Some(2_000));
        assert_eq!(parse_duration_ms("2000"), Some(2_000));
        assert_eq!(parse_duration_ms("500ms"), Some(500));
        assert_eq!(parse_duration_ms("1m30s"), Some(90_000));
        assert_eq!(parse_duration_ms("1h 5m"), Some(3_900_000));
        assert_eq!(parse_duration_ms("0.5s"), Some(500));
        assert_eq!(parse_duration_ms("soon"), None);
    }

    #[test]
    fn leading_integer_matches_form_number_semantics() {
        assert_eq!(parse_leading_integer("500"), Some(500));
        assert_eq!(parse_leading_integer(" 10MB"), Some(10));
        assert_eq!(parse_leading_integer("abc"), None);
    }
}
