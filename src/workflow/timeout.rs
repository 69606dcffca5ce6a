//! Parse a step's `timeout:` field.

use std::time::Duration;

/// Parse a human-friendly duration like `250ms`, `30s`, `5m` or `1h`.
///
/// A bare number means seconds. Returns `None` for anything else,
/// including zero.
pub fn parse_timeout(input: &str) -> Option<Duration> {
    let input = input.trim();

    let (num_str, unit) = if let Some(s) = input.strip_suffix("ms") {
        (s, "ms")
    } else if let Some(s) = input.strip_suffix('s') {
        (s, "s")
    } else if let Some(s) = input.strip_suffix('m') {
        (s, "m")
    } else if let Some(s) = input.strip_suffix('h') {
        (s, "h")
    } else {
        (input, "s")
    };

    let num: u64 = num_str.trim().parse().ok()?;
    if num == 0 {
        return None;
    }

    let duration = match unit {
        "ms" => Duration::from_millis(num),
        "s" => Duration::from_secs(num),
        "m" => Duration::from_secs(num.checked_mul(60)?),
        "h" => Duration::from_secs(num.checked_mul(3600)?),
        _ => return None,
    };
    Some(duration)
}
