// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Duration parsing for Go-style duration strings.
//!
//! Supports parsing duration strings in Go format (e.g., "30m", "12h", "1h30m",
//! "1.5d") into Rust `std::time::Duration`, and formatting durations back into
//! literals that re-parse to the same value.

use anyhow::{bail, Context, Result};
use std::time::Duration;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 3600 * NANOS_PER_SEC;
const NANOS_PER_DAY: u128 = 24 * NANOS_PER_HOUR;

/// Parse a Go-style duration string into a Rust `Duration`.
///
/// Supported units, largest to smallest:
/// - `d` (days, 24 hours): "30d", "1.5d"
/// - `h` (hours): "12h"
/// - `m` (minutes): "30m"
/// - `s` (seconds): "90s"
/// - `ms` (milliseconds): "250ms"
/// - `us` / `µs` (microseconds): "100us"
/// - `ns` (nanoseconds): "500ns"
///
/// Multiple components may be concatenated ("1h30m", "2d12h") and values may
/// carry a fractional part ("1.5d" is 36 hours).
///
/// # Examples
///
/// ```
/// use isotope::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("24h").unwrap(), Duration::from_secs(86400));
/// assert_eq!(parse_duration("1.5d").unwrap(), Duration::from_secs(129_600));
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
///
/// // Invalid formats return errors
/// assert!(parse_duration("").is_err());
/// assert!(parse_duration("10").is_err());  // Missing unit
/// assert!(parse_duration("10w").is_err()); // Invalid unit
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, a component is missing its unit,
/// a unit is unknown, or the value does not parse as a number.
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    if duration_str.is_empty() {
        bail!("Duration string cannot be empty");
    }

    let mut total_nanos: u128 = 0;
    let mut rest = duration_str;

    while !rest.is_empty() {
        // Leading numeric part, optionally fractional
        let value_len = rest
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .map(char::len_utf8)
            .sum::<usize>();
        if value_len == 0 {
            bail!("Expected a number at '{rest}' in duration '{duration_str}'");
        }

        let (value_str, unit_rest) = rest.split_at(value_len);
        let value: f64 = value_str
            .parse()
            .with_context(|| format!("Invalid number '{value_str}' in duration '{duration_str}'"))?;

        // Unit suffix, longest match first so "ms" is not read as "m" + "s"
        let (unit_nanos, unit_len) = if unit_rest.starts_with("ns") {
            (1u128, 2)
        } else if unit_rest.starts_with("us") {
            (NANOS_PER_MICRO, 2)
        } else if unit_rest.starts_with("µs") {
            (NANOS_PER_MICRO, "µs".len())
        } else if unit_rest.starts_with("ms") {
            (NANOS_PER_MILLI, 2)
        } else if unit_rest.starts_with('s') {
            (NANOS_PER_SEC, 1)
        } else if unit_rest.starts_with('m') {
            (NANOS_PER_MIN, 1)
        } else if unit_rest.starts_with('h') {
            (NANOS_PER_HOUR, 1)
        } else if unit_rest.starts_with('d') {
            (NANOS_PER_DAY, 1)
        } else {
            bail!(
                "Missing or unknown unit at '{unit_rest}' in duration '{duration_str}'. \
                 Use ns, us, ms, s, m, h, or d"
            );
        };

        if !value.is_finite() || value < 0.0 {
            bail!("Duration value '{value_str}' out of range in '{duration_str}'");
        }

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        #[allow(clippy::cast_sign_loss)]
        let component = (value * unit_nanos as f64).round() as u128;
        total_nanos = total_nanos
            .checked_add(component)
            .context("Duration value too large (overflow)")?;

        rest = &unit_rest[unit_len..];
    }

    let secs = u64::try_from(total_nanos / NANOS_PER_SEC)
        .context("Duration value too large (overflow)")?;
    #[allow(clippy::cast_possible_truncation)]
    let nanos = (total_nanos % NANOS_PER_SEC) as u32;
    Ok(Duration::new(secs, nanos))
}

/// Format a `Duration` as a literal that [`parse_duration`] accepts.
///
/// Components are emitted largest-unit first and zero components are omitted,
/// so `Duration::from_secs(5400)` becomes `"1h30m"` and the zero duration
/// becomes `"0s"`. The output always round-trips: parsing it yields exactly
/// the input duration.
///
/// # Examples
///
/// ```
/// use isotope::duration::{format_duration, parse_duration};
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
/// assert_eq!(format_duration(Duration::from_secs(86400)), "24h");
///
/// let original = Duration::from_millis(90_250);
/// assert_eq!(parse_duration(&format_duration(original)).unwrap(), original);
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total_nanos = duration.as_nanos();
    if total_nanos == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    let mut rest = total_nanos;

    for (unit_nanos, suffix) in [
        (NANOS_PER_HOUR, "h"),
        (NANOS_PER_MIN, "m"),
        (NANOS_PER_SEC, "s"),
        (NANOS_PER_MILLI, "ms"),
        (NANOS_PER_MICRO, "us"),
        (1, "ns"),
    ] {
        let count = rest / unit_nanos;
        if count > 0 {
            out.push_str(&format!("{count}{suffix}"));
            rest -= count * unit_nanos;
        }
    }

    out
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod duration_tests;
