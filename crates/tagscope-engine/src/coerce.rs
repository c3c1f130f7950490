//! Best-fit typing of raw strings
//!
//! Accepts the separator conventions found in hand-typed data: `1.234.567,89`
//! and `1,234,567.89` both read as the same float, a trailing sign moves to
//! the front, and `12.5 + 3i` reads as a complex number.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use tagscope_core::{Complex, Value};
use tracing::trace;

/// Inputs at least this long are never tried as dates.
const DATE_CANDIDATE_MAX_LEN: usize = 32;

/// Tokens at least this long are never tried as booleans.
const BOOL_CANDIDATE_MAX_LEN: usize = 6;

/// Scanning stops at the first disqualifying character found at this position.
const SCAN_CUTOFF: usize = 5;

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%a %b %e %H:%M:%S %z %Y",
    "%A %B %d %H:%M:%S %Y %z",
    "%d %b %Y %H:%M:%S %z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%b %d, %Y %H:%M:%S",
    "%a %b %e %H:%M:%S %Y",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
];

#[derive(Debug, Default)]
struct Scan {
    buffer: String,
    decimals: usize,
    has_imaginary: bool,
    has_operand: bool,
    leading_zero: bool,
    complex: bool,
    number: bool,
    position: usize,
}

impl Scan {
    fn run(input: &str) -> Self {
        let mut scan = Scan {
            complex: true,
            number: true,
            ..Default::default()
        };

        for c in input.chars() {
            if c.is_whitespace() {
                continue;
            }

            match c {
                '(' | ')' | '[' | ']' | '{' | '}' => {}
                '-' | '+' => {
                    if c == '-' || scan.position > 0 {
                        scan.buffer.push(c);
                    }
                    if scan.position > 0 {
                        scan.number = false;
                    } else {
                        if scan.has_operand {
                            scan.complex = false;
                            break;
                        }
                        scan.has_operand = true;
                    }
                }
                '.' => {
                    scan.leading_zero = false;
                    scan.buffer.push(c);
                    if scan.complex && scan.decimals == 2 {
                        scan.complex = false;
                        scan.number = false;
                        break;
                    }
                    if scan.number && scan.decimals == 1 {
                        scan.number = false;
                    }
                    scan.decimals += 1;
                }
                ',' => {}
                '0' => {
                    if scan.buffer.is_empty() {
                        scan.leading_zero = true;
                    }
                    scan.buffer.push(c);
                }
                '1'..='9' => scan.buffer.push(c),
                'i' => {
                    scan.buffer.push(c);
                    scan.number = false;
                    if scan.has_imaginary {
                        scan.complex = false;
                        break;
                    }
                    scan.has_imaginary = true;
                }
                other => {
                    scan.buffer.push(other);
                    scan.complex = false;
                    scan.number = false;
                    if scan.position == SCAN_CUTOFF {
                        break;
                    }
                }
            }
            scan.position += 1;
        }

        scan
    }
}

/// Normalises thousands/decimal separators and a trailing sign.
fn normalise(input: &str) -> String {
    let last_period = input.rfind('.');
    let last_comma = input.rfind(',');

    let mut normalised = match (last_period, last_comma) {
        (Some(period), Some(comma)) if comma > period => input
            .chars()
            .map(|c| match c {
                ',' => '.',
                '.' => ',',
                other => other,
            })
            .collect(),
        _ if input.matches('.').count() > 1 => input.replace('.', ""),
        _ => input.to_string(),
    };

    if let Some(sign) = normalised.chars().last().filter(|c| *c == '-' || *c == '+') {
        normalised.pop();
        normalised.insert(0, sign);
    }
    normalised
}

/// Splits `a<sep>bi` or `bi<sep>a` into a complex number.
fn split_complex(buffer: &str, separator: char) -> Option<Complex> {
    let parts: Vec<&str> = buffer.split(separator).collect();
    if parts.len() != 2 {
        return None;
    }
    let sign = if separator == '-' { -1.0 } else { 1.0 };

    if parts[0].ends_with('i') {
        let re: f64 = parts[1].parse().ok()?;
        let im: f64 = parts[0].trim_matches('i').parse().ok()?;
        Some(Complex::new(sign * re, im))
    } else if parts[1].ends_with('i') {
        let re: f64 = parts[0].parse().ok()?;
        let im: f64 = parts[1].trim_matches('i').parse().ok()?;
        Some(Complex::new(re, sign * im))
    } else {
        None
    }
}

/// Best-effort date/time parse over a fixed list of layouts.
pub fn parse_datetime(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(t) = DateTime::parse_from_rfc3339(input) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_rfc2822(input) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ZONED_FORMATS {
        if let Ok(t) = DateTime::parse_from_str(input, format) {
            return Some(t.with_timezone(&Utc));
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(input, format) {
            return Some(t.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(input, format) {
            return d.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
        }
    }
    None
}

/// Converts a raw string into its best-fit typed value.
///
/// Tries, in order: complex, integer or float, boolean, date/time (as Unix
/// epoch milliseconds), and finally falls back to the input string. Returns
/// `None` only for input with nothing to scan.
pub fn parse_typed_value(input: &str) -> Option<Value> {
    if input.is_empty() {
        return None;
    }

    let normalised = normalise(input);
    let mut scan = Scan::run(&normalised);
    if scan.position == 0 {
        return None;
    }
    trace!(input, buffer = %scan.buffer, "scanned typed value candidate");

    if scan.complex {
        if let Some(c) =
            split_complex(&scan.buffer, '+').or_else(|| split_complex(&scan.buffer, '-'))
        {
            return Some(Value::Complex(c));
        }
    }

    if scan.leading_zero {
        scan.number = false;
    }
    if scan.number {
        if scan.decimals > 0 {
            if let Ok(f) = scan.buffer.parse::<f64>() {
                return Some(Value::Float(f));
            }
        }
        if let Ok(i) = scan.buffer.parse::<i64>() {
            return Some(Value::Int(i));
        }
    }

    if scan.buffer.len() < BOOL_CANDIDATE_MAX_LEN {
        match scan.buffer.to_lowercase().as_str() {
            "true" => return Some(Value::Bool(true)),
            "false" => return Some(Value::Bool(false)),
            _ => {}
        }
    }

    if input.len() < DATE_CANDIDATE_MAX_LEN {
        if let Some(t) = parse_datetime(input).filter(|t| t.year() != 0) {
            return Some(Value::Int(t.timestamp_millis()));
        }
    }

    Some(Value::String(input.to_string()))
}
