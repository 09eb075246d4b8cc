//! The textual encoding of times and durations.
//!
//! The JSON API carries both as seconds with exactly nine digits after the
//! decimal point: `"1234567890.999999999"`. Times are measured from the Unix
//! epoch. A negative value carries its sign on the whole literal, so one and
//! a half seconds before the epoch is `"-1.500000000"`. Parsing is exact;
//! exponents, a leading `+`, missing or extra fraction digits are all
//! rejected.

use chrono::{DateTime, Duration, TimeZone, Utc};
use error::Error;
use std::time::UNIX_EPOCH;

const NANOS_PER_SEC: u32 = 1_000_000_000;
const FRACTION_DIGITS: usize = 9;
// chrono durations are bounded by i64::MAX milliseconds
const MAX_SECONDS: u64 = (i64::max_value() / 1000) as u64;

fn literal(negative: bool, whole: u64, frac: u32) -> String {
    if negative && (whole != 0 || frac != 0) {
        format!("-{}.{:09}", whole, frac)
    } else {
        format!("{}.{:09}", whole, frac)
    }
}

fn malformed(s: &str) -> Error {
    Error::MalformedLiteral(s.to_string())
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Split a literal into its sign, whole seconds and nanoseconds.
fn parse_literal(s: &str) -> Result<(bool, u64, u32), Error> {
    let (negative, body) = if s.starts_with('-') {
        (true, &s[1..])
    } else {
        (false, s)
    };
    let mut parts = body.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let frac = match parts.next() {
        Some(frac) => frac,
        None => return Err(malformed(s)),
    };
    if !all_digits(whole) || !all_digits(frac) || frac.len() != FRACTION_DIGITS {
        return Err(malformed(s));
    }
    let whole: u64 = whole.parse().map_err(|_| malformed(s))?;
    let frac: u32 = frac.parse().map_err(|_| malformed(s))?;
    Ok((negative, whole, frac))
}

/// Encode a duration, preserving its sign.
pub fn format_duration(d: &Duration) -> String {
    let secs = d.num_seconds();
    let nanos = (*d - Duration::seconds(secs)).num_nanoseconds().unwrap_or(0);
    literal(
        secs < 0 || nanos < 0,
        secs.unsigned_abs(),
        nanos.unsigned_abs() as u32,
    )
}

/// Decode a duration literal.
pub fn parse_duration(s: &str) -> Result<Duration, Error> {
    let (negative, whole, frac) = parse_literal(s)?;
    if whole > MAX_SECONDS {
        return Err(malformed(s));
    }
    let d = Duration::seconds(whole as i64)
        .checked_add(&Duration::nanoseconds(i64::from(frac)))
        .ok_or_else(|| malformed(s))?;
    Ok(if negative { -d } else { d })
}

/// Encode an instant as seconds since the Unix epoch.
pub fn format_time(t: &DateTime<Utc>) -> String {
    let mut secs = t.timestamp();
    let mut nanos = t.timestamp_subsec_nanos();
    // leap seconds report nanos past one second
    if nanos >= NANOS_PER_SEC {
        secs += 1;
        nanos -= NANOS_PER_SEC;
    }
    if secs >= 0 {
        literal(false, secs as u64, nanos)
    } else if nanos == 0 {
        literal(true, secs.unsigned_abs(), 0)
    } else {
        literal(true, (secs + 1).unsigned_abs(), NANOS_PER_SEC - nanos)
    }
}

/// Decode an instant encoded as seconds since the Unix epoch.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, Error> {
    let (negative, whole, frac) = parse_literal(s)?;
    if whole > i64::max_value() as u64 {
        return Err(malformed(s));
    }
    let whole = whole as i64;
    let (secs, nanos) = match (negative, frac) {
        (false, _) => (whole, frac),
        (true, 0) => (-whole, 0),
        (true, _) => (-whole - 1, NANOS_PER_SEC - frac),
    };
    Utc.timestamp_opt(secs, nanos)
        .single()
        .ok_or_else(|| malformed(s))
}

/// The Unix epoch.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from(UNIX_EPOCH)
}
