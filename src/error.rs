//! Error conditions surfaced by the metric value model.

use serde_json;
use std::error;
use std::fmt;
use std::io;
use types::Kind;

/// Everything that can go wrong while converting, decoding or looking up a
/// metric.
#[derive(Debug)]
pub enum Error {
    /// No metric with the requested path exists.
    MetricNotFound,
    /// The kind is `Unknown` or not usable in this position.
    UnsupportedKind(Kind),
    /// The list element kind is not one a list may carry.
    UnsupportedSubType(Kind),
    /// A kind name or wire tag that is not part of the enumeration.
    UnrecognizedKind(String),
    /// The value does not have the shape dictated by kind and sub type.
    ValueMismatch {
        /// The declared kind
        kind: Kind,
        /// The declared sub type
        sub_type: Kind,
    },
    /// A time or duration literal that is not `[-]<seconds>.<9 digits>`.
    MalformedLiteral(String),
    /// A JSON number that does not fit the declared bit width.
    OutOfRange {
        /// The declared kind
        kind: Kind,
        /// The offending number, as written
        value: String,
    },
    /// A NaN or infinite float, which JSON cannot carry.
    NonFinite(Kind),
    /// Non-finite sample offered to a distribution.
    InvalidSample(f64),
    /// Distribution bookkeeping does not hold.
    InvalidDistribution(&'static str),
    /// Samples may only be removed from non-cumulative distributions.
    CumulativeDistribution,
    /// Metrics sharing a group id carry different timestamps.
    GroupTimestampMismatch(i64),
    /// The codec registry has no entry for this value tag.
    UnregisteredTag(u8),
    /// Bytes on the native wire are not valid UTF-8.
    Utf8,
    /// A configuration value is missing or of the wrong type.
    Config(String),
    /// Underlying I/O failure.
    Io(io::Error),
    /// Underlying JSON failure.
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::MetricNotFound => write!(f, "messages: No metric found."),
            Error::UnsupportedKind(kind) => write!(f, "unsupported kind: {:?}", kind),
            Error::UnsupportedSubType(kind) => {
                write!(f, "unsupported list sub type: {:?}", kind)
            }
            Error::UnrecognizedKind(ref name) => {
                write!(f, "unsupported kind: unrecognized {:?}", name)
            }
            Error::ValueMismatch { kind, sub_type } => write!(
                f,
                "value does not match kind {:?} / sub type {:?}",
                kind, sub_type
            ),
            Error::MalformedLiteral(ref lit) => {
                write!(f, "malformed time/duration literal: {:?}", lit)
            }
            Error::OutOfRange { kind, ref value } => {
                write!(f, "{} out of range for {:?}", value, kind)
            }
            Error::NonFinite(kind) => write!(f, "non-finite {:?} has no JSON form", kind),
            Error::InvalidSample(v) => write!(f, "invalid distribution sample: {}", v),
            Error::InvalidDistribution(why) => write!(f, "invalid distribution: {}", why),
            Error::CumulativeDistribution => {
                write!(f, "cannot remove values from a cumulative distribution")
            }
            Error::GroupTimestampMismatch(id) => {
                write!(f, "metrics in group {} disagree on timestamp", id)
            }
            Error::UnregisteredTag(tag) => write!(f, "no codec registered for tag {}", tag),
            Error::Utf8 => write!(f, "invalid utf-8 on the wire"),
            Error::Config(ref why) => write!(f, "configuration error: {}", why),
            Error::Io(ref e) => write!(f, "io error: {}", e),
            Error::Json(ref e) => write!(f, "json error: {}", e),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref e) => Some(e),
            Error::Json(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Json(e)
    }
}
