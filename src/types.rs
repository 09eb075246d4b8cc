//! The kinds a metric value may take.
//!
//! `Kind` classifies the shape of a metric's value. For `Kind::List` the
//! element kind is carried separately as the metric's sub type; every other
//! kind ignores its sub type, which is conventionally `Kind::Unknown`.

use error::Error;
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The declared type of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// No kind; never a valid value kind.
    Unknown,
    /// `bool`
    Bool,
    /// `i8`
    Int8,
    /// `i16`
    Int16,
    /// `i32`
    Int32,
    /// `i64`
    Int64,
    /// `u8`
    Uint8,
    /// `u16`
    Uint16,
    /// `u32`
    Uint32,
    /// `u64`
    Uint64,
    /// `f32`
    Float32,
    /// `f64`
    Float64,
    /// UTF-8 text
    String,
    /// A `messages::Distribution`
    Dist,
    /// An instant in time
    Time,
    /// A signed span of time
    Duration,
    /// An ordered sequence whose element kind is the sub type
    List,
}

const ALL: [Kind; 17] = [
    Kind::Unknown,
    Kind::Bool,
    Kind::Int8,
    Kind::Int16,
    Kind::Int32,
    Kind::Int64,
    Kind::Uint8,
    Kind::Uint16,
    Kind::Uint32,
    Kind::Uint64,
    Kind::Float32,
    Kind::Float64,
    Kind::String,
    Kind::Dist,
    Kind::Time,
    Kind::Duration,
    Kind::List,
];

impl Kind {
    /// The name used for this kind in the JSON API.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Kind::Unknown => "",
            Kind::Bool => "bool",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::String => "string",
            Kind::Dist => "distribution",
            Kind::Time => "time",
            Kind::Duration => "duration",
            Kind::List => "list",
        }
    }

    /// Stable single byte identifying this kind on the native wire.
    pub fn tag(&self) -> u8 {
        match *self {
            Kind::Unknown => 0,
            Kind::Bool => 1,
            Kind::Int8 => 2,
            Kind::Int16 => 3,
            Kind::Int32 => 4,
            Kind::Int64 => 5,
            Kind::Uint8 => 6,
            Kind::Uint16 => 7,
            Kind::Uint32 => 8,
            Kind::Uint64 => 9,
            Kind::Float32 => 10,
            Kind::Float64 => 11,
            Kind::String => 12,
            Kind::Dist => 13,
            Kind::Time => 14,
            Kind::Duration => 15,
            Kind::List => 16,
        }
    }

    /// Inverse of `Kind::tag`.
    pub fn from_tag(tag: u8) -> Result<Kind, Error> {
        ALL.iter()
            .find(|k| k.tag() == tag)
            .cloned()
            .ok_or_else(|| Error::UnrecognizedKind(format!("tag {}", tag)))
    }

    /// The size in bits of the kind's value for the integer and float
    /// kinds, zero for all others.
    pub fn bits(&self) -> u32 {
        match *self {
            Kind::Int8 | Kind::Uint8 => 8,
            Kind::Int16 | Kind::Uint16 => 16,
            Kind::Int32 | Kind::Uint32 | Kind::Float32 => 32,
            Kind::Int64 | Kind::Uint64 | Kind::Float64 => 64,
            _ => 0,
        }
    }

    /// True for `Kind::Unknown`.
    pub fn is_unknown(&self) -> bool {
        *self == Kind::Unknown
    }

    /// Whether a list may carry elements of this kind.
    ///
    /// Lists hold scalars, times and durations. Lists of lists and lists of
    /// distributions are not representable.
    pub fn is_list_element(&self) -> bool {
        match *self {
            Kind::Unknown | Kind::Dist | Kind::List => false,
            _ => true,
        }
    }
}

impl Default for Kind {
    fn default() -> Kind {
        Kind::Unknown
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Kind, Error> {
        ALL.iter()
            .find(|k| k.as_str() == s)
            .cloned()
            .ok_or_else(|| Error::UnrecognizedKind(s.to_string()))
    }
}

impl Serialize for Kind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D>(deserializer: D) -> Result<Kind, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(de::Error::custom)
    }
}
