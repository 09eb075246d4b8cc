use chrono::{DateTime, Duration, Utc};
use duration;
use error::Error;
use messages::Distribution;
use serde::ser::{Serialize, Serializer};
use serde_json;
use std::convert::TryFrom;
use types::Kind;

/// The payload of a metric.
///
/// Which variant a metric carries is dictated by its kind and sub type and
/// by the representation the metric is currently in:
///
/// | Kind         | Native                  | JSON                       |
/// |--------------|-------------------------|----------------------------|
/// | scalars      | the scalar variant      | the same                   |
/// | Dist         | `Dist`                  | `Dist`                     |
/// | Time         | `Time`                  | `String` literal           |
/// | Duration     | `Duration`              | `String` literal           |
/// | List<Time>   | `List(List::Time)`      | `List(List::String)`       |
/// | List<Dur.>   | `List(List::Duration)`  | `List(List::String)`       |
/// | List<other>  | `List(List::<other>)`   | the same                   |
///
/// Literals are described in the `duration` module.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Kind::Bool
    Bool(bool),
    /// Kind::Int8
    Int8(i8),
    /// Kind::Int16
    Int16(i16),
    /// Kind::Int32
    Int32(i32),
    /// Kind::Int64
    Int64(i64),
    /// Kind::Uint8
    Uint8(u8),
    /// Kind::Uint16
    Uint16(u16),
    /// Kind::Uint32
    Uint32(u32),
    /// Kind::Uint64
    Uint64(u64),
    /// Kind::Float32
    Float32(f32),
    /// Kind::Float64
    Float64(f64),
    /// Kind::String, or a Time / Duration literal in JSON form
    String(String),
    /// Kind::Dist. `None` is "no distribution yet", distinct from an empty
    /// distribution.
    Dist(Option<Box<Distribution>>),
    /// Kind::Time in native form
    Time(DateTime<Utc>),
    /// Kind::Duration in native form
    Duration(Duration),
    /// Kind::List
    List(List),
}

/// An ordered sequence of values of one element kind.
#[derive(Debug, Clone, PartialEq)]
pub enum List {
    /// `[]bool`
    Bool(Vec<bool>),
    /// `[]i8`
    Int8(Vec<i8>),
    /// `[]i16`
    Int16(Vec<i16>),
    /// `[]i32`
    Int32(Vec<i32>),
    /// `[]i64`
    Int64(Vec<i64>),
    /// `[]u8`
    Uint8(Vec<u8>),
    /// `[]u16`
    Uint16(Vec<u16>),
    /// `[]u32`
    Uint32(Vec<u32>),
    /// `[]u64`
    Uint64(Vec<u64>),
    /// `[]f32`
    Float32(Vec<f32>),
    /// `[]f64`
    Float64(Vec<f64>),
    /// Strings, or Time / Duration literals in JSON form
    String(Vec<String>),
    /// Native times
    Time(Vec<DateTime<Utc>>),
    /// Native durations
    Duration(Vec<Duration>),
}

impl Value {
    /// The kind and sub type this value has when read as native.
    pub fn kinds(&self) -> (Kind, Kind) {
        match *self {
            Value::List(ref list) => (Kind::List, list.kind()),
            ref scalar => (scalar.scalar_kind().unwrap_or(Kind::Unknown), Kind::Unknown),
        }
    }

    /// The kind of a non-list value when read as native.
    pub(crate) fn scalar_kind(&self) -> Option<Kind> {
        Some(match *self {
            Value::Bool(_) => Kind::Bool,
            Value::Int8(_) => Kind::Int8,
            Value::Int16(_) => Kind::Int16,
            Value::Int32(_) => Kind::Int32,
            Value::Int64(_) => Kind::Int64,
            Value::Uint8(_) => Kind::Uint8,
            Value::Uint16(_) => Kind::Uint16,
            Value::Uint32(_) => Kind::Uint32,
            Value::Uint64(_) => Kind::Uint64,
            Value::Float32(_) => Kind::Float32,
            Value::Float64(_) => Kind::Float64,
            Value::String(_) => Kind::String,
            Value::Dist(_) => Kind::Dist,
            Value::Time(_) => Kind::Time,
            Value::Duration(_) => Kind::Duration,
            Value::List(_) => return None,
        })
    }

    /// Single byte naming the variant on the native wire: the kind tag for
    /// non-lists, `0x80 | element tag` for lists.
    pub fn tag(&self) -> u8 {
        match *self {
            Value::List(ref list) => LIST_TAG | list.kind().tag(),
            ref scalar => scalar.scalar_kind().unwrap_or(Kind::Unknown).tag(),
        }
    }

    /// Decode a raw JSON payload as the JSON representation of `kind` /
    /// `sub_type`.
    pub fn from_json(kind: Kind, sub_type: Kind, json: serde_json::Value) -> Result<Value, Error> {
        let json_kind = (kind, sub_type);
        Ok(match kind {
            Kind::Bool => Value::Bool(as_bool(json_kind, &json)?),
            Kind::Int8 => Value::Int8(as_int(json_kind, &json)?),
            Kind::Int16 => Value::Int16(as_int(json_kind, &json)?),
            Kind::Int32 => Value::Int32(as_int(json_kind, &json)?),
            Kind::Int64 => Value::Int64(as_int(json_kind, &json)?),
            Kind::Uint8 => Value::Uint8(as_uint(json_kind, &json)?),
            Kind::Uint16 => Value::Uint16(as_uint(json_kind, &json)?),
            Kind::Uint32 => Value::Uint32(as_uint(json_kind, &json)?),
            Kind::Uint64 => Value::Uint64(as_uint(json_kind, &json)?),
            Kind::Float32 => Value::Float32(as_f32(json_kind, &json)?),
            Kind::Float64 => Value::Float64(as_float(json_kind, &json)?),
            Kind::String | Kind::Time | Kind::Duration => {
                Value::String(as_string(json_kind, &json)?)
            }
            Kind::Dist => {
                if json.is_null() {
                    Value::Dist(None)
                } else {
                    let dist: Distribution = serde_json::from_value(json)?;
                    dist.validate()?;
                    Value::Dist(Some(Box::new(dist)))
                }
            }
            Kind::List => {
                let items = match json {
                    serde_json::Value::Null => Vec::new(),
                    serde_json::Value::Array(items) => items,
                    _ => return Err(mismatch(json_kind)),
                };
                Value::List(List::from_json(sub_type, &items)?)
            }
            Kind::Unknown => return Err(Error::UnsupportedKind(kind)),
        })
    }
}

pub(crate) const LIST_TAG: u8 = 0x80;

impl List {
    /// The element kind when read as native.
    pub fn kind(&self) -> Kind {
        match *self {
            List::Bool(_) => Kind::Bool,
            List::Int8(_) => Kind::Int8,
            List::Int16(_) => Kind::Int16,
            List::Int32(_) => Kind::Int32,
            List::Int64(_) => Kind::Int64,
            List::Uint8(_) => Kind::Uint8,
            List::Uint16(_) => Kind::Uint16,
            List::Uint32(_) => Kind::Uint32,
            List::Uint64(_) => Kind::Uint64,
            List::Float32(_) => Kind::Float32,
            List::Float64(_) => Kind::Float64,
            List::String(_) => Kind::String,
            List::Time(_) => Kind::Time,
            List::Duration(_) => Kind::Duration,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match *self {
            List::Bool(ref v) => v.len(),
            List::Int8(ref v) => v.len(),
            List::Int16(ref v) => v.len(),
            List::Int32(ref v) => v.len(),
            List::Int64(ref v) => v.len(),
            List::Uint8(ref v) => v.len(),
            List::Uint16(ref v) => v.len(),
            List::Uint32(ref v) => v.len(),
            List::Uint64(ref v) => v.len(),
            List::Float32(ref v) => v.len(),
            List::Float64(ref v) => v.len(),
            List::String(ref v) => v.len(),
            List::Time(ref v) => v.len(),
            List::Duration(ref v) => v.len(),
        }
    }

    /// True if the list holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The empty list of the given element kind.
    pub fn empty(element: Kind) -> Result<List, Error> {
        Ok(match element {
            Kind::Bool => List::Bool(Vec::new()),
            Kind::Int8 => List::Int8(Vec::new()),
            Kind::Int16 => List::Int16(Vec::new()),
            Kind::Int32 => List::Int32(Vec::new()),
            Kind::Int64 => List::Int64(Vec::new()),
            Kind::Uint8 => List::Uint8(Vec::new()),
            Kind::Uint16 => List::Uint16(Vec::new()),
            Kind::Uint32 => List::Uint32(Vec::new()),
            Kind::Uint64 => List::Uint64(Vec::new()),
            Kind::Float32 => List::Float32(Vec::new()),
            Kind::Float64 => List::Float64(Vec::new()),
            Kind::String => List::String(Vec::new()),
            Kind::Time => List::Time(Vec::new()),
            Kind::Duration => List::Duration(Vec::new()),
            Kind::Unknown | Kind::Dist | Kind::List => {
                return Err(Error::UnsupportedSubType(element))
            }
        })
    }

    fn from_json(element: Kind, items: &[serde_json::Value]) -> Result<List, Error> {
        let json_kind = (Kind::List, element);
        macro_rules! collect {
            ($variant:ident, $extract:ident) => {
                List::$variant(
                    items
                        .iter()
                        .map(|item| $extract(json_kind, item))
                        .collect::<Result<Vec<_>, Error>>()?,
                )
            };
        }
        Ok(match element {
            Kind::Bool => collect!(Bool, as_bool),
            Kind::Int8 => collect!(Int8, as_int),
            Kind::Int16 => collect!(Int16, as_int),
            Kind::Int32 => collect!(Int32, as_int),
            Kind::Int64 => collect!(Int64, as_int),
            Kind::Uint8 => collect!(Uint8, as_uint),
            Kind::Uint16 => collect!(Uint16, as_uint),
            Kind::Uint32 => collect!(Uint32, as_uint),
            Kind::Uint64 => collect!(Uint64, as_uint),
            Kind::Float32 => collect!(Float32, as_f32),
            Kind::Float64 => collect!(Float64, as_float),
            Kind::String | Kind::Time | Kind::Duration => collect!(String, as_string),
            Kind::Unknown | Kind::Dist | Kind::List => {
                return Err(Error::UnsupportedSubType(element))
            }
        })
    }
}

fn mismatch((kind, sub_type): (Kind, Kind)) -> Error {
    Error::ValueMismatch {
        kind: kind,
        sub_type: sub_type,
    }
}

fn out_of_range((kind, sub_type): (Kind, Kind), json: &serde_json::Value) -> Error {
    Error::OutOfRange {
        kind: if kind == Kind::List { sub_type } else { kind },
        value: json.to_string(),
    }
}

fn as_bool(json_kind: (Kind, Kind), json: &serde_json::Value) -> Result<bool, Error> {
    json.as_bool().ok_or_else(|| mismatch(json_kind))
}

fn as_int<T>(json_kind: (Kind, Kind), json: &serde_json::Value) -> Result<T, Error>
where
    T: TryFrom<i64>,
{
    if json.is_u64() && json.as_i64().is_none() {
        return Err(out_of_range(json_kind, json));
    }
    let n = json.as_i64().ok_or_else(|| mismatch(json_kind))?;
    T::try_from(n).map_err(|_| out_of_range(json_kind, json))
}

fn as_uint<T>(json_kind: (Kind, Kind), json: &serde_json::Value) -> Result<T, Error>
where
    T: TryFrom<u64>,
{
    if json.is_i64() && json.as_u64().is_none() {
        return Err(out_of_range(json_kind, json));
    }
    let n = json.as_u64().ok_or_else(|| mismatch(json_kind))?;
    T::try_from(n).map_err(|_| out_of_range(json_kind, json))
}

fn as_float(json_kind: (Kind, Kind), json: &serde_json::Value) -> Result<f64, Error> {
    json.as_f64().ok_or_else(|| mismatch(json_kind))
}

fn as_f32(json_kind: (Kind, Kind), json: &serde_json::Value) -> Result<f32, Error> {
    let n = as_float(json_kind, json)?;
    let f = n as f32;
    if n.is_finite() && !f.is_finite() {
        return Err(out_of_range(json_kind, json));
    }
    Ok(f)
}

fn as_string(json_kind: (Kind, Kind), json: &serde_json::Value) -> Result<String, Error> {
    json.as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| mismatch(json_kind))
}

// Native times and durations serialize as their literals, so a native metric
// written to JSON is indistinguishable from its converted form.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match *self {
            Value::Bool(v) => serializer.serialize_bool(v),
            Value::Int8(v) => serializer.serialize_i8(v),
            Value::Int16(v) => serializer.serialize_i16(v),
            Value::Int32(v) => serializer.serialize_i32(v),
            Value::Int64(v) => serializer.serialize_i64(v),
            Value::Uint8(v) => serializer.serialize_u8(v),
            Value::Uint16(v) => serializer.serialize_u16(v),
            Value::Uint32(v) => serializer.serialize_u32(v),
            Value::Uint64(v) => serializer.serialize_u64(v),
            Value::Float32(v) => serializer.serialize_f32(v),
            Value::Float64(v) => serializer.serialize_f64(v),
            Value::String(ref v) => serializer.serialize_str(v),
            Value::Dist(None) => serializer.serialize_none(),
            Value::Dist(Some(ref dist)) => dist.serialize(serializer),
            Value::Time(ref t) => serializer.serialize_str(&duration::format_time(t)),
            Value::Duration(ref d) => serializer.serialize_str(&duration::format_duration(d)),
            Value::List(ref list) => list.serialize(serializer),
        }
    }
}

impl Serialize for List {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match *self {
            List::Bool(ref v) => v.serialize(serializer),
            List::Int8(ref v) => v.serialize(serializer),
            List::Int16(ref v) => v.serialize(serializer),
            List::Int32(ref v) => v.serialize(serializer),
            List::Int64(ref v) => v.serialize(serializer),
            List::Uint8(ref v) => v.serialize(serializer),
            List::Uint16(ref v) => v.serialize(serializer),
            List::Uint32(ref v) => v.serialize(serializer),
            List::Uint64(ref v) => v.serialize(serializer),
            List::Float32(ref v) => v.serialize(serializer),
            List::Float64(ref v) => v.serialize(serializer),
            List::String(ref v) => v.serialize(serializer),
            List::Time(ref v) => serializer.collect_seq(v.iter().map(duration::format_time)),
            List::Duration(ref v) => {
                serializer.collect_seq(v.iter().map(duration::format_duration))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json;

    #[test]
    fn native_kinds() {
        assert_eq!(Value::Uint16(3).kinds(), (Kind::Uint16, Kind::Unknown));
        assert_eq!(
            Value::List(List::Time(vec![])).kinds(),
            (Kind::List, Kind::Time)
        );
        assert_eq!(Value::Dist(None).kinds(), (Kind::Dist, Kind::Unknown));
    }

    #[test]
    fn list_tags_are_marked() {
        assert_eq!(Value::Int32(1).tag(), Kind::Int32.tag());
        assert_eq!(
            Value::List(List::Int32(vec![1])).tag(),
            0x80 | Kind::Int32.tag()
        );
    }

    #[test]
    fn decodes_json_by_kind() {
        let v = Value::from_json(Kind::Int8, Kind::Unknown, json!(-12)).unwrap();
        assert_eq!(v, Value::Int8(-12));
        let v = Value::from_json(Kind::Float32, Kind::Unknown, json!(1.5)).unwrap();
        assert_eq!(v, Value::Float32(1.5));
        let v = Value::from_json(Kind::Time, Kind::Unknown, json!("3.000000000")).unwrap();
        assert_eq!(v, Value::String("3.000000000".to_string()));
        let v = Value::from_json(Kind::List, Kind::Uint8, json!([1, 2, 255])).unwrap();
        assert_eq!(v, Value::List(List::Uint8(vec![1, 2, 255])));
        let v = Value::from_json(Kind::List, Kind::Bool, json!(null)).unwrap();
        assert_eq!(v, Value::List(List::Bool(vec![])));
        let v = Value::from_json(Kind::Dist, Kind::Unknown, json!(null)).unwrap();
        assert_eq!(v, Value::Dist(None));
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        match Value::from_json(Kind::Int8, Kind::Unknown, json!(300)) {
            Err(Error::OutOfRange { kind: Kind::Int8, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        match Value::from_json(Kind::List, Kind::Uint32, json!([1, -1])) {
            Err(Error::OutOfRange { kind: Kind::Uint32, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(Value::from_json(Kind::Int64, Kind::Unknown, json!(u64::max_value())).is_err());
        assert!(Value::from_json(Kind::Uint64, Kind::Unknown, json!(u64::max_value())).is_ok());
    }

    #[test]
    fn float32_overflow_is_rejected() {
        match Value::from_json(Kind::Float32, Kind::Unknown, json!(1e300)) {
            Err(Error::OutOfRange { kind: Kind::Float32, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        match Value::from_json(Kind::List, Kind::Float32, json!([1.5, -1e300])) {
            Err(Error::OutOfRange { kind: Kind::Float32, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        let max = json!(f64::from(::std::f32::MAX));
        let v = Value::from_json(Kind::Float32, Kind::Unknown, max).unwrap();
        assert_eq!(v, Value::Float32(::std::f32::MAX));
    }

    #[test]
    fn wrong_json_shape_is_a_mismatch() {
        match Value::from_json(Kind::Bool, Kind::Unknown, json!("true")) {
            Err(Error::ValueMismatch { kind: Kind::Bool, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(Value::from_json(Kind::Int32, Kind::Unknown, json!(1.5)).is_err());
        assert!(Value::from_json(Kind::List, Kind::Int32, json!(7)).is_err());
        match Value::from_json(Kind::List, Kind::Dist, json!([])) {
            Err(Error::UnsupportedSubType(Kind::Dist)) => {}
            other => panic!("unexpected {:?}", other),
        }
        match Value::from_json(Kind::Unknown, Kind::Unknown, json!(1)) {
            Err(Error::UnsupportedKind(Kind::Unknown)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn invalid_distribution_payload_is_rejected() {
        let payload = json!({
            "min": 0.0, "max": 0.0, "average": 0.0, "median": 0.0, "sum": 0.0,
            "count": 3, "generation": 1,
            "ranges": [{"lower": 0.0, "upper": 1.0, "count": 1},
                       {"lower": 1.0, "upper": 0.0, "count": 1}]
        });
        match Value::from_json(Kind::Dist, Kind::Unknown, payload) {
            Err(Error::InvalidDistribution(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn native_lists_serialize_as_literals() {
        let d = Duration::seconds(2);
        let v = Value::List(List::Duration(vec![d, -d]));
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            json!(["2.000000000", "-2.000000000"])
        );
    }
}
