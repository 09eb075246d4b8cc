//! The value representation carried by every metric sample.
//!
//! A `Metric` is either in its native representation, where times and
//! durations are `chrono` values, or in its JSON representation, where they
//! are decimal literals. `Metric::to_json` and `Metric::to_native` move a
//! metric between the two in place.

use chrono::{DateTime, Utc};
use duration;
use error::Error;
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json;
use std::collections::HashMap;
use std::slice;
use types::Kind;
use units::Unit;

#[cfg(test)]
mod arbitrary;
mod convert;
mod distribution;
mod value;

pub use self::convert::check_native;
pub use self::distribution::{exponential_bounds, linear_bounds, Distribution, RangeWithCount};
pub use self::value::{List, Value};
pub(crate) use self::value::LIST_TAG;

/// When a metric's value was taken.
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    /// No timestamp. Written to JSON as the empty string.
    None,
    /// Native form.
    Time(DateTime<Utc>),
    /// JSON form: seconds since the epoch with nine fractional digits.
    Literal(String),
}

impl Timestamp {
    /// True for `Timestamp::None`.
    pub fn is_none(&self) -> bool {
        *self == Timestamp::None
    }

    fn instant(&self) -> Result<Option<DateTime<Utc>>, Error> {
        match *self {
            Timestamp::None => Ok(None),
            Timestamp::Time(t) => Ok(Some(t)),
            Timestamp::Literal(ref s) => Ok(Some(duration::parse_time(s)?)),
        }
    }

    fn to_json(&self) -> Result<Option<Timestamp>, Error> {
        match *self {
            Timestamp::None => Ok(None),
            Timestamp::Time(ref t) => Ok(Some(Timestamp::Literal(duration::format_time(t)))),
            Timestamp::Literal(_) => Err(Error::ValueMismatch {
                kind: Kind::Time,
                sub_type: Kind::Unknown,
            }),
        }
    }

    fn to_native(&self) -> Result<Option<Timestamp>, Error> {
        match *self {
            Timestamp::None => Ok(None),
            Timestamp::Literal(ref s) => Ok(Some(Timestamp::Time(duration::parse_time(s)?))),
            Timestamp::Time(_) => Err(Error::ValueMismatch {
                kind: Kind::Time,
                sub_type: Kind::Unknown,
            }),
        }
    }
}

impl Default for Timestamp {
    fn default() -> Timestamp {
        Timestamp::None
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match *self {
            Timestamp::None => serializer.serialize_str(""),
            Timestamp::Time(ref t) => serializer.serialize_str(&duration::format_time(t)),
            Timestamp::Literal(ref s) => serializer.serialize_str(s),
        }
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// A single metric sample.
///
/// The shape of `value` is dictated by `kind` and `sub_type`; see `Value`
/// for the table. Metrics sharing a `group_id` always share a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    /// The absolute path to this metric
    pub path: String,
    /// The description of this metric
    pub description: String,
    /// The unit of measurement this metric represents
    #[serde(skip_serializing_if = "Unit::is_none")]
    pub unit: Unit,
    /// The metric's type
    pub kind: Kind,
    /// The element kind if `kind` is `Kind::List`
    #[serde(rename = "subType", skip_serializing_if = "Kind::is_unknown")]
    pub sub_type: Kind,
    /// The size in bits of the value for the integer and float kinds
    #[serde(skip_serializing_if = "is_zero")]
    pub bits: u32,
    /// The value
    pub value: Value,
    /// When the value was taken
    pub timestamp: Timestamp,
    /// The metric's region. All metrics of a group share a timestamp.
    #[serde(rename = "groupId")]
    pub group_id: i64,
}

#[derive(Deserialize)]
struct RawMetric {
    path: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    unit: Unit,
    kind: Kind,
    #[serde(rename = "subType", default)]
    sub_type: Kind,
    #[serde(default)]
    bits: u32,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(rename = "groupId", default)]
    group_id: i64,
}

// Decoding is driven by kind and sub type: the same JSON payload means
// different things for different kinds. The result is in JSON form.
impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D>(deserializer: D) -> Result<Metric, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawMetric::deserialize(deserializer)?;
        let value = Value::from_json(raw.kind, raw.sub_type, raw.value).map_err(de::Error::custom)?;
        let timestamp = match raw.timestamp {
            Some(ref s) if !s.is_empty() => Timestamp::Literal(s.clone()),
            _ => Timestamp::None,
        };
        Ok(Metric {
            path: raw.path,
            description: raw.description,
            unit: raw.unit,
            kind: raw.kind,
            sub_type: raw.sub_type,
            bits: raw.bits,
            value: value,
            timestamp: timestamp,
            group_id: raw.group_id,
        })
    }
}

impl Metric {
    /// Create a native metric. Kind, sub type and bits follow from `value`.
    pub fn new<S>(path: S, value: Value) -> Metric
    where
        S: Into<String>,
    {
        let (kind, sub_type) = value.kinds();
        Metric {
            path: path.into(),
            description: String::new(),
            unit: Unit::None,
            kind: kind,
            sub_type: sub_type,
            bits: kind.bits(),
            value: value,
            timestamp: Timestamp::None,
            group_id: 0,
        }
    }

    /// Set the description of the Metric
    pub fn description<S>(mut self, description: S) -> Metric
    where
        S: Into<String>,
    {
        self.description = description.into();
        self
    }

    /// Set the unit of the Metric
    pub fn unit(mut self, unit: Unit) -> Metric {
        self.unit = unit;
        self
    }

    /// Set the native timestamp of the Metric
    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Metric {
        self.timestamp = Timestamp::Time(ts);
        self
    }

    /// Set the group of the Metric
    pub fn group_id(mut self, group_id: i64) -> Metric {
        self.group_id = group_id;
        self
    }

    /// Rewrite this metric in place into its JSON representation.
    ///
    /// On error the metric is left as it was.
    pub fn to_json(&mut self) -> Result<(), Error> {
        let value = convert::to_json(self.kind, self.sub_type, &self.value)?;
        let timestamp = self.timestamp.to_json()?;
        self.replace(value, timestamp);
        Ok(())
    }

    /// Rewrite this metric in place into its native representation.
    ///
    /// On error the metric is left as it was.
    pub fn to_native(&mut self) -> Result<(), Error> {
        let value = convert::to_native(self.kind, self.sub_type, &self.value)?;
        let timestamp = self.timestamp.to_native()?;
        self.replace(value, timestamp);
        Ok(())
    }

    fn replace(&mut self, value: Option<Value>, timestamp: Option<Timestamp>) {
        if let Some(value) = value {
            self.value = value;
        }
        if let Some(timestamp) = timestamp {
            self.timestamp = timestamp;
        }
    }
}

/// The canonical empty value for a kind.
///
/// `sub_type` is consulted only for `Kind::List`, giving the empty list of
/// that element kind. A distribution's zero value is `Value::Dist(None)`: no
/// distribution yet, not an empty one.
pub fn zero_value(kind: Kind, sub_type: Kind) -> Result<Value, Error> {
    Ok(match kind {
        Kind::Bool => Value::Bool(false),
        Kind::Int8 => Value::Int8(0),
        Kind::Int16 => Value::Int16(0),
        Kind::Int32 => Value::Int32(0),
        Kind::Int64 => Value::Int64(0),
        Kind::Uint8 => Value::Uint8(0),
        Kind::Uint16 => Value::Uint16(0),
        Kind::Uint32 => Value::Uint32(0),
        Kind::Uint64 => Value::Uint64(0),
        Kind::Float32 => Value::Float32(0.0),
        Kind::Float64 => Value::Float64(0.0),
        Kind::String => Value::String(String::new()),
        Kind::Dist => Value::Dist(None),
        Kind::Time => Value::Time(duration::epoch()),
        Kind::Duration => Value::Duration(::chrono::Duration::zero()),
        Kind::List => Value::List(List::empty(sub_type)?),
        Kind::Unknown => return Err(Error::UnsupportedKind(kind)),
    })
}

/// An ordered collection of metrics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricList(pub Vec<Metric>);

impl MetricList {
    /// Create an empty MetricList
    pub fn new() -> MetricList {
        MetricList::default()
    }

    /// Append a metric
    pub fn push(&mut self, metric: Metric) {
        self.0.push(metric)
    }

    /// Number of metrics held
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no metrics are held
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the metrics in order
    pub fn iter(&self) -> slice::Iter<Metric> {
        self.0.iter()
    }

    /// Look a metric up by its path.
    pub fn find(&self, path: &str) -> Result<&Metric, Error> {
        self.0
            .iter()
            .find(|m| m.path == path)
            .ok_or(Error::MetricNotFound)
    }

    /// Convert every metric to JSON. Stops at the first failure; metrics
    /// before it have been converted.
    pub fn to_json(&mut self) -> Result<(), Error> {
        for metric in &mut self.0 {
            metric.to_json()?;
        }
        Ok(())
    }

    /// Convert every metric to native. Stops at the first failure; metrics
    /// before it have been converted.
    pub fn to_native(&mut self) -> Result<(), Error> {
        for metric in &mut self.0 {
            metric.to_native()?;
        }
        Ok(())
    }

    /// Verify that metrics sharing a group id share a timestamp.
    ///
    /// Timestamps are compared as instants, so the list may mix native and
    /// JSON forms. A malformed literal fails the check.
    pub fn check_groups(&self) -> Result<(), Error> {
        let mut seen: HashMap<i64, Option<DateTime<Utc>>> = HashMap::new();
        for metric in &self.0 {
            let instant = metric.timestamp.instant()?;
            let ts = seen.entry(metric.group_id).or_insert(instant);
            if *ts != instant {
                debug!(
                    "group {} timestamp mismatch at {}",
                    metric.group_id, metric.path
                );
                return Err(Error::GroupTimestampMismatch(metric.group_id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use quickcheck::{QuickCheck, TestResult};
    use serde_json;

    #[test]
    fn native_json_native_round_trip() {
        fn inner(m: Metric) -> TestResult {
            let mut json = m.clone();
            json.to_json().unwrap();
            let mut native = json.clone();
            native.to_native().unwrap();
            let mut again = native.clone();
            again.to_json().unwrap();
            TestResult::from_bool(native == m && again == json)
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(Metric) -> TestResult);
    }

    #[test]
    fn serde_round_trip() {
        fn inner(m: Metric) -> TestResult {
            let text = serde_json::to_string(&m).unwrap();
            let mut decoded: Metric = serde_json::from_str(&text).unwrap();
            decoded.to_native().unwrap();
            TestResult::from_bool(decoded == m)
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(Metric) -> TestResult);
    }

    #[test]
    fn boundary_literals_round_trip() {
        let mut m = Metric::new("/epoch", Value::Time(duration::epoch()));
        m.to_json().unwrap();
        assert_eq!(m.value, Value::String("0.000000000".to_string()));
        m.to_native().unwrap();
        assert_eq!(m.value, Value::Time(duration::epoch()));

        let d = -(Duration::seconds(1) + Duration::milliseconds(500));
        let mut m = Metric::new("/neg", Value::Duration(d));
        m.to_json().unwrap();
        assert_eq!(m.value, Value::String("-1.500000000".to_string()));
        m.to_native().unwrap();
        assert_eq!(m.value, Value::Duration(d));
    }

    #[test]
    fn new_derives_kinds() {
        let m = Metric::new("/a", Value::Float32(1.0));
        assert_eq!(m.kind, Kind::Float32);
        assert_eq!(m.sub_type, Kind::Unknown);
        assert_eq!(m.bits, 32);
        let m = Metric::new("/b", Value::List(List::Uint16(vec![1, 2])));
        assert_eq!(m.kind, Kind::List);
        assert_eq!(m.sub_type, Kind::Uint16);
        assert_eq!(m.bits, 0);
    }

    #[test]
    fn absent_timestamp_stays_absent() {
        let mut m = Metric::new("/a", Value::Bool(true));
        m.to_json().unwrap();
        assert_eq!(m.timestamp, Timestamp::None);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["timestamp"], "");
        let mut back: Metric = serde_json::from_value(json).unwrap();
        assert_eq!(back.timestamp, Timestamp::None);
        back.to_native().unwrap();
        assert_eq!(back.timestamp, Timestamp::None);
    }

    #[test]
    fn failed_conversion_leaves_metric_alone() {
        let mut m = Metric::new("/a", Value::Int32(3));
        m.timestamp = Timestamp::Literal("not a time".to_string());
        let before = m.clone();
        assert!(m.to_native().is_err());
        assert_eq!(m, before);

        let mut m = Metric::new("/b", Value::Duration(Duration::seconds(1)));
        m.timestamp = Timestamp::Literal("1.000000000".to_string());
        let before = m.clone();
        assert!(m.to_json().is_err());
        assert_eq!(m, before);
    }

    #[test]
    fn json_schema_field_names() {
        let m = Metric::new("/proc/cpu", Value::List(List::Int8(vec![1, -1])))
            .description("cpu")
            .unit(Unit::Millisecond)
            .group_id(7);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["path"], "/proc/cpu");
        assert_eq!(json["description"], "cpu");
        assert_eq!(json["unit"], "Milliseconds");
        assert_eq!(json["kind"], "list");
        assert_eq!(json["subType"], "int8");
        assert_eq!(json["value"], json!([1, -1]));
        assert_eq!(json["timestamp"], "");
        assert_eq!(json["groupId"], 7);
        assert!(json.get("bits").is_none());

        let m = Metric::new("/x", Value::Uint32(5));
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("unit").is_none());
        assert!(json.get("subType").is_none());
        assert_eq!(json["bits"], 32);
    }

    #[test]
    fn zero_values() {
        assert_eq!(zero_value(Kind::Dist, Kind::Unknown).unwrap(), Value::Dist(None));
        assert_ne!(
            zero_value(Kind::Dist, Kind::Unknown).unwrap(),
            Value::Dist(Some(Box::new(Distribution::new(&[]).unwrap())))
        );
        assert_eq!(zero_value(Kind::Uint64, Kind::Unknown).unwrap(), Value::Uint64(0));
        assert_eq!(
            zero_value(Kind::String, Kind::Unknown).unwrap(),
            Value::String(String::new())
        );
        assert_eq!(
            zero_value(Kind::Duration, Kind::Unknown).unwrap(),
            Value::Duration(Duration::zero())
        );
        assert_eq!(
            zero_value(Kind::List, Kind::Time).unwrap(),
            Value::List(List::Time(vec![]))
        );
        match zero_value(Kind::Unknown, Kind::Unknown) {
            Err(Error::UnsupportedKind(Kind::Unknown)) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(zero_value(Kind::List, Kind::Dist).is_err());
    }

    #[test]
    fn zero_values_are_native() {
        for kind in &[Kind::Bool, Kind::Int8, Kind::Float64, Kind::Dist, Kind::Time] {
            let zero = zero_value(*kind, Kind::Unknown).unwrap();
            assert!(check_native(*kind, Kind::Unknown, &zero).is_ok());
        }
    }

    #[test]
    fn find_by_path() {
        let mut list = MetricList::new();
        list.push(Metric::new("/a", Value::Bool(true)));
        list.push(Metric::new("/b", Value::Int64(2)));
        assert_eq!(list.find("/b").unwrap().value, Value::Int64(2));
        match list.find("/c") {
            Err(Error::MetricNotFound) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn groups_share_timestamps() {
        let t0 = Utc.timestamp_opt(10, 0).single().unwrap();
        let t1 = Utc.timestamp_opt(11, 0).single().unwrap();
        let mut list = MetricList::new();
        list.push(Metric::new("/a", Value::Bool(true)).group_id(1).timestamp(t0));
        list.push(Metric::new("/b", Value::Bool(true)).group_id(1).timestamp(t0));
        list.push(Metric::new("/c", Value::Bool(true)).group_id(2).timestamp(t1));
        assert!(list.check_groups().is_ok());
        list.push(Metric::new("/d", Value::Bool(true)).group_id(2).timestamp(t0));
        match list.check_groups() {
            Err(Error::GroupTimestampMismatch(2)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn groups_compare_instants_across_forms() {
        let t0 = Utc.timestamp_opt(10, 5).single().unwrap();
        let mut list = MetricList::new();
        list.push(Metric::new("/a", Value::Bool(true)).group_id(3).timestamp(t0));
        let mut json_form = Metric::new("/b", Value::Bool(false)).group_id(3);
        json_form.timestamp = Timestamp::Literal("10.000000005".to_string());
        list.push(json_form);
        assert!(list.check_groups().is_ok());

        let mut other = Metric::new("/c", Value::Bool(false)).group_id(3);
        other.timestamp = Timestamp::Literal("10.000000006".to_string());
        list.push(other);
        match list.check_groups() {
            Err(Error::GroupTimestampMismatch(3)) => {}
            r => panic!("unexpected {:?}", r),
        }

        let mut broken = MetricList::new();
        let mut m = Metric::new("/d", Value::Bool(true));
        m.timestamp = Timestamp::Literal("ten".to_string());
        broken.push(m);
        assert!(broken.check_groups().is_err());
    }

    #[test]
    fn non_finite_metric_stays_native() {
        let mut m = Metric::new("/nan", Value::Float64(::std::f64::NAN));
        match m.to_json() {
            Err(Error::NonFinite(Kind::Float64)) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(m.kind, Kind::Float64);
        match m.value {
            Value::Float64(f) => assert!(f.is_nan()),
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn list_serializes_as_array() {
        let mut list = MetricList::new();
        list.push(Metric::new("/a", Value::Time(duration::epoch())));
        let text = serde_json::to_string(&list).unwrap();
        assert!(text.starts_with('['));
        let mut back: MetricList = serde_json::from_str(&text).unwrap();
        back.to_native().unwrap();
        assert_eq!(back, list);
    }
}
