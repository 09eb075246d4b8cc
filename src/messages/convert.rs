//! The conversion engine between native and JSON payloads.
//!
//! Both directions are strict. A payload already in the target shape, or in
//! no recognized shape at all, is a mismatch rather than a pass-through. The
//! functions here never touch the metric; they return the replacement value,
//! or `None` when the payload's shape is identical in both representations.

use duration;
use error::Error;
use messages::value::{List, Value};
use types::Kind;

fn mismatch(kind: Kind, sub_type: Kind) -> Error {
    Error::ValueMismatch {
        kind: kind,
        sub_type: sub_type,
    }
}

fn check_kinds(kind: Kind, sub_type: Kind) -> Result<(), Error> {
    match kind {
        Kind::Unknown => Err(Error::UnsupportedKind(kind)),
        Kind::List if !sub_type.is_list_element() => Err(Error::UnsupportedSubType(sub_type)),
        _ => Ok(()),
    }
}

/// Scalars, strings and distributions look the same in both forms.
fn shared_shape(kind: Kind, sub_type: Kind, value: &Value) -> Result<Option<Value>, Error> {
    match (kind, value.scalar_kind()) {
        (Kind::Time, _) | (Kind::Duration, _) => Err(mismatch(kind, sub_type)),
        (kind, Some(found)) if kind == found => Ok(None),
        _ => Err(mismatch(kind, sub_type)),
    }
}

/// NaN and infinities have no JSON form.
fn check_finite(value: &Value) -> Result<(), Error> {
    let finite = match *value {
        Value::Float32(f) => f.is_finite(),
        Value::Float64(f) => f.is_finite(),
        Value::List(List::Float32(ref fs)) => fs.iter().all(|f| f.is_finite()),
        Value::List(List::Float64(ref fs)) => fs.iter().all(|f| f.is_finite()),
        _ => true,
    };
    if finite {
        Ok(())
    } else {
        let (kind, sub_type) = value.kinds();
        Err(Error::NonFinite(if kind == Kind::List { sub_type } else { kind }))
    }
}

/// Compute the JSON payload for a native payload.
pub fn to_json(kind: Kind, sub_type: Kind, value: &Value) -> Result<Option<Value>, Error> {
    check_kinds(kind, sub_type)?;
    check_finite(value)?;
    match (kind, value) {
        (Kind::Time, &Value::Time(ref t)) => Ok(Some(Value::String(duration::format_time(t)))),
        (Kind::Duration, &Value::Duration(ref d)) => {
            Ok(Some(Value::String(duration::format_duration(d))))
        }
        (Kind::List, &Value::List(ref list)) => match (sub_type, list) {
            (Kind::Time, &List::Time(ref ts)) => Ok(Some(Value::List(List::String(
                ts.iter().map(duration::format_time).collect(),
            )))),
            (Kind::Duration, &List::Duration(ref ds)) => Ok(Some(Value::List(List::String(
                ds.iter().map(duration::format_duration).collect(),
            )))),
            (sub_type, list) if list.kind() == sub_type => Ok(None),
            _ => Err(mismatch(kind, sub_type)),
        },
        (Kind::List, _) => Err(mismatch(kind, sub_type)),
        (kind, value) => shared_shape(kind, sub_type, value),
    }
}

/// Compute the native payload for a JSON payload.
pub fn to_native(kind: Kind, sub_type: Kind, value: &Value) -> Result<Option<Value>, Error> {
    check_kinds(kind, sub_type)?;
    match (kind, value) {
        (Kind::Time, &Value::String(ref s)) => Ok(Some(Value::Time(duration::parse_time(s)?))),
        (Kind::Duration, &Value::String(ref s)) => {
            Ok(Some(Value::Duration(duration::parse_duration(s)?)))
        }
        (Kind::List, &Value::List(ref list)) => match (sub_type, list) {
            (Kind::Time, &List::String(ref lits)) => Ok(Some(Value::List(List::Time(
                lits.iter()
                    .map(|s| duration::parse_time(s))
                    .collect::<Result<Vec<_>, Error>>()?,
            )))),
            (Kind::Duration, &List::String(ref lits)) => Ok(Some(Value::List(List::Duration(
                lits.iter()
                    .map(|s| duration::parse_duration(s))
                    .collect::<Result<Vec<_>, Error>>()?,
            )))),
            (Kind::Time, _) | (Kind::Duration, _) => Err(mismatch(kind, sub_type)),
            (sub_type, list) if list.kind() == sub_type => Ok(None),
            _ => Err(mismatch(kind, sub_type)),
        },
        (Kind::List, _) => Err(mismatch(kind, sub_type)),
        (kind, value) => shared_shape(kind, sub_type, value),
    }
}

/// Succeeds when `value` is a well-formed native payload for the kinds.
pub fn check_native(kind: Kind, sub_type: Kind, value: &Value) -> Result<(), Error> {
    to_json(kind, sub_type, value).map(|_| ())
}
