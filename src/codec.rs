//! Native binary representation of metrics for the RPC transport.
//!
//! Every value variant is identified on the wire by a single tag byte (see
//! `Value::tag`). A `Registry` maps each tag to the pair of functions that
//! encode and decode it. `Registry::standard` knows every variant, including
//! times, durations and distributions; callers never pass per-value type
//! hints.
//!
//! A metric is framed as:
//!
//! ```text
//! | Length: u32, BigEndian | path | description | unit: u8 | kind: u8 |
//! | sub type: u8 | bits: u8 | group id: i64, BigEndian | timestamp | value |
//! ```
//!
//! Strings are a u32 length followed by UTF-8 bytes. The timestamp is a
//! presence byte optionally followed by i64 seconds and u32 nanoseconds. The
//! value is its tag followed by the variant's payload.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Duration, TimeZone, Utc};
use error::Error;
use messages::{check_native, Distribution, List, Metric, MetricList, RangeWithCount, Timestamp,
               Value, LIST_TAG};
use std::collections::HashMap;
use std::io;
use std::io::{Read, Write};
use types::Kind;
use units::Unit;

/// Frames larger than this are refused on decode.
pub const MAX_FRAME_BYTES: usize = 16 * 1_048_576;

/// Writes one value variant.
pub type EncodeFn = fn(&Value, &mut Vec<u8>) -> Result<(), Error>;
/// Reads one value variant, the tag having been consumed.
pub type DecodeFn = fn(&mut &[u8]) -> Result<Value, Error>;

/// Encode/decode pair for one value tag.
#[derive(Clone, Copy)]
pub struct Codec {
    /// Writes the payload
    pub encode: EncodeFn,
    /// Reads the payload
    pub decode: DecodeFn,
}

/// Map from value tag to codec.
pub struct Registry {
    codecs: HashMap<u8, Codec>,
}

fn invalid(why: &'static str) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::InvalidData, why))
}

fn wrong_variant(value: &Value) -> Error {
    let (kind, sub_type) = value.kinds();
    Error::ValueMismatch {
        kind: kind,
        sub_type: sub_type,
    }
}

fn put_len(buf: &mut Vec<u8>, len: usize) -> Result<(), Error> {
    if len > u32::max_value() as usize {
        return Err(invalid("length does not fit in u32"));
    }
    Ok(buf.write_u32::<BigEndian>(len as u32)?)
}

fn get_len(buf: &mut &[u8]) -> Result<usize, Error> {
    Ok(buf.read_u32::<BigEndian>()? as usize)
}

fn put_bool(buf: &mut Vec<u8>, v: &bool) -> Result<(), Error> {
    Ok(buf.write_u8(*v as u8)?)
}

fn get_bool(buf: &mut &[u8]) -> Result<bool, Error> {
    match buf.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(invalid("bool out of range")),
    }
}

fn put_i8(buf: &mut Vec<u8>, v: &i8) -> Result<(), Error> {
    Ok(buf.write_i8(*v)?)
}

fn get_i8(buf: &mut &[u8]) -> Result<i8, Error> {
    Ok(buf.read_i8()?)
}

fn put_u8(buf: &mut Vec<u8>, v: &u8) -> Result<(), Error> {
    Ok(buf.write_u8(*v)?)
}

fn get_u8(buf: &mut &[u8]) -> Result<u8, Error> {
    Ok(buf.read_u8()?)
}

macro_rules! number {
    ($put:ident, $get:ident, $t:ty, $write:ident, $read:ident) => {
        fn $put(buf: &mut Vec<u8>, v: &$t) -> Result<(), Error> {
            Ok(buf.$write::<BigEndian>(*v)?)
        }

        fn $get(buf: &mut &[u8]) -> Result<$t, Error> {
            Ok(buf.$read::<BigEndian>()?)
        }
    };
}

number!(put_i16, get_i16, i16, write_i16, read_i16);
number!(put_i32, get_i32, i32, write_i32, read_i32);
number!(put_i64, get_i64, i64, write_i64, read_i64);
number!(put_u16, get_u16, u16, write_u16, read_u16);
number!(put_u32, get_u32, u32, write_u32, read_u32);
number!(put_u64, get_u64, u64, write_u64, read_u64);
number!(put_f32, get_f32, f32, write_f32, read_f32);
number!(put_f64, get_f64, f64, write_f64, read_f64);

fn put_string(buf: &mut Vec<u8>, v: &String) -> Result<(), Error> {
    put_len(buf, v.len())?;
    buf.extend_from_slice(v.as_bytes());
    Ok(())
}

fn get_string(buf: &mut &[u8]) -> Result<String, Error> {
    let len = get_len(buf)?;
    if len > buf.len() {
        return Err(invalid("string runs past end of frame"));
    }
    let (bytes, rest) = buf.split_at(len);
    *buf = rest;
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::Utf8)
}

fn put_time(buf: &mut Vec<u8>, v: &DateTime<Utc>) -> Result<(), Error> {
    buf.write_i64::<BigEndian>(v.timestamp())?;
    Ok(buf.write_u32::<BigEndian>(v.timestamp_subsec_nanos())?)
}

fn get_time(buf: &mut &[u8]) -> Result<DateTime<Utc>, Error> {
    let secs = buf.read_i64::<BigEndian>()?;
    let nanos = buf.read_u32::<BigEndian>()?;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .ok_or_else(|| invalid("time out of range"))
}

fn put_duration(buf: &mut Vec<u8>, v: &Duration) -> Result<(), Error> {
    let secs = v.num_seconds();
    let nanos = (*v - Duration::seconds(secs)).num_nanoseconds().unwrap_or(0);
    buf.write_i64::<BigEndian>(secs)?;
    Ok(buf.write_i32::<BigEndian>(nanos as i32)?)
}

fn get_duration(buf: &mut &[u8]) -> Result<Duration, Error> {
    let secs = buf.read_i64::<BigEndian>()?;
    let nanos = buf.read_i32::<BigEndian>()?;
    let max_secs = (i64::max_value() / 1000) as u64;
    if secs.unsigned_abs() > max_secs || nanos.unsigned_abs() >= 1_000_000_000 {
        return Err(invalid("duration out of range"));
    }
    Duration::seconds(secs)
        .checked_add(&Duration::nanoseconds(i64::from(nanos)))
        .ok_or_else(|| invalid("duration out of range"))
}

fn put_dist(buf: &mut Vec<u8>, v: &Option<Box<Distribution>>) -> Result<(), Error> {
    let dist = match *v {
        None => return Ok(buf.write_u8(0)?),
        Some(ref dist) => dist,
    };
    buf.write_u8(1)?;
    for f in &[dist.min, dist.max, dist.average, dist.median, dist.sum] {
        buf.write_f64::<BigEndian>(*f)?;
    }
    buf.write_u64::<BigEndian>(dist.count)?;
    buf.write_u64::<BigEndian>(dist.generation)?;
    put_bool(buf, &dist.is_not_cumulative)?;
    put_len(buf, dist.ranges.len())?;
    for r in &dist.ranges {
        buf.write_f64::<BigEndian>(r.lower)?;
        buf.write_f64::<BigEndian>(r.upper)?;
        buf.write_u64::<BigEndian>(r.count)?;
    }
    Ok(())
}

fn get_dist(buf: &mut &[u8]) -> Result<Option<Box<Distribution>>, Error> {
    if !get_bool(buf)? {
        return Ok(None);
    }
    let min = get_f64(buf)?;
    let max = get_f64(buf)?;
    let average = get_f64(buf)?;
    let median = get_f64(buf)?;
    let sum = get_f64(buf)?;
    let count = get_u64(buf)?;
    let generation = get_u64(buf)?;
    let is_not_cumulative = get_bool(buf)?;
    let len = get_len(buf)?;
    let mut ranges = Vec::with_capacity(len.min(buf.len() / 24));
    for _ in 0..len {
        ranges.push(RangeWithCount {
            lower: get_f64(buf)?,
            upper: get_f64(buf)?,
            count: get_u64(buf)?,
        });
    }
    let dist = Distribution {
        min: min,
        max: max,
        average: average,
        median: median,
        sum: sum,
        count: count,
        generation: generation,
        is_not_cumulative: is_not_cumulative,
        ranges: ranges,
    };
    dist.validate()?;
    Ok(Some(Box::new(dist)))
}

macro_rules! scalar_codec {
    ($enc:ident, $dec:ident, $variant:ident, $put:ident, $get:ident) => {
        fn $enc(value: &Value, buf: &mut Vec<u8>) -> Result<(), Error> {
            match *value {
                Value::$variant(ref v) => $put(buf, v),
                _ => Err(wrong_variant(value)),
            }
        }

        fn $dec(buf: &mut &[u8]) -> Result<Value, Error> {
            Ok(Value::$variant($get(buf)?))
        }
    };
}

macro_rules! list_codec {
    ($enc:ident, $dec:ident, $variant:ident, $put:ident, $get:ident) => {
        fn $enc(value: &Value, buf: &mut Vec<u8>) -> Result<(), Error> {
            match *value {
                Value::List(List::$variant(ref items)) => {
                    put_len(buf, items.len())?;
                    for item in items {
                        $put(buf, item)?;
                    }
                    Ok(())
                }
                _ => Err(wrong_variant(value)),
            }
        }

        fn $dec(buf: &mut &[u8]) -> Result<Value, Error> {
            let len = get_len(buf)?;
            let mut items = Vec::with_capacity(len.min(buf.len()));
            for _ in 0..len {
                items.push($get(buf)?);
            }
            Ok(Value::List(List::$variant(items)))
        }
    };
}

scalar_codec!(enc_bool, dec_bool, Bool, put_bool, get_bool);
scalar_codec!(enc_i8, dec_i8, Int8, put_i8, get_i8);
scalar_codec!(enc_i16, dec_i16, Int16, put_i16, get_i16);
scalar_codec!(enc_i32, dec_i32, Int32, put_i32, get_i32);
scalar_codec!(enc_i64, dec_i64, Int64, put_i64, get_i64);
scalar_codec!(enc_u8, dec_u8, Uint8, put_u8, get_u8);
scalar_codec!(enc_u16, dec_u16, Uint16, put_u16, get_u16);
scalar_codec!(enc_u32, dec_u32, Uint32, put_u32, get_u32);
scalar_codec!(enc_u64, dec_u64, Uint64, put_u64, get_u64);
scalar_codec!(enc_f32, dec_f32, Float32, put_f32, get_f32);
scalar_codec!(enc_f64, dec_f64, Float64, put_f64, get_f64);
scalar_codec!(enc_string, dec_string, String, put_string, get_string);
scalar_codec!(enc_dist, dec_dist, Dist, put_dist, get_dist);
scalar_codec!(enc_time, dec_time, Time, put_time, get_time);
scalar_codec!(enc_duration, dec_duration, Duration, put_duration, get_duration);

list_codec!(enc_bools, dec_bools, Bool, put_bool, get_bool);
list_codec!(enc_i8s, dec_i8s, Int8, put_i8, get_i8);
list_codec!(enc_i16s, dec_i16s, Int16, put_i16, get_i16);
list_codec!(enc_i32s, dec_i32s, Int32, put_i32, get_i32);
list_codec!(enc_i64s, dec_i64s, Int64, put_i64, get_i64);
list_codec!(enc_u8s, dec_u8s, Uint8, put_u8, get_u8);
list_codec!(enc_u16s, dec_u16s, Uint16, put_u16, get_u16);
list_codec!(enc_u32s, dec_u32s, Uint32, put_u32, get_u32);
list_codec!(enc_u64s, dec_u64s, Uint64, put_u64, get_u64);
list_codec!(enc_f32s, dec_f32s, Float32, put_f32, get_f32);
list_codec!(enc_f64s, dec_f64s, Float64, put_f64, get_f64);
list_codec!(enc_strings, dec_strings, String, put_string, get_string);
list_codec!(enc_times, dec_times, Time, put_time, get_time);
list_codec!(enc_durations, dec_durations, Duration, put_duration, get_duration);

impl Registry {
    /// A registry with no codecs.
    pub fn new() -> Registry {
        Registry {
            codecs: HashMap::new(),
        }
    }

    /// A registry holding a codec for every value variant.
    pub fn standard() -> Registry {
        let mut reg = Registry::new();
        let scalars: [(Kind, EncodeFn, DecodeFn); 15] = [
            (Kind::Bool, enc_bool, dec_bool),
            (Kind::Int8, enc_i8, dec_i8),
            (Kind::Int16, enc_i16, dec_i16),
            (Kind::Int32, enc_i32, dec_i32),
            (Kind::Int64, enc_i64, dec_i64),
            (Kind::Uint8, enc_u8, dec_u8),
            (Kind::Uint16, enc_u16, dec_u16),
            (Kind::Uint32, enc_u32, dec_u32),
            (Kind::Uint64, enc_u64, dec_u64),
            (Kind::Float32, enc_f32, dec_f32),
            (Kind::Float64, enc_f64, dec_f64),
            (Kind::String, enc_string, dec_string),
            (Kind::Dist, enc_dist, dec_dist),
            (Kind::Time, enc_time, dec_time),
            (Kind::Duration, enc_duration, dec_duration),
        ];
        let lists: [(Kind, EncodeFn, DecodeFn); 14] = [
            (Kind::Bool, enc_bools, dec_bools),
            (Kind::Int8, enc_i8s, dec_i8s),
            (Kind::Int16, enc_i16s, dec_i16s),
            (Kind::Int32, enc_i32s, dec_i32s),
            (Kind::Int64, enc_i64s, dec_i64s),
            (Kind::Uint8, enc_u8s, dec_u8s),
            (Kind::Uint16, enc_u16s, dec_u16s),
            (Kind::Uint32, enc_u32s, dec_u32s),
            (Kind::Uint64, enc_u64s, dec_u64s),
            (Kind::Float32, enc_f32s, dec_f32s),
            (Kind::Float64, enc_f64s, dec_f64s),
            (Kind::String, enc_strings, dec_strings),
            (Kind::Time, enc_times, dec_times),
            (Kind::Duration, enc_durations, dec_durations),
        ];
        for &(kind, encode, decode) in scalars.iter() {
            reg.register(kind.tag(), Codec { encode: encode, decode: decode });
        }
        for &(kind, encode, decode) in lists.iter() {
            reg.register(LIST_TAG | kind.tag(), Codec { encode: encode, decode: decode });
        }
        debug!("standard codec registry holds {} tags", reg.codecs.len());
        reg
    }

    /// Register `codec` for `tag`, returning the codec it replaces.
    pub fn register(&mut self, tag: u8, codec: Codec) -> Option<Codec> {
        self.codecs.insert(tag, codec)
    }

    /// True if `tag` has a codec.
    pub fn contains(&self, tag: u8) -> bool {
        self.codecs.contains_key(&tag)
    }

    /// Append `value`, tag first.
    pub fn encode_value(&self, value: &Value, buf: &mut Vec<u8>) -> Result<(), Error> {
        let tag = value.tag();
        let codec = self.codecs.get(&tag).ok_or(Error::UnregisteredTag(tag))?;
        buf.write_u8(tag)?;
        (codec.encode)(value, buf)
    }

    /// Read one tagged value off the front of `buf`.
    pub fn decode_value(&self, buf: &mut &[u8]) -> Result<Value, Error> {
        let tag = buf.read_u8()?;
        let codec = self.codecs.get(&tag).ok_or(Error::UnregisteredTag(tag))?;
        (codec.decode)(buf)
    }

    /// Write one framed metric. The metric must be in native form.
    pub fn encode_metric<W>(&self, metric: &Metric, w: &mut W) -> Result<(), Error>
    where
        W: Write,
    {
        check_native(metric.kind, metric.sub_type, &metric.value)?;
        if metric.bits > u32::from(u8::max_value()) {
            return Err(invalid("bits does not fit in u8"));
        }
        let mut body = Vec::with_capacity(64);
        put_string(&mut body, &metric.path)?;
        put_string(&mut body, &metric.description)?;
        body.write_u8(metric.unit.tag())?;
        body.write_u8(metric.kind.tag())?;
        body.write_u8(metric.sub_type.tag())?;
        body.write_u8(metric.bits as u8)?;
        body.write_i64::<BigEndian>(metric.group_id)?;
        match metric.timestamp {
            Timestamp::None => body.write_u8(0)?,
            Timestamp::Time(ref t) => {
                body.write_u8(1)?;
                put_time(&mut body, t)?;
            }
            Timestamp::Literal(_) => {
                return Err(Error::ValueMismatch {
                    kind: Kind::Time,
                    sub_type: Kind::Unknown,
                })
            }
        }
        self.encode_value(&metric.value, &mut body)?;
        if body.len() > MAX_FRAME_BYTES {
            return Err(invalid("metric frame too large"));
        }
        w.write_u32::<BigEndian>(body.len() as u32)?;
        w.write_all(&body)?;
        Ok(())
    }

    /// Read one framed metric, in native form.
    pub fn decode_metric<R>(&self, r: &mut R) -> Result<Metric, Error>
    where
        R: Read,
    {
        let len = r.read_u32::<BigEndian>()? as usize;
        if len > MAX_FRAME_BYTES {
            return Err(invalid("metric frame too large"));
        }
        let mut body = vec![0; len];
        r.read_exact(&mut body)?;
        let mut buf = &body[..];
        let path = get_string(&mut buf)?;
        let description = get_string(&mut buf)?;
        let unit = Unit::from_tag(buf.read_u8()?).ok_or_else(|| invalid("unknown unit"))?;
        let kind = Kind::from_tag(buf.read_u8()?)?;
        let sub_type = Kind::from_tag(buf.read_u8()?)?;
        let bits = u32::from(buf.read_u8()?);
        let group_id = buf.read_i64::<BigEndian>()?;
        let timestamp = match buf.read_u8()? {
            0 => Timestamp::None,
            1 => Timestamp::Time(get_time(&mut buf)?),
            _ => return Err(invalid("bad timestamp marker")),
        };
        let value = self.decode_value(&mut buf)?;
        if !buf.is_empty() {
            return Err(invalid("trailing bytes in metric frame"));
        }
        check_native(kind, sub_type, &value)?;
        Ok(Metric {
            path: path,
            description: description,
            unit: unit,
            kind: kind,
            sub_type: sub_type,
            bits: bits,
            value: value,
            timestamp: timestamp,
            group_id: group_id,
        })
    }

    /// Write a count followed by each metric's frame.
    pub fn encode_list<W>(&self, metrics: &MetricList, w: &mut W) -> Result<(), Error>
    where
        W: Write,
    {
        if metrics.len() > u32::max_value() as usize {
            return Err(invalid("too many metrics"));
        }
        w.write_u32::<BigEndian>(metrics.len() as u32)?;
        for metric in metrics.iter() {
            self.encode_metric(metric, w)?;
        }
        Ok(())
    }

    /// Read a list written by `encode_list`.
    pub fn decode_list<R>(&self, r: &mut R) -> Result<MetricList, Error>
    where
        R: Read,
    {
        let count = r.read_u32::<BigEndian>()?;
        let mut metrics = MetricList::new();
        for _ in 0..count {
            metrics.push(self.decode_metric(r)?);
        }
        Ok(metrics)
    }
}

impl Default for Registry {
    fn default() -> Registry {
        Registry::standard()
    }
}
