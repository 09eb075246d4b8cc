//! Random native metrics for property tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use messages::{linear_bounds, Distribution, List, Metric, Value};
use quickcheck::{Arbitrary, Gen};
use units::Unit;

fn small_float<G: Gen>(g: &mut G) -> f64 {
    f64::from(g.gen_range(-4096i32, 4096)) / 8.0
}

fn arbitrary_string<G: Gen>(g: &mut G) -> String {
    let len = g.gen_range(0, 16);
    g.gen_iter::<char>().take(len).collect()
}

fn arbitrary_time<G: Gen>(g: &mut G) -> DateTime<Utc> {
    Utc.timestamp_opt(
        g.gen_range(-4_000_000_000i64, 4_000_000_000),
        g.gen_range(0u32, 1_000_000_000),
    ).single()
        .unwrap()
}

fn arbitrary_duration<G: Gen>(g: &mut G) -> Duration {
    Duration::nanoseconds(g.gen())
}

fn arbitrary_list<G: Gen>(g: &mut G) -> List {
    let len = g.gen_range(0, 8);
    match g.gen_range(0, 14) {
        0 => List::Bool((0..len).map(|_| g.gen()).collect()),
        1 => List::Int8((0..len).map(|_| g.gen()).collect()),
        2 => List::Int16((0..len).map(|_| g.gen()).collect()),
        3 => List::Int32((0..len).map(|_| g.gen()).collect()),
        4 => List::Int64((0..len).map(|_| g.gen()).collect()),
        5 => List::Uint8((0..len).map(|_| g.gen()).collect()),
        6 => List::Uint16((0..len).map(|_| g.gen()).collect()),
        7 => List::Uint32((0..len).map(|_| g.gen()).collect()),
        8 => List::Uint64((0..len).map(|_| g.gen()).collect()),
        9 => List::Float32((0..len).map(|_| small_float(g) as f32).collect()),
        10 => List::Float64((0..len).map(|_| small_float(g)).collect()),
        11 => List::String((0..len).map(|_| arbitrary_string(g)).collect()),
        12 => List::Time((0..len).map(|_| arbitrary_time(g)).collect()),
        _ => List::Duration((0..len).map(|_| arbitrary_duration(g)).collect()),
    }
}

fn arbitrary_dist<G: Gen>(g: &mut G) -> Option<Box<Distribution>> {
    if g.gen() {
        return None;
    }
    let bounds = linear_bounds(-100.0, 25.0, g.gen_range(0, 10));
    let mut dist = if g.gen() {
        Distribution::new(&bounds).unwrap()
    } else {
        Distribution::new_non_cumulative(&bounds).unwrap()
    };
    for _ in 0..g.gen_range(0, 20) {
        dist.add(small_float(g)).unwrap();
    }
    Some(Box::new(dist))
}

impl Arbitrary for Metric {
    fn arbitrary<G>(g: &mut G) -> Self
    where
        G: Gen,
    {
        let value = match g.gen_range(0, 17) {
            0 => Value::Bool(g.gen()),
            1 => Value::Int8(g.gen()),
            2 => Value::Int16(g.gen()),
            3 => Value::Int32(g.gen()),
            4 => Value::Int64(g.gen()),
            5 => Value::Uint8(g.gen()),
            6 => Value::Uint16(g.gen()),
            7 => Value::Uint32(g.gen()),
            8 => Value::Uint64(g.gen()),
            9 => Value::Float32(small_float(g) as f32),
            10 => Value::Float64(small_float(g)),
            11 => Value::String(arbitrary_string(g)),
            12 => Value::Dist(arbitrary_dist(g)),
            13 => Value::Time(arbitrary_time(g)),
            14 => Value::Duration(arbitrary_duration(g)),
            _ => Value::List(arbitrary_list(g)),
        };
        let mut metric = Metric::new(format!("/{}", arbitrary_string(g)), value)
            .description(arbitrary_string(g))
            .group_id(g.gen_range(0, 4));
        if g.gen() {
            metric = metric.timestamp(arbitrary_time(g));
        }
        if g.gen() {
            metric = metric.unit(Unit::Second);
        }
        metric
    }
}
