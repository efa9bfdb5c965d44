//! Record fixtures shared by the unit tests

use crate::schema::{Bytes, FieldDescriptor};
use crate::{lazy_static, Record, Registry};

#[derive(Record, Debug, Default, Clone, PartialEq)]
#[record(name = "Point")]
pub struct Point {
    #[serial]
    pub x: i32,
    #[serial]
    pub y: i32,
}

#[derive(Record, Debug, Default, Clone, PartialEq)]
#[record(name = "Polygon")]
pub struct Polygon {
    #[serial]
    pub label: String,
    #[serial]
    pub vertices: Vec<Point>,
    #[serial]
    pub origin: Option<Point>,
}

/// One field of every kind
#[derive(Record, Debug, Default, Clone, PartialEq)]
#[record(name = "Sample")]
pub struct Sample {
    #[serial]
    pub flag: bool,
    #[serial]
    pub tiny: i8,
    #[serial]
    pub short: i16,
    #[serial]
    pub int: i32,
    #[serial]
    pub long: i64,
    #[serial]
    pub single: f32,
    #[serial]
    pub double: f64,
    #[serial(rename = "maybeFlag")]
    pub maybe_flag: Option<bool>,
    #[serial(rename = "maybeShort")]
    pub maybe_short: Option<i16>,
    #[serial(rename = "maybeDouble")]
    pub maybe_double: Option<f64>,
    #[serial]
    pub text: String,
    #[serial]
    pub blob: Bytes,
    #[serial]
    pub numbers: Vec<i16>,
    #[serial]
    pub slots: Vec<Option<i32>>,
    #[serial]
    pub grid: Vec<Vec<i32>>,
    #[serial]
    pub polygon: Option<Polygon>,
    #[serial]
    pub points: Vec<Point>,
    /// Not serialized
    pub scratch: u64,
}

/// Record type that is never registered
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Unregistered {
    pub id: i32,
}

impl Record for Unregistered {
    const NAME: &'static str = "Unregistered";

    fn fields() -> Vec<FieldDescriptor> {
        vec![FieldDescriptor::new::<Self, i32>("id", |r| &r.id, |r| &mut r.id)]
    }
}

lazy_static! {
    static ref REGISTRY: Registry = {
        let mut registry = Registry::new();
        registry.register::<Point>().expect("fresh registry");
        registry.register::<Polygon>().expect("fresh registry");
        registry.register::<Sample>().expect("fresh registry");
        registry
    };
}

/// Shared registry holding `Point`, `Polygon` and `Sample`
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// A `Sample` with every field populated
pub fn sample() -> Sample {
    Sample {
        flag: true,
        tiny: -128,
        short: 12345,
        int: -2_000_000_000,
        long: i64::MAX,
        single: 0.1,
        double: -1.0e-300,
        maybe_flag: Some(false),
        maybe_short: Some(-1),
        maybe_double: Some(2.5),
        text: "tab\there \"quoted\" ünïcode".to_owned(),
        blob: Bytes::from(vec![0, 1, 254, 255]),
        numbers: vec![1, -2, 3],
        slots: vec![Some(1), None, Some(3)],
        grid: vec![vec![1, 2], vec![], vec![3]],
        polygon: Some(Polygon {
            label: "square".to_owned(),
            vertices: vec![
                Point { x: 0, y: 0 },
                Point { x: 0, y: 1 },
                Point { x: 1, y: 1 },
                Point { x: 1, y: 0 },
            ],
            origin: Some(Point { x: -5, y: 5 }),
        }),
        points: vec![Point { x: i32::MIN, y: i32::MAX }],
        scratch: 0,
    }
}
