//! Coercion of raw remote responses into typed values.
//!
//! Recognizers run in a fixed priority order and the first match wins.
//! Patterns are anchored at the start of the response only, so trailing
//! text after a recognized value is ignored.

use crate::geometry::{Point, Rectangle, WorldPoint};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;

/// Decoded result of one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    WorldPoint(WorldPoint),
    Rectangle(Rectangle),
    Point(Point),
    IntArray(Vec<i64>),
    Text(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_world_point(&self) -> Option<WorldPoint> {
        match self {
            Value::WorldPoint(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_rectangle(&self) -> Option<Rectangle> {
        match self {
            Value::Rectangle(r) => Some(*r),
            _ => None,
        }
    }

    /// Every world point in the value.
    ///
    /// Handles list renderings such as `[WorldPoint(x=1, y=2, plane=0), ...]`,
    /// which fall through to text during decoding. `null` yields nothing.
    pub fn world_points(&self) -> Vec<WorldPoint> {
        match self {
            Value::WorldPoint(p) => vec![*p],
            Value::Text(text) => WORLD_POINT_ANYWHERE
                .captures_iter(text)
                .filter_map(|caps| world_point_from(&caps))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::WorldPoint(p) => write!(f, "({}, {}, {})", p.x, p.y, p.plane),
            Value::Rectangle(r) => write!(
                f,
                "[x={}, y={}, width={}, height={}]",
                r.x, r.y, r.width, r.height
            ),
            Value::Point(p) => write!(f, "({}, {})", p.x, p.y),
            Value::IntArray(values) => {
                let items: Vec<String> = values.iter().map(i64::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Text(text) => f.write_str(text),
        }
    }
}

struct Rule {
    pattern: Regex,
    build: fn(&Captures) -> Option<Value>,
}

const WORLD_POINT_BODY: &str = r"\w+\(x=(-?\d+), y=(-?\d+), plane=(-?\d+)\)";

static WORLD_POINT_ANYWHERE: Lazy<Regex> =
    Lazy::new(|| Regex::new(WORLD_POINT_BODY).expect("world point pattern"));

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule {
            pattern: anchored(WORLD_POINT_BODY),
            build: |caps| world_point_from(caps).map(Value::WorldPoint),
        },
        Rule {
            pattern: anchored(
                r"[\w.$]+\[x=(-?\d+),y=(-?\d+),width=(-?\d+),height=(-?\d+)\]",
            ),
            build: |caps| {
                Some(Value::Rectangle(Rectangle::new(
                    int_group(caps, 1)?,
                    int_group(caps, 2)?,
                    int_group(caps, 3)?,
                    int_group(caps, 4)?,
                )))
            },
        },
        Rule {
            pattern: anchored(r"[\w.$]+\[x=(-?\d+),y=(-?\d+)\]"),
            build: |caps| {
                Some(Value::Point(Point::new(
                    int_group(caps, 1)?,
                    int_group(caps, 2)?,
                )))
            },
        },
        Rule {
            // Empty arrays (`int[0] {}`) decode to an empty list.
            pattern: anchored(r"\w+\s*\[\d+\]\s*\{\s*((?:-?\d+\s*,\s*)*-?\d+)?\s*\}"),
            build: |caps| {
                let body = match caps.get(1) {
                    Some(m) => m.as_str(),
                    None => return Some(Value::IntArray(Vec::new())),
                };
                body.split(',')
                    .map(|item| item.trim().parse::<i64>().ok())
                    .collect::<Option<Vec<_>>>()
                    .map(Value::IntArray)
            },
        },
        Rule {
            pattern: anchored(r"\s*[+-]?\d+\s*$"),
            build: |caps| caps[0].trim().parse::<i64>().ok().map(Value::Int),
        },
    ]
});

fn anchored(body: &str) -> Regex {
    Regex::new(&format!("^(?:{})", body)).expect("decoder pattern")
}

fn int_group(caps: &Captures, index: usize) -> Option<i32> {
    caps.get(index)?.as_str().parse().ok()
}

fn world_point_from(caps: &Captures) -> Option<WorldPoint> {
    Some(WorldPoint::new(
        int_group(caps, 1)?,
        int_group(caps, 2)?,
        int_group(caps, 3)?,
    ))
}

/// Decode one raw response into the most specific value it matches.
pub fn decode(raw: &str) -> Value {
    for rule in RULES.iter() {
        if let Some(caps) = rule.pattern.captures(raw) {
            if let Some(value) = (rule.build)(&caps) {
                return value;
            }
        }
    }
    Value::Text(raw.to_string())
}

/// Absent responses (transport failures) stay absent.
pub fn decode_response(raw: Option<&str>) -> Option<Value> {
    raw.map(decode)
}
