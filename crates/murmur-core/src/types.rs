//! Shared types used across all Murmur crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Monotonic tick count of a controller.
pub type Tick = u64;

/// Opaque identifier of one agent, also used as its store prefix (e.g. `agent.3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The conventional id of the `index`-th agent of a swarm.
    pub fn from_index(index: usize) -> Self {
        Self(format!("agent.{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AgentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A value held in the shared store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Double(f64),
    String(String),
    Doubles(Vec<f64>),
}

impl Value {
    /// Integer view. Doubles truncate, strings parse, arrays are 0.
    pub fn to_integer(&self) -> i64 {
        match self {
            Value::Integer(i) => *i,
            Value::Double(d) => *d as i64,
            Value::String(s) => s.trim().parse().unwrap_or(0),
            Value::Doubles(_) => 0,
        }
    }

    pub fn to_double(&self) -> f64 {
        match self {
            Value::Integer(i) => *i as f64,
            Value::Double(d) => *d,
            Value::String(s) => s.trim().parse().unwrap_or(0.0),
            Value::Doubles(v) => v.first().copied().unwrap_or(0.0),
        }
    }

    pub fn to_doubles(&self) -> Vec<f64> {
        match self {
            Value::Integer(i) => vec![*i as f64],
            Value::Double(d) => vec![*d],
            Value::String(s) => parse_number_list(s).unwrap_or_default(),
            Value::Doubles(v) => v.clone(),
        }
    }

    /// Whether the value counts as "set": non-zero numbers, non-empty strings and arrays.
    pub fn is_true(&self) -> bool {
        match self {
            Value::Integer(i) => *i != 0,
            Value::Double(d) => *d != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Doubles(v) => !v.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::String(s) => f.write_str(s),
            Value::Doubles(v) => {
                let parts: Vec<String> = v.iter().map(|d| d.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Doubles(v)
    }
}

impl From<Position> for Value {
    fn from(p: Position) -> Self {
        Value::Doubles(vec![p.x, p.y, p.z])
    }
}

/// A flat key/value mapping, e.g. algorithm arguments.
pub type KnowledgeMap = BTreeMap<String, Value>;

/// Parse `"(1, 2)"`, `"[1,2,3]"` or `"1 2 3"` into numbers.
pub fn parse_number_list(text: &str) -> Option<Vec<f64>> {
    let trimmed = text
        .trim()
        .trim_start_matches(['(', '['])
        .trim_end_matches([')', ']']);
    if trimmed.trim().is_empty() {
        return None;
    }
    trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f64>().ok())
        .collect()
}

/// Reference frame a platform reports positions in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferenceFrame {
    #[default]
    Cartesian,
    Gps,
}

/// A position in a platform's reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Build from up to three coordinates; missing ones are zero.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [] => None,
            [x] => Some(Self::new(*x, 0.0, 0.0)),
            [x, y] => Some(Self::new(*x, *y, 0.0)),
            [x, y, z, ..] => Some(Self::new(*x, *y, *z)),
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        parse_number_list(text).and_then(|v| Self::from_slice(&v))
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            other => Self::from_slice(&other.to_doubles()),
        }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }

    pub fn approximately_equal(&self, other: &Position, epsilon: f64) -> bool {
        self.distance_to(other) <= epsilon
    }

    pub fn lerp(&self, other: &Position, t: f64) -> Position {
        Position::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }

    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Position {
        Position::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.x, self.y, self.z]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// A target pose: position plus roll/pitch/yaw in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Position,
    pub orientation: [f64; 3],
}

impl Pose {
    pub fn at(position: Position) -> Self {
        Self {
            position,
            orientation: [0.0; 3],
        }
    }

    pub fn with_yaw(mut self, yaw: f64) -> Self {
        self.orientation[2] = yaw;
        self
    }
}

/// Result of asking a platform to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// Still travelling toward the target.
    Moving,
    /// Within epsilon of the target.
    Arrived,
    /// The platform could not accept the request.
    Error,
}

/// Descriptor of one sensor available to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub name: String,
    /// Sensing range in meters.
    pub range: f64,
    /// Cell size used for coverage bookkeeping.
    pub discretization: f64,
}

impl Sensor {
    pub fn new(name: impl Into<String>, range: f64, discretization: f64) -> Self {
        Self {
            name: name.into(),
            range,
            discretization,
        }
    }
}

/// Read-only map of sensor names to descriptors.
pub type Sensors = BTreeMap<String, Sensor>;
