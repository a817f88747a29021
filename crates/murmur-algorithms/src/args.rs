//! Typed access to a factory's argument map.

use murmur_core::error::{MurmurError, Result};
use murmur_core::types::{KnowledgeMap, Position, Value};

/// Argument map bound to the factory name used in error messages.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    factory: &'a str,
    map: &'a KnowledgeMap,
}

impl<'a> Args<'a> {
    pub fn new(factory: &'a str, map: &'a KnowledgeMap) -> Self {
        Self { factory, map }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key)
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string()).filter(|s| !s.is_empty())
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.string(key).unwrap_or_else(|| default.to_string())
    }

    pub fn require_string(&self, key: &str) -> Result<String> {
        self.string(key)
            .ok_or_else(|| MurmurError::missing_argument(self.factory, key))
    }

    /// A number, or `default` when absent. Unparseable text is an error.
    pub fn double_or(&self, key: &str, default: f64) -> Result<f64> {
        match self.get(key) {
            None => Ok(default),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| {
                MurmurError::invalid_argument(self.factory, key, s.as_str(), "expected a number")
            }),
            Some(v) => Ok(v.to_double()),
        }
    }

    /// A finite number above zero, or `default` when absent.
    pub fn positive_or(&self, key: &str, default: f64) -> Result<f64> {
        let value = self.double_or(key, default)?;
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(MurmurError::invalid_argument(
                self.factory,
                key,
                value.to_string(),
                "must be a finite positive number",
            ))
        }
    }

    /// A whole count in `1..=max`, or `default` when absent. Fractions round.
    pub fn count_or(&self, key: &str, default: usize, max: usize) -> Result<usize> {
        let value = self.double_or(key, default as f64)?.round();
        if value.is_finite() && value >= 1.0 && value <= max as f64 {
            Ok(value as usize)
        } else {
            Err(MurmurError::invalid_argument(
                self.factory,
                key,
                value.to_string(),
                format!("must be a count between 1 and {}", max),
            ))
        }
    }

    pub fn position(&self, key: &str) -> Result<Option<Position>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => Position::from_value(v).map(Some).ok_or_else(|| {
                MurmurError::invalid_argument(self.factory, key, v.to_string(), "expected (x,y[,z])")
            }),
        }
    }

    pub fn require_position(&self, key: &str) -> Result<Position> {
        self.position(key)?
            .ok_or_else(|| MurmurError::missing_argument(self.factory, key))
    }

    /// Positions under keys `"0"`, `"1"`, ... up to the first gap.
    pub fn indexed_positions(&self) -> Result<Vec<Position>> {
        let mut positions = Vec::new();
        while let Some(position) = self.position(&positions.len().to_string())? {
            positions.push(position);
        }
        Ok(positions)
    }
}
