/// Typed option values exchanged with the scene manager and its zones.

use std::fmt;
use std::str::FromStr;
use glam::Vec3;
use crate::error::Result;
use crate::geometry::AABB;

/// Value of a named option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Real(f32),
    Vector3(Vec3),
    Aabb(AABB),
    Text(String),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Integers, plus reals with no fractional part.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(value) => Some(*value),
            OptionValue::Real(value) if value.fract() == 0.0 => Some(*value as i64),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f32> {
        match self {
            OptionValue::Real(value) => Some(*value),
            OptionValue::Int(value) => Some(*value as f32),
            _ => None,
        }
    }

    pub fn as_vector3(&self) -> Option<Vec3> {
        match self {
            OptionValue::Vector3(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_aabb(&self) -> Option<AABB> {
        match self {
            OptionValue::Aabb(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<f32> for OptionValue {
    fn from(value: f32) -> Self {
        OptionValue::Real(value)
    }
}

impl From<Vec3> for OptionValue {
    fn from(value: Vec3) -> Self {
        OptionValue::Vector3(value)
    }
}

impl From<AABB> for OptionValue {
    fn from(value: AABB) -> Self {
        OptionValue::Aabb(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

// ===== BACK-TOUCH POLICY =====

/// When a node found behind a portal without an observed crossing is moved
/// into the portal's target zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackTouchPolicy {
    /// Only observed crossings move nodes
    Never,
    /// Back touches are repaired while following a crossing
    #[default]
    AfterCrossing,
    /// Back touches are repaired on every check
    Always,
}

impl BackTouchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackTouchPolicy::Never => "Never",
            BackTouchPolicy::AfterCrossing => "AfterCrossing",
            BackTouchPolicy::Always => "Always",
        }
    }
}

impl fmt::Display for BackTouchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackTouchPolicy {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Never" => Ok(BackTouchPolicy::Never),
            "AfterCrossing" => Ok(BackTouchPolicy::AfterCrossing),
            "Always" => Ok(BackTouchPolicy::Always),
            other => Err(crate::engine_err!("pcz::SceneManager", InvalidConfig:
                "Unknown back-touch policy '{}' (expected Never, AfterCrossing or Always)", other)),
        }
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
