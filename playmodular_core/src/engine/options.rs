//! Named, typed and range-bounded tunables exposed by every strategy.

use crate::engine::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const OPT_MAX_DEPTH: &str = "max_depth";
pub const OPT_THREAD_COUNT: &str = "thread_count";
pub const OPT_HEURISTIC: &str = "heuristic";
pub const OPT_WINDOW_MODE: &str = "window_mode";
pub const OPT_ITERATIONS: &str = "iteration_count";
pub const OPT_EXPLORATION: &str = "exploration_constant";
pub const OPT_MAX_MOVES: &str = "max_moves";
pub const OPT_FINAL_MOVE: &str = "final_move_policy";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    Real(f64),
    Choice(String),
}

impl OptionValue {
    pub fn as_int(&self, name: &str) -> Result<i64, ConfigError> {
        match self {
            Self::Int(v) => Ok(*v),
            _ => Err(ConfigError::TypeMismatch {
                name: name.to_string(),
                expected: "integer",
            }),
        }
    }

    /// Integers are accepted where a real is expected.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_real(&self, name: &str) -> Result<f64, ConfigError> {
        match self {
            Self::Real(v) => Ok(*v),
            Self::Int(v) => Ok(*v as f64),
            Self::Choice(_) => Err(ConfigError::TypeMismatch {
                name: name.to_string(),
                expected: "real",
            }),
        }
    }

    pub fn as_choice(&self, name: &str) -> Result<&str, ConfigError> {
        match self {
            Self::Choice(v) => Ok(v),
            _ => Err(ConfigError::TypeMismatch {
                name: name.to_string(),
                expected: "choice",
            }),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Choice(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionKind {
    Integer { min: i64, max: i64 },
    Real { min: f64, max: f64 },
    Choice { choices: Vec<String> },
}

/// Description of one tunable and its current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    pub value: OptionValue,
}

impl OptionSpec {
    pub fn integer(name: &str, description: &str, value: i64, min: i64, max: i64) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind: OptionKind::Integer { min, max },
            value: OptionValue::Int(value),
        }
    }

    pub fn real(name: &str, description: &str, value: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind: OptionKind::Real { min, max },
            value: OptionValue::Real(value),
        }
    }

    pub fn choice(name: &str, description: &str, value: &str, choices: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind: OptionKind::Choice { choices },
            value: OptionValue::Choice(value.to_string()),
        }
    }
}

/// Runtime-editable strategy settings.
///
/// Options are only applied between decisions: `choose_move` borrows the
/// strategy mutably, so a change can never land mid-search.
pub trait Configurable {
    fn options(&self) -> Vec<OptionSpec>;

    fn set_option(&mut self, name: &str, value: OptionValue) -> Result<(), ConfigError>;

    /// Applies options in order, stopping at the first error.
    fn set_options<I>(&mut self, options: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, OptionValue)>,
        Self: Sized,
    {
        for (name, value) in options {
            self.set_option(&name, value)?;
        }
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn check_int(name: &str, value: i64, min: i64, max: i64) -> Result<i64, ConfigError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            name: name.to_string(),
            value: value as f64,
            min: min as f64,
            max: max as f64,
        })
    }
}

pub fn check_real(name: &str, value: f64, min: f64, max: f64) -> Result<f64, ConfigError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            name: name.to_string(),
            value,
            min,
            max,
        })
    }
}

/// Number of hardware threads, at least one.
pub fn available_threads() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_coercion() {
        assert_eq!(OptionValue::Int(3).as_int("x").unwrap(), 3);
        assert!((OptionValue::Int(2).as_real("x").unwrap() - 2.0).abs() < f64::EPSILON);
        assert!(OptionValue::Real(2.5).as_int("x").is_err());
        assert_eq!(
            OptionValue::Choice("shared".into()).as_choice("x").unwrap(),
            "shared"
        );
        assert!(OptionValue::Int(1).as_choice("x").is_err());
    }

    #[test]
    fn test_range_checks() {
        assert!(check_int(OPT_MAX_DEPTH, 10, 1, 10).is_ok());
        let err = check_int(OPT_MAX_DEPTH, 11, 1, 10).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
        assert!(check_real(OPT_EXPLORATION, 0.05, 0.1, 10.0).is_err());
        assert!(check_real(OPT_EXPLORATION, f64::NAN, 0.1, 10.0).is_err());
    }

    #[test]
    fn test_value_json_is_untagged() {
        let values: Vec<OptionValue> = serde_json::from_str(r#"[4, 1.5, "shared"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                OptionValue::Int(4),
                OptionValue::Real(1.5),
                OptionValue::Choice("shared".into())
            ]
        );
    }
}
