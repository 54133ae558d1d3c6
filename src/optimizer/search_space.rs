//! Discrete search space for hyperparameters

use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Candidate value of one hyperparameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl ParameterValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            ParameterValue::Bool(_) => None,
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// A named hyperparameter and its allowed values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub choices: Vec<ParameterValue>,
}

/// Sampled configuration, keyed by parameter name
pub type TrialParams = BTreeMap<String, ParameterValue>;

/// Lookup helpers for sampled configurations
pub trait TrialParamsExt {
    fn float(&self, name: &str) -> Result<f64>;
    fn int(&self, name: &str) -> Result<i64>;
    fn bool(&self, name: &str) -> Result<bool>;
}

impl TrialParamsExt for TrialParams {
    fn float(&self, name: &str) -> Result<f64> {
        self.get(name)
            .and_then(ParameterValue::as_float)
            .ok_or_else(|| missing(name, "float"))
    }

    fn int(&self, name: &str) -> Result<i64> {
        self.get(name)
            .and_then(ParameterValue::as_int)
            .ok_or_else(|| missing(name, "integer"))
    }

    fn bool(&self, name: &str) -> Result<bool> {
        self.get(name)
            .and_then(ParameterValue::as_bool)
            .ok_or_else(|| missing(name, "boolean"))
    }
}

fn missing(name: &str, kind: &str) -> PredictorError {
    PredictorError::SearchError(format!("trial has no {} parameter '{}'", kind, name))
}

/// Render params as `a=1, b=true`
pub fn format_params(params: &TrialParams) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Cartesian grid of discrete parameters.
///
/// Grid points are numbered with the last parameter varying fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
}

impl SearchSpace {
    /// Create a new empty search space
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the search space
    pub fn add(mut self, name: impl Into<String>, choices: Vec<ParameterValue>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            choices,
        });
        self
    }

    /// Add a float parameter
    pub fn floats(self, name: impl Into<String>, values: &[f64]) -> Self {
        self.add(name, values.iter().map(|v| ParameterValue::Float(*v)).collect())
    }

    /// Add an integer parameter
    pub fn ints(self, name: impl Into<String>, values: &[i64]) -> Self {
        self.add(name, values.iter().map(|v| ParameterValue::Int(*v)).collect())
    }

    /// Add a boolean parameter
    pub fn bools(self, name: impl Into<String>, values: &[bool]) -> Self {
        self.add(name, values.iter().map(|v| ParameterValue::Bool(*v)).collect())
    }

    /// Get all parameters
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Number of grid points
    pub fn grid_size(&self) -> usize {
        if self.parameters.is_empty() {
            return 0;
        }
        self.parameters.iter().map(|p| p.choices.len()).product()
    }

    /// Configuration at grid position `index`
    pub fn grid_point(&self, index: usize) -> Result<TrialParams> {
        let size = self.grid_size();
        if index >= size {
            return Err(PredictorError::SearchError(format!(
                "grid index {} out of range for {} points",
                index, size
            )));
        }

        let mut rest = index;
        let mut params = TrialParams::new();
        for param in self.parameters.iter().rev() {
            let n = param.choices.len();
            params.insert(param.name.clone(), param.choices[rest % n]);
            rest /= n;
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_space_builder() {
        let space = SearchSpace::new()
            .ints("max_depth", &[20, 22, 24])
            .bools("bootstrap", &[true, false])
            .floats("alpha", &[0.1]);

        assert_eq!(space.len(), 3);
        assert_eq!(space.grid_size(), 6);
    }

    #[test]
    fn test_grid_point_last_varies_fastest() {
        let space = SearchSpace::new()
            .ints("a", &[1, 2])
            .bools("b", &[true, false]);

        let p0 = space.grid_point(0).unwrap();
        let p1 = space.grid_point(1).unwrap();
        let p2 = space.grid_point(2).unwrap();
        assert_eq!(p0.int("a").unwrap(), 1);
        assert!(p0.bool("b").unwrap());
        assert!(!p1.bool("b").unwrap());
        assert_eq!(p2.int("a").unwrap(), 2);
        assert!(space.grid_point(4).is_err());
    }

    #[test]
    fn test_typed_lookup_errors() {
        let space = SearchSpace::new().bools("b", &[true]);
        let p = space.grid_point(0).unwrap();
        assert!(p.int("b").is_err());
        assert!(p.float("missing").is_err());
        assert_eq!(format_params(&p), "b=true");
    }

    #[test]
    fn test_empty_space_has_no_points() {
        assert_eq!(SearchSpace::new().grid_size(), 0);
    }
}
