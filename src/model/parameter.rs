use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Resolved parameter values for one optimizer trial.
///
/// Every rate, scale, IRF and constraint weight in the model is a reference
/// into this lookup. The optimizer owns the parameter vector; the kinetic
/// core only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    values: HashMap<String, f64>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a parameter value
    pub fn insert(&mut self, label: impl Into<String>, value: f64) {
        self.values.insert(label.into(), value);
    }

    /// Builder-style variant of [`Parameters::insert`]
    pub fn with(mut self, label: impl Into<String>, value: f64) -> Self {
        self.insert(label, value);
        self
    }

    /// Resolves a parameter reference.
    ///
    /// Finite numeric literals are accepted as references, so fixed values
    /// such as `"1.0"` can be used in place of a label. Labels like `"inf"`
    /// or `"nan"` are never read as literals.
    pub fn get(&self, label: &str) -> Result<f64, ConfigurationError> {
        match self.values.get(label) {
            Some(value) => Ok(*value),
            None => label
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ConfigurationError::MissingParameter(label.to_string())),
        }
    }

    /// Resolves an optional reference, defaulting to `1.0` when absent.
    pub fn get_or_one(&self, label: Option<&str>) -> Result<f64, ConfigurationError> {
        label.map_or(Ok(1.0), |l| self.get(l))
    }

    /// Resolves a list of references in order
    pub fn get_all<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<f64>, ConfigurationError> {
        labels.iter().map(|l| self.get(l.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_label_and_literal() {
        let p = Parameters::new().with("kinetic.1", 0.5);
        assert_eq!(p.get("kinetic.1").unwrap(), 0.5);
        assert_eq!(p.get("2.5").unwrap(), 2.5);
        assert_eq!(
            p.get("kinetic.2").unwrap_err(),
            ConfigurationError::MissingParameter("kinetic.2".to_string())
        );
    }

    #[test]
    fn test_non_finite_literals_are_missing() {
        let p = Parameters::new();
        for label in ["inf", "nan", "infinity", "-inf", "NaN"] {
            assert_eq!(
                p.get(label).unwrap_err(),
                ConfigurationError::MissingParameter(label.to_string())
            );
        }
        // an explicit value under such a label still resolves
        assert!(p.clone().with("nan", 0.1).get("nan").is_ok());
    }

    #[test]
    fn test_get_or_one() {
        let p: Parameters = [("scale", 3.0)].into_iter().collect();
        assert_eq!(p.get_or_one(None).unwrap(), 1.0);
        assert_eq!(p.get_or_one(Some("scale")).unwrap(), 3.0);
    }
}
