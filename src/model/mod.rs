//! Model description consumed by the kinetic core.
//!
//! The model is plain data: labelled K-matrices, megacomplexes grouping them,
//! IRFs, initial concentrations and per-dataset settings. Every numeric value
//! is a reference into [`Parameters`], resolved at evaluation time.

pub mod compartment;
pub mod constraint;
pub mod irf;
pub mod parameter;
mod validation;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use compartment::{CompartmentOrder, MatrixSpace, ModelSpace, OrderSpace, RateSpace};
pub use constraint::{CompartmentConstraint, Interval, SpectralRelation};
pub use irf::{CoherentArtifact, GaussianIrf, Irf, ResolvedGaussianIrf};
pub use parameter::Parameters;

use crate::error::{ConfigurationError, KineticError};
use crate::kinetic::rate_matrix::RateMatrix;

/// Supported schema versions
pub const SUPPORTED_SCHEMA_VERSIONS: &[&str] = &["1.0"];

fn default_schema() -> String {
    SUPPORTED_SCHEMA_VERSIONS[0].to_string()
}

/// A group of K-matrices evaluated together as one rate network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Megacomplex {
    pub k_matrices: Vec<String>,
}

/// Initial concentration of each compartment, as parameter references.
///
/// `compartments` and `parameters` are parallel lists; their order is the
/// order species are reported in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialConcentration {
    pub compartments: Vec<String>,
    pub parameters: Vec<String>,
}

impl InitialConcentration {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            compartments: entries.iter().map(|(c, _)| c.to_string()).collect(),
            parameters: entries.iter().map(|(_, p)| p.to_string()).collect(),
        }
    }

    pub fn compartment_order(&self) -> CompartmentOrder<ModelSpace> {
        CompartmentOrder::new(self.compartments.clone())
    }

    pub fn parameter_for(&self, compartment: &str) -> Option<&str> {
        self.compartments
            .iter()
            .position(|c| c == compartment)
            .and_then(|i| self.parameters.get(i))
            .map(String::as_str)
    }
}

/// Per-dataset settings and axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Dataset {
    pub megacomplexes: Vec<String>,
    /// Optional scaling parameter per megacomplex label
    #[serde(default)]
    pub megacomplex_scaling: HashMap<String, String>,
    /// Overall scaling parameter of the dataset
    #[serde(default)]
    pub scaling: Option<String>,
    #[serde(default)]
    pub irf: Option<String>,
    #[serde(default)]
    pub initial_concentration: Option<String>,
    #[serde(default)]
    pub compartment_constraints: Vec<CompartmentConstraint>,
    /// Adds a constant `<label>_baseline` column
    #[serde(default)]
    pub baseline: bool,
    /// Samples of the kinetic (time) axis, the matrix rows
    #[serde(default)]
    pub time: Vec<f64>,
    /// Samples of the global (e.g. spectral) axis, one matrix each
    #[serde(default)]
    pub global_axis: Vec<f64>,
}

impl Dataset {
    pub fn baseline_label(label: &str) -> String {
        format!("{}_baseline", label)
    }
}

/// Complete kinetic model description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct KineticModel {
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Global compartment order
    pub compartments: Vec<String>,
    #[serde(default)]
    pub k_matrices: HashMap<String, RateMatrix>,
    #[serde(default)]
    pub megacomplexes: HashMap<String, Megacomplex>,
    #[serde(default)]
    pub irfs: HashMap<String, Irf>,
    #[serde(default)]
    pub initial_concentrations: HashMap<String, InitialConcentration>,
    #[serde(default)]
    pub spectral_relations: Vec<SpectralRelation>,
    #[serde(default)]
    pub datasets: HashMap<String, Dataset>,
}

fn missing(kind: &'static str, label: &str) -> ConfigurationError {
    ConfigurationError::MissingItem {
        kind,
        label: label.to_string(),
    }
}

impl KineticModel {
    pub fn new(compartments: &[&str]) -> Self {
        Self {
            schema: default_schema(),
            compartments: compartments.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Parses and validates a JSON model description
    pub fn from_json(json: &str) -> Result<Self, KineticError> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> Result<String, KineticError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_k_matrix(mut self, matrix: RateMatrix) -> Self {
        self.k_matrices.insert(matrix.label.clone(), matrix);
        self
    }

    pub fn with_megacomplex(mut self, label: &str, k_matrices: &[&str]) -> Self {
        self.megacomplexes.insert(
            label.to_string(),
            Megacomplex {
                k_matrices: k_matrices.iter().map(|k| k.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_irf(mut self, label: &str, irf: Irf) -> Self {
        self.irfs.insert(label.to_string(), irf);
        self
    }

    pub fn with_initial_concentration(mut self, label: &str, ic: InitialConcentration) -> Self {
        self.initial_concentrations.insert(label.to_string(), ic);
        self
    }

    pub fn with_spectral_relation(mut self, relation: SpectralRelation) -> Self {
        self.spectral_relations.push(relation);
        self
    }

    pub fn with_dataset(mut self, label: &str, dataset: Dataset) -> Self {
        self.datasets.insert(label.to_string(), dataset);
        self
    }

    pub fn compartment_order(&self) -> CompartmentOrder<ModelSpace> {
        CompartmentOrder::new(self.compartments.clone())
    }

    pub fn dataset(&self, label: &str) -> Result<&Dataset, ConfigurationError> {
        self.datasets.get(label).ok_or_else(|| missing("Dataset", label))
    }

    /// The K-matrices of a megacomplex combined into one network.
    ///
    /// Returns `None` for a megacomplex without K-matrices.
    pub fn megacomplex_rate_matrix(
        &self,
        label: &str,
    ) -> Result<Option<RateMatrix>, ConfigurationError> {
        let megacomplex = self
            .megacomplexes
            .get(label)
            .ok_or_else(|| missing("Megacomplex", label))?;
        let mut combined: Option<RateMatrix> = None;
        for k_label in &megacomplex.k_matrices {
            let matrix = self
                .k_matrices
                .get(k_label)
                .ok_or_else(|| missing("K-matrix", k_label))?;
            combined = Some(match combined {
                None => matrix.clone(),
                Some(c) => c.combine(matrix)?,
            });
        }
        Ok(combined)
    }

    /// The Gaussian IRF of a dataset, if it has one
    pub fn dataset_irf(&self, dataset: &Dataset) -> Result<Option<&GaussianIrf>, ConfigurationError> {
        match &dataset.irf {
            None => Ok(None),
            Some(label) => self
                .irfs
                .get(label)
                .map(Irf::as_gaussian)
                .ok_or_else(|| missing("IRF", label)),
        }
    }

    pub fn dataset_initial_concentration(
        &self,
        dataset: &Dataset,
    ) -> Result<Option<&InitialConcentration>, ConfigurationError> {
        match &dataset.initial_concentration {
            None => Ok(None),
            Some(label) => self
                .initial_concentrations
                .get(label)
                .map(Some)
                .ok_or_else(|| missing("Initial concentration", label)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinetic::rate_matrix::RateMatrixEntry;

    fn model() -> KineticModel {
        KineticModel::new(&["s1", "s2", "s3"])
            .with_k_matrix(
                RateMatrix::new("k1", vec![RateMatrixEntry::new("s2", "s1", "k21")]).unwrap(),
            )
            .with_k_matrix(
                RateMatrix::new("k2", vec![RateMatrixEntry::new("s2", "s2", "k22")]).unwrap(),
            )
            .with_k_matrix(
                RateMatrix::new("k3", vec![RateMatrixEntry::new("s2", "s1", "dup")]).unwrap(),
            )
            .with_megacomplex("mc1", &["k1", "k2"])
            .with_megacomplex("bad", &["k1", "k3"])
            .with_megacomplex("empty", &[])
    }

    #[test]
    fn test_megacomplex_combines_k_matrices() {
        let combined = model().megacomplex_rate_matrix("mc1").unwrap().unwrap();
        assert_eq!(combined.entries().len(), 2);
        assert_eq!(combined.involved_compartments().labels(), &["s2", "s1"]);
    }

    #[test]
    fn test_megacomplex_with_duplicate_rates() {
        let err = model().megacomplex_rate_matrix("bad").unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateRate { .. }));
    }

    #[test]
    fn test_megacomplex_without_k_matrices() {
        assert!(model().megacomplex_rate_matrix("empty").unwrap().is_none());
        assert!(matches!(
            model().megacomplex_rate_matrix("nope").unwrap_err(),
            ConfigurationError::MissingItem { .. }
        ));
    }

    #[test]
    fn test_initial_concentration_lookup() {
        let ic = InitialConcentration::new(&[("s1", "j.1"), ("s2", "j.0")]);
        assert_eq!(ic.parameter_for("s2"), Some("j.0"));
        assert_eq!(ic.parameter_for("s3"), None);
    }
}
