//! Post-fit decomposition of conditionally linear parameters.
//!
//! Once the optimizer has converged and the linear solver has produced the
//! clp of every global-axis value, [`PostFitDecomposer::decompose`] turns
//! them into species associated spectra, decay associated spectra,
//! amplitude matrices and IRF diagnostics. Everything is recomputed from the
//! inputs on each call.

mod das;
mod irf;
mod spectra;

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, Array3};

use crate::error::{ConfigurationError, KineticError};
use crate::kinetic::matrix::DatasetMatrices;
use crate::model::{KineticModel, Parameters};

pub use das::MegacomplexDecomposition;
pub use irf::{CoherentArtifactReport, IrfReport};

/// Clp of a group of global-axis values solved together.
#[derive(Debug, Clone, PartialEq)]
pub struct ClpGroup {
    /// Global-axis values the group was solved for
    pub indices: Vec<f64>,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ClpGroup {
    pub fn value(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .and_then(|i| self.values.get(i).copied())
    }

    fn distance(&self, index: f64) -> f64 {
        self.indices
            .iter()
            .map(|i| (i - index).abs())
            .fold(f64::INFINITY, f64::min)
    }
}

/// Output of the linear solver for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ClpResult {
    /// Labels of the columns of `clp`
    pub labels: Vec<String>,
    /// Indexed by (global axis, label)
    pub clp: Array2<f64>,
    /// Reduced clp, as solved before spectral relations were expanded
    pub groups: Vec<ClpGroup>,
}

impl ClpResult {
    pub fn new(labels: Vec<String>, clp: Array2<f64>) -> Self {
        Self {
            labels,
            clp,
            groups: Vec::new(),
        }
    }

    pub fn with_groups(mut self, groups: Vec<ClpGroup>) -> Self {
        self.groups = groups;
        self
    }

    /// Column of `label` in `clp`
    pub fn column(&self, label: &str) -> Result<usize, ConfigurationError> {
        self.labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| ConfigurationError::MissingItem {
                kind: "Clp",
                label: label.to_string(),
            })
    }

    /// Columns `labels` of `clp`, indexed by (global axis, label)
    pub fn select(&self, labels: &[String]) -> Result<Array2<f64>, ConfigurationError> {
        let columns = labels
            .iter()
            .map(|l| self.column(l))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.clp.select(ndarray::Axis(1), &columns))
    }

    /// The group solved closest to `index`
    pub fn nearest_group(&self, index: f64) -> Option<&ClpGroup> {
        self.groups
            .iter()
            .min_by(|a, b| a.distance(index).total_cmp(&b.distance(index)))
    }

    fn check_shape(&self, global: usize) -> Result<(), ConfigurationError> {
        if self.clp.nrows() != global {
            return Err(ConfigurationError::ShapeMismatch {
                what: "clp rows",
                expected: global,
                actual: self.clp.nrows(),
            });
        }
        if self.clp.ncols() != self.labels.len() {
            return Err(ConfigurationError::ShapeMismatch {
                what: "clp columns",
                expected: self.labels.len(),
                actual: self.clp.ncols(),
            });
        }
        Ok(())
    }
}

/// Everything derived from the clp of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PostFitOutputs {
    /// Species reported in `species_associated_spectra` and `species_concentration`
    pub species: Vec<String>,
    /// Indexed by (global axis, species)
    pub species_associated_spectra: Array2<f64>,
    /// Indexed by (global axis, time, species)
    pub species_concentration: Array3<f64>,
    /// Baseline amplitude per global-axis value
    pub baseline: Option<Array1<f64>>,
    pub megacomplexes: Vec<MegacomplexDecomposition>,
    pub irf: Option<IrfReport>,
}

impl PostFitOutputs {
    pub fn megacomplex(&self, label: &str) -> Option<&MegacomplexDecomposition> {
        self.megacomplexes.iter().find(|m| m.label == label)
    }
}

/// Computes [`PostFitOutputs`] for the datasets of a model.
pub struct PostFitDecomposer<'a> {
    model: &'a KineticModel,
}

impl<'a> PostFitDecomposer<'a> {
    pub fn new(model: &'a KineticModel) -> Self {
        Self { model }
    }

    pub fn decompose(
        &self,
        dataset: &str,
        matrices: &DatasetMatrices,
        clp: &ClpResult,
        parameters: &Parameters,
    ) -> Result<PostFitOutputs, KineticError> {
        let model = self.model;
        let data = model.dataset(dataset)?;
        clp.check_shape(matrices.global_axis.len())?;

        let species = spectra::species(model, data, matrices)?;
        let mut sas = clp.select(&species)?;
        let mut baseline = if data.baseline {
            let column = clp.column(&crate::model::Dataset::baseline_label(dataset))?;
            Some(clp.clp.column(column).to_owned())
        } else {
            None
        };

        spectra::apply_spectral_constraints(
            data,
            dataset,
            &matrices.global_axis,
            &species,
            &mut sas,
            baseline.as_mut(),
        );
        spectra::apply_spectral_relations(
            model,
            &matrices.global_axis,
            &species,
            &mut sas,
            clp,
            parameters,
        )?;

        let species_concentration = matrices.select(&species)?;
        let megacomplexes = das::decompose_megacomplexes(model, data, &species, &sas, parameters)?;
        let irf = irf::irf_report(model, data, matrices, clp, parameters)?;

        tracing::debug!(
            dataset,
            species = species.len(),
            megacomplexes = megacomplexes.len(),
            "decomposed clp"
        );

        Ok(PostFitOutputs {
            species,
            species_associated_spectra: sas,
            species_concentration,
            baseline,
            megacomplexes,
            irf,
        })
    }
}

/// Converts a nalgebra matrix into an ndarray one.
fn to_array2(matrix: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn(matrix.shape(), |(i, j)| matrix[(i, j)])
}

fn to_array1(vector: &DVector<f64>) -> Array1<f64> {
    Array1::from_iter(vector.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_nearest_group() {
        let groups = vec![
            ClpGroup {
                indices: vec![400.0, 410.0],
                labels: vec!["s1".into()],
                values: vec![1.0],
            },
            ClpGroup {
                indices: vec![500.0],
                labels: vec!["s1".into()],
                values: vec![2.0],
            },
        ];
        let clp = ClpResult::new(vec!["s1".into()], array![[1.0], [2.0]]).with_groups(groups);

        assert_eq!(clp.nearest_group(412.0).unwrap().value("s1"), Some(1.0));
        assert_eq!(clp.nearest_group(470.0).unwrap().value("s1"), Some(2.0));
    }

    #[test]
    fn test_clp_shape_is_checked() {
        let clp = ClpResult::new(vec!["s1".into(), "s2".into()], array![[1.0], [2.0]]);
        assert!(matches!(
            clp.check_shape(2).unwrap_err(),
            ConfigurationError::ShapeMismatch {
                what: "clp columns",
                ..
            }
        ));
        assert!(clp.column("s3").is_err());
    }
}
