//! Kinetic matrix assembly.
//!
//! For one dataset and one value of the global axis the builder produces a
//! matrix whose rows are time samples and whose columns are compartment
//! concentrations, followed by coherent artifact and baseline columns when
//! the dataset asks for them. Every megacomplex is decomposed, evaluated and
//! projected on its own and then added into the shared columns.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array3, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::{ConfigurationError, KineticError};
use crate::kinetic::basis::{gaussian, AnalyticBasis, BasisEvaluator};
use crate::kinetic::concentration::project_concentrations;
use crate::kinetic::constraint::{apply_equal_constraints, removed_compartments};
use crate::kinetic::eigen::EigenDecomposition;
use crate::kinetic::progress::ProgressTracker;
use crate::kinetic::rate_matrix::RateMatrix;
use crate::model::compartment::{CompartmentOrder, MatrixSpace, RateSpace};
use crate::model::{Dataset, GaussianIrf, KineticModel, Parameters};

/// Options for [`KineticMatrixBuilder::build_dataset`].
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Print progress to stdout while evaluating the global axis
    pub show_progress: bool,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self) -> Self {
        self.show_progress = true;
        self
    }
}

/// Kinetic matrix at one global-axis value.
#[derive(Debug, Clone, PartialEq)]
pub struct KineticMatrix {
    /// Column labels
    pub compartments: CompartmentOrder<MatrixSpace>,
    /// Rows are time samples
    pub matrix: DMatrix<f64>,
}

impl KineticMatrix {
    pub fn column(&self, label: &str) -> Result<DVector<f64>, ConfigurationError> {
        let index = self.compartments.index_of(label)?;
        Ok(self.matrix.column(index).clone_owned())
    }
}

/// Kinetic matrices of a dataset for every value of its global axis.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetMatrices {
    pub compartments: CompartmentOrder<MatrixSpace>,
    pub global_axis: Vec<f64>,
    pub time: Vec<f64>,
    /// Indexed by (global axis, time, column)
    pub matrices: Array3<f64>,
}

impl DatasetMatrices {
    /// The matrix at position `global` of the global axis
    pub fn at(&self, global: usize) -> ArrayView2<'_, f64> {
        self.matrices.index_axis(Axis(0), global)
    }

    /// Columns `labels`, indexed by (global axis, time, label)
    pub fn select(&self, labels: &[String]) -> Result<Array3<f64>, ConfigurationError> {
        let columns = labels
            .iter()
            .map(|l| self.compartments.index_of(l))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.matrices.select(Axis(2), &columns))
    }
}

/// Megacomplex ready for evaluation, parameters already resolved.
struct PreparedMegacomplex {
    label: String,
    order: CompartmentOrder<RateSpace>,
    /// Destination column of every compartment of `order`
    columns: Vec<usize>,
    eigen: EigenDecomposition,
    scale: f64,
    /// Initial concentrations ordered like `order`
    initial: Option<DVector<f64>>,
}

/// Column layout of a dataset. Depends only on the model.
struct Layout<'m> {
    dataset: &'m Dataset,
    irf: Option<&'m GaussianIrf>,
    rate_matrices: Vec<(&'m str, RateMatrix)>,
    compartments: CompartmentOrder<MatrixSpace>,
    coherent_columns: Vec<usize>,
    baseline_column: Option<usize>,
}

struct Prepared<'m> {
    layout: Layout<'m>,
    megacomplexes: Vec<PreparedMegacomplex>,
    dispersion_fallback: f64,
    coherent_width: Option<f64>,
}

/// Builds kinetic matrices for the datasets of a model.
///
/// The builder holds no state between calls; eigen-decompositions are
/// shared between the global-axis values of one [`build_dataset`] call only.
///
/// [`build_dataset`]: KineticMatrixBuilder::build_dataset
pub struct KineticMatrixBuilder<'a, E: BasisEvaluator = AnalyticBasis> {
    model: &'a KineticModel,
    evaluator: E,
}

impl<'a> KineticMatrixBuilder<'a, AnalyticBasis> {
    pub fn new(model: &'a KineticModel) -> Self {
        Self {
            model,
            evaluator: AnalyticBasis,
        }
    }
}

impl<'a, E: BasisEvaluator> KineticMatrixBuilder<'a, E> {
    /// Replaces the basis evaluator
    pub fn with_evaluator<F: BasisEvaluator>(self, evaluator: F) -> KineticMatrixBuilder<'a, F> {
        KineticMatrixBuilder {
            model: self.model,
            evaluator,
        }
    }

    /// Column labels of the matrices of `dataset`.
    ///
    /// Stable for a given model: it never depends on parameters or on the
    /// global-axis value.
    pub fn compartment_order(
        &self,
        dataset: &str,
    ) -> Result<CompartmentOrder<MatrixSpace>, KineticError> {
        Ok(self.layout(dataset)?.compartments)
    }

    /// The kinetic matrix of `dataset` at the global-axis value `index`.
    pub fn build(
        &self,
        dataset: &str,
        index: f64,
        parameters: &Parameters,
    ) -> Result<KineticMatrix, KineticError> {
        let prepared = self.prepare(dataset, parameters)?;
        let matrix = self.evaluate(&prepared, index, parameters)?;
        Ok(KineticMatrix {
            compartments: prepared.layout.compartments,
            matrix,
        })
    }

    /// Kinetic matrices of `dataset` at every value of its global axis.
    ///
    /// Global-axis values are evaluated in parallel, each into its own slice
    /// of the result.
    pub fn build_dataset(
        &self,
        dataset: &str,
        parameters: &Parameters,
        options: BuildOptions,
    ) -> Result<DatasetMatrices, KineticError> {
        let prepared = self.prepare(dataset, parameters)?;
        let data = prepared.layout.dataset;
        let columns = prepared.layout.compartments.len();
        let mut matrices = Array3::zeros((data.global_axis.len(), data.time.len(), columns));

        let progress_tracker = if options.show_progress {
            println!(
                "Computing kinetic matrices: {} global-axis values × {} time samples...",
                data.global_axis.len(),
                data.time.len()
            );
            Some(ProgressTracker::new(data.global_axis.len()))
        } else {
            None
        };

        let result: Result<(), KineticError> = matrices
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .try_for_each(|(i, mut slice)| {
                let matrix = self.evaluate(&prepared, data.global_axis[i], parameters)?;
                for ((row, column), value) in slice.indexed_iter_mut() {
                    *value = matrix[(row, column)];
                }
                if let Some(ref tracker) = progress_tracker {
                    tracker.inc();
                }
                Ok(())
            });

        if let Some(tracker) = progress_tracker {
            tracker.finish();
        }

        result?;
        tracing::debug!(
            dataset,
            global = data.global_axis.len(),
            time = data.time.len(),
            columns,
            megacomplexes = prepared.megacomplexes.len(),
            "built dataset matrices"
        );
        Ok(DatasetMatrices {
            compartments: prepared.layout.compartments,
            global_axis: data.global_axis.clone(),
            time: data.time.clone(),
            matrices,
        })
    }

    fn layout(&self, label: &str) -> Result<Layout<'a>, ConfigurationError> {
        let model = self.model;
        let dataset = model.dataset(label)?;
        let model_order = model.compartment_order();

        let mut rate_matrices = Vec::with_capacity(dataset.megacomplexes.len());
        let mut involved = CompartmentOrder::<RateSpace>::empty();
        for megacomplex in &dataset.megacomplexes {
            let Some(rate_matrix) = model.megacomplex_rate_matrix(megacomplex)? else {
                continue;
            };
            let order = rate_matrix.involved_compartments();
            order.indices_in(&model_order)?;
            order.iter().for_each(|c| involved.push_unique(c));
            rate_matrices.push((megacomplex.as_str(), rate_matrix));
        }

        let mut compartments: CompartmentOrder<MatrixSpace> =
            model_order.filtered_by(&involved).relabel();

        let irf = model.dataset_irf(dataset)?;
        let mut coherent_columns = Vec::new();
        if let Some(artifact) = irf.and_then(|i| i.coherent_artifact.as_ref()) {
            if !(1..=3).contains(&artifact.order) {
                return Err(ConfigurationError::InvalidCoherentArtifactOrder(artifact.order));
            }
            for column_label in artifact.labels() {
                compartments.push_unique(&column_label);
                coherent_columns.push(compartments.index_of(&column_label)?);
            }
        }

        let baseline_column = if dataset.baseline {
            let baseline = Dataset::baseline_label(label);
            compartments.push_unique(&baseline);
            Some(compartments.index_of(&baseline)?)
        } else {
            None
        };

        Ok(Layout {
            dataset,
            irf,
            rate_matrices,
            compartments,
            coherent_columns,
            baseline_column,
        })
    }

    /// Resolves everything that does not depend on the global-axis value.
    fn prepare(&self, label: &str, parameters: &Parameters) -> Result<Prepared<'a>, KineticError> {
        let layout = self.layout(label)?;
        let dataset = layout.dataset;
        let dataset_scale = parameters.get_or_one(dataset.scaling.as_deref())?;
        let initial_concentration = self.model.dataset_initial_concentration(dataset)?;

        let mut megacomplexes = Vec::with_capacity(layout.rate_matrices.len());
        for (megacomplex, rate_matrix) in &layout.rate_matrices {
            let order = rate_matrix.involved_compartments();
            let columns = order.indices_in(&layout.compartments)?;
            let k = rate_matrix.full(parameters)?;
            let eigen = EigenDecomposition::from_rate_matrix(&rate_matrix.label, &k)?;
            let scale = parameters.get_or_one(
                dataset
                    .megacomplex_scaling
                    .get(*megacomplex)
                    .map(String::as_str),
            )? * dataset_scale;

            let initial = match initial_concentration {
                None => None,
                Some(ic) => {
                    let ic_label = dataset.initial_concentration.as_deref().unwrap_or_default();
                    let values = order
                        .iter()
                        .map(|c| {
                            let parameter = ic.parameter_for(c).ok_or_else(|| {
                                ConfigurationError::MissingInitialConcentration {
                                    label: ic_label.to_string(),
                                    compartment: c.to_string(),
                                }
                            })?;
                            parameters.get(parameter)
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Some(DVector::from_vec(values))
                }
            };

            megacomplexes.push(PreparedMegacomplex {
                label: megacomplex.to_string(),
                order,
                columns,
                eigen,
                scale,
                initial,
            });
        }

        let coherent_width = layout
            .irf
            .and_then(|i| i.coherent_artifact.as_ref())
            .and_then(|a| a.width.as_deref())
            .map(|w| parameters.get(w))
            .transpose()?;

        Ok(Prepared {
            dispersion_fallback: dataset.global_axis.first().copied().unwrap_or(0.0),
            layout,
            megacomplexes,
            coherent_width,
        })
    }

    fn evaluate(
        &self,
        prepared: &Prepared<'_>,
        index: f64,
        parameters: &Parameters,
    ) -> Result<DMatrix<f64>, KineticError> {
        let layout = &prepared.layout;
        let dataset = layout.dataset;
        let times = &dataset.time;
        let mut matrix = DMatrix::zeros(times.len(), layout.compartments.len());

        let irf = layout
            .irf
            .map(|i| i.resolve(parameters, index, prepared.dispersion_fallback))
            .transpose()?;

        for megacomplex in &prepared.megacomplexes {
            let removed =
                removed_compartments(&dataset.compartment_constraints, &megacomplex.order, index);
            let (modes, rates): (Vec<usize>, Vec<f64>) = (0..megacomplex.eigen.len())
                .filter(|j| removed.binary_search(j).is_err())
                .map(|j| (j, megacomplex.eigen.rates[j]))
                .unzip();

            let mut local = DMatrix::zeros(times.len(), megacomplex.order.len());
            match &irf {
                None => self
                    .evaluator
                    .decay(&mut local, &modes, &rates, times, megacomplex.scale),
                Some(irf) => self.evaluator.decay_gaussian_irf(
                    &mut local,
                    &modes,
                    &rates,
                    times,
                    &irf.clone().scaled(megacomplex.scale),
                ),
            }

            apply_equal_constraints(
                &mut local,
                &megacomplex.order,
                &dataset.compartment_constraints,
                index,
                parameters,
            )?;

            if let Some(initial) = &megacomplex.initial {
                local = project_concentrations(
                    &megacomplex.label,
                    &local,
                    &megacomplex.eigen,
                    initial,
                )?;
            }

            for (source, &destination) in megacomplex.columns.iter().enumerate() {
                matrix
                    .column_mut(destination)
                    .axpy(1.0, &local.column(source), 1.0);
            }
        }

        if let Some(irf) = &irf {
            if let Some((&center, &width)) = irf.centers.first().zip(irf.widths.first()) {
                let width = prepared.coherent_width.unwrap_or(width);
                for (order, &column) in layout.coherent_columns.iter().enumerate() {
                    for (row, &t) in times.iter().enumerate() {
                        matrix[(row, column)] = coherent_artifact(order + 1, t, center, width);
                    }
                }
            }
        }

        if let Some(column) = layout.baseline_column {
            matrix.column_mut(column).fill(1.0);
        }

        Ok(matrix)
    }
}

/// The IRF Gaussian (`order` 1) and its first and second time derivative
/// shapes (`order` 2 and 3).
pub fn coherent_artifact(order: usize, t: f64, center: f64, width: f64) -> f64 {
    if width <= 0.0 {
        return 0.0;
    }
    let g = gaussian(t, center, width);
    let w2 = width * width;
    match order {
        1 => g,
        2 => g * (center - t) / w2,
        3 => g * ((t - center).powi(2) - w2) / (w2 * w2),
        _ => 0.0,
    }
}
