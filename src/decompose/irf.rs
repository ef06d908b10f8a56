use ndarray::{Array1, Array2, Array3};

use crate::decompose::ClpResult;
use crate::error::ConfigurationError;
use crate::kinetic::basis::gaussian;
use crate::kinetic::matrix::DatasetMatrices;
use crate::model::{Dataset, KineticModel, Parameters};

/// Coherent artifact columns and their clp.
#[derive(Debug, Clone, PartialEq)]
pub struct CoherentArtifactReport {
    pub labels: Vec<String>,
    /// Indexed by (global axis, time, order)
    pub concentration: Array3<f64>,
    /// Indexed by (global axis, order)
    pub spectra: Array2<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrfReport {
    /// Global-axis value the profile was evaluated at
    pub index: f64,
    /// First IRF component over the time axis
    pub profile: Array1<f64>,
    /// Centre shift of each dispersion order, indexed by (global axis, order)
    pub center_dispersion: Option<Array2<f64>>,
    pub coherent_artifact: Option<CoherentArtifactReport>,
}

/// Diagnostics of the Gaussian IRF of a dataset, if it has one.
///
/// The profile is evaluated at the dispersion centre, or at the smallest
/// global-axis value when the IRF declares none.
pub(super) fn irf_report(
    model: &KineticModel,
    dataset: &Dataset,
    matrices: &DatasetMatrices,
    clp: &ClpResult,
    parameters: &Parameters,
) -> Result<Option<IrfReport>, ConfigurationError> {
    let Some(irf) = model.dataset_irf(dataset)? else {
        return Ok(None);
    };
    let global_axis = &matrices.global_axis;
    let fallback = global_axis.first().copied().unwrap_or(0.0);
    let index = irf
        .dispersion_center
        .unwrap_or_else(|| global_axis.iter().copied().fold(f64::INFINITY, f64::min));
    let index = if index.is_finite() { index } else { fallback };

    let resolved = irf.resolve(parameters, index, fallback)?;
    let profile = match resolved.components().next() {
        Some((center, width, _)) if width > 0.0 => matrices
            .time
            .iter()
            .map(|&t| gaussian(t, center, width))
            .collect(),
        _ => Array1::zeros(matrices.time.len()),
    };

    let center_dispersion = if irf.dispersion_center.is_some() && !irf.center_dispersion.is_empty() {
        let orders = irf.center_dispersion.len();
        let mut dispersion = Array2::zeros((global_axis.len(), orders));
        for (i, &x) in global_axis.iter().enumerate() {
            let terms = irf.center_dispersion_terms(parameters, x, fallback)?;
            for (k, term) in terms.into_iter().enumerate() {
                dispersion[(i, k)] = term;
            }
        }
        Some(dispersion)
    } else {
        None
    };

    let coherent_artifact = match &irf.coherent_artifact {
        None => None,
        Some(artifact) => {
            let labels = artifact.labels();
            Some(CoherentArtifactReport {
                concentration: matrices.select(&labels)?,
                spectra: clp.select(&labels)?,
                labels,
            })
        }
    };

    Ok(Some(IrfReport {
        index,
        profile,
        center_dispersion,
        coherent_artifact,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::compartment::CompartmentOrder;
    use crate::model::{GaussianIrf, Irf};
    use approx::assert_relative_eq;
    use ndarray::array;

    fn setup(irf: GaussianIrf) -> (KineticModel, DatasetMatrices, ClpResult) {
        let model = KineticModel::new(&["s1"]).with_irf("irf1", Irf::Gaussian(irf)).with_dataset(
            "d1",
            Dataset {
                irf: Some("irf1".into()),
                ..Default::default()
            },
        );
        let matrices = DatasetMatrices {
            compartments: CompartmentOrder::from(&["s1", "coherent_artifact_1"][..]),
            global_axis: vec![500.0, 400.0],
            time: vec![0.0, 0.1, 0.2],
            matrices: Array3::from_shape_fn((2, 3, 2), |(g, t, c)| (g * 100 + t * 10 + c) as f64),
        };
        let clp = ClpResult::new(
            vec!["s1".into(), "coherent_artifact_1".into()],
            array![[1.0, 2.0], [3.0, 4.0]],
        );
        (model, matrices, clp)
    }

    fn parameters() -> Parameters {
        Parameters::new()
            .with("irf.center", 0.1)
            .with("irf.width", 0.05)
            .with("irf.disp", 0.02)
    }

    #[test]
    fn test_profile_at_smallest_index_without_dispersion_center() {
        let (model, matrices, clp) = setup(GaussianIrf::new("irf.center", "irf.width"));
        let report = irf_report(&model, model.dataset("d1").unwrap(), &matrices, &clp, &parameters())
            .unwrap()
            .unwrap();

        assert_eq!(report.index, 400.0);
        assert_relative_eq!(report.profile[1], 1.0);
        assert!(report.center_dispersion.is_none());
        assert!(report.coherent_artifact.is_none());
    }

    #[test]
    fn test_center_dispersion_and_coherent_artifact() {
        let irf = GaussianIrf::new("irf.center", "irf.width")
            .with_center_dispersion(450.0, vec!["irf.disp".into()])
            .with_coherent_artifact(1);
        let (model, matrices, clp) = setup(irf);
        let report = irf_report(&model, model.dataset("d1").unwrap(), &matrices, &clp, &parameters())
            .unwrap()
            .unwrap();

        assert_eq!(report.index, 450.0);
        let dispersion = report.center_dispersion.unwrap();
        assert_relative_eq!(dispersion[(0, 0)], 0.02 * 0.5);
        assert_relative_eq!(dispersion[(1, 0)], -0.02 * 0.5);

        let artifact = report.coherent_artifact.unwrap();
        assert_eq!(artifact.spectra, array![[2.0], [4.0]]);
        assert_eq!(artifact.concentration[(1, 2, 0)], 121.0);
    }
}
