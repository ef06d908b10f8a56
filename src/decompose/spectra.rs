use ndarray::{Array1, Array2};

use crate::decompose::ClpResult;
use crate::error::ConfigurationError;
use crate::kinetic::matrix::DatasetMatrices;
use crate::model::{Dataset, KineticModel, Parameters};

/// Species reported for a dataset.
///
/// With an initial concentration these are its compartments that appear in
/// the matrix, in its declaration order; otherwise the kinetic columns of
/// the matrix.
pub(super) fn species(
    model: &KineticModel,
    dataset: &Dataset,
    matrices: &DatasetMatrices,
) -> Result<Vec<String>, ConfigurationError> {
    let species = match model.dataset_initial_concentration(dataset)? {
        Some(ic) => ic
            .compartments
            .iter()
            .filter(|c| matrices.compartments.contains(c))
            .cloned()
            .collect(),
        None => matrices
            .compartments
            .iter()
            .filter(|c| model.compartments.iter().any(|m| m.as_str() == *c))
            .map(str::to_string)
            .collect(),
    };
    Ok(species)
}

/// Zeroes spectra where a zero or only constraint applies.
pub(super) fn apply_spectral_constraints(
    dataset: &Dataset,
    label: &str,
    global_axis: &[f64],
    species: &[String],
    sas: &mut Array2<f64>,
    mut baseline: Option<&mut Array1<f64>>,
) {
    let baseline_label = Dataset::baseline_label(label);
    for constraint in dataset
        .compartment_constraints
        .iter()
        .filter(|c| c.is_spectral())
    {
        let column = species.iter().position(|s| s == constraint.compartment());
        let is_baseline = constraint.compartment() == baseline_label;
        for (i, &index) in global_axis.iter().enumerate() {
            if !constraint.applies(index) {
                continue;
            }
            if let Some(column) = column {
                sas[(i, column)] = 0.0;
            }
            if is_baseline {
                if let Some(baseline) = baseline.as_deref_mut() {
                    baseline[i] = 0.0;
                }
            }
        }
    }
}

/// Replaces related spectra by the scaled spectrum of their target.
///
/// The target amplitude is read from the reduced clp group solved closest
/// to each global-axis value.
pub(super) fn apply_spectral_relations(
    model: &KineticModel,
    global_axis: &[f64],
    species: &[String],
    sas: &mut Array2<f64>,
    clp: &ClpResult,
    parameters: &Parameters,
) -> Result<(), ConfigurationError> {
    for relation in &model.spectral_relations {
        let Some(column) = species.iter().position(|s| *s == relation.compartment) else {
            continue;
        };
        let factor = parameters.get(&relation.parameter)?;
        for (i, &index) in global_axis.iter().enumerate() {
            if !relation.applies(index) {
                continue;
            }
            let target = clp
                .nearest_group(index)
                .and_then(|group| group.value(&relation.target))
                .ok_or_else(|| ConfigurationError::MissingItem {
                    kind: "Reduced clp",
                    label: relation.target.clone(),
                })?;
            sas[(i, column)] = factor * target;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompose::ClpGroup;
    use crate::model::{CompartmentConstraint, Interval, SpectralRelation};
    use ndarray::array;

    fn species_labels() -> Vec<String> {
        vec!["s1".into(), "s2".into()]
    }

    #[test]
    fn test_zero_and_only_constraints() {
        let dataset = Dataset {
            compartment_constraints: vec![
                CompartmentConstraint::Zero {
                    compartment: "s1".into(),
                    intervals: vec![Interval(0.0, 450.0)],
                },
                CompartmentConstraint::Only {
                    compartment: "d1_baseline".into(),
                    intervals: vec![Interval(450.0, 1000.0)],
                },
            ],
            ..Default::default()
        };
        let mut sas = array![[1.0, 2.0], [3.0, 4.0]];
        let mut baseline = array![5.0, 6.0];

        apply_spectral_constraints(
            &dataset,
            "d1",
            &[400.0, 500.0],
            &species_labels(),
            &mut sas,
            Some(&mut baseline),
        );

        assert_eq!(sas, array![[0.0, 2.0], [3.0, 4.0]]);
        assert_eq!(baseline, array![0.0, 6.0]);
    }

    #[test]
    fn test_spectral_relation_uses_nearest_group() {
        let model = KineticModel::new(&["s1", "s2"]).with_spectral_relation(SpectralRelation {
            compartment: "s2".into(),
            target: "s1".into(),
            parameter: "rel".into(),
            intervals: vec![Interval(450.0, 1000.0)],
        });
        let clp = ClpResult::new(species_labels(), array![[1.0, 2.0], [3.0, 4.0]]).with_groups(vec![
            ClpGroup {
                indices: vec![400.0],
                labels: vec!["s1".into()],
                values: vec![1.0],
            },
            ClpGroup {
                indices: vec![500.0],
                labels: vec!["s1".into()],
                values: vec![3.0],
            },
        ]);
        let mut sas = clp.clp.clone();

        apply_spectral_relations(
            &model,
            &[400.0, 500.0],
            &species_labels(),
            &mut sas,
            &clp,
            &Parameters::new().with("rel", 0.5),
        )
        .unwrap();

        assert_eq!(sas, array![[1.0, 2.0], [3.0, 1.5]]);
    }

    #[test]
    fn test_spectral_relation_without_groups() {
        let model = KineticModel::new(&["s1", "s2"]).with_spectral_relation(SpectralRelation {
            compartment: "s2".into(),
            target: "s1".into(),
            parameter: "rel".into(),
            intervals: vec![Interval(0.0, 1000.0)],
        });
        let clp = ClpResult::new(species_labels(), array![[1.0, 2.0]]);
        let mut sas = clp.clp.clone();
        let err = apply_spectral_relations(
            &model,
            &[400.0],
            &species_labels(),
            &mut sas,
            &clp,
            &Parameters::new().with("rel", 0.5),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingItem { .. }));
    }
}
