use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, Axis};

use crate::decompose::{to_array1, to_array2};
use crate::error::{ConfigurationError, KineticError};
use crate::kinetic::concentration::{concentration_transform, gamma};
use crate::kinetic::eigen::EigenDecomposition;
use crate::model::compartment::{CompartmentOrder, ModelSpace};
use crate::model::{Dataset, KineticModel, Parameters};

/// Rate network of one megacomplex expressed in its decay components.
#[derive(Debug, Clone, PartialEq)]
pub struct MegacomplexDecomposition {
    pub label: String,
    /// Species of the network, rows and columns of `k_matrix`
    pub species: Vec<String>,
    /// Indexed by (to, from)
    pub k_matrix: DMatrix<f64>,
    /// Amplitude of each component in each species, indexed by (component, species)
    pub a_matrix: DMatrix<f64>,
    pub rates: DVector<f64>,
    pub lifetimes: DVector<f64>,
    /// Indexed by (global axis, component)
    pub decay_associated_spectra: Array2<f64>,
}

impl MegacomplexDecomposition {
    pub fn rates_array(&self) -> Array1<f64> {
        to_array1(&self.rates)
    }
}

/// Decay associated spectra of every megacomplex of a dataset.
///
/// Empty when the dataset has no initial concentration, since the
/// amplitude matrix is only defined relative to one.
pub(super) fn decompose_megacomplexes(
    model: &KineticModel,
    dataset: &Dataset,
    species: &[String],
    sas: &Array2<f64>,
    parameters: &Parameters,
) -> Result<Vec<MegacomplexDecomposition>, KineticError> {
    let Some(ic) = model.dataset_initial_concentration(dataset)? else {
        return Ok(Vec::new());
    };
    let ic_label = dataset.initial_concentration.as_deref().unwrap_or_default();

    let mut decompositions = Vec::with_capacity(dataset.megacomplexes.len());
    for label in &dataset.megacomplexes {
        let Some(rate_matrix) = model.megacomplex_rate_matrix(label)? else {
            continue;
        };
        let involved = rate_matrix.involved_compartments();
        let order: CompartmentOrder<ModelSpace> = ic.compartment_order().filtered_by(&involved);

        let k = rate_matrix.full_in(&order, parameters)?;
        let eigen = EigenDecomposition::from_rate_matrix(&rate_matrix.label, &k)?;
        let initial = order
            .iter()
            .map(|c| match ic.parameter_for(c) {
                Some(p) => parameters.get(p),
                None => Err(ConfigurationError::MissingInitialConcentration {
                    label: ic_label.to_string(),
                    compartment: c.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let gamma = gamma(label, &eigen, &DVector::from_vec(initial))?;
        let a_matrix = concentration_transform(&eigen, &gamma);

        let columns = order
            .iter()
            .map(|c| {
                species
                    .iter()
                    .position(|s| s == c)
                    .ok_or_else(|| ConfigurationError::UnknownCompartment {
                        compartment: c.to_string(),
                        context: "species",
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let das = sas.select(Axis(1), &columns).dot(&to_array2(&a_matrix).t());

        decompositions.push(MegacomplexDecomposition {
            label: label.clone(),
            species: order.labels().to_vec(),
            k_matrix: k,
            lifetimes: eigen.lifetimes(),
            rates: eigen.rates,
            a_matrix,
            decay_associated_spectra: das,
        });
    }
    Ok(decompositions)
}
