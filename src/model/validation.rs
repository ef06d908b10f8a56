//! Structural validation of model descriptions

use std::collections::HashSet;

use crate::error::ConfigurationError;
use crate::kinetic::rate_matrix::RateMatrix;
use crate::model::{Dataset, Irf, KineticModel, SUPPORTED_SCHEMA_VERSIONS};

impl KineticModel {
    /// Checks references and compartment usage.
    ///
    /// Parameter references are not checked here; they are only known once
    /// the optimizer supplies a parameter set.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.check_schema_version()?;
        self.validate_compartments()?;
        self.validate_k_matrices()?;
        self.validate_megacomplexes()?;
        self.validate_irfs()?;
        self.validate_datasets()?;
        Ok(())
    }

    fn check_schema_version(&self) -> Result<(), ConfigurationError> {
        if !SUPPORTED_SCHEMA_VERSIONS.contains(&self.schema.as_str()) {
            return Err(ConfigurationError::UnsupportedSchema {
                version: self.schema.clone(),
                supported: SUPPORTED_SCHEMA_VERSIONS.join(", "),
            });
        }
        Ok(())
    }

    fn validate_compartments(&self) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for compartment in &self.compartments {
            if !seen.insert(compartment.as_str()) {
                return Err(ConfigurationError::DuplicateCompartment(compartment.clone()));
            }
        }
        Ok(())
    }

    fn validate_k_matrices(&self) -> Result<(), ConfigurationError> {
        let order = self.compartment_order();
        for matrix in self.k_matrices.values() {
            // Deserialised matrices bypass the duplicate check of the constructor.
            RateMatrix::new(matrix.label.clone(), matrix.entries().to_vec())?;
            matrix.involved_compartments().indices_in(&order)?;
        }
        Ok(())
    }

    fn validate_megacomplexes(&self) -> Result<(), ConfigurationError> {
        for label in self.megacomplexes.keys() {
            self.megacomplex_rate_matrix(label)?;
        }
        Ok(())
    }

    fn validate_irfs(&self) -> Result<(), ConfigurationError> {
        for irf in self.irfs.values() {
            let Irf::Gaussian(gaussian) = irf else {
                continue;
            };
            if gaussian.width.len() != gaussian.center.len() {
                return Err(ConfigurationError::ShapeMismatch {
                    what: "IRF widths",
                    expected: gaussian.center.len(),
                    actual: gaussian.width.len(),
                });
            }
            if let Some(artifact) = &gaussian.coherent_artifact {
                if !(1..=3).contains(&artifact.order) {
                    return Err(ConfigurationError::InvalidCoherentArtifactOrder(artifact.order));
                }
            }
        }
        Ok(())
    }

    fn validate_datasets(&self) -> Result<(), ConfigurationError> {
        let order = self.compartment_order();
        for (label, dataset) in &self.datasets {
            for megacomplex in &dataset.megacomplexes {
                if !self.megacomplexes.contains_key(megacomplex) {
                    return Err(ConfigurationError::MissingItem {
                        kind: "Megacomplex",
                        label: megacomplex.clone(),
                    });
                }
            }
            self.dataset_irf(dataset)?;
            if let Some(ic) = self.dataset_initial_concentration(dataset)? {
                if ic.parameters.len() != ic.compartments.len() {
                    return Err(ConfigurationError::ShapeMismatch {
                        what: "initial concentration parameters",
                        expected: ic.compartments.len(),
                        actual: ic.parameters.len(),
                    });
                }
                ic.compartment_order().indices_in(&order)?;
            }
            let baseline = Dataset::baseline_label(label);
            for constraint in &dataset.compartment_constraints {
                if constraint.compartment() != baseline {
                    order.index_of(constraint.compartment())?;
                }
            }
        }
        Ok(())
    }
}
