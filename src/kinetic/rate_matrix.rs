use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::model::compartment::{CompartmentOrder, OrderSpace, RateSpace};
use crate::model::Parameters;

/// One first-order transfer `from → to` with rate constant `parameter`.
///
/// An entry with `to == from` is a loss term: decay of `from` out of the
/// network (e.g. to the ground state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateMatrixEntry {
    pub to: String,
    pub from: String,
    pub parameter: String,
}

impl RateMatrixEntry {
    pub fn new(to: impl Into<String>, from: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            from: from.into(),
            parameter: parameter.into(),
        }
    }

    fn same_pair(&self, other: &RateMatrixEntry) -> bool {
        self.to == other.to && self.from == other.from
    }
}

/// A network of first-order rate constants between compartments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateMatrix {
    pub label: String,
    entries: Vec<RateMatrixEntry>,
}

impl RateMatrix {
    /// Creates a rate matrix, rejecting duplicate `(to, from)` pairs.
    pub fn new(
        label: impl Into<String>,
        entries: Vec<RateMatrixEntry>,
    ) -> Result<Self, ConfigurationError> {
        let mut matrix = Self {
            label: label.into(),
            entries: Vec::with_capacity(entries.len()),
        };
        for entry in entries {
            matrix.push(entry)?;
        }
        Ok(matrix)
    }

    fn push(&mut self, entry: RateMatrixEntry) -> Result<(), ConfigurationError> {
        if self.entries.iter().any(|e| e.same_pair(&entry)) {
            return Err(ConfigurationError::DuplicateRate {
                to: entry.to,
                from: entry.from,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[RateMatrixEntry] {
        &self.entries
    }

    /// Unions the entries of both matrices.
    ///
    /// A rate declared in both is a configuration error; nothing is overwritten.
    pub fn combine(&self, other: &RateMatrix) -> Result<RateMatrix, ConfigurationError> {
        let mut combined = self.clone();
        combined.label = format!("{}+{}", self.label, other.label);
        for entry in &other.entries {
            combined.push(entry.clone())?;
        }
        Ok(combined)
    }

    /// Compartments involved in the network, in first-seen order.
    pub fn involved_compartments(&self) -> CompartmentOrder<RateSpace> {
        let mut order = CompartmentOrder::empty();
        for entry in &self.entries {
            order.push_unique(&entry.to);
            order.push_unique(&entry.from);
        }
        order
    }

    /// Dense signed rate matrix over [`RateMatrix::involved_compartments`].
    ///
    /// `K[to, from]` holds the transfer rate, `K[i, i]` is minus the total
    /// rate leaving `i` (transfers plus loss), so that `dc/dt = K c`.
    pub fn full(&self, parameters: &Parameters) -> Result<DMatrix<f64>, ConfigurationError> {
        self.full_in(&self.involved_compartments(), parameters)
    }

    /// Dense rate matrix over an explicit compartment order.
    ///
    /// Transfers into compartments outside `order` still drain their source,
    /// transfers out of them are ignored.
    pub fn full_in<S: OrderSpace>(
        &self,
        order: &CompartmentOrder<S>,
        parameters: &Parameters,
    ) -> Result<DMatrix<f64>, ConfigurationError> {
        let size = order.len();
        let mut k = DMatrix::zeros(size, size);
        for entry in &self.entries {
            let Some(from) = order.position(&entry.from) else {
                continue;
            };
            let rate = parameters.get(&entry.parameter)?;
            if let Some(to) = order.position(&entry.to).filter(|to| *to != from) {
                k[(to, from)] += rate;
            }
            // Every entry drains its source compartment.
            k[(from, from)] -= rate;
        }
        Ok(k)
    }
}
