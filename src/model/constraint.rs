use serde::{Deserialize, Serialize};

/// Closed interval on the global axis, `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval(pub f64, pub f64);

impl Interval {
    pub fn contains(&self, value: f64) -> bool {
        let (lo, hi) = if self.0 <= self.1 {
            (self.0, self.1)
        } else {
            (self.1, self.0)
        };
        lo <= value && value <= hi
    }
}

fn in_any(intervals: &[Interval], index: f64) -> bool {
    intervals.iter().any(|i| i.contains(index))
}

/// Constraint on a single compartment, scoped to a window of the global axis.
///
/// `Equal`, `EqualArea` and `Zero` apply inside their intervals. `Only` keeps
/// a compartment inside its intervals and therefore applies outside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompartmentConstraint {
    /// The compartment column is the weighted sum of the target columns
    Equal {
        compartment: String,
        /// `(target compartment, weight parameter)` pairs
        targets: Vec<(String, String)>,
        intervals: Vec<Interval>,
    },
    /// Penalty on the area ratio of two spectra, handled by the optimizer
    EqualArea {
        compartment: String,
        target: String,
        parameter: String,
        weight: f64,
        intervals: Vec<Interval>,
    },
    /// The compartment has no amplitude inside the intervals
    Zero {
        compartment: String,
        intervals: Vec<Interval>,
    },
    /// The compartment only has amplitude inside the intervals
    Only {
        compartment: String,
        intervals: Vec<Interval>,
    },
}

impl CompartmentConstraint {
    pub fn compartment(&self) -> &str {
        match self {
            CompartmentConstraint::Equal { compartment, .. }
            | CompartmentConstraint::EqualArea { compartment, .. }
            | CompartmentConstraint::Zero { compartment, .. }
            | CompartmentConstraint::Only { compartment, .. } => compartment,
        }
    }

    /// Whether the constraint is active at the global axis value `index`
    pub fn applies(&self, index: f64) -> bool {
        match self {
            CompartmentConstraint::Equal { intervals, .. }
            | CompartmentConstraint::EqualArea { intervals, .. }
            | CompartmentConstraint::Zero { intervals, .. } => in_any(intervals, index),
            CompartmentConstraint::Only { intervals, .. } => !in_any(intervals, index),
        }
    }

    /// Whether an active constraint takes the compartment out of the decay basis.
    ///
    /// Equal-area constraints only add a penalty term, every other variant
    /// replaces or removes the compartment's own decay column.
    pub fn removes_compartment(&self) -> bool {
        !matches!(self, CompartmentConstraint::EqualArea { .. })
    }

    /// Whether the constraint zeroes spectra after the fit
    pub fn is_spectral(&self) -> bool {
        matches!(
            self,
            CompartmentConstraint::Zero { .. } | CompartmentConstraint::Only { .. }
        )
    }
}

/// Ties the spectrum of `compartment` to `parameter × target`.
///
/// The linear solver drops `compartment` from the clp where the relation
/// applies; its spectrum is synthesised again after the fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralRelation {
    pub compartment: String,
    pub target: String,
    pub parameter: String,
    pub intervals: Vec<Interval>,
}

impl SpectralRelation {
    pub fn applies(&self, index: f64) -> bool {
        in_any(&self.intervals, index)
    }
}
