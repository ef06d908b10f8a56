//! Typed compartment orders.
//!
//! The same compartment appears at different positions depending on which
//! list is being indexed: the model-wide declaration order, the compartment
//! map of a single K-matrix and the column order of a kinetic matrix. Each of
//! these is a [`CompartmentOrder`] tagged with a marker type, and moving an
//! index from one to another always goes through [`CompartmentOrder::indices_in`].

use std::fmt;
use std::marker::PhantomData;

use crate::error::ConfigurationError;

/// Coordinate system a compartment order lives in.
pub trait OrderSpace: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Human readable name used in error messages
    const NAME: &'static str;
}

/// Compartments in model declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpace;

/// Compartments in the first-seen order of one K-matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSpace;

/// Columns of one kinetic matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixSpace;

impl OrderSpace for ModelSpace {
    const NAME: &'static str = "model";
}
impl OrderSpace for RateSpace {
    const NAME: &'static str = "K-matrix";
}
impl OrderSpace for MatrixSpace {
    const NAME: &'static str = "matrix";
}

/// An ordered list of compartment labels in coordinate system `S`.
#[derive(Clone, PartialEq, Eq)]
pub struct CompartmentOrder<S> {
    labels: Vec<String>,
    _space: PhantomData<S>,
}

impl<S: OrderSpace> CompartmentOrder<S> {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            _space: PhantomData,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Appends `label` unless it is already present.
    pub fn push_unique(&mut self, label: &str) {
        if !self.contains(label) {
            self.labels.push(label.to_string());
        }
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Position of `label`, or an [`ConfigurationError::UnknownCompartment`].
    pub fn index_of(&self, label: &str) -> Result<usize, ConfigurationError> {
        self.position(label)
            .ok_or_else(|| ConfigurationError::UnknownCompartment {
                compartment: label.to_string(),
                context: S::NAME,
            })
    }

    /// Translates every position of `self` into the matching position of `target`.
    ///
    /// Element `i` of the result is the index in `target` of `self.labels()[i]`.
    pub fn indices_in<T: OrderSpace>(
        &self,
        target: &CompartmentOrder<T>,
    ) -> Result<Vec<usize>, ConfigurationError> {
        self.labels.iter().map(|l| target.index_of(l)).collect()
    }

    /// Keeps the labels of `self` that are also in `other`, in the order of `self`.
    pub fn filtered_by<T: OrderSpace>(&self, other: &CompartmentOrder<T>) -> Self {
        self.labels
            .iter()
            .filter(|l| other.contains(l))
            .cloned()
            .collect()
    }

    /// Reinterprets the labels in another coordinate system.
    ///
    /// This is only correct when the new list really is ordered like `self`,
    /// e.g. a filtered model order used as matrix columns.
    pub fn relabel<T: OrderSpace>(self) -> CompartmentOrder<T> {
        CompartmentOrder::new(self.labels)
    }
}

impl<S: OrderSpace> fmt::Debug for CompartmentOrder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", S::NAME, self.labels)
    }
}

impl<S: OrderSpace> FromIterator<String> for CompartmentOrder<S> {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<S: OrderSpace> From<&[&str]> for CompartmentOrder<S> {
    fn from(labels: &[&str]) -> Self {
        Self::new(labels.iter().map(|l| l.to_string()).collect())
    }
}
