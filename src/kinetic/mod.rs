//! Kinetic core: rate matrices, their eigenmodes, and the matrices built from them.

pub mod basis;
pub mod concentration;
pub mod constraint;
pub mod eigen;
pub mod matrix;
mod progress;
pub mod rate_matrix;

pub use basis::{AnalyticBasis, BasisEvaluator};
pub use eigen::EigenDecomposition;
pub use matrix::{BuildOptions, DatasetMatrices, KineticMatrix, KineticMatrixBuilder};
pub use rate_matrix::{RateMatrix, RateMatrixEntry};
