//! Global and target analysis of time-resolved spectra.
//!
//! A [`KineticModel`] describes networks of first-order rate processes between
//! compartments. For every value of a dataset's global axis the
//! [`KineticMatrixBuilder`] evaluates the concentration time-courses of those
//! compartments, optionally convolved with a dispersive Gaussian IRF. The
//! spectra are conditionally linear parameters (clp) solved outside this
//! crate; after the fit, [`PostFitDecomposer`] derives species and decay
//! associated spectra from them.
//!
//! ```ignore
//! use kinspec::prelude::*;
//!
//! let model = KineticModel::from_json(&std::fs::read_to_string("model.json")?)?;
//! let builder = KineticMatrixBuilder::new(&model);
//! let matrices = builder.build_dataset("dataset1", &parameters, BuildOptions::new())?;
//! ```

pub mod decompose;
pub mod error;
pub mod kinetic;
pub mod model;

pub use decompose::{ClpGroup, ClpResult, PostFitDecomposer, PostFitOutputs};
pub use error::{ConfigurationError, KineticError, NumericalError};
pub use kinetic::{
    AnalyticBasis, BasisEvaluator, BuildOptions, DatasetMatrices, EigenDecomposition,
    KineticMatrix, KineticMatrixBuilder, RateMatrix, RateMatrixEntry,
};
pub use model::{
    CompartmentConstraint, Dataset, GaussianIrf, InitialConcentration, Interval, Irf,
    KineticModel, Parameters, SpectralRelation,
};

pub mod prelude {
    pub use crate::decompose::{
        ClpGroup, ClpResult, IrfReport, MegacomplexDecomposition, PostFitDecomposer,
        PostFitOutputs,
    };
    pub use crate::error::{ConfigurationError, KineticError, NumericalError};
    pub use crate::kinetic::{
        AnalyticBasis, BasisEvaluator, BuildOptions, DatasetMatrices, KineticMatrix,
        KineticMatrixBuilder, RateMatrix, RateMatrixEntry,
    };
    pub use crate::model::{
        CoherentArtifact, CompartmentConstraint, CompartmentOrder, Dataset, GaussianIrf,
        InitialConcentration, Interval, Irf, KineticModel, Megacomplex, Parameters,
        SpectralRelation,
    };
}
