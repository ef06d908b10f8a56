use thiserror::Error;

/// Errors caused by an invalid model description.
///
/// These are always fatal: the same model fails the same way for every
/// parameter vector, so the caller should abort rather than retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Two rate matrices declare a rate for the same `(to, from)` pair
    #[error("Rate from '{from}' to '{to}' is declared more than once")]
    DuplicateRate { to: String, from: String },

    /// A compartment label is not part of the order it is translated into
    #[error("Compartment '{compartment}' is not part of the {context} compartment order")]
    UnknownCompartment {
        compartment: String,
        context: &'static str,
    },

    /// A parameter reference could not be resolved
    #[error("Parameter '{0}' is not defined")]
    MissingParameter(String),

    /// A labelled model item (dataset, megacomplex, K-matrix, ...) is missing
    #[error("{kind} '{label}' is not defined in the model")]
    MissingItem { kind: &'static str, label: String },

    /// A compartment has no initial concentration entry
    #[error("Initial concentration '{label}' has no entry for compartment '{compartment}'")]
    MissingInitialConcentration { label: String, compartment: String },

    /// Coherent artifacts are only defined up to the second derivative
    #[error("Coherent artifact order must be between 1 and 3, got {0}")]
    InvalidCoherentArtifactOrder(usize),

    /// The model uses a schema version this crate does not understand
    #[error("Unsupported schema version '{version}'. Supported versions: {supported}")]
    UnsupportedSchema { version: String, supported: String },

    /// A compartment is declared twice in the model compartment list
    #[error("Duplicate compartment name: '{0}'")]
    DuplicateCompartment(String),

    /// Supplied arrays do not agree with the dataset they belong to
    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The model description could not be parsed
    #[error("Failed to parse model description: {0}")]
    Parse(String),
}

/// Errors raised by the linear algebra of a single matrix build.
///
/// The outer optimizer decides whether these reject a trial step or abort.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericalError {
    /// The eigenvector matrix cannot be inverted to working precision
    #[error("Eigenvector matrix of '{label}' is singular, initial concentrations cannot be projected")]
    SingularEigenvectors { label: String },

    /// The eigen-decomposition did not produce finite eigenvalues
    #[error("Eigen-decomposition of '{label}' failed: {reason}")]
    EigenDecomposition { label: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KineticError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Numerical error: {0}")]
    Numerical(#[from] NumericalError),
}

impl KineticError {
    /// Returns true if the error stems from the model description
    pub fn is_configuration(&self) -> bool {
        matches!(self, KineticError::Configuration(_))
    }
}

impl From<serde_json::Error> for KineticError {
    fn from(e: serde_json::Error) -> Self {
        KineticError::Configuration(ConfigurationError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_keep_the_category() {
        let err: KineticError = ConfigurationError::MissingParameter("k1".into()).into();
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Configuration error: Parameter 'k1' is not defined"
        );

        let err: KineticError = NumericalError::SingularEigenvectors { label: "mc1".into() }.into();
        assert!(!err.is_configuration());

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: KineticError = parse.into();
        assert!(matches!(
            err,
            KineticError::Configuration(ConfigurationError::Parse(_))
        ));
    }
}
