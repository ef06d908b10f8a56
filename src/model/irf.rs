use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::model::Parameters;

/// Instrument response function of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Irf {
    /// Ideal delta excitation at `t = 0`
    #[default]
    None,
    Gaussian(GaussianIrf),
}

impl Irf {
    pub fn as_gaussian(&self) -> Option<&GaussianIrf> {
        match self {
            Irf::None => None,
            Irf::Gaussian(g) => Some(g),
        }
    }
}

/// Coherent artifact columns derived from the IRF shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoherentArtifact {
    /// Number of columns: the Gaussian itself and up to its second derivative
    pub order: usize,
    /// Width parameter used instead of the IRF width
    #[serde(default)]
    pub width: Option<String>,
}

impl CoherentArtifact {
    /// Column labels, `coherent_artifact_1..=order`
    pub fn labels(&self) -> Vec<String> {
        (1..=self.order)
            .map(|i| format!("coherent_artifact_{}", i))
            .collect()
    }
}

/// Parameter references of a (multi-component, dispersive) Gaussian IRF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianIrf {
    pub center: Vec<String>,
    pub width: Vec<String>,
    /// One scale per component; all components are scaled by 1 when empty
    #[serde(default)]
    pub scale: Vec<String>,
    #[serde(default)]
    pub center_dispersion: Vec<String>,
    #[serde(default)]
    pub width_dispersion: Vec<String>,
    /// Reference point on the global axis for the dispersion polynomials
    #[serde(default)]
    pub dispersion_center: Option<f64>,
    /// Period of the excitation, enables the backsweep correction
    #[serde(default)]
    pub backsweep_period: Option<String>,
    #[serde(default)]
    pub coherent_artifact: Option<CoherentArtifact>,
}

/// IRF parameter values at one point of the global axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGaussianIrf {
    pub centers: Vec<f64>,
    pub widths: Vec<f64>,
    pub scales: Vec<f64>,
    pub backsweep_period: Option<f64>,
}

impl ResolvedGaussianIrf {
    pub fn components(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.centers
            .iter()
            .zip(self.widths.iter())
            .zip(self.scales.iter())
            .map(|((c, w), s)| (*c, *w, *s))
    }

    /// Multiplies every component scale by `scale`
    pub fn scaled(mut self, scale: f64) -> Self {
        self.scales.iter_mut().for_each(|s| *s *= scale);
        self
    }
}

/// `Σ_k coefficients[k] · distance^(k+1)`
pub fn dispersion_polynomial(coefficients: &[f64], distance: f64) -> f64 {
    coefficients
        .iter()
        .enumerate()
        .map(|(k, a)| a * distance.powi(k as i32 + 1))
        .sum()
}

impl GaussianIrf {
    pub fn new(center: impl Into<String>, width: impl Into<String>) -> Self {
        Self {
            center: vec![center.into()],
            width: vec![width.into()],
            scale: Vec::new(),
            center_dispersion: Vec::new(),
            width_dispersion: Vec::new(),
            dispersion_center: None,
            backsweep_period: None,
            coherent_artifact: None,
        }
    }

    pub fn with_backsweep(mut self, period: impl Into<String>) -> Self {
        self.backsweep_period = Some(period.into());
        self
    }

    pub fn with_center_dispersion(mut self, center: f64, coefficients: Vec<String>) -> Self {
        self.dispersion_center = Some(center);
        self.center_dispersion = coefficients;
        self
    }

    pub fn with_coherent_artifact(mut self, order: usize) -> Self {
        self.coherent_artifact = Some(CoherentArtifact { order, width: None });
        self
    }

    /// Normalised distance of `index` from the dispersion centre.
    ///
    /// `fallback_center` is used when the IRF does not declare its own centre.
    pub fn dispersion_distance(&self, index: f64, fallback_center: f64) -> f64 {
        (index - self.dispersion_center.unwrap_or(fallback_center)) / 100.0
    }

    /// Resolves all references and applies dispersion at the global axis value `index`.
    pub fn resolve(
        &self,
        parameters: &Parameters,
        index: f64,
        fallback_center: f64,
    ) -> Result<ResolvedGaussianIrf, ConfigurationError> {
        let mut centers = parameters.get_all(&self.center)?;
        let mut widths = parameters.get_all(&self.width)?;
        if widths.len() != centers.len() {
            return Err(ConfigurationError::ShapeMismatch {
                what: "IRF widths",
                expected: centers.len(),
                actual: widths.len(),
            });
        }

        let distance = self.dispersion_distance(index, fallback_center);
        if !self.center_dispersion.is_empty() {
            let shift = dispersion_polynomial(&parameters.get_all(&self.center_dispersion)?, distance);
            centers.iter_mut().for_each(|c| *c += shift);
        }
        if !self.width_dispersion.is_empty() {
            let shift = dispersion_polynomial(&parameters.get_all(&self.width_dispersion)?, distance);
            widths.iter_mut().for_each(|w| *w += shift);
        }

        let scales = if self.scale.is_empty() {
            vec![1.0; centers.len()]
        } else {
            let scales = parameters.get_all(&self.scale)?;
            if scales.len() != centers.len() {
                return Err(ConfigurationError::ShapeMismatch {
                    what: "IRF scales",
                    expected: centers.len(),
                    actual: scales.len(),
                });
            }
            scales
        };

        let backsweep_period = self
            .backsweep_period
            .as_deref()
            .map(|p| parameters.get(p))
            .transpose()?;

        Ok(ResolvedGaussianIrf {
            centers,
            widths,
            scales,
            backsweep_period,
        })
    }

    /// Centre shift of each dispersion order at the global axis value `index`.
    ///
    /// Entry `k` is `a_k · d^(k+1)`, the contribution of the `k`-th coefficient.
    pub fn center_dispersion_terms(
        &self,
        parameters: &Parameters,
        index: f64,
        fallback_center: f64,
    ) -> Result<Vec<f64>, ConfigurationError> {
        let distance = self.dispersion_distance(index, fallback_center);
        Ok(parameters
            .get_all(&self.center_dispersion)?
            .iter()
            .enumerate()
            .map(|(k, a)| a * distance.powi(k as i32 + 1))
            .collect())
    }
}
