//! Dispersion statistics and consistency labelling.

use serde::Serialize;

use crate::classify::tables::{CV_HIGH_CONSISTENCY_BELOW, CV_MODERATE_CONSISTENCY_BELOW};
use crate::model::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    High,
    Moderate,
    Low,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VariabilityResult {
    pub std_dev: Option<f64>,
    pub coefficient_of_variation: Option<f64>,
    pub consistency: Consistency,
}

impl VariabilityResult {
    /// Substitute used when there are fewer than two values.
    pub fn undefined() -> Self {
        Self {
            std_dev: None,
            coefficient_of_variation: None,
            consistency: Consistency::Undefined,
        }
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std_dev(values: &[f64]) -> Result<f64, AnalysisError> {
    if values.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            required: 2,
            found: values.len(),
        });
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Ok((ss / (values.len() - 1) as f64).sqrt())
}

/// Consistency label for a coefficient of variation.
pub fn classify_cv(cv: f64) -> Consistency {
    if cv < CV_HIGH_CONSISTENCY_BELOW {
        Consistency::High
    } else if cv < CV_MODERATE_CONSISTENCY_BELOW {
        Consistency::Moderate
    } else {
        Consistency::Low
    }
}

/// Standard deviation, CV and consistency of `values`.
///
/// A zero mean leaves the CV undefined; the standard deviation is still
/// reported.
pub fn analyze_variability(values: &[f64]) -> Result<VariabilityResult, AnalysisError> {
    let std_dev = sample_std_dev(values)?;
    let m = mean(values).unwrap_or(0.0);

    if m == 0.0 {
        return Ok(VariabilityResult {
            std_dev: Some(std_dev),
            coefficient_of_variation: None,
            consistency: Consistency::Undefined,
        });
    }

    let cv = std_dev / m;
    Ok(VariabilityResult {
        std_dev: Some(std_dev),
        coefficient_of_variation: Some(cv),
        consistency: classify_cv(cv),
    })
}
