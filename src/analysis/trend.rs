//! Linear trend estimation.

use serde::Serialize;

use crate::model::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendResult {
    /// Units per index step (mm/month for monthly ET).
    pub slope: f64,
    pub label: TrendLabel,
}

impl TrendResult {
    /// Neutral result substituted when there is too little data.
    pub fn stable() -> Self {
        Self {
            slope: 0.0,
            label: TrendLabel::Stable,
        }
    }
}

/// Labels a slope against the symmetric stability margin `epsilon`.
pub fn classify_slope(slope: f64, epsilon: f64) -> TrendLabel {
    if slope > epsilon {
        TrendLabel::Increasing
    } else if slope < -epsilon {
        TrendLabel::Decreasing
    } else {
        TrendLabel::Stable
    }
}

/// Ordinary least-squares slope of value against index.
///
/// Needs at least two points with distinct indices.
pub fn ols_slope(points: &[(f64, f64)]) -> Result<f64, AnalysisError> {
    if points.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            required: 2,
            found: points.len(),
        });
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), &(x, y)| {
        let dx = x - mean_x;
        (sxy + dx * (y - mean_y), sxx + dx * dx)
    });

    if sxx == 0.0 {
        return Err(AnalysisError::InsufficientData {
            required: 2,
            found: 1,
        });
    }

    Ok(sxy / sxx)
}

/// Fits and labels the trend of `(index, value)` points.
pub fn estimate_trend(points: &[(f64, f64)], epsilon: f64) -> Result<TrendResult, AnalysisError> {
    let slope = ols_slope(points)?;
    Ok(TrendResult {
        slope,
        label: classify_slope(slope, epsilon),
    })
}
