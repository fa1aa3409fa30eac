/// Categorical classification of aggregated metrics.
///
/// Submodules:
/// - `thresholds`: ordered band tables and first-match lookup.
/// - `tables`: the versioned water-use / vigor tables and engine constants.

pub mod tables;
pub mod thresholds;

pub use tables::AnalysisTables;
pub use thresholds::{Band, ClassificationResult, ClassificationTable};
