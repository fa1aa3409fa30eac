/// Analytics engine for the ET / NDVI service.
///
/// Submodules:
/// - `aggregate`: month / season / year bucketing and growing-season totals.
/// - `trend`: least-squares trend and direction label.
/// - `variability`: sample standard deviation, CV and consistency.
/// - `report`: composes the above into `et_analysis` / `vegetation_summary`.
///
/// Nothing in here performs I/O; every function takes immutable input and
/// returns a new value.

pub mod aggregate;
pub mod report;
pub mod trend;
pub mod variability;

pub use report::{AnalysisReport, EtAnalysis, ProcessedResponse, VegetationSummary, analyze, process};

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Converts millimetres to inches, rounded to 2 decimals.
pub fn mm_to_inches(mm: f64) -> f64 {
    round_to(mm / MM_PER_INCH, 2)
}
