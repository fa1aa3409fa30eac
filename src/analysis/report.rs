//! Composite ET and vegetation reports.
//!
//! Field names, nesting and units of the serialized structs here are the
//! response contract consumed by the presentation layer. Numbers are kept at
//! full precision through every computation and rounded once, when the
//! output struct is built.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::aggregate::{Granularity, aggregate, growing_season_total, monthly_mean_series};
use super::trend::{TrendLabel, TrendResult, estimate_trend};
use super::variability::{Consistency, VariabilityResult, analyze_variability, mean, sample_std_dev};
use super::{mm_to_inches, round_to};
use crate::classify::AnalysisTables;
use crate::ingest::normalize::normalize;
use crate::logging::{self, Component};
use crate::model::{AnalysisError, AnalysisRequest, Observation, Series, Variable};

/// Provider credited in `data_sources` and variable summaries.
pub const DATA_SOURCE: &str = "OpenET";

const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalTotals {
    pub winter: f64,
    pub spring: f64,
    pub summer: f64,
    pub fall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtVariability {
    pub std_dev_mm: Option<f64>,
    pub coefficient_of_variation: Option<f64>,
    pub consistency: Consistency,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtAnalysis {
    pub total_et_mm: i64,
    pub mean_monthly_et_mm: f64,
    pub max_monthly_et_mm: i64,
    pub min_monthly_et_mm: i64,
    pub peak_et_month: String,
    pub total_et_inches: f64,
    pub growing_season_et_mm: i64,
    pub growing_season_et_inches: f64,
    pub observations: usize,
    pub date_range: DateRange,
    pub yearly_totals_mm: BTreeMap<String, f64>,
    pub seasonal_totals_mm: SeasonalTotals,
    pub monthly_trend: TrendLabel,
    pub trend_slope_mm_per_month: f64,
    pub et_variability: EtVariability,
    pub water_use_classification: String,
    pub water_use_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VegetationSummary {
    pub total_observations: usize,
    pub mean_ndvi: f64,
    pub max_ndvi: f64,
    pub min_ndvi: f64,
    pub std_dev: Option<f64>,
    pub vigor_classification: String,
    pub data_sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub et_analysis: EtAnalysis,
    pub vegetation_summary: VegetationSummary,
}

/// Extraction summary for one variable.
///
/// Serialized with variable-specific keys: `et_mean` / `ndvi_mean`, and data
/// points as `{"date": ..., "ET": ...}` / `{"date": ..., "NDVI": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSummary {
    pub variable: Variable,
    pub source: String,
    pub location: String,
    pub values_found: usize,
    pub date_range: String,
    pub mean: f64,
    pub data_points: Vec<(NaiveDate, f64)>,
}

struct DataPoints<'a>(&'a VariableSummary);

struct DataPoint<'a> {
    label: &'a str,
    date: NaiveDate,
    value: f64,
}

impl Serialize for DataPoint<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("date", &self.date.format(DATE_FORMAT).to_string())?;
        map.serialize_entry(self.label, &self.value)?;
        map.end()
    }
}

impl Serialize for DataPoints<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let label = self.0.variable.label();
        serializer.collect_seq(self.0.data_points.iter().map(|&(date, value)| DataPoint {
            label,
            date,
            value,
        }))
    }
}

impl Serialize for VariableSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mean_key = format!("{}_mean", self.variable.provider_name());
        let mut map = serializer.serialize_map(Some(6))?;
        map.serialize_entry("source", &self.source)?;
        map.serialize_entry("location", &self.location)?;
        map.serialize_entry("values_found", &self.values_found)?;
        map.serialize_entry("date_range", &self.date_range)?;
        map.serialize_entry(&mean_key, &self.mean)?;
        map.serialize_entry("data_points", &DataPoints(self))?;
        map.end()
    }
}

/// Full response: both extraction summaries plus the two reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedResponse {
    #[serde(rename = "NDVI")]
    pub ndvi: VariableSummary,
    #[serde(rename = "ET")]
    pub et: VariableSummary,
    pub et_analysis: EtAnalysis,
    pub vegetation_summary: VegetationSummary,
}

// ---------------------------------------------------------------------------
// ET analysis
// ---------------------------------------------------------------------------

fn empty_series_error(series: &Series) -> AnalysisError {
    AnalysisError::Data {
        variable: series.variable(),
        reason: "series contains no observations".to_string(),
    }
}

/// Builds `et_analysis` from a normalized ET series.
pub fn analyze_et(series: &Series, tables: &AnalysisTables) -> Result<EtAnalysis, AnalysisError> {
    let (Some(first), Some(last)) = (series.first_date(), series.last_date()) else {
        return Err(empty_series_error(series));
    };

    let months = aggregate(series, Granularity::Month);
    let seasons = aggregate(series, Granularity::Season);
    let years = aggregate(series, Granularity::Year);

    let monthly: Vec<_> = months.iter().filter(|b| !b.is_empty()).collect();
    let monthly_totals: Vec<f64> = monthly.iter().map(|b| b.sum).collect();

    let total: f64 = months.iter().map(|b| b.sum).sum();
    let mean_monthly = mean(&monthly_totals).ok_or_else(|| empty_series_error(series))?;

    // First month holding the maximum wins ties.
    let mut peak = monthly[0];
    for &bucket in &monthly[1..] {
        if bucket.sum > peak.sum {
            peak = bucket;
        }
    }
    let max_monthly = peak.sum;

    // Date of the largest observation inside the peak month; first one on ties.
    let peak_date = series
        .observations()
        .iter()
        .filter(|o| o.date.format("%Y-%m").to_string() == peak.key)
        .fold(None::<&Observation>, |best, o| match best {
            Some(b) if b.value >= o.value => Some(b),
            _ => Some(o),
        })
        .map(|o| o.date.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| format!("{}-01", peak.key));
    let min_monthly = monthly_totals.iter().copied().fold(f64::INFINITY, f64::min);

    let growing = growing_season_total(&months, &tables.growing_season);

    let mean_series = monthly_mean_series(&months);
    let trend = estimate_trend(&mean_series, tables.trend_epsilon).unwrap_or_else(|e| {
        logging::debug(Component::Analysis, Some("ET"), &format!("trend substituted: {}", e));
        TrendResult::stable()
    });

    let mean_values: Vec<f64> = mean_series.iter().map(|p| p.1).collect();
    let variability = analyze_variability(&mean_values).unwrap_or_else(|e| {
        logging::debug(Component::Analysis, Some("ET"), &format!("variability substituted: {}", e));
        VariabilityResult::undefined()
    });

    let water_use = tables.classify_water_use(mean_monthly);
    if water_use.is_unclassified() {
        logging::warn(
            Component::Analysis,
            Some("ET"),
            &format!("mean monthly ET {} is outside every water-use band", mean_monthly),
        );
    }

    let season_total = |i: usize| round_to(seasons[i].sum, 0);
    let total_et_mm = round_to(total, 0) as i64;
    let growing_season_et_mm = round_to(growing, 0) as i64;

    Ok(EtAnalysis {
        total_et_mm,
        mean_monthly_et_mm: round_to(mean_monthly, 1),
        max_monthly_et_mm: round_to(max_monthly, 0) as i64,
        min_monthly_et_mm: round_to(min_monthly, 0) as i64,
        peak_et_month: peak_date,
        // Converted from the reported millimetres so the two fields agree.
        total_et_inches: mm_to_inches(total_et_mm as f64),
        growing_season_et_mm,
        growing_season_et_inches: mm_to_inches(growing_season_et_mm as f64),
        observations: series.len(),
        date_range: DateRange {
            start: first.format(DATE_FORMAT).to_string(),
            end: last.format(DATE_FORMAT).to_string(),
        },
        yearly_totals_mm: years
            .iter()
            .map(|b| (b.key.clone(), round_to(b.sum, 0)))
            .collect(),
        seasonal_totals_mm: SeasonalTotals {
            winter: season_total(0),
            spring: season_total(1),
            summer: season_total(2),
            fall: season_total(3),
        },
        monthly_trend: trend.label,
        trend_slope_mm_per_month: round_to(trend.slope, 3),
        et_variability: EtVariability {
            std_dev_mm: variability.std_dev.map(|v| round_to(v, 1)),
            coefficient_of_variation: variability.coefficient_of_variation.map(|v| round_to(v, 2)),
            consistency: variability.consistency,
        },
        water_use_classification: water_use.class_label,
        water_use_description: water_use.description,
    })
}

// ---------------------------------------------------------------------------
// Vegetation summary
// ---------------------------------------------------------------------------

/// Builds `vegetation_summary` from a normalized NDVI series.
pub fn summarize_vegetation(
    series: &Series,
    tables: &AnalysisTables,
) -> Result<VegetationSummary, AnalysisError> {
    let values = series.values();
    let mean_ndvi = mean(&values).ok_or_else(|| empty_series_error(series))?;
    let max_ndvi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_ndvi = values.iter().copied().fold(f64::INFINITY, f64::min);

    let std_dev = match sample_std_dev(&values) {
        Ok(sd) => Some(round_to(sd, 3)),
        Err(e) => {
            logging::debug(Component::Analysis, Some("NDVI"), &format!("std_dev omitted: {}", e));
            None
        }
    };

    let vigor = tables.classify_vigor(mean_ndvi);

    Ok(VegetationSummary {
        total_observations: values.len(),
        mean_ndvi: round_to(mean_ndvi, 3),
        max_ndvi: round_to(max_ndvi, 3),
        min_ndvi: round_to(min_ndvi, 3),
        std_dev,
        vigor_classification: vigor.description,
        data_sources: vec![DATA_SOURCE.to_string()],
    })
}

// ---------------------------------------------------------------------------
// Variable summaries
// ---------------------------------------------------------------------------

/// Builds the extraction summary of one normalized series.
pub fn summarize_variable(series: &Series, location: &str) -> VariableSummary {
    let date_range = match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => format!(
            "{} to {}",
            first.format(DATE_FORMAT),
            last.format(DATE_FORMAT)
        ),
        _ => "N/A".to_string(),
    };

    VariableSummary {
        variable: series.variable(),
        source: DATA_SOURCE.to_string(),
        location: location.to_string(),
        values_found: series.len(),
        date_range,
        mean: mean(&series.values()).map(|m| round_to(m, 3)).unwrap_or(0.0),
        data_points: series.observations().iter().map(|o| (o.date, o.value)).collect(),
    }
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

fn normalize_request(
    request: &AnalysisRequest,
) -> Result<(Series, Series), AnalysisError> {
    let window = request.window()?;
    let et = normalize(Variable::Et, &request.series.et, &window)?;
    let ndvi = normalize(Variable::Ndvi, &request.series.ndvi, &window)?;
    Ok((et, ndvi))
}

/// Runs the full engine and returns both reports.
///
/// A variable that normalizes to nothing aborts the whole analysis with
/// `AnalysisError::Data`; no partial report is produced.
pub fn analyze(request: &AnalysisRequest, tables: &AnalysisTables) -> Result<AnalysisReport, AnalysisError> {
    let (et, ndvi) = normalize_request(request)?;
    build_report(&et, &ndvi, tables)
}

fn build_report(et: &Series, ndvi: &Series, tables: &AnalysisTables) -> Result<AnalysisReport, AnalysisError> {
    let report = AnalysisReport {
        et_analysis: analyze_et(et, tables)?,
        vegetation_summary: summarize_vegetation(ndvi, tables)?,
    };

    logging::info(
        Component::Analysis,
        None,
        &format!(
            "Report built: {} ET / {} NDVI observations, {}, {}",
            et.len(),
            ndvi.len(),
            report.et_analysis.water_use_classification,
            report.vegetation_summary.vigor_classification
        ),
    );

    Ok(report)
}

/// Runs the engine and attaches per-variable extraction summaries.
pub fn process(
    request: &AnalysisRequest,
    location: &str,
    tables: &AnalysisTables,
) -> Result<ProcessedResponse, AnalysisError> {
    let (et, ndvi) = normalize_request(request)?;
    let report = build_report(&et, &ndvi, tables)?;

    Ok(ProcessedResponse {
        ndvi: summarize_variable(&ndvi, location),
        et: summarize_variable(&et, location),
        et_analysis: report.et_analysis,
        vegetation_summary: report.vegetation_summary,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
