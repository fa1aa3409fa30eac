/// Core data types for the ET / NDVI analytics service.
///
/// This module defines the shared domain model imported by all other modules:
/// variables, raw and normalized observations, the query window, and the
/// error taxonomy. It contains no I/O.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// Remote-sensed variables served by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    #[serde(rename = "ET")]
    Et,
    #[serde(rename = "NDVI")]
    Ndvi,
}

impl Variable {
    /// Field name the provider uses for this variable's values.
    pub fn provider_name(&self) -> &'static str {
        match self {
            Variable::Et => "et",
            Variable::Ndvi => "ndvi",
        }
    }

    /// Upper-case name used in request and response payloads.
    pub fn label(&self) -> &'static str {
        match self {
            Variable::Et => "ET",
            Variable::Ndvi => "NDVI",
        }
    }

    /// Whether `value` lies inside the physically expected range.
    ///
    /// ET is a non-negative water flux; NDVI is softly bounded to [0, 1].
    pub fn in_expected_range(&self, value: f64) -> bool {
        match self {
            Variable::Et => value >= 0.0,
            Variable::Ndvi => (0.0..=1.0).contains(&value),
        }
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// One record as it arrives from the request or the provider, before any
/// validation.
///
/// The provider names its fields `time` and `et`/`ndvi`; the request contract
/// uses `date` and `value`. Both spellings deserialize into this type.
/// Neither field is checked here: a missing, null or non-string date is
/// dropped by normalization like any other bad record.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawRecord {
    #[serde(default, alias = "time")]
    pub date: serde_json::Value,
    #[serde(default, alias = "et", alias = "ndvi")]
    pub value: serde_json::Value,
}

impl RawRecord {
    pub fn new(date: &str, value: serde_json::Value) -> Self {
        Self {
            date: serde_json::Value::String(date.to_string()),
            value,
        }
    }

    /// The date field when it is a string.
    pub fn date_str(&self) -> Option<&str> {
        self.date.as_str()
    }
}

/// Both raw series carried by an analysis request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSeries {
    #[serde(rename = "ET", default)]
    pub et: Vec<RawRecord>,
    #[serde(rename = "NDVI", default)]
    pub ndvi: Vec<RawRecord>,
}

/// Input contract handed to the engine by the request-handling layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisRequest {
    pub series: RawSeries,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl AnalysisRequest {
    /// Parses a request from its JSON representation.
    pub fn from_json(text: &str) -> Result<Self, AnalysisError> {
        serde_json::from_str(text).map_err(|e| AnalysisError::InvalidRequest(e.to_string()))
    }

    /// Validated query window of this request.
    pub fn window(&self) -> Result<QueryWindow, AnalysisError> {
        QueryWindow::new(self.start_date, self.end_date)
    }
}

// ---------------------------------------------------------------------------
// Normalized series
// ---------------------------------------------------------------------------

/// Inclusive date range of a query. `start` is strictly before `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl QueryWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AnalysisError> {
        if start >= end {
            return Err(AnalysisError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Whether the calendar month of `date` overlaps the window.
    ///
    /// Monthly records are dated on the first of their month, so a window
    /// starting mid-month still keeps the month it starts in.
    pub fn overlaps_month(&self, date: NaiveDate) -> bool {
        let month = (date.year(), date.month());
        month >= (self.start.year(), self.start.month()) && month <= (self.end.year(), self.end.month())
    }
}

/// A single validated measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Ordered observations of one variable.
///
/// Dates are unique and ascending. Only `ingest::normalize` builds a `Series`
/// from untrusted input; the fields are private so it cannot be mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    variable: Variable,
    observations: Vec<Observation>,
}

impl Series {
    /// Builds a series from observations already sorted by unique date.
    pub(crate) fn from_sorted(variable: Variable, observations: Vec<Observation>) -> Self {
        debug_assert!(observations.windows(2).all(|w| w[0].date < w[1].date));
        Self {
            variable,
            observations,
        }
    }

    pub fn variable(&self) -> Variable {
        self.variable
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    pub fn sum(&self) -> f64 {
        self.observations.iter().map(|o| o.value).sum()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the analytics engine.
///
/// Values falling outside every classification band are not errors; they
/// yield the `"unclassified"` result instead.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// No usable observations remained after normalization.
    Data { variable: Variable, reason: String },
    /// Trend or variability needs more data points than were available.
    InsufficientData { required: usize, found: usize },
    /// The query window is empty or reversed.
    InvalidWindow { start: NaiveDate, end: NaiveDate },
    /// The request body could not be deserialized.
    InvalidRequest(String),
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::Data { variable, reason } => {
                write!(f, "No usable {} data: {}", variable, reason)
            }
            AnalysisError::InsufficientData { required, found } => write!(
                f,
                "Insufficient data: need at least {} points, found {}",
                required, found
            ),
            AnalysisError::InvalidWindow { start, end } => {
                write!(f, "Invalid window: start_date {} must be before end_date {}", start, end)
            }
            AnalysisError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
