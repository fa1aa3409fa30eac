/// OpenET Data API Client
///
/// Retrieves monthly ET and NDVI time series for a point or polygon from the
/// OpenET raster timeseries endpoints. One request per variable; no retry.
///
/// API Documentation: https://openet-api.org

use std::time::Duration;

use serde::Serialize;

use crate::logging::{self, Component};
use crate::model::{RawRecord, RawSeries, Variable};

const OPENET_BASE_URL: &str = "https://openet-api.org";

/// Provider requests routinely take minutes for large polygons.
const REQUEST_TIMEOUT_SECS: u64 = 300;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, PartialEq)]
pub enum OpenEtError {
    /// No API key was configured.
    MissingApiKey,
    /// Non-2xx HTTP response from the OpenET API.
    HttpError(u16),
    /// The request could not be sent or the body could not be read.
    RequestFailed(String),
    /// The response body was not the expected JSON array.
    ParseError(String),
    /// The provider answered with an empty series.
    NoData(Variable),
    /// A polygon coordinate list could not be used.
    InvalidGeometry(String),
}

impl std::fmt::Display for OpenEtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenEtError::MissingApiKey => write!(f, "Missing API key: set OPENET_API_KEY"),
            OpenEtError::HttpError(code) => write!(f, "HTTP error: {}", code),
            OpenEtError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
            OpenEtError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            OpenEtError::NoData(variable) => {
                write!(f, "No data returned for {}", variable.provider_name())
            }
            OpenEtError::InvalidGeometry(msg) => write!(f, "Invalid geometry: {}", msg),
        }
    }
}

impl std::error::Error for OpenEtError {}

impl From<reqwest::Error> for OpenEtError {
    fn from(e: reqwest::Error) -> Self {
        OpenEtError::RequestFailed(e.to_string())
    }
}

// ============================================================================
// Request payloads
// ============================================================================

/// Area the provider should sample.
///
/// Coordinates are passed through verbatim as `[lon, lat, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point { lat: f64, lon: f64 },
    Polygon(Vec<f64>),
}

impl Geometry {
    fn endpoint(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "raster/timeseries/point",
            Geometry::Polygon(_) => "raster/timeseries/polygon",
        }
    }

    fn coordinates(&self) -> Vec<f64> {
        match self {
            Geometry::Point { lat, lon } => vec![*lon, *lat],
            Geometry::Polygon(flat) => flat.clone(),
        }
    }

    /// Parses a flat `lon,lat,lon,lat,...` list into a polygon.
    ///
    /// Needs at least three vertices, each inside WGS84 bounds. The
    /// coordinates are sent to the provider in the order given.
    pub fn parse_polygon(raw: &str) -> Result<Geometry, OpenEtError> {
        let coords = raw
            .split(',')
            .map(|token| {
                token
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| OpenEtError::InvalidGeometry(format!("bad coordinate '{}'", token.trim())))
            })
            .collect::<Result<Vec<f64>, _>>()?;

        if coords.len() % 2 != 0 {
            return Err(OpenEtError::InvalidGeometry(format!(
                "expected lon,lat pairs, got {} values",
                coords.len()
            )));
        }
        if coords.len() < 6 {
            return Err(OpenEtError::InvalidGeometry(format!(
                "a polygon needs at least 3 vertices, got {}",
                coords.len() / 2
            )));
        }
        for pair in coords.chunks(2) {
            let (lon, lat) = (pair[0], pair[1]);
            if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
                return Err(OpenEtError::InvalidGeometry(format!(
                    "vertex {}, {} is out of range",
                    lon, lat
                )));
            }
        }

        Ok(Geometry::Polygon(coords))
    }

    /// Human-readable location used in logs and response summaries.
    pub fn location_label(&self) -> String {
        match self {
            Geometry::Point { lat, lon } => format!("{}, {}", lat, lon),
            Geometry::Polygon(_) => "Polygon area".to_string(),
        }
    }
}

/// JSON body of a timeseries request.
#[derive(Debug, Clone, Serialize)]
pub struct TimeseriesRequest {
    pub geometry: Vec<f64>,
    pub date_range: [String; 2],
    pub file_format: &'static str,
    pub interval: &'static str,
    pub model: &'static str,
    pub reference_et: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reducer: Option<&'static str>,
    pub units: &'static str,
    pub variable: &'static str,
    pub version: f64,
}

/// Builds the request body for one variable.
pub fn build_request(
    geometry: &Geometry,
    start_date: &str,
    end_date: &str,
    variable: Variable,
) -> TimeseriesRequest {
    TimeseriesRequest {
        geometry: geometry.coordinates(),
        date_range: [start_date.to_string(), end_date.to_string()],
        file_format: "JSON",
        interval: "monthly",
        model: "Ensemble",
        reference_et: "gridMET",
        reducer: match geometry {
            Geometry::Polygon(_) => Some("mean"),
            Geometry::Point { .. } => None,
        },
        units: "mm",
        variable: variable.provider_name(),
        version: 2.1,
    }
}

/// Full URL of the endpoint serving `geometry`.
pub fn endpoint_url(geometry: &Geometry) -> String {
    format!("{}/{}", OPENET_BASE_URL, geometry.endpoint())
}

// ============================================================================
// Response parsing
// ============================================================================

/// Parses a provider response body into raw records.
///
/// The provider answers with `[{"time": "2020-01-01", "et": 31}, ...]`. Entries
/// missing the variable's field come through with a null value and are
/// dropped later by normalization.
pub fn parse_timeseries_response(
    body: &str,
    variable: Variable,
) -> Result<Vec<RawRecord>, OpenEtError> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|e| OpenEtError::ParseError(e.to_string()))?;

    let items = json.as_array().ok_or_else(|| {
        OpenEtError::ParseError(format!(
            "expected a JSON array for {}, got {}",
            variable.provider_name(),
            json_type_name(&json)
        ))
    })?;

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let Some(date) = item.get("time").and_then(|t| t.as_str()) else {
            continue;
        };
        let value = item
            .get(variable.provider_name())
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        records.push(RawRecord::new(date, value));
    }

    Ok(records)
}

/// Rejects an empty provider series.
///
/// An empty array means the provider has no coverage for the geometry or
/// window, which `logging::classify_openet_failure` treats as expected.
pub fn require_records(records: Vec<RawRecord>, variable: Variable) -> Result<Vec<RawRecord>, OpenEtError> {
    if records.is_empty() {
        return Err(OpenEtError::NoData(variable));
    }
    Ok(records)
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ============================================================================
// API Client Functions
// ============================================================================

/// Builds a blocking client with the provider timeout.
pub fn build_client() -> Result<reqwest::blocking::Client, OpenEtError> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?)
}

/// Fetch one variable's monthly series for `geometry`.
pub fn fetch_variable(
    client: &reqwest::blocking::Client,
    api_key: &str,
    geometry: &Geometry,
    start_date: &str,
    end_date: &str,
    variable: Variable,
) -> Result<Vec<RawRecord>, OpenEtError> {
    if api_key.trim().is_empty() {
        return Err(OpenEtError::MissingApiKey);
    }

    let location = geometry.location_label();
    logging::info(
        Component::OpenEt,
        Some(&location),
        &format!("Fetching {} data", variable),
    );

    let payload = build_request(geometry, start_date, end_date, variable);
    let response = client
        .post(endpoint_url(geometry))
        .header("Authorization", api_key)
        .json(&payload)
        .send()?;

    if !response.status().is_success() {
        return Err(OpenEtError::HttpError(response.status().as_u16()));
    }

    let body = response.text()?;
    let records = require_records(parse_timeseries_response(&body, variable)?, variable)?;

    logging::info(
        Component::OpenEt,
        Some(&location),
        &format!("Fetched {} {} records", records.len(), variable),
    );

    Ok(records)
}

/// Fetch ET and NDVI for `geometry` (two requests).
pub fn fetch_both_variables(
    client: &reqwest::blocking::Client,
    api_key: &str,
    geometry: &Geometry,
    start_date: &str,
    end_date: &str,
) -> Result<RawSeries, OpenEtError> {
    let location = geometry.location_label();
    let fetch = |variable: Variable| {
        fetch_variable(client, api_key, geometry, start_date, end_date, variable).inspect_err(|e| {
            logging::log_openet_failure(&location, &format!("fetch {}", variable), e);
        })
    };

    Ok(RawSeries {
        et: fetch(Variable::Et)?,
        ndvi: fetch(Variable::Ndvi)?,
    })
}

// ============================================================================
// Tests
// ============================================================================
