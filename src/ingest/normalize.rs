/// Raw record normalization.
///
/// Converts untyped provider/request records into a `Series`: one observation
/// per date, ascending, numeric values only, limited to the months the
/// query window touches.
/// This is the only place raw input is validated; everything downstream
/// works on typed observations.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::logging::{self, Component};
use crate::model::{AnalysisError, Observation, QueryWindow, RawRecord, Series, Variable};

/// Parses the date portion of a record.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` and RFC 3339 timestamps. The
/// timestamp forms keep their local calendar date.
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive())
}

/// Extracts a finite number from a JSON value. Anything else is non-numeric.
pub fn numeric_value(value: &serde_json::Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

/// Builds the canonical series for `variable` from raw records.
///
/// Rules:
/// - null / non-numeric values are dropped;
/// - unparseable dates are dropped;
/// - dates in months that do not overlap `window` are dropped;
/// - a repeated date keeps the value of its last occurrence;
/// - the result is ordered by date.
///
/// Returns `AnalysisError::Data` when nothing usable remains.
pub fn normalize(
    variable: Variable,
    records: &[RawRecord],
    window: &QueryWindow,
) -> Result<Series, AnalysisError> {
    let label = variable.label();
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut bad_dates = 0usize;
    let mut outside_window = 0usize;

    for record in records {
        let Some(value) = numeric_value(&record.value) else {
            continue;
        };

        let Some(date) = record.date_str().and_then(parse_record_date) else {
            bad_dates += 1;
            continue;
        };

        if !window.overlaps_month(date) {
            outside_window += 1;
            continue;
        }

        if !variable.in_expected_range(value) {
            logging::warn(
                Component::Normalizer,
                Some(label),
                &format!("{} value {} on {} is outside the expected range", label, value, date),
            );
        }

        by_date.insert(date, value);
    }

    if bad_dates > 0 {
        logging::warn(
            Component::Normalizer,
            Some(label),
            &format!("{} record(s) dropped with unparseable dates", bad_dates),
        );
    }
    if outside_window > 0 {
        logging::debug(
            Component::Normalizer,
            Some(label),
            &format!(
                "{} record(s) outside {}..{} dropped",
                outside_window,
                window.start(),
                window.end()
            ),
        );
    }

    logging::log_normalization_summary(label, records.len(), by_date.len());

    if by_date.is_empty() {
        let reason = if records.is_empty() {
            "no records supplied".to_string()
        } else {
            format!("all {} records were null, non-numeric or out of range", records.len())
        };
        return Err(AnalysisError::Data { variable, reason });
    }

    let observations = by_date
        .into_iter()
        .map(|(date, value)| Observation { date, value })
        .collect();

    Ok(Series::from_sorted(variable, observations))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
