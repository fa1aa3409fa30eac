/// End-to-end tests for the analytics engine.
///
/// Tests drive the public API the way the request-handling layer does:
/// build an input-contract JSON body, run `analysis::analyze` / `process`,
/// and check the serialized output shape and values.
///
/// Run with: cargo test --test analysis_integration

use etveg_service::analysis::{self, aggregate::{Granularity, aggregate}};
use etveg_service::classify::AnalysisTables;
use etveg_service::classify::thresholds::{Band, ClassificationTable};
use etveg_service::ingest::normalize::normalize;
use etveg_service::model::{AnalysisError, AnalysisRequest, RawRecord, Variable};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Monthly records starting at `start_year-start_month`, one per value.
fn monthly_records(start_year: i32, start_month: u32, values: &[Value]) -> Vec<Value> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let m0 = start_month as usize - 1 + i;
            let year = start_year + (m0 / 12) as i32;
            let month = m0 % 12 + 1;
            json!({"date": format!("{:04}-{:02}-01", year, month), "value": v})
        })
        .collect()
}

fn request(et: Vec<Value>, ndvi: Vec<Value>, start: &str, end: &str) -> AnalysisRequest {
    let body = json!({
        "series": {"ET": et, "NDVI": ndvi},
        "start_date": start,
        "end_date": end,
    });
    AnalysisRequest::from_json(&body.to_string()).expect("test request should parse")
}

fn nums(values: &[f64]) -> Vec<Value> {
    values.iter().map(|v| json!(v)).collect()
}

/// Two years of monthly ET (mm) resembling an irrigated field.
fn two_year_et() -> Vec<Value> {
    nums(&[
        12.0, 18.0, 35.0, 62.0, 98.0, 141.0, 165.0, 150.0, 104.0, 60.0, 25.0, 11.0, // 2020
        14.0, 20.0, 38.0, 66.0, 105.0, 150.0, 172.0, 158.0, 110.0, 63.0, 27.0, 13.0, // 2021
    ])
}

fn two_year_ndvi() -> Vec<Value> {
    nums(&[
        0.21, 0.23, 0.30, 0.42, 0.58, 0.71, 0.76, 0.72, 0.61, 0.44, 0.30, 0.22,
        0.22, 0.24, 0.31, 0.45, 0.60, 0.73, 0.78, 0.74, 0.62, 0.45, 0.31, 0.23,
    ])
}

// ---------------------------------------------------------------------------
// Output contract
// ---------------------------------------------------------------------------

#[test]
fn test_report_has_documented_shape() {
    let req = request(
        monthly_records(2020, 1, &two_year_et()),
        monthly_records(2020, 1, &two_year_ndvi()),
        "2020-01-01",
        "2021-12-31",
    );
    let report = analysis::analyze(&req, &AnalysisTables::default()).expect("analysis should succeed");
    let json = serde_json::to_value(&report).unwrap();

    let et = &json["et_analysis"];
    for field in [
        "total_et_mm",
        "mean_monthly_et_mm",
        "max_monthly_et_mm",
        "min_monthly_et_mm",
        "peak_et_month",
        "total_et_inches",
        "growing_season_et_mm",
        "growing_season_et_inches",
        "observations",
        "date_range",
        "yearly_totals_mm",
        "seasonal_totals_mm",
        "monthly_trend",
        "trend_slope_mm_per_month",
        "et_variability",
        "water_use_classification",
        "water_use_description",
    ] {
        assert!(et.get(field).is_some(), "et_analysis missing '{}'", field);
    }
    for field in ["std_dev_mm", "coefficient_of_variation", "consistency"] {
        assert!(et["et_variability"].get(field).is_some(), "et_variability missing '{}'", field);
    }

    let veg = &json["vegetation_summary"];
    for field in [
        "total_observations",
        "mean_ndvi",
        "max_ndvi",
        "min_ndvi",
        "std_dev",
        "vigor_classification",
        "data_sources",
    ] {
        assert!(veg.get(field).is_some(), "vegetation_summary missing '{}'", field);
    }
    assert_eq!(veg["data_sources"], json!(["OpenET"]));
}

#[test]
fn test_two_year_field_values() {
    let req = request(
        monthly_records(2020, 1, &two_year_et()),
        monthly_records(2020, 1, &two_year_ndvi()),
        "2020-01-01",
        "2021-12-31",
    );
    let report = analysis::analyze(&req, &AnalysisTables::default()).unwrap();
    let et = &report.et_analysis;

    // 2020 = 881, 2021 = 936
    assert_eq!(et.total_et_mm, 1817);
    assert_eq!(et.yearly_totals_mm.get("2020"), Some(&881.0));
    assert_eq!(et.yearly_totals_mm.get("2021"), Some(&936.0));
    assert_eq!(et.observations, 24);
    assert_eq!(et.max_monthly_et_mm, 172);
    assert_eq!(et.min_monthly_et_mm, 11);
    assert_eq!(et.peak_et_month, "2021-07-01");
    assert_eq!(et.mean_monthly_et_mm, 75.7); // 1817 / 24 = 75.708
    assert_eq!(et.water_use_classification, "very_high_water_use");
    assert_eq!(et.date_range.start, "2020-01-01");
    assert_eq!(et.date_range.end, "2021-12-01");

    // Apr-Oct: 2020 = 780, 2021 = 824
    assert_eq!(et.growing_season_et_mm, 1604);

    assert_eq!(et.seasonal_totals_mm.winter, 88.0);
    assert_eq!(et.seasonal_totals_mm.spring, 404.0);
    assert_eq!(et.seasonal_totals_mm.summer, 936.0);
    assert_eq!(et.seasonal_totals_mm.fall, 389.0);

    let veg = &report.vegetation_summary;
    assert_eq!(veg.total_observations, 24);
    assert_eq!(veg.max_ndvi, 0.78);
    assert_eq!(veg.min_ndvi, 0.21);
    assert_eq!(veg.vigor_classification, "Moderate vegetation");
}

#[test]
fn test_total_inches_conversion_law() {
    let req = request(
        monthly_records(2020, 1, &two_year_et()),
        monthly_records(2020, 1, &two_year_ndvi()),
        "2020-01-01",
        "2021-12-31",
    );
    let et = analysis::analyze(&req, &AnalysisTables::default()).unwrap().et_analysis;
    let expected = (et.total_et_mm as f64 / 25.4 * 100.0).round() / 100.0;
    assert_eq!(et.total_et_inches, expected);
    let expected_gs = (et.growing_season_et_mm as f64 / 25.4 * 100.0).round() / 100.0;
    assert_eq!(et.growing_season_et_inches, expected_gs);
}

#[test]
fn test_growing_season_scenario_3779_mm() {
    // Every month inside April-October, summing to 3779 mm.
    let et = monthly_records(2021, 4, &nums(&[412.0, 560.0, 688.0, 719.0, 650.0, 480.0, 270.0]));
    let ndvi = monthly_records(2021, 4, &nums(&[0.40, 0.45, 0.47, 0.44, 0.42, 0.41, 0.43]));
    let req = request(et, ndvi, "2021-01-01", "2021-12-31");

    let report = analysis::analyze(&req, &AnalysisTables::default()).unwrap();
    assert_eq!(report.et_analysis.total_et_mm, 3779);
    assert_eq!(report.et_analysis.growing_season_et_mm, 3779);
    assert_eq!(report.et_analysis.total_et_inches, 148.78);
    assert_eq!(report.et_analysis.growing_season_et_inches, 148.78);
}

#[test]
fn test_mean_ndvi_0_432_is_moderate_vegetation() {
    // Mean of these five values is exactly 0.432.
    let ndvi = monthly_records(2021, 4, &nums(&[0.40, 0.42, 0.43, 0.45, 0.46]));
    let et = monthly_records(2021, 4, &nums(&[60.0, 80.0, 100.0, 90.0, 70.0]));
    let req = request(et, ndvi, "2021-01-01", "2021-12-31");

    let veg = analysis::analyze(&req, &AnalysisTables::default()).unwrap().vegetation_summary;
    assert_eq!(veg.mean_ndvi, 0.432);
    assert_eq!(veg.vigor_classification, "Moderate vegetation");
}

// ---------------------------------------------------------------------------
// Trend and variability
// ---------------------------------------------------------------------------

#[test]
fn test_increasing_series_reports_increasing_trend() {
    let et = monthly_records(2020, 1, &nums(&[719.0, 900.0, 1152.0, 2016.0]));
    let ndvi = monthly_records(2020, 1, &nums(&[0.3, 0.3, 0.3, 0.3]));
    let req = request(et, ndvi, "2020-01-01", "2020-12-31");
    let et = analysis::analyze(&req, &AnalysisTables::default()).unwrap().et_analysis;
    assert_eq!(serde_json::to_value(et.monthly_trend).unwrap(), "increasing");
    assert!(et.trend_slope_mm_per_month > 0.0);
}

#[test]
fn test_constant_series_reports_stable_and_high_consistency() {
    let et = monthly_records(2020, 1, &nums(&[40.0; 12]));
    let ndvi = monthly_records(2020, 1, &nums(&[0.5; 12]));
    let req = request(et, ndvi, "2020-01-01", "2020-12-31");
    let json = serde_json::to_value(analysis::analyze(&req, &AnalysisTables::default()).unwrap()).unwrap();

    assert_eq!(json["et_analysis"]["monthly_trend"], "stable");
    assert_eq!(json["et_analysis"]["trend_slope_mm_per_month"], 0.0);
    assert_eq!(json["et_analysis"]["et_variability"]["consistency"], "high");
    assert_eq!(json["et_analysis"]["et_variability"]["coefficient_of_variation"], 0.0);
    assert_eq!(json["et_analysis"]["water_use_classification"], "moderate_water_use");
}

#[test]
fn test_single_observation_reports_explicit_markers() {
    let et = monthly_records(2020, 6, &nums(&[120.0]));
    let ndvi = monthly_records(2020, 6, &nums(&[0.66]));
    let req = request(et, ndvi, "2020-01-01", "2020-12-31");
    let json = serde_json::to_value(analysis::analyze(&req, &AnalysisTables::default()).unwrap()).unwrap();

    assert_eq!(json["et_analysis"]["monthly_trend"], "stable");
    assert_eq!(json["et_analysis"]["et_variability"]["consistency"], "undefined");
    assert!(json["et_analysis"]["et_variability"]["std_dev_mm"].is_null());
    assert!(json["vegetation_summary"]["std_dev"].is_null());
    assert_eq!(json["vegetation_summary"]["vigor_classification"], "Healthy vegetation");
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

#[test]
fn test_empty_et_series_is_data_error() {
    let req = request(vec![], monthly_records(2020, 1, &nums(&[0.4])), "2020-01-01", "2020-12-31");
    let err = analysis::analyze(&req, &AnalysisTables::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::Data { variable: Variable::Et, .. }), "got {:?}", err);
}

#[test]
fn test_all_null_ndvi_is_data_error_not_zeros() {
    let req = request(
        monthly_records(2020, 1, &nums(&[50.0, 60.0])),
        monthly_records(2020, 1, &[json!(null), json!(null)]),
        "2020-01-01",
        "2020-12-31",
    );
    let err = analysis::analyze(&req, &AnalysisTables::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::Data { variable: Variable::Ndvi, .. }), "got {:?}", err);
}

#[test]
fn test_reversed_window_is_rejected() {
    let req = request(
        monthly_records(2020, 1, &nums(&[50.0])),
        monthly_records(2020, 1, &nums(&[0.4])),
        "2020-12-31",
        "2020-01-01",
    );
    assert!(matches!(
        analysis::analyze(&req, &AnalysisTables::default()),
        Err(AnalysisError::InvalidWindow { .. })
    ));
}

#[test]
fn test_nulls_and_duplicates_are_cleaned_before_analysis() {
    let et = vec![
        json!({"date": "2020-01-01", "value": 10}),
        json!({"date": "2020-02-01", "value": null}),
        json!({"date": "2020-03-01", "value": "bad"}),
        json!({"date": "2020-01-01", "value": 30}),
        json!({"date": "2020-04-01", "value": 50}),
    ];
    let req = request(et, monthly_records(2020, 1, &nums(&[0.4, 0.5])), "2020-01-01", "2020-12-31");
    let et = analysis::analyze(&req, &AnalysisTables::default()).unwrap().et_analysis;
    assert_eq!(et.observations, 2);
    assert_eq!(et.total_et_mm, 80);
}

#[test]
fn test_records_with_bad_dates_are_dropped_not_rejected() {
    let body = json!({
        "series": {
            "ET": [
                {"date": null, "value": 5},
                {"value": 9},
                {"date": 20200301, "value": 11},
                {"date": "2020-01-01", "value": 40},
                {"date": "2020-02-01", "value": 60},
            ],
            "NDVI": monthly_records(2020, 1, &nums(&[0.4, 0.5])),
        },
        "start_date": "2020-01-01",
        "end_date": "2020-12-31",
    });
    let req = AnalysisRequest::from_json(&body.to_string()).expect("request should parse");
    let et = analysis::analyze(&req, &AnalysisTables::default()).unwrap().et_analysis;
    assert_eq!(et.observations, 2);
    assert_eq!(et.total_et_mm, 100);
}

#[test]
fn test_mid_month_start_keeps_first_monthly_record() {
    let req = request(
        monthly_records(2020, 1, &nums(&[30.0, 40.0, 50.0])),
        monthly_records(2020, 1, &nums(&[0.4, 0.5, 0.6])),
        "2020-01-15",
        "2020-03-31",
    );
    let et = analysis::analyze(&req, &AnalysisTables::default()).unwrap().et_analysis;
    assert_eq!(et.observations, 3);
    assert_eq!(et.total_et_mm, 120);
    assert_eq!(et.date_range.start, "2020-01-01");
}

// ---------------------------------------------------------------------------
// Aggregation partition property
// ---------------------------------------------------------------------------

#[test]
fn test_month_buckets_partition_irregular_series() {
    let records: Vec<RawRecord> = [
        ("2020-01-03", 1.25),
        ("2020-01-17", 2.5),
        ("2020-02-29", 3.0),
        ("2020-05-10", 4.75),
        ("2020-12-31", 5.0),
        ("2021-01-01", 6.5),
        ("2021-03-15", 7.0),
    ]
    .iter()
    .map(|&(d, v)| RawRecord::new(d, json!(v)))
    .collect();

    let window = AnalysisRequest {
        series: Default::default(),
        start_date: "2020-01-01".parse().unwrap(),
        end_date: "2021-12-31".parse().unwrap(),
    }
    .window()
    .unwrap();
    let series = normalize(Variable::Et, &records, &window).unwrap();
    let buckets = aggregate(&series, Granularity::Month);

    assert_eq!(buckets.len(), 15); // 2020-01 .. 2021-03
    assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), series.len());
    let bucket_sum: f64 = buckets.iter().map(|b| b.sum).sum();
    assert!((bucket_sum - series.sum()).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Alternate tables
// ---------------------------------------------------------------------------

#[test]
fn test_substituted_tables_change_labels() {
    let mut tables = AnalysisTables::default();
    tables.vigor = ClassificationTable::new(
        "vigor",
        vec![
            Band::new(0.0, Some(0.5), "thin", "Thin canopy"),
            Band::new(0.5, None, "thick", "Thick canopy"),
        ],
    )
    .unwrap();
    tables.trend_epsilon = 1000.0;

    let et = monthly_records(2020, 1, &nums(&[10.0, 20.0, 30.0, 40.0]));
    let ndvi = monthly_records(2020, 1, &nums(&[0.6, 0.7]));
    let req = request(et, ndvi, "2020-01-01", "2020-12-31");
    let report = analysis::analyze(&req, &tables).unwrap();

    assert_eq!(report.vegetation_summary.vigor_classification, "Thick canopy");
    assert_eq!(
        serde_json::to_value(report.et_analysis.monthly_trend).unwrap(),
        "stable",
        "a huge epsilon should absorb a 10 mm/month slope"
    );
}

// ---------------------------------------------------------------------------
// Processed response
// ---------------------------------------------------------------------------

#[test]
fn test_processed_response_includes_variable_summaries() {
    let req = request(
        monthly_records(2020, 1, &nums(&[31.0, 45.0])),
        monthly_records(2020, 1, &nums(&[0.25, 0.35])),
        "2020-01-01",
        "2020-12-31",
    );
    let response = analysis::process(&req, "38.5, -121.7", &AnalysisTables::default()).unwrap();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["ET"]["values_found"], 2);
    assert_eq!(json["ET"]["et_mean"], 38.0);
    assert_eq!(json["ET"]["data_points"][0], json!({"date": "2020-01-01", "ET": 31.0}));
    assert_eq!(json["NDVI"]["ndvi_mean"], 0.3);
    assert_eq!(json["NDVI"]["date_range"], "2020-01-01 to 2020-02-01");
    assert_eq!(json["NDVI"]["location"], "38.5, -121.7");
    assert!(json.get("et_analysis").is_some());
    assert!(json.get("vegetation_summary").is_some());
}
