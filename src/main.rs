/// Command-line entry point.
///
/// Usage:
///   etveg_service analyze <request.json>
///   etveg_service fetch-point <lat> <lon> <start_date> <end_date>
///   etveg_service fetch-polygon <start_date> <end_date> <lon,lat,lon,lat,...>
///
/// All commands print the processed response as JSON on stdout. Logs go to
/// stderr and, when `ETVEG_LOG_FILE` is set, to that file.

use std::env;
use std::fs;
use std::process::ExitCode;

use chrono::NaiveDate;

use etveg_service::analysis;
use etveg_service::classify::AnalysisTables;
use etveg_service::config::{self, Settings};
use etveg_service::ingest::openet::{self, Geometry};
use etveg_service::logging::{self, Component};
use etveg_service::model::{AnalysisRequest, QueryWindow};

const USAGE: &str = "usage:
  etveg_service analyze <request.json>
  etveg_service fetch-point <lat> <lon> <start_date> <end_date>
  etveg_service fetch-polygon <start_date> <end_date> <lon,lat,lon,lat,...>";

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logger(settings.log_level, settings.log_file.as_deref(), false);

    let tables = match config::load_tables(&settings) {
        Ok(t) => t,
        Err(e) => {
            logging::error(Component::Config, None, &e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("analyze") if args.len() == 2 => run_analyze(&args[1], &tables),
        Some("fetch-point") if args.len() == 5 => run_fetch_point(&args[1..], &settings, &tables),
        Some("fetch-polygon") if args.len() == 4 => run_fetch_polygon(&args[1..], &settings, &tables),
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(msg) => {
            logging::error(Component::System, None, &msg);
            ExitCode::FAILURE
        }
    }
}

fn run_analyze(path: &str, tables: &AnalysisTables) -> Result<String, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
    let request = AnalysisRequest::from_json(&text).map_err(|e| e.to_string())?;
    let response = analysis::process(&request, path, tables).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
}

fn parse_arg<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, String> {
    raw.parse().map_err(|_| format!("invalid {}: '{}'", name, raw))
}

fn parse_window(start: &str, end: &str) -> Result<QueryWindow, String> {
    let start: NaiveDate = parse_arg("start_date", start)?;
    let end: NaiveDate = parse_arg("end_date", end)?;
    QueryWindow::new(start, end).map_err(|e| e.to_string())
}

fn run_fetch_point(args: &[String], settings: &Settings, tables: &AnalysisTables) -> Result<String, String> {
    let lat: f64 = parse_arg("lat", &args[0])?;
    let lon: f64 = parse_arg("lon", &args[1])?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("coordinates out of range: {}, {}", lat, lon));
    }
    let window = parse_window(&args[2], &args[3])?;
    run_fetch(Geometry::Point { lat, lon }, window, settings, tables)
}

fn run_fetch_polygon(args: &[String], settings: &Settings, tables: &AnalysisTables) -> Result<String, String> {
    let window = parse_window(&args[0], &args[1])?;
    let geometry = Geometry::parse_polygon(&args[2]).map_err(|e| e.to_string())?;
    run_fetch(geometry, window, settings, tables)
}

fn run_fetch(
    geometry: Geometry,
    window: QueryWindow,
    settings: &Settings,
    tables: &AnalysisTables,
) -> Result<String, String> {
    let api_key = settings.api_key.as_deref().unwrap_or_default();
    let client = openet::build_client().map_err(|e| e.to_string())?;

    let start_str = window.start().to_string();
    let end_str = window.end().to_string();
    let series = openet::fetch_both_variables(&client, api_key, &geometry, &start_str, &end_str)
        .map_err(|e| e.to_string())?;

    let request = AnalysisRequest {
        series,
        start_date: window.start(),
        end_date: window.end(),
    };
    let response = analysis::process(&request, &geometry.location_label(), tables)
        .map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
}
