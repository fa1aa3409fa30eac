//! ET / NDVI analytics service.
//!
//! Turns monthly evapotranspiration and NDVI series from OpenET into seasonal
//! and yearly totals, trend and variability indicators, and water-use /
//! vegetation-vigor classifications.
//!
//! Modules:
//! - `model`: shared types and the error taxonomy.
//! - `ingest`: raw record normalization and the OpenET client.
//! - `analysis`: aggregation, trend, variability and report composition.
//! - `classify`: threshold tables and band lookup.
//! - `config`: environment settings and table loading.
//! - `logging`: structured console / file logging.

pub mod analysis;
pub mod classify;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
