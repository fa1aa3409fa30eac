/// Data ingestion for the analytics service.
///
/// Submodules:
/// - `normalize`: validates raw records into ordered `Series`.
/// - `openet`: OpenET API client (request building, fetch, response parsing).

pub mod normalize;
pub mod openet;
