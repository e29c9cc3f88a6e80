//! Boundary file formats.
mod geojson;
pub use geojson::{GeoJsonParser, ParseError};
