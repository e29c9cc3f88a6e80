use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
  map::{
    coordinates::{PixelCoordinate, WGS84Coordinate},
    region::{ID_KEYS, NAME_KEYS, Region, polygon},
  },
  profile_scope,
};

#[derive(Error, Debug)]
pub enum ParseError {
  #[error("invalid json: {0}")]
  InvalidJson(#[from] serde_json::Error),
  #[error("GeoJSON must be an object or an array of features")]
  NotAnObject,
  #[error("missing 'type' field for GeoJSON")]
  MissingType,
  #[error("unsupported boundary format: {0}")]
  Unsupported(String),
  #[error("unknown GeoJSON type: {0}")]
  UnknownType(String),
}

/// Normalizes the GeoJSON shapes found in boundary files into [`Region`]s.
///
/// Accepts a `FeatureCollection`, a single `Feature`, a bare geometry or a bare array of
/// features. Only areal geometries (`Polygon`, `MultiPolygon` and collections of them) become
/// boundaries, everything else is skipped.
#[derive(Debug, Default)]
pub struct GeoJsonParser {
  regions: Vec<Region>,
}

impl GeoJsonParser {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Parses a complete document.
  pub fn parse_str(self, data: &str) -> Result<Vec<Region>, ParseError> {
    let value: Value = serde_json::from_str(data)?;
    self.parse_value(&value)
  }

  /// Parses an already deserialized document.
  pub fn parse_value(mut self, value: &Value) -> Result<Vec<Region>, ParseError> {
    profile_scope!("GeoJsonParser::parse_value");
    self.parse_geojson(value)?;
    Ok(self.regions)
  }

  fn parse_geojson(&mut self, value: &Value) -> Result<(), ParseError> {
    match value {
      Value::Array(items) => {
        for item in items {
          self.parse_feature(item, Some("Polygon"));
        }
      }
      Value::Object(obj) => {
        let geotype = obj
          .get("type")
          .and_then(Value::as_str)
          .ok_or(ParseError::MissingType)?;
        match geotype {
          "FeatureCollection" => {
            if let Some(features) = obj.get("features").and_then(Value::as_array) {
              for feature in features {
                self.parse_feature(feature, None);
              }
            }
          }
          "Feature" => self.parse_feature(value, None),
          "Polygon" | "MultiPolygon" | "GeometryCollection" => {
            self.push_region(&Map::new(), None, value, None);
          }
          "Topology" => return Err(ParseError::Unsupported(geotype.to_string())),
          _ => return Err(ParseError::UnknownType(geotype.to_string())),
        }
      }
      _ => return Err(ParseError::NotAnObject),
    }
    Ok(())
  }

  fn parse_feature(&mut self, feature: &Value, default_type: Option<&str>) {
    let Some(obj) = feature.as_object() else {
      log::warn!("Skipping feature that is not an object");
      return;
    };
    let empty = Map::new();
    let properties = obj
      .get("properties")
      .and_then(Value::as_object)
      .unwrap_or(&empty);
    match obj.get("geometry") {
      Some(geometry) => self.push_region(properties, obj.get("id"), geometry, default_type),
      None => log::warn!("Skipping feature without geometry"),
    }
  }

  fn push_region(
    &mut self,
    properties: &Map<String, Value>,
    feature_id: Option<&Value>,
    geometry: &Value,
    default_type: Option<&str>,
  ) {
    let polygons = Self::parse_geometry(geometry, default_type);
    let position = self.regions.len() as u64 + 1;
    let name = Self::extract_name(properties).unwrap_or_else(|| format!("Region {position}"));
    if polygons.is_empty() {
      log::warn!("Skipping '{name}': no areal geometry");
      return;
    }
    let id = Self::extract_id(properties, feature_id);
    self
      .regions
      .push(Region::new(name, id, properties.clone(), polygons));
  }

  fn extract_name(properties: &Map<String, Value>) -> Option<String> {
    NAME_KEYS
      .iter()
      .filter_map(|key| properties.get(*key))
      .find_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
      .map(ToString::to_string)
  }

  #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
  fn extract_id(properties: &Map<String, Value>, feature_id: Option<&Value>) -> Option<u64> {
    ID_KEYS
      .iter()
      .filter_map(|key| properties.get(*key))
      .chain(feature_id)
      .find_map(|v| match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
      })
  }

  /// All areal parts of a geometry, holes included.
  fn parse_geometry(geometry: &Value, default_type: Option<&str>) -> Vec<geo::Polygon<f32>> {
    let Some(obj) = geometry.as_object() else {
      return Vec::new();
    };
    let Some(geom_type) = obj.get("type").and_then(Value::as_str).or(default_type) else {
      return Vec::new();
    };

    match geom_type {
      "Polygon" => obj
        .get("coordinates")
        .and_then(Self::parse_polygon)
        .into_iter()
        .collect(),
      "MultiPolygon" => obj
        .get("coordinates")
        .and_then(Value::as_array)
        .map(|polygons| polygons.iter().filter_map(Self::parse_polygon).collect())
        .unwrap_or_default(),
      "GeometryCollection" => obj
        .get("geometries")
        .and_then(Value::as_array)
        .map(|geometries| {
          geometries
            .iter()
            .flat_map(|g| Self::parse_geometry(g, None))
            .collect()
        })
        .unwrap_or_default(),
      other => {
        log::debug!("Ignoring non areal geometry {other}");
        Vec::new()
      }
    }
  }

  /// The first ring is the exterior, every further one a hole.
  fn parse_polygon(rings: &Value) -> Option<geo::Polygon<f32>> {
    let (exterior, interiors) = rings.as_array()?.split_first()?;
    polygon(
      Self::parse_coordinate_array(exterior)?,
      interiors
        .iter()
        .filter_map(Self::parse_coordinate_array)
        .collect(),
    )
  }

  /// Parse a single coordinate [lon, lat] or [lon, lat, elevation]
  #[allow(clippy::cast_possible_truncation)]
  fn parse_coordinate(coord: &Value) -> Option<PixelCoordinate> {
    if let Some(array) = coord.as_array()
      && array.len() >= 2
    {
      let lon = array[0].as_f64()? as f32;
      let lat = array[1].as_f64()? as f32;
      let wgs84 = WGS84Coordinate::new(lat, lon);
      return wgs84.is_valid().then(|| PixelCoordinate::from(wgs84));
    }
    None
  }

  /// Parse an array of coordinates [[lon, lat], [lon, lat], ...]
  fn parse_coordinate_array(coords: &Value) -> Option<Vec<PixelCoordinate>> {
    coords
      .as_array()
      .map(|array| array.iter().filter_map(Self::parse_coordinate).collect())
  }
}
