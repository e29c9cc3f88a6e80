use std::sync::Arc;

use geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, TriangulateEarcut};
use serde_json::{Map, Value};

use super::coordinates::{BoundingBox, PixelCoordinate};
use crate::geometry_loader::sanitize;

/// Property keys that carry the display name of a county, in lookup order.
pub const NAME_KEYS: [&str; 6] = ["COUNTY_NAM", "COUNTY", "county", "NAME", "name", "Name"];
/// Property keys that carry the numeric id of a county, in lookup order.
pub const ID_KEYS: [&str; 3] = ["OBJECTID", "id", "ID_"];

/// Builds a polygon on the canvas from an exterior ring and its holes.
///
/// Returns `None` if the exterior cannot enclose an area; such holes are dropped.
#[must_use]
pub fn polygon(
  exterior: Vec<PixelCoordinate>,
  interiors: Vec<Vec<PixelCoordinate>>,
) -> Option<geo::Polygon<f32>> {
  let exterior = ring(exterior)?;
  let interiors = interiors.into_iter().filter_map(ring).collect();
  Some(geo::Polygon::new(exterior, interiors))
}

fn ring(mut coords: Vec<PixelCoordinate>) -> Option<LineString<f32>> {
  if coords.len() > 1 && coords.first() == coords.last() {
    coords.pop();
  }
  if coords.len() < 3 {
    return None;
  }
  Some(coords.into_iter().map(Coord::from).collect())
}

#[derive(Debug, PartialEq)]
struct RegionData {
  name: String,
  id: Option<u64>,
  properties: Map<String, Value>,
  shape: MultiPolygon<f32>,
  triangles: Vec<[PixelCoordinate; 3]>,
}

/// A named county boundary. Immutable once loaded and cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct Region(Arc<RegionData>);

impl Region {
  /// `id` is the county's own id, if the boundary file carries one.
  #[must_use]
  pub fn new(
    name: String,
    id: Option<u64>,
    properties: Map<String, Value>,
    polygons: Vec<geo::Polygon<f32>>,
  ) -> Self {
    let triangles = polygons
      .iter()
      .flat_map(TriangulateEarcut::earcut_triangles_iter)
      .map(|t| t.to_array().map(PixelCoordinate::from))
      .collect();
    Self(Arc::new(RegionData {
      name,
      id,
      properties,
      shape: MultiPolygon::new(polygons),
      triangles,
    }))
  }

  #[must_use]
  pub fn name(&self) -> &str {
    &self.0.name
  }

  #[must_use]
  pub fn id(&self) -> Option<u64> {
    self.0.id
  }

  /// The url and file system safe form of the name.
  #[must_use]
  pub fn key(&self) -> String {
    sanitize(&self.0.name)
  }

  #[must_use]
  pub fn properties(&self) -> &Map<String, Value> {
    &self.0.properties
  }

  /// A numeric property, also accepting numbers encoded as strings.
  #[must_use]
  pub fn numeric_property(&self, key: &str) -> Option<f64> {
    match self.0.properties.get(key)? {
      Value::Number(n) => n.as_f64(),
      Value::String(s) => s.trim().parse().ok(),
      _ => None,
    }
  }

  /// The boundary on the canvas, holes included.
  #[must_use]
  pub fn shape(&self) -> &MultiPolygon<f32> {
    &self.0.shape
  }

  /// Outlines to stroke: every exterior followed by its holes.
  pub fn rings(&self) -> impl Iterator<Item = &LineString<f32>> {
    self
      .0
      .shape
      .iter()
      .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
  }

  /// The fill, holes left out.
  #[must_use]
  pub fn triangles(&self) -> &[[PixelCoordinate; 3]] {
    &self.0.triangles
  }

  /// Two handles denote the same county if name and id agree.
  #[must_use]
  pub fn same_as(&self, other: &Region) -> bool {
    Arc::ptr_eq(&self.0, &other.0) || (self.0.id == other.0.id && self.0.name == other.0.name)
  }

  #[must_use]
  pub fn bounding_box(&self) -> BoundingBox {
    self
      .0
      .shape
      .bounding_rect()
      .map_or_else(BoundingBox::get_invalid, |rect| {
        BoundingBox::from_iterator([rect.min(), rect.max()].map(PixelCoordinate::from))
      })
  }

  /// Strictly inside, holes excluded.
  #[must_use]
  pub fn contains(&self, p: PixelCoordinate) -> bool {
    self.0.shape.contains(&Point::from(Coord::from(p)))
  }
}

/// What a collection covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
  Country,
  Region(String),
}

/// The boundaries of the active scope. Replaced as a whole, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionCollection {
  scope: Scope,
  regions: Arc<[Region]>,
}

impl RegionCollection {
  #[must_use]
  pub fn new(scope: Scope, regions: Vec<Region>) -> Self {
    Self {
      scope,
      regions: regions.into(),
    }
  }

  #[must_use]
  pub fn single(region: Region) -> Self {
    Self::new(Scope::Region(region.name().to_string()), vec![region])
  }

  #[must_use]
  pub fn scope(&self) -> &Scope {
    &self.scope
  }

  #[must_use]
  pub fn regions(&self) -> &[Region] {
    &self.regions
  }

  pub fn iter(&self) -> impl Iterator<Item = &Region> {
    self.regions.iter()
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.regions.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.regions.is_empty()
  }

  /// Case insensitive lookup by display name.
  #[must_use]
  pub fn find(&self, name: &str) -> Option<&Region> {
    self
      .regions
      .iter()
      .find(|r| r.name().eq_ignore_ascii_case(name))
  }

  #[must_use]
  pub fn bounding_box(&self) -> BoundingBox {
    self
      .regions
      .iter()
      .map(Region::bounding_box)
      .fold(BoundingBox::get_invalid(), |acc, b| acc.extend(&b))
  }

  /// Whether both collections hold the very same boundaries.
  #[must_use]
  pub fn same_as(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.regions, &other.regions) && self.scope == other.scope
  }
}
