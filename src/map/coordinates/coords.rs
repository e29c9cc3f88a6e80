use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// The fixed canvas size for ``PixelCoordinate``s.
pub const CANVAS_SIZE: f32 = 1024. * 2.;

pub trait XY:
  Default + Copy + Clone + AddAssign<Self> + Mul<f32, Output = Self> + Add<Self, Output = Self>
{
  fn x(&self) -> f32;
  fn y(&self) -> f32;
  #[must_use]
  fn with_x(self, x: f32) -> Self;
  #[must_use]
  fn with_y(self, y: f32) -> Self;
}

impl Coordinate for PixelCoordinate {
  fn as_pixel_coordinate(&self) -> PixelCoordinate {
    *self
  }
}

const PI: f32 = std::f32::consts::PI;

impl From<WGS84Coordinate> for PixelCoordinate {
  fn from(coord: WGS84Coordinate) -> Self {
    let lat = coord.lat.to_radians();
    PixelCoordinate {
      x: (coord.lon + 180.) / 360. * CANVAS_SIZE,
      y: (1. - (lat.tan() + 1. / lat.cos()).ln() / PI) / 2. * CANVAS_SIZE,
    }
  }
}

impl From<PixelCoordinate> for geo::Coord<f32> {
  fn from(pc: PixelCoordinate) -> Self {
    geo::Coord { x: pc.x, y: pc.y }
  }
}

impl From<geo::Coord<f32>> for PixelCoordinate {
  fn from(c: geo::Coord<f32>) -> Self {
    PixelCoordinate { x: c.x, y: c.y }
  }
}

impl From<egui::Pos2> for PixelPosition {
  fn from(pos: egui::Pos2) -> Self {
    PixelPosition { x: pos.x, y: pos.y }
  }
}

impl From<PixelPosition> for egui::Pos2 {
  fn from(pp: PixelPosition) -> Self {
    egui::Pos2::new(pp.x, pp.y)
  }
}

impl XY for PixelCoordinate {
  fn x(&self) -> f32 {
    self.x
  }

  fn y(&self) -> f32 {
    self.y
  }

  fn with_x(mut self, x: f32) -> Self {
    self.x = x;
    self
  }

  fn with_y(mut self, y: f32) -> Self {
    self.y = y;
    self
  }
}

impl XY for PixelPosition {
  fn x(&self) -> f32 {
    self.x
  }

  fn y(&self) -> f32 {
    self.y
  }

  fn with_x(mut self, x: f32) -> Self {
    self.x = x;
    self
  }

  fn with_y(mut self, y: f32) -> Self {
    self.y = y;
    self
  }
}

/// A coordinate system used to draw the boundaries on an imaginary canvas.
/// Is equivalent to the Web Mercator projection on a fixed zoom level.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct PixelCoordinate {
  pub x: f32,
  pub y: f32,
}

impl PixelCoordinate {
  #[must_use]
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }

  #[must_use]
  pub fn is_valid(&self) -> bool {
    self.x >= 0. && self.y >= 0. && self.x <= CANVAS_SIZE && self.y <= CANVAS_SIZE
  }
}

impl AddAssign for PixelCoordinate {
  fn add_assign(&mut self, other: Self) {
    self.x += other.x;
    self.y += other.y;
  }
}

impl Add for PixelCoordinate {
  type Output = Self;

  fn add(self, rhs: Self) -> Self {
    Self {
      x: self.x + rhs.x,
      y: self.y + rhs.y,
    }
  }
}

impl Mul<f32> for PixelCoordinate {
  type Output = Self;

  fn mul(self, rhs: f32) -> Self {
    Self {
      x: self.x * rhs,
      y: self.y * rhs,
    }
  }
}

/// The standard WGS84 coordinate system.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct WGS84Coordinate {
  #[serde(alias = "latitude")]
  pub lat: f32,
  #[serde(alias = "longitude")]
  pub lon: f32,
}

impl WGS84Coordinate {
  #[must_use]
  pub fn new(lat: f32, lon: f32) -> Self {
    Self { lat, lon }
  }

  #[must_use]
  pub fn is_valid(&self) -> bool {
    -85.0 < self.lat && self.lat < 85.0 && -180.0 <= self.lon && self.lon <= 180.0
  }
}

/// Meant for actual pixels in the UI. Handled equivalently to a ``egui::Pos2``.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct PixelPosition {
  pub x: f32,
  pub y: f32,
}

impl PixelPosition {
  #[must_use]
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }
}

impl Mul<f32> for PixelPosition {
  type Output = Self;

  fn mul(self, rhs: f32) -> Self {
    Self {
      x: self.x * rhs,
      y: self.y * rhs,
    }
  }
}

impl Add<PixelPosition> for PixelPosition {
  type Output = Self;

  fn add(self, rhs: PixelPosition) -> Self {
    Self {
      x: self.x + rhs.x,
      y: self.y + rhs.y,
    }
  }
}

impl Sub<PixelPosition> for PixelPosition {
  type Output = Self;

  fn sub(self, rhs: PixelPosition) -> Self {
    Self {
      x: self.x - rhs.x,
      y: self.y - rhs.y,
    }
  }
}

impl AddAssign for PixelPosition {
  fn add_assign(&mut self, other: Self) {
    self.x += other.x;
    self.y += other.y;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_approx_eq::assert_approx_eq;

  #[test]
  fn origin_is_canvas_center() {
    let pc = PixelCoordinate::from(WGS84Coordinate::new(0., 0.));
    assert_approx_eq!(pc.x, CANVAS_SIZE / 2.);
    assert_approx_eq!(pc.y, CANVAS_SIZE / 2.);
  }

  #[test]
  fn north_is_up() {
    let north = PixelCoordinate::from(WGS84Coordinate::new(5.5, 37.9));
    let south = PixelCoordinate::from(WGS84Coordinate::new(-4.7, 37.9));
    assert!(north.y < south.y);
    assert_approx_eq!(north.x, south.x);
  }

  #[test]
  fn canvas_and_geo_coords_agree() {
    let pc = PixelCoordinate::new(1200.5, 1030.25);
    let coord = geo::Coord::from(pc);
    assert_approx_eq!(coord.x, 1200.5);
    assert_eq!(PixelCoordinate::from(coord), pc);
  }
}
