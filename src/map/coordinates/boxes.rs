use super::{CANVAS_SIZE, Coordinate, PixelCoordinate};

/// An axis aligned box on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  max_x: f32,
  min_x: f32,
  max_y: f32,
  min_y: f32,
}

impl Default for BoundingBox {
  fn default() -> Self {
    Self::new()
  }
}

impl BoundingBox {
  #[must_use]
  pub fn new() -> Self {
    Self::get_invalid()
  }

  #[must_use]
  pub fn get_invalid() -> Self {
    Self {
      max_x: f32::MIN,
      min_x: f32::MAX,
      max_y: f32::MIN,
      min_y: f32::MAX,
    }
  }

  #[must_use]
  pub fn center(&self) -> PixelCoordinate {
    PixelCoordinate {
      x: f32::midpoint(self.max_x, self.min_x),
      y: f32::midpoint(self.max_y, self.min_y),
    }
  }

  pub fn from_iterator<C: Coordinate, I: IntoIterator<Item = C>>(positions: I) -> Self {
    let mut bb = Self::get_invalid();
    positions
      .into_iter()
      .for_each(|pos| bb.add_coordinate(pos.as_pixel_coordinate()));
    bb
  }

  #[must_use]
  pub fn is_valid(&self) -> bool {
    self.min_y <= self.max_y
      && self.min_x <= self.max_x
      && self.min_x.abs() <= CANVAS_SIZE
      && self.min_y.abs() <= CANVAS_SIZE
      && self.max_x.abs() <= CANVAS_SIZE
      && self.max_y.abs() <= CANVAS_SIZE
  }

  pub fn add_coordinate(&mut self, pp: PixelCoordinate) {
    self.min_y = self.min_y.min(pp.y);
    self.min_x = self.min_x.min(pp.x);
    self.max_y = self.max_y.max(pp.y);
    self.max_x = self.max_x.max(pp.x);
  }

  #[must_use]
  pub fn extend(self, bb: &Self) -> Self {
    if !self.is_valid() {
      return *bb;
    }

    if !bb.is_valid() {
      return self;
    }

    Self {
      min_x: self.min_x.min(bb.min_x),
      min_y: self.min_y.min(bb.min_y),
      max_x: self.max_x.max(bb.max_x),
      max_y: self.max_y.max(bb.max_y),
    }
  }

  #[must_use]
  pub fn width(&self) -> f32 {
    self.max_x - self.min_x
  }

  #[must_use]
  pub fn height(&self) -> f32 {
    self.max_y - self.min_y
  }
}
