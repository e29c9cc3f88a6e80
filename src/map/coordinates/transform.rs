use std::marker::PhantomData;

use super::XY;

/// A strongly typed transform, meant to be used between ``PixelCoordinate``s (the canvas the
/// boundaries live on) and ``PixelPosition``s (pixels in the viewport).
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct TTransform<F: XY, T: XY> {
  pub zoom: f32,
  pub trans: T,
  phantom_data: PhantomData<F>,
}

impl<F: XY, T: XY + Default> Default for TTransform<F, T> {
  fn default() -> Self {
    Self {
      zoom: 1.,
      trans: T::default(),
      phantom_data: PhantomData,
    }
  }
}

/// We want to avoid accidental conversions between incompatible coordinates.
pub trait PrivateInto<T> {
  fn conv(self) -> T;
}

impl<F: XY, T: XY> PrivateInto<T> for F {
  fn conv(self) -> T {
    T::default().with_x(self.x()).with_y(self.y())
  }
}

impl<F: XY, T: XY> TTransform<F, T>
where
  F: PrivateInto<T>,
  T: PrivateInto<F>,
{
  #[must_use]
  pub fn is_invalid(&self) -> bool {
    self.zoom == 0. || self.zoom.is_nan() || self.trans.x().is_nan() || self.trans.y().is_nan()
  }

  /// Zooms the transform.
  #[must_use]
  pub fn zoomed(mut self, factor: f32) -> Self {
    self.zoom *= factor;
    self
  }

  /// Translates.
  pub fn translate(&mut self, delta: T) -> &mut Self {
    self.trans += delta;
    self
  }

  /// The inverse ```TTransform```.
  #[must_use]
  pub fn invert(self) -> TTransform<T, F> {
    TTransform {
      zoom: 1. / self.zoom,
      trans: self.trans.conv() * (-1. / self.zoom),
      phantom_data: PhantomData,
    }
  }

  /// Applies the transform to a coordinate.
  pub fn apply(&self, from: F) -> T {
    (from * self.zoom).conv() + self.trans
  }
}
