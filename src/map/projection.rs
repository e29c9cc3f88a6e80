use egui::Rect;

use super::coordinates::{BoundingBox, PixelCoordinate, PixelPosition, Transform};

/// Space kept free on each side of the viewport.
pub const DEFAULT_PADDING: f32 = 20.;

/// Maps the canvas onto a viewport so that a bounding box fills it, centred and with a uniform
/// scale on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
  transform: Transform,
  viewport: Rect,
}

impl Projection {
  /// `None` if the box is empty or the viewport leaves no room after padding.
  #[must_use]
  pub fn fit(bb: &BoundingBox, viewport: Rect, padding: f32) -> Option<Self> {
    if !bb.is_valid() {
      return None;
    }
    let inner = viewport.shrink(padding);
    if inner.width() <= 0. || inner.height() <= 0. {
      return None;
    }

    // A single point or a line still gets a finite scale.
    let width = bb.width().max(f32::EPSILON);
    let height = bb.height().max(f32::EPSILON);
    let zoom = (inner.width() / width).min(inner.height() / height);

    let mut transform = Transform::default().zoomed(zoom);
    let center = transform.apply(bb.center());
    transform.translate(PixelPosition::from(viewport.center()) - center);

    (!transform.is_invalid()).then_some(Self {
      transform,
      viewport,
    })
  }

  #[must_use]
  pub fn transform(&self) -> &Transform {
    &self.transform
  }

  #[must_use]
  pub fn viewport(&self) -> Rect {
    self.viewport
  }

  #[must_use]
  pub fn to_screen(&self, coord: PixelCoordinate) -> PixelPosition {
    self.transform.apply(coord)
  }

  #[must_use]
  pub fn to_canvas(&self, pos: PixelPosition) -> PixelCoordinate {
    self.transform.invert().apply(pos)
  }
}

#[cfg(test)]
mod tests {
  use assert_approx_eq::assert_approx_eq;
  use egui::{Pos2, vec2};

  use super::*;

  fn viewport() -> Rect {
    Rect::from_min_size(Pos2::ZERO, vec2(800., 600.))
  }

  #[test]
  fn wide_box_fills_width() {
    let bb = BoundingBox::from_iterator([PixelCoordinate::new(100., 100.), PixelCoordinate::new(300., 150.)]);
    let projection = Projection::fit(&bb, viewport(), DEFAULT_PADDING).unwrap();

    assert_approx_eq!(projection.transform().zoom, 760. / 200.);
    let left = projection.to_screen(PixelCoordinate::new(100., 125.));
    let right = projection.to_screen(PixelCoordinate::new(300., 125.));
    assert_approx_eq!(left.x, 20., 1e-3);
    assert_approx_eq!(right.x, 780., 1e-3);
    assert_approx_eq!(left.y, 300., 1e-3);
  }

  #[test]
  fn tall_box_fills_height_and_is_centred() {
    let bb = BoundingBox::from_iterator([PixelCoordinate::new(0., 0.), PixelCoordinate::new(10., 40.)]);
    let projection = Projection::fit(&bb, viewport(), DEFAULT_PADDING).unwrap();

    let top = projection.to_screen(PixelCoordinate::new(5., 0.));
    let bottom = projection.to_screen(PixelCoordinate::new(5., 40.));
    assert_approx_eq!(top.y, 20., 1e-3);
    assert_approx_eq!(bottom.y, 580., 1e-3);
    assert_approx_eq!(top.x, 400., 1e-3);
  }

  #[test]
  fn offset_viewport() {
    let viewport = Rect::from_min_size(Pos2::new(300., 50.), vec2(400., 400.));
    let bb = BoundingBox::from_iterator([PixelCoordinate::new(0., 0.), PixelCoordinate::new(1., 1.)]);
    let projection = Projection::fit(&bb, viewport, 0.).unwrap();

    let center = projection.to_screen(PixelCoordinate::new(0.5, 0.5));
    assert_approx_eq!(center.x, 500., 1e-3);
    assert_approx_eq!(center.y, 250., 1e-3);

    let back = projection.to_canvas(center);
    assert_approx_eq!(back.x, 0.5, 1e-4);
    assert_approx_eq!(back.y, 0.5, 1e-4);
  }

  #[test]
  fn nothing_to_fit() {
    assert!(Projection::fit(&BoundingBox::get_invalid(), viewport(), DEFAULT_PADDING).is_none());
    let bb = BoundingBox::from_iterator([PixelCoordinate::new(0., 0.), PixelCoordinate::new(1., 1.)]);
    let tiny = Rect::from_min_size(Pos2::ZERO, vec2(30., 30.));
    assert!(Projection::fit(&bb, tiny, DEFAULT_PADDING).is_none());
  }
}
