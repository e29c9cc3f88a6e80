mod boxes;
mod coords;
mod transform;

/// Bounding boxes.
pub use boxes::*;
/// Coordinates.
pub use coords::*;
/// Transforms.
use transform::TTransform;

/// Maps canvas coordinates of the boundaries onto pixels of the viewport.
pub type Transform = TTransform<PixelCoordinate, PixelPosition>;

/// A trait generalizing types of coordinates used in this application.
pub trait Coordinate: Copy + Clone + std::fmt::Debug {
  fn as_pixel_coordinate(&self) -> PixelCoordinate;
}

