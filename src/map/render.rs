use std::{rc::Rc, time::Duration};

use egui::{
  Color32, Mesh, Pos2, Rect, Shape,
  epaint::{PathShape, PathStroke},
};
use log::{debug, info};

use super::{
  projection::{DEFAULT_PADDING, Projection},
  region::{Region, RegionCollection, Scope},
};
use crate::profile_scope;

type Painter = egui::Painter;

pub const DEFAULT_FILL: Color32 = Color32::WHITE;
pub const HIGHLIGHT_FILL: Color32 = Color32::from_rgb(0x60, 0xa5, 0xfa);
pub const SELECTED_FILL: Color32 = Color32::from_rgb(0xe2, 0xe8, 0xf0);
pub const STROKE_COLOR: Color32 = Color32::BLACK;
pub const DEFAULT_STROKE_WIDTH: f32 = 0.5;
pub const HIGHLIGHT_STROKE_WIDTH: f32 = 1.0;

const CHOROPLETH_LOW: Color32 = Color32::from_rgb(0xf0, 0xfd, 0xf4);
const CHOROPLETH_HIGH: Color32 = Color32::from_rgb(0x15, 0x80, 0x3d);

/// Reactions of the map to pointer events on a county. Called on the ui thread.
pub trait RegionHandlers {
  fn pointer_enter(&self, region: &Region);
  fn pointer_leave(&self, region: &Region);
  fn pointer_click(&self, region: &Region);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeStyle {
  pub fill: Color32,
  pub stroke_width: f32,
  pub stroke_color: Color32,
}

/// A county projected onto the viewport.
pub struct RenderedShape {
  region: Region,
  rings: Vec<Vec<Pos2>>,
  fill: Vec<Pos2>,
  base_fill: Color32,
  highlight: f32,
  handlers: Rc<dyn RegionHandlers>,
}

impl RenderedShape {
  #[must_use]
  pub fn region(&self) -> &Region {
    &self.region
  }

  /// Screen space outlines, exteriors before their holes, without the closing point.
  #[must_use]
  pub fn rings(&self) -> &[Vec<Pos2>] {
    &self.rings
  }

  /// Screen space fill triangles, three points each.
  #[must_use]
  pub fn fill(&self) -> &[Pos2] {
    &self.fill
  }

  #[must_use]
  pub fn handlers(&self) -> &Rc<dyn RegionHandlers> {
    &self.handlers
  }

  /// Fill without any highlight.
  #[must_use]
  pub fn base_fill(&self) -> Color32 {
    self.base_fill
  }

  /// How far the highlight has faded in, from 0 to 1.
  #[must_use]
  pub fn highlight(&self) -> f32 {
    self.highlight
  }

  pub fn pointer_enter(&self) {
    self.handlers.pointer_enter(&self.region);
  }

  pub fn pointer_leave(&self) {
    self.handlers.pointer_leave(&self.region);
  }

  pub fn pointer_click(&self) {
    self.handlers.pointer_click(&self.region);
  }
}

/// Everything drawn for one collection. A new scope always gets a new drawing.
pub struct Drawing {
  generation: u64,
  collection: RegionCollection,
  projection: Option<Projection>,
  viewport: Rect,
  shapes: Vec<RenderedShape>,
}

impl Drawing {
  #[must_use]
  pub fn generation(&self) -> u64 {
    self.generation
  }

  #[must_use]
  pub fn scope(&self) -> &Scope {
    self.collection.scope()
  }

  #[must_use]
  pub fn collection(&self) -> &RegionCollection {
    &self.collection
  }

  #[must_use]
  pub fn projection(&self) -> Option<&Projection> {
    self.projection.as_ref()
  }

  #[must_use]
  pub fn shapes(&self) -> &[RenderedShape] {
    &self.shapes
  }

  /// The topmost shape under `pos`.
  #[must_use]
  pub fn hit_test(&self, pos: Pos2) -> Option<&RenderedShape> {
    let projection = self.projection.as_ref()?;
    if !projection.viewport().contains(pos) {
      return None;
    }
    let coord = projection.to_canvas(pos.into());
    self.shapes.iter().rev().find(|s| s.region.contains(coord))
  }

  #[must_use]
  pub fn style_of(&self, shape: &RenderedShape) -> ShapeStyle {
    match self.collection.scope() {
      Scope::Region(_) => ShapeStyle {
        fill: SELECTED_FILL,
        stroke_width: HIGHLIGHT_STROKE_WIDTH,
        stroke_color: STROKE_COLOR,
      },
      Scope::Country => ShapeStyle {
        fill: lerp_color(shape.base_fill, HIGHLIGHT_FILL, shape.highlight),
        stroke_width: DEFAULT_STROKE_WIDTH
          + (HIGHLIGHT_STROKE_WIDTH - DEFAULT_STROKE_WIDTH) * shape.highlight,
        stroke_color: STROKE_COLOR,
      },
    }
  }

  pub fn paint(&self, painter: &Painter) {
    profile_scope!("Drawing::paint");
    for shape in &self.shapes {
      let style = self.style_of(shape);
      let mut mesh = Mesh::default();
      for &p in &shape.fill {
        mesh.colored_vertex(p, style.fill);
      }
      #[allow(clippy::cast_possible_truncation)]
      for i in 0..shape.fill.len() as u32 / 3 {
        mesh.add_triangle(3 * i, 3 * i + 1, 3 * i + 2);
      }
      painter.add(Shape::mesh(mesh));
      for ring in &shape.rings {
        painter.add(Shape::Path(PathShape {
          points: ring.clone(),
          closed: true,
          fill: Color32::TRANSPARENT,
          stroke: PathStroke::new(style.stroke_width, style.stroke_color),
        }));
      }
    }
  }
}

/// Projects collections onto the viewport and keeps the hover highlight.
pub struct RenderEngine {
  drawing: Option<Drawing>,
  next_generation: u64,
  hovered: Option<Region>,
  fade: Duration,
  choropleth_property: Option<String>,
}

impl Default for RenderEngine {
  fn default() -> Self {
    Self::new(Duration::from_millis(200), None)
  }
}

impl RenderEngine {
  #[must_use]
  pub fn new(fade: Duration, choropleth_property: Option<String>) -> Self {
    Self {
      drawing: None,
      next_generation: 0,
      hovered: None,
      fade,
      choropleth_property,
    }
  }

  #[must_use]
  pub fn drawing(&self) -> Option<&Drawing> {
    self.drawing.as_ref()
  }

  /// Draws `collection` into `viewport`. The projection is only recomputed if one of them
  /// changed, a different collection replaces the drawing as a whole.
  pub fn render(
    &mut self,
    collection: &RegionCollection,
    viewport: Rect,
    handlers: &Rc<dyn RegionHandlers>,
  ) -> &Drawing {
    profile_scope!("RenderEngine::render");
    let drawing = match self.drawing.take() {
      Some(drawing) if drawing.collection.same_as(collection) => {
        if drawing.viewport == viewport {
          drawing
        } else {
          debug!("Viewport changed to {viewport:?}, reprojecting");
          let mut rebuilt =
            self.build(drawing.collection.clone(), viewport, handlers, drawing.generation);
          for (shape, old) in rebuilt.shapes.iter_mut().zip(&drawing.shapes) {
            shape.highlight = old.highlight;
          }
          rebuilt
        }
      }
      old => {
        if let Some(old) = old {
          debug!("Tearing down drawing {}", old.generation);
        }
        self.hovered = None;
        let generation = self.next_generation;
        self.next_generation += 1;
        info!(
          "Drawing {} regions for {:?} (generation {generation})",
          collection.len(),
          collection.scope()
        );
        self.build(collection.clone(), viewport, handlers, generation)
      }
    };
    self.drawing.insert(drawing)
  }

  fn build(
    &self,
    collection: RegionCollection,
    viewport: Rect,
    handlers: &Rc<dyn RegionHandlers>,
    generation: u64,
  ) -> Drawing {
    let projection = Projection::fit(&collection.bounding_box(), viewport, DEFAULT_PADDING);
    let fills = self.base_fills(&collection);
    let shapes = match &projection {
      Some(projection) => collection
        .iter()
        .zip(fills)
        .map(|(region, base_fill)| RenderedShape {
          region: region.clone(),
          rings: region
            .rings()
            .map(|ring| {
              let open = ring.0.len().saturating_sub(usize::from(ring.is_closed()));
              ring.0[..open]
                .iter()
                .map(|c| projection.to_screen((*c).into()).into())
                .collect()
            })
            .collect(),
          fill: region
            .triangles()
            .iter()
            .flatten()
            .map(|c| projection.to_screen(*c).into())
            .collect(),
          base_fill,
          highlight: 0.,
          handlers: Rc::clone(handlers),
        })
        .collect(),
      None => {
        debug!("Nothing to project into {viewport:?}");
        Vec::new()
      }
    };

    Drawing {
      generation,
      collection,
      projection,
      viewport,
      shapes,
    }
  }

  /// Plain white, or a ramp over the configured property for the country view.
  #[allow(clippy::cast_possible_truncation)]
  fn base_fills(&self, collection: &RegionCollection) -> Vec<Color32> {
    let values: Vec<Option<f64>> = match (&self.choropleth_property, collection.scope()) {
      (Some(property), Scope::Country) => collection
        .iter()
        .map(|r| r.numeric_property(property))
        .collect(),
      _ => return vec![DEFAULT_FILL; collection.len()],
    };

    let (min, max) = values
      .iter()
      .flatten()
      .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(*v), hi.max(*v))
      });

    values
      .into_iter()
      .map(|v| match v {
        Some(v) if max > min => {
          lerp_color(CHOROPLETH_LOW, CHOROPLETH_HIGH, ((v - min) / (max - min)) as f32)
        }
        Some(_) => CHOROPLETH_LOW,
        None => DEFAULT_FILL,
      })
      .collect()
  }

  #[must_use]
  pub fn hovered(&self) -> Option<&Region> {
    self.hovered.as_ref()
  }

  /// The region whose highlight fades in; every other one fades out.
  pub fn set_hovered(&mut self, region: Option<&Region>) {
    self.hovered = region.cloned();
  }

  /// Moves the highlight fades forward by `dt`. Returns whether anything is still fading.
  #[allow(clippy::cast_precision_loss)]
  pub fn advance(&mut self, dt: Duration) -> bool {
    let Some(drawing) = &mut self.drawing else {
      return false;
    };
    let step = if self.fade.is_zero() {
      1.
    } else {
      dt.as_secs_f32() / self.fade.as_secs_f32()
    };

    let mut fading = false;
    for shape in &mut drawing.shapes {
      let target = if self
        .hovered
        .as_ref()
        .is_some_and(|h| h.same_as(&shape.region))
      {
        1.
      } else {
        0.
      };
      if shape.highlight < target {
        shape.highlight = (shape.highlight + step).min(target);
      } else if shape.highlight > target {
        shape.highlight = (shape.highlight - step).max(target);
      }
      fading |= (shape.highlight - target).abs() > f32::EPSILON;
    }
    fading
  }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lerp_color(from: Color32, to: Color32, t: f32) -> Color32 {
  let t = t.clamp(0., 1.);
  let channel = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
  Color32::from_rgba_unmultiplied(
    channel(from.r(), to.r()),
    channel(from.g(), to.g()),
    channel(from.b(), to.b()),
    channel(from.a(), to.a()),
  )
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use egui::vec2;
  use serde_json::{Map, Value, json};

  use super::*;
  use crate::map::{coordinates::PixelCoordinate, region::polygon};

  #[derive(Default)]
  struct Recorder(RefCell<Vec<String>>);

  impl RegionHandlers for Recorder {
    fn pointer_enter(&self, region: &Region) {
      self.0.borrow_mut().push(format!("enter {}", region.name()));
    }
    fn pointer_leave(&self, region: &Region) {
      self.0.borrow_mut().push(format!("leave {}", region.name()));
    }
    fn pointer_click(&self, region: &Region) {
      self.0.borrow_mut().push(format!("click {}", region.name()));
    }
  }

  fn square(name: &str, x: f32, properties: Map<String, Value>) -> Region {
    let ring = vec![
      PixelCoordinate::new(x, 0.),
      PixelCoordinate::new(x + 1., 0.),
      PixelCoordinate::new(x + 1., 1.),
      PixelCoordinate::new(x, 1.),
    ];
    Region::new(name.into(), None, properties, vec![polygon(ring, vec![]).unwrap()])
  }

  fn country() -> RegionCollection {
    RegionCollection::new(
      Scope::Country,
      vec![square("Mombasa", 0., Map::new()), square("Kwale", 1., Map::new())],
    )
  }

  fn viewport() -> Rect {
    Rect::from_min_size(Pos2::ZERO, vec2(800., 600.))
  }

  #[test]
  fn shapes_dispatch_to_handlers() {
    let recorder = Rc::new(Recorder::default());
    let handlers: Rc<dyn RegionHandlers> = recorder.clone();
    let mut engine = RenderEngine::default();
    let drawing = engine.render(&country(), viewport(), &handlers);

    let kwale = drawing.hit_test(Pos2::new(600., 300.)).unwrap();
    assert_eq!(kwale.region().name(), "Kwale");
    kwale.pointer_enter();
    kwale.pointer_click();
    drawing.shapes()[0].pointer_leave();
    assert_eq!(
      *recorder.0.borrow(),
      vec!["enter Kwale", "click Kwale", "leave Mombasa"]
    );
    assert!(drawing.hit_test(Pos2::new(5., 5.)).is_none());
  }

  #[test]
  fn highlight_fades_in_and_out() {
    let handlers: Rc<dyn RegionHandlers> = Rc::new(Recorder::default());
    let collection = country();
    let mut engine = RenderEngine::default();
    engine.render(&collection, viewport(), &handlers);

    engine.set_hovered(collection.find("Kwale"));
    assert!(engine.advance(Duration::from_millis(100)));
    let drawing = engine.drawing().unwrap();
    assert!((drawing.shapes()[1].highlight() - 0.5).abs() < 1e-4);
    assert_eq!(drawing.style_of(&drawing.shapes()[0]).fill, DEFAULT_FILL);

    assert!(!engine.advance(Duration::from_millis(150)));
    let drawing = engine.drawing().unwrap();
    let style = drawing.style_of(&drawing.shapes()[1]);
    assert_eq!(style.fill, HIGHLIGHT_FILL);
    assert!((style.stroke_width - HIGHLIGHT_STROKE_WIDTH).abs() < 1e-6);

    engine.set_hovered(None);
    assert!(engine.advance(Duration::from_millis(100)));
    assert!(!engine.advance(Duration::from_millis(100)));
    let drawing = engine.drawing().unwrap();
    assert_eq!(drawing.style_of(&drawing.shapes()[1]).fill, DEFAULT_FILL);
  }

  #[test]
  fn resize_keeps_generation_and_scope_switch_replaces_it() {
    let handlers: Rc<dyn RegionHandlers> = Rc::new(Recorder::default());
    let collection = country();
    let mut engine = RenderEngine::default();
    let first = engine.render(&collection, viewport(), &handlers).generation();

    engine.set_hovered(collection.find("Mombasa"));
    engine.advance(Duration::from_millis(200));
    let resized = engine.render(
      &collection,
      Rect::from_min_size(Pos2::ZERO, vec2(400., 300.)),
      &handlers,
    );
    assert_eq!(resized.generation(), first);
    assert!((resized.shapes()[0].highlight() - 1.).abs() < 1e-6);

    let detail = RegionCollection::single(square("Lamu", 5., Map::new()));
    let drawing = engine.render(&detail, viewport(), &handlers);
    assert_eq!(drawing.generation(), first + 1);
    assert_eq!(drawing.shapes().len(), 1);
    assert_eq!(drawing.style_of(&drawing.shapes()[0]).fill, SELECTED_FILL);
    assert!(engine.hovered().is_none());
  }

  #[test]
  fn choropleth_ramp() {
    let handlers: Rc<dyn RegionHandlers> = Rc::new(Recorder::default());
    let props = |v: Value| match json!({ "population": v }) {
      Value::Object(map) => map,
      _ => unreachable!(),
    };
    let collection = RegionCollection::new(
      Scope::Country,
      vec![
        square("Lamu", 0., props(json!(143_920))),
        square("Nairobi", 1., props(json!("4397073"))),
        square("Unknown", 2., Map::new()),
      ],
    );
    let mut engine = RenderEngine::new(Duration::from_millis(200), Some("population".into()));
    let drawing = engine.render(&collection, viewport(), &handlers);
    assert_eq!(drawing.shapes()[0].base_fill(), CHOROPLETH_LOW);
    assert_eq!(drawing.shapes()[1].base_fill(), CHOROPLETH_HIGH);
    assert_eq!(drawing.shapes()[2].base_fill(), DEFAULT_FILL);
  }

  #[test]
  fn color_lerp_endpoints() {
    assert_eq!(lerp_color(DEFAULT_FILL, HIGHLIGHT_FILL, 0.), DEFAULT_FILL);
    assert_eq!(lerp_color(DEFAULT_FILL, HIGHLIGHT_FILL, 1.), HIGHLIGHT_FILL);
    assert_eq!(lerp_color(DEFAULT_FILL, HIGHLIGHT_FILL, 7.), HIGHLIGHT_FILL);
  }
}
