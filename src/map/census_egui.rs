use std::{cell::RefCell, rc::Rc, time::Duration};

use egui::{Response, Sense, Ui, Widget};
use log::debug;

use super::{
  region::{Region, RegionCollection},
  render::{Drawing, RegionHandlers, RenderEngine},
};
use crate::profile_scope;

/// What happened to a county under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
  Enter(Region),
  Leave(Region),
  Click(Region),
}

/// Collects the events of a frame until the app takes them.
#[derive(Default)]
struct EventQueue(RefCell<Vec<PointerEvent>>);

impl RegionHandlers for EventQueue {
  fn pointer_enter(&self, region: &Region) {
    self.0.borrow_mut().push(PointerEvent::Enter(region.clone()));
  }

  fn pointer_leave(&self, region: &Region) {
    self.0.borrow_mut().push(PointerEvent::Leave(region.clone()));
  }

  fn pointer_click(&self, region: &Region) {
    self.0.borrow_mut().push(PointerEvent::Click(region.clone()));
  }
}

/// The county map widget.
pub struct CountyMap {
  engine: RenderEngine,
  collection: Option<RegionCollection>,
  queue: Rc<EventQueue>,
  handlers: Rc<dyn RegionHandlers>,
  under_pointer: Option<Region>,
  interactive: bool,
}

impl CountyMap {
  #[must_use]
  pub fn new(fade: Duration, choropleth_property: Option<String>) -> Self {
    let queue = Rc::new(EventQueue::default());
    let handlers: Rc<dyn RegionHandlers> = queue.clone();
    Self {
      engine: RenderEngine::new(fade, choropleth_property),
      collection: None,
      queue,
      handlers,
      under_pointer: None,
      interactive: true,
    }
  }

  /// Replaces what is drawn. The previous drawing is dropped on the next frame.
  pub fn set_collection(&mut self, collection: RegionCollection) {
    if self
      .collection
      .as_ref()
      .is_some_and(|c| c.same_as(&collection))
    {
      return;
    }
    debug!("Map switches to {:?}", collection.scope());
    self.under_pointer = None;
    self.collection = Some(collection);
  }

  #[must_use]
  pub fn collection(&self) -> Option<&RegionCollection> {
    self.collection.as_ref()
  }

  #[must_use]
  pub fn drawing(&self) -> Option<&Drawing> {
    self.engine.drawing()
  }

  pub fn set_hovered(&mut self, region: Option<&Region>) {
    self.engine.set_hovered(region);
  }

  /// While disabled no pointer events are produced.
  pub fn set_interactive(&mut self, interactive: bool) {
    self.interactive = interactive;
  }

  /// Pointer events since the last call, oldest first.
  pub fn take_events(&self) -> Vec<PointerEvent> {
    self.queue.0.take()
  }

  fn dispatch_pointer(&mut self, response: &Response) {
    let Some(drawing) = self.engine.drawing() else {
      return;
    };
    let hit = response
      .hover_pos()
      .and_then(|pos| drawing.hit_test(pos));

    let changed = match (&self.under_pointer, hit) {
      (Some(old), Some(new)) => !old.same_as(new.region()),
      (None, None) => false,
      _ => true,
    };
    if changed {
      if let Some(old) = self.under_pointer.take() {
        self.handlers.pointer_leave(&old);
      }
      if let Some(new) = hit {
        new.pointer_enter();
        self.under_pointer = Some(new.region().clone());
      }
    }

    if response.clicked()
      && let Some(shape) = hit
    {
      shape.pointer_click();
    }
  }
}

impl Widget for &mut CountyMap {
  fn ui(self, ui: &mut Ui) -> Response {
    profile_scope!("CountyMap::ui");
    let size = ui.available_size();
    let (rect, response) = ui.allocate_exact_size(size, Sense::click());

    let Some(collection) = self.collection.clone() else {
      return response;
    };
    self.engine.render(&collection, rect, &self.handlers);

    if self.interactive {
      self.dispatch_pointer(&response);
    } else if let Some(old) = self.under_pointer.take() {
      self.handlers.pointer_leave(&old);
    }

    let dt = ui.input(|i| i.stable_dt).min(0.1);
    if self.engine.advance(Duration::from_secs_f32(dt)) {
      ui.ctx().request_repaint();
    }

    if ui.is_rect_visible(rect)
      && let Some(drawing) = self.engine.drawing()
    {
      drawing.paint(&ui.painter_at(rect));
    }

    if self.under_pointer.is_some() && self.interactive {
      ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
    }

    response
  }
}
