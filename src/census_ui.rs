use std::{
  f32::consts::TAU,
  sync::{
    Arc,
    mpsc::{Receiver, Sender},
  },
  time::Instant,
};

use egui::{Align2, Color32, FontId, Pos2, RichText, Stroke, epaint::PathStroke, vec2};
use log::{debug, error, info};

use crate::{
  config::Config,
  directory::{CountyDirectory, CountyEntry},
  geometry_loader::{GeometryLoader, LoaderError},
  info::{FetchStatus, InfoCoordinator, InfoProvider, RegionInfo, RetryPolicy},
  interaction::{Command, InteractionState, Phase, Target},
  map::{
    census_egui::{CountyMap, PointerEvent},
    region::{Region, RegionCollection},
  },
  profile_scope,
  task_tracker::{TaskCategory, TaskGuard, task_tracker},
};

const RING_COLOR: Color32 = Color32::from_rgb(0x3b, 0x82, 0xf6);
const TRACK_COLOR: Color32 = Color32::from_rgb(0xe5, 0xe7, 0xeb);
const ERROR_COLOR: Color32 = Color32::from_rgb(0xb9, 0x1c, 0x1c);

/// Headline figures of the 2019 census.
const NATIONAL_FIGURES: [(&str, &str); 3] = [
  ("Number of Households", "300"),
  ("GDP/Capita", "$2,110"),
  ("Population Density", "94.6 people per km²"),
];

struct Gauge {
  label: &'static str,
  value: f32,
  color: Color32,
}

const NATIONAL_GAUGES: [Gauge; 3] = [
  Gauge {
    label: "Literacy",
    value: 78.8,
    color: Color32::from_rgb(0xfb, 0x61, 0x07),
  },
  Gauge {
    label: "Electricity",
    value: 85.,
    color: Color32::from_rgb(0x2c, 0x29, 0x16),
  },
  Gauge {
    label: "Education",
    value: 92.4,
    color: Color32::from_rgb(0xfb, 0xb0, 0x2d),
  },
];

enum Loaded {
  Country(Result<RegionCollection, LoaderError>),
  Region {
    generation: u64,
    name: String,
    result: Result<Region, LoaderError>,
  },
  Directory(anyhow::Result<CountyDirectory>),
}

/// The census dashboard: national figures, the county map and what is known about the county
/// under the pointer.
pub struct CensusApp {
  ctx: egui::Context,
  map: CountyMap,
  state: InteractionState,
  info: InfoCoordinator,
  loader: GeometryLoader,
  directory: CountyDirectory,
  country: Option<RegionCollection>,
  detail: Option<RegionCollection>,
  country_error: Option<String>,
  region_error: Option<String>,
  load_generation: u64,
  sender: Sender<Loaded>,
  receiver: Receiver<Loaded>,
}

impl CensusApp {
  /// Starts loading the country map and the county directory. Needs a running tokio runtime.
  #[must_use]
  pub fn new(
    ctx: egui::Context,
    config: &Config,
    loader: GeometryLoader,
    provider: Arc<dyn InfoProvider>,
  ) -> Self {
    let (sender, receiver) = std::sync::mpsc::channel();
    let app = Self {
      map: CountyMap::new(
        config.timings.highlight(),
        config.choropleth_property.clone(),
      ),
      state: InteractionState::new(config.timings.debounce(), config.timings.transition()),
      info: InfoCoordinator::new(provider, RetryPolicy::from(&config.timings))
        .with_repaint(ctx.clone()),
      loader,
      directory: CountyDirectory::default(),
      country: None,
      detail: None,
      country_error: None,
      region_error: None,
      load_generation: 0,
      sender,
      receiver,
      ctx,
    };

    let loader = app.loader.clone();
    app.spawn_load("Kenya boundaries".to_string(), async move {
      Loaded::Country(loader.load_country_boundaries().await)
    });
    let source = app.loader.clone();
    let path = config.directory_path().to_string();
    app.spawn_load("County directory".to_string(), async move {
      Loaded::Directory(source.load_directory(&path).await)
    });
    app
  }

  fn spawn_load<F>(&self, name: String, load: F)
  where
    F: Future<Output = Loaded> + Send + 'static,
  {
    let sender = self.sender.clone();
    let ctx = self.ctx.clone();
    tokio::spawn(async move {
      let _guard = TaskGuard::new(name, TaskCategory::GeometryLoad);
      let _ = sender
        .send(load.await)
        .inspect_err(|e| debug!("Dashboard gone before load finished: {e}"));
      ctx.request_repaint();
    });
  }

  #[must_use]
  pub fn state(&self) -> &InteractionState {
    &self.state
  }

  #[must_use]
  pub fn info_status(&self) -> &FetchStatus {
    self.info.status()
  }

  #[must_use]
  pub fn map(&self) -> &CountyMap {
    &self.map
  }

  /// A failed country load, else a failed county load. Loading a county only clears the latter.
  #[must_use]
  pub fn load_error(&self) -> Option<&str> {
    self.country_error.as_deref().or(self.region_error.as_deref())
  }

  /// Makes `collection` the country overview.
  pub fn show_country(&mut self, collection: RegionCollection) {
    info!("Country map with {} counties", collection.len());
    if self.state.selected().is_none() {
      self.map.set_collection(collection.clone());
    }
    self.country = Some(collection);
  }

  fn receive_loads(&mut self) {
    while let Ok(loaded) = self.receiver.try_recv() {
      match loaded {
        Loaded::Country(Ok(collection)) => {
          self.country_error = None;
          self.show_country(collection);
        }
        Loaded::Country(Err(e)) => {
          error!("Failed to load the country map: {e}");
          self.country_error = Some(e.to_string());
        }
        Loaded::Directory(Ok(directory)) => {
          info!("County directory with {} entries", directory.len());
          self.directory = directory;
        }
        Loaded::Directory(Err(e)) => error!("No county directory: {e:#}"),
        Loaded::Region {
          generation,
          name,
          result,
        } => {
          let wanted = self
            .state
            .selected()
            .is_some_and(|s| s.name() == name);
          if generation != self.load_generation || !wanted {
            debug!("Dropping boundary of {name}, no longer selected");
            continue;
          }
          match result {
            Ok(region) => self.detail = Some(RegionCollection::single(region)),
            Err(e) => {
              error!("Failed to load {name}: {e}");
              self.region_error = Some(e.to_string());
            }
          }
        }
      }
    }
  }

  fn apply(&mut self, commands: Vec<Command>) {
    for command in commands {
      debug!("Applying {command:?}");
      match command {
        Command::FetchInfo(region) => self.info.request(region.name()),
        Command::ClearInfo => self.info.clear(),
        Command::LoadRegion(region) => {
          self.region_error = None;
          self.detail = None;
          self.load_generation += 1;
          let generation = self.load_generation;
          let loader = self.loader.clone();
          let name = region.name().to_string();
          self.spawn_load(format!("{name} boundary"), async move {
            let result = loader.load_region_boundary(&name).await;
            Loaded::Region {
              generation,
              name,
              result,
            }
          });
        }
        Command::ShowCountry => {
          self.detail = None;
          self.region_error = None;
          self.info.clear();
          if let Some(country) = &self.country {
            self.map.set_collection(country.clone());
          }
        }
      }
    }
  }

  /// Feeds the pointer events of the map into the state machine.
  pub fn handle_pointer_events(&mut self, now: Instant) {
    for event in self.map.take_events() {
      self.pointer_event(&event, now);
    }
  }

  /// Applies a single pointer event as if it came from the map.
  pub fn pointer_event(&mut self, event: &PointerEvent, now: Instant) {
    let commands = match event {
      PointerEvent::Enter(region) => self.state.pointer_enter(region, now),
      PointerEvent::Leave(region) => self.state.pointer_leave(region, now),
      PointerEvent::Click(region) => self.state.click(region, now),
    };
    self.apply(commands);
  }

  /// Returns to the country overview, if a county is shown.
  pub fn back(&mut self, now: Instant) {
    let commands = self.state.back(now);
    self.apply(commands);
  }

  /// Advances timers. Called once per frame before anything is drawn.
  pub fn tick(&mut self, now: Instant) {
    self.receive_loads();
    self.info.poll();

    let commands = self.state.tick(now);
    self.apply(commands);

    if matches!(self.state.phase(), Phase::Detail { .. })
      && let Some(detail) = self.detail.take()
    {
      self.map.set_collection(detail);
    }

    self.map.set_hovered(self.state.hovered());
    self.map.set_interactive(matches!(
      self.state.phase(),
      Phase::Overview | Phase::HoverPending { .. } | Phase::HoverResolved { .. }
    ));
  }

  fn sidebar_ui(ui: &mut egui::Ui) {
    ui.add_space(8.);
    ui.heading(RichText::new("Kenya 2019 Census").strong());
    ui.add_space(4.);
    ui.label(RichText::new("Population").color(Color32::GRAY));
    ui.label(RichText::new("56.4M").size(28.).strong());
    ui.add_space(8.);

    for (title, value) in NATIONAL_FIGURES {
      egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.label(RichText::new(title).color(Color32::GRAY));
        ui.label(RichText::new(value).size(18.).strong());
      });
      ui.add_space(4.);
    }

    ui.add_space(12.);
    ui.horizontal_wrapped(|ui| {
      for gauge in &NATIONAL_GAUGES {
        gauge_ui(ui, gauge.label, gauge.value, gauge.color);
      }
    });

    ui.with_layout(egui::Layout::bottom_up(egui::Align::Min), |ui| {
      let tracker = task_tracker();
      let loads = tracker.count_by_category(&TaskCategory::GeometryLoad);
      let fetches = tracker.count_by_category(&TaskCategory::InfoFetch);
      if loads + fetches == 0 {
        return;
      }
      ui.horizontal(|ui| {
        ui.spinner();
        ui.label(
          RichText::new(format!("{loads} loads, {fetches} info requests"))
            .size(10.)
            .color(Color32::GRAY),
        );
      });
      // Laid out bottom up: the oldest task sits right above the summary.
      for task in tracker.snapshot() {
        ui.label(
          RichText::new(format!("{} ({:.1}s)", task.name, task.elapsed().as_secs_f32()))
            .size(10.)
            .color(Color32::GRAY),
        );
      }
    });
  }

  fn info_panel_ui(&mut self, ui: &mut egui::Ui, now: Instant) {
    let detail_region = match self.state.phase() {
      Phase::Detail { region }
      | Phase::Transitioning {
        to: Target::Detail(region),
        ..
      } => Some(region.clone()),
      _ => None,
    };

    if let Some(region) = &detail_region {
      let back = ui.add_enabled(!self.state.is_transitioning(), egui::Button::new("⬅ Back to Kenya"));
      if back.clicked() {
        self.back(now);
      }
      ui.add_space(8.);
      ui.heading(region.name());
      if let Some(entry) = self.directory.get(region.name()) {
        directory_ui(ui, entry);
      }
      ui.separator();
    } else if let Some(region) = self.state.hovered() {
      ui.heading(region.name());
      ui.separator();
    }

    match self.info.status() {
      FetchStatus::Idle => {}
      FetchStatus::Loading { region } => {
        ui.horizontal(|ui| {
          ui.spinner();
          ui.label(format!("Loading {region}…"));
        });
      }
      FetchStatus::Success(info) => {
        egui::ScrollArea::vertical().show(ui, |ui| info_cards_ui(ui, info));
      }
      FetchStatus::Failed { error, .. } => {
        ui.label(RichText::new("No information available").strong());
        ui.label(RichText::new(error).size(10.).color(Color32::GRAY));
      }
    }
  }

  fn error_ui(&mut self, ui: &mut egui::Ui) {
    let Some(message) = self.load_error().map(str::to_string) else {
      return;
    };
    egui::Frame::NONE
      .fill(Color32::from_rgb(0xfe, 0xe2, 0xe2))
      .inner_margin(egui::Margin::same(8))
      .show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal_wrapped(|ui| {
          ui.label(
            RichText::new("Could not load the map")
              .strong()
              .color(ERROR_COLOR),
          );
          ui.label(message);
          if ui.button("Dismiss").clicked() {
            self.country_error = None;
            self.region_error = None;
          }
        });
      });
  }

  fn hover_ring_ui(&self, ctx: &egui::Context, now: Instant) {
    let Some(progress) = self.state.hover_progress(now) else {
      return;
    };
    if progress >= 1. {
      return;
    }
    let Some(pointer) = ctx.input(|i| i.pointer.hover_pos()) else {
      return;
    };
    let painter = ctx.layer_painter(egui::LayerId::new(
      egui::Order::Foreground,
      egui::Id::new("hover_ring"),
    ));
    let center = pointer + vec2(18., -18.);
    painter.circle_stroke(center, 10., Stroke::new(2., TRACK_COLOR));
    painter.add(egui::Shape::line(arc(center, 10., progress), PathStroke::new(2., RING_COLOR)));
  }
}

impl eframe::App for CensusApp {
  // Required by eframe 0.34; all rendering happens in `update`, which eframe still calls first.
  fn ui(&mut self, _ui: &mut egui::Ui, _frame: &mut eframe::Frame) {}

  fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
    profile_scope!("CensusApp::update");
    crate::profiling::new_frame();
    let now = Instant::now();

    self.tick(now);

    if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
      self.back(now);
    }

    egui::SidePanel::left("census_sidebar")
      .resizable(false)
      .exact_width(260.)
      .show(ctx, |ui| {
        profile_scope!("CensusApp::sidebar");
        Self::sidebar_ui(ui);
      });

    let info_visible = self.state.selected().is_some()
      || self.state.hovered().is_some()
      || !matches!(self.info.status(), FetchStatus::Idle);
    if info_visible {
      egui::SidePanel::right("county_info")
        .resizable(true)
        .default_width(320.)
        .show(ctx, |ui| {
          profile_scope!("CensusApp::info_panel");
          self.info_panel_ui(ui, now);
        });
    }

    egui::CentralPanel::default()
      .frame(egui::Frame::NONE.fill(Color32::from_rgb(0xf8, 0xfa, 0xfc)))
      .show(ctx, |ui| {
        profile_scope!("CensusApp::map");
        self.error_ui(ui);
        if self.map.collection().is_none() && self.country_error.is_none() {
          ui.centered_and_justified(|ui| ui.spinner());
          return;
        }
        if let Some(progress) = self.state.transition_progress(now) {
          ui.set_opacity((1. - progress).max(0.1));
        }
        ui.add(&mut self.map);
      });

    self.handle_pointer_events(now);
    self.hover_ring_ui(ctx, now);

    match self.state.phase() {
      Phase::HoverPending { .. } | Phase::Transitioning { .. } => ctx.request_repaint(),
      _ => {
        if let Some(deadline) = self.state.next_deadline(now) {
          ctx.request_repaint_after(deadline);
        }
      }
    }
  }
}

fn directory_ui(ui: &mut egui::Ui, entry: &CountyEntry) {
  egui::Grid::new("county_directory")
    .num_columns(2)
    .show(ui, |ui| {
      ui.label("Capital");
      ui.label(&entry.capital);
      ui.end_row();
      ui.label("County code");
      ui.label(entry.code.to_string());
      ui.end_row();
    });
  if !entry.sub_counties.is_empty() {
    chips_ui(ui, "Sub-counties", &entry.sub_counties, Color32::from_rgb(0xf1, 0xf5, 0xf9));
  }
}

fn info_cards_ui(ui: &mut egui::Ui, info: &RegionInfo) {
  ui.label(&info.description.overview);
  ui.add_space(8.);

  #[allow(clippy::cast_possible_truncation)]
  gauge_ui(
    ui,
    "GDP Contribution",
    info.statistics.gdp_contribution as f32,
    RING_COLOR,
  );

  let leader = &info.statistics.leader;
  egui::Frame::group(ui.style()).show(ui, |ui| {
    ui.set_width(ui.available_width());
    ui.label(RichText::new(&leader.position).color(Color32::GRAY));
    ui.label(RichText::new(&leader.name).strong());
    ui.label(RichText::new(&leader.period).size(10.));
  });

  chips_ui(
    ui,
    "Main Income Sources",
    &info.description.main_income_sources,
    Color32::from_rgb(0xdb, 0xea, 0xfe),
  );
  chips_ui(ui, "Tribes", &info.description.tribes, Color32::from_rgb(0xdc, 0xfc, 0xe7));
  chips_ui(ui, "Landmarks", &info.description.landmarks, Color32::from_rgb(0xfe, 0xf3, 0xc7));
  chips_ui(
    ui,
    "Constituencies",
    &info.statistics.constituencies,
    Color32::from_rgb(0xf3, 0xe8, 0xff),
  );
}

fn chips_ui(ui: &mut egui::Ui, title: &str, items: &[String], fill: Color32) {
  ui.add_space(6.);
  ui.label(RichText::new(title).strong());
  ui.horizontal_wrapped(|ui| {
    for item in items {
      egui::Frame::NONE
        .fill(fill)
        .corner_radius(egui::CornerRadius::same(8))
        .inner_margin(egui::Margin::symmetric(8, 2))
        .show(ui, |ui| ui.label(RichText::new(item).size(12.)));
    }
  });
}

/// A ring filled to `value` percent that grows into place.
fn gauge_ui(ui: &mut egui::Ui, label: &str, value: f32, color: Color32) {
  let target = value.clamp(0., 100.);
  let shown = ui
    .ctx()
    .animate_value_with_time(ui.id().with(label), target, 0.5);

  ui.vertical(|ui| {
    let (rect, _) = ui.allocate_exact_size(vec2(72., 72.), egui::Sense::hover());
    let painter = ui.painter_at(rect.expand(4.));
    let center = rect.center();
    let radius = 30.;
    let width = (target / 10.).clamp(2., 8.);
    painter.circle_stroke(center, radius, Stroke::new(width, TRACK_COLOR));
    if shown > 0. {
      painter.add(egui::Shape::line(
        arc(center, radius, shown / 100.),
        PathStroke::new(width, color),
      ));
    }
    painter.text(
      center,
      Align2::CENTER_CENTER,
      format!("{}%", target.round()),
      FontId::proportional(14.),
      ui.visuals().strong_text_color(),
    );
    ui.label(RichText::new(label).size(11.));
  });
}

/// Points of a clockwise arc starting at twelve o'clock.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn arc(center: Pos2, radius: f32, fraction: f32) -> Vec<Pos2> {
  let fraction = fraction.clamp(0., 1.);
  let segments = ((64. * fraction).ceil() as usize).max(1);
  (0..=segments)
    .map(|i| {
      let angle = TAU * fraction * i as f32 / segments as f32 - TAU / 4.;
      center + vec2(angle.cos(), angle.sin()) * radius
    })
    .collect()
}
