use std::{
  collections::HashMap,
  path::Path,
  sync::Arc,
  time::{Duration, Instant},
};

use censusmap::{
  CensusApp,
  config::Config,
  geometry_loader::{AssetPaths, FileAssets, GeometryLoader},
  info::{FetchStatus, InfoError, InfoProvider, RegionInfo},
  interaction::Phase,
  map::{
    census_egui::PointerEvent,
    region::{Region, RegionCollection, Scope},
  },
  parser::GeoJsonParser,
  task_tracker::{TaskCategory, TaskGuard},
};
use eframe::App;
use egui_kittest::{Harness, kittest::Queryable};
use serde_json::{Value, json};

struct Offline;

#[async_trait::async_trait]
impl InfoProvider for Offline {
  fn name(&self) -> &str {
    "offline"
  }

  async fn region_info(&self, _region: &str) -> Result<RegionInfo, InfoError> {
    Err(InfoError::MissingApiKey)
  }
}

/// Answers with placeholder content after a per county delay.
#[derive(Default)]
struct Scripted {
  latency: HashMap<String, Duration>,
}

impl Scripted {
  fn with_latency(mut self, region: &str, latency: Duration) -> Self {
    self.latency.insert(region.to_string(), latency);
    self
  }
}

#[async_trait::async_trait]
impl InfoProvider for Scripted {
  fn name(&self) -> &str {
    "scripted"
  }

  async fn region_info(&self, region: &str) -> Result<RegionInfo, InfoError> {
    if let Some(latency) = self.latency.get(region) {
      tokio::time::sleep(*latency).await;
    }
    Ok(RegionInfo::fallback(region))
  }
}

fn create_test_app(assets: &Path, provider: Arc<dyn InfoProvider>) -> CensusApp {
  let mut config = Config::defaults();
  config.asset_root = Some(assets.display().to_string());
  config.timings.debounce_ms = Some(0);
  config.timings.transition_ms = Some(50);
  config.timings.retry_delay_ms = Some(10);
  let loader = GeometryLoader::new(
    Arc::new(FileAssets::new(assets)),
    AssetPaths::from_config(&config),
  );
  CensusApp::new(egui::Context::default(), &config, loader, provider)
}

fn harness(app: CensusApp) -> Harness<'static, CensusApp> {
  Harness::new_state(
    |ctx, app: &mut CensusApp| {
      let mut frame = eframe::Frame::_new_kittest();
      app.update(ctx, &mut frame);
    },
    app,
  )
}

/// Steps the app until `done` holds, for at most two seconds.
async fn step_until(
  harness: &mut Harness<'static, CensusApp>,
  done: impl Fn(&CensusApp) -> bool,
) -> bool {
  for _ in 0..200 {
    harness.step();
    if done(harness.state()) {
      return true;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  false
}

const COUNTIES: [&str; 3] = ["Nairobi", "Kiambu", "Machakos"];

fn feature(name: &str, i: usize) -> Value {
  let lon = 36.0 + i as f64;
  json!({
    "type": "Feature",
    "properties": { "COUNTY_NAM": name, "OBJECTID": i + 1 },
    "geometry": {
      "type": "Polygon",
      "coordinates": [[[lon, -1.5], [lon + 1.0, -1.5], [lon + 1.0, -0.5], [lon, -0.5], [lon, -1.5]]]
    }
  })
}

fn kenya_geojson() -> Value {
  let features: Vec<_> = COUNTIES
    .iter()
    .enumerate()
    .map(|(i, name)| feature(name, i))
    .collect();
  json!({ "type": "FeatureCollection", "features": features })
}

fn kenya() -> RegionCollection {
  let regions: Vec<Region> = GeoJsonParser::new().parse_value(&kenya_geojson()).unwrap();
  RegionCollection::new(Scope::Country, regions)
}

/// The country file plus one file per county in `counties`.
fn write_assets(root: &Path, counties: &[&str]) {
  std::fs::create_dir_all(root.join("geojson")).unwrap();
  std::fs::create_dir_all(root.join("counties/geojson")).unwrap();
  std::fs::write(root.join("geojson/kenya.geojson"), kenya_geojson().to_string()).unwrap();
  for name in counties {
    let i = COUNTIES.iter().position(|c| c == name).unwrap();
    let file = json!({ "type": "FeatureCollection", "features": [feature(name, i)] });
    std::fs::write(
      root.join(format!("counties/geojson/{}.json", name.to_lowercase())),
      file.to_string(),
    )
    .unwrap();
  }
}

fn county(app: &CensusApp, name: &str) -> Region {
  app.map().collection().unwrap().find(name).unwrap().clone()
}

fn overview_of(app: &CensusApp) -> Option<String> {
  match app.info_status() {
    FetchStatus::Success(info) => Some(info.description.overview.clone()),
    _ => None,
  }
}

#[tokio::test]
async fn national_figures_are_shown() {
  let dir = tempfile::tempdir().unwrap();
  let mut harness = harness(create_test_app(dir.path(), Arc::new(Offline)));
  harness.step();

  harness.get_by_label("Kenya 2019 Census");
  harness.get_by_label("Population");
  harness.get_by_label("56.4M");
  harness.get_by_label("Number of Households");
  harness.get_by_label("94.6 people per km²");
  harness.get_by_label("Literacy");
  harness.get_by_label("Electricity");
  harness.get_by_label("Education");
}

#[tokio::test]
async fn missing_country_map_is_reported() {
  let dir = tempfile::tempdir().unwrap();
  let mut harness = harness(create_test_app(dir.path(), Arc::new(Offline)));

  assert!(step_until(&mut harness, |app| app.load_error().is_some()).await);
  harness.step();

  assert!(harness.state().load_error().unwrap().contains("kenya.geojson"));
  harness.get_by_label("Could not load the map");
}

#[tokio::test]
async fn country_map_is_drawn() {
  let dir = tempfile::tempdir().unwrap();
  let mut app = create_test_app(dir.path(), Arc::new(Offline));
  app.show_country(kenya());

  let mut harness = harness(app);
  harness.step();
  harness.step();

  let state = harness.state();
  assert!(matches!(state.state().phase(), Phase::Overview));
  let drawing = state.map().drawing().unwrap();
  assert_eq!(drawing.shapes().len(), 3);
  assert_eq!(drawing.scope(), &Scope::Country);
}

#[tokio::test]
async fn clicked_county_is_shown_on_its_own() {
  let dir = tempfile::tempdir().unwrap();
  write_assets(dir.path(), &["Kiambu"]);
  let mut harness = harness(create_test_app(dir.path(), Arc::new(Scripted::default())));
  assert!(step_until(&mut harness, |app| app.map().drawing().is_some()).await);
  assert_eq!(harness.state().map().drawing().unwrap().scope(), &Scope::Country);

  let kiambu = county(harness.state(), "Kiambu");
  harness
    .state_mut()
    .pointer_event(&PointerEvent::Click(kiambu), Instant::now());
  assert!(harness.state().state().is_transitioning());

  let shown_alone = |app: &CensusApp| {
    app
      .map()
      .drawing()
      .is_some_and(|d| d.scope() == &Scope::Region("Kiambu".to_string()))
  };
  assert!(step_until(&mut harness, shown_alone).await);
  let app = harness.state();
  assert!(matches!(app.state().phase(), Phase::Detail { region } if region.name() == "Kiambu"));
  assert_eq!(app.map().drawing().unwrap().shapes().len(), 1);
  assert!(app.load_error().is_none());
  harness.get_by_label("⬅ Back to Kenya");
}

#[tokio::test]
async fn failed_county_load_keeps_the_country() {
  let dir = tempfile::tempdir().unwrap();
  write_assets(dir.path(), &[]);
  let mut harness = harness(create_test_app(dir.path(), Arc::new(Scripted::default())));
  assert!(step_until(&mut harness, |app| app.map().drawing().is_some()).await);

  let machakos = county(harness.state(), "Machakos");
  harness
    .state_mut()
    .pointer_event(&PointerEvent::Click(machakos), Instant::now());
  assert!(
    step_until(&mut harness, |app| {
      app.load_error().is_some() && matches!(app.state().phase(), Phase::Detail { .. })
    })
    .await
  );
  harness.step();

  let app = harness.state();
  assert!(app.load_error().unwrap().contains("machakos"));
  let drawing = app.map().drawing().unwrap();
  assert_eq!(drawing.scope(), &Scope::Country);
  assert_eq!(drawing.shapes().len(), 3);
  harness.get_by_label("Could not load the map");
}

#[tokio::test]
async fn hover_answer_arriving_after_a_click_is_dropped() {
  let dir = tempfile::tempdir().unwrap();
  write_assets(dir.path(), &["Kiambu"]);
  let provider = Scripted::default().with_latency("Nairobi", Duration::from_millis(300));
  let mut harness = harness(create_test_app(dir.path(), Arc::new(provider)));
  assert!(step_until(&mut harness, |app| app.map().drawing().is_some()).await);

  let nairobi = county(harness.state(), "Nairobi");
  harness
    .state_mut()
    .pointer_event(&PointerEvent::Enter(nairobi), Instant::now());
  harness.step();
  assert_eq!(
    harness.state().info_status(),
    &FetchStatus::Loading {
      region: "Nairobi".to_string()
    }
  );

  let kiambu = county(harness.state(), "Kiambu");
  harness
    .state_mut()
    .pointer_event(&PointerEvent::Click(kiambu), Instant::now());
  assert!(
    step_until(&mut harness, |app| {
      overview_of(app).is_some() && matches!(app.state().phase(), Phase::Detail { .. })
    })
    .await
  );

  // Outlive the hover request.
  tokio::time::sleep(Duration::from_millis(400)).await;
  harness.step();
  harness.step();
  assert_eq!(
    overview_of(harness.state()).as_deref(),
    Some("Information about Kiambu County")
  );
  harness.get_by_label("Information about Kiambu County");
  assert!(harness.query_by_label("Information about Nairobi County").is_none());
}

#[tokio::test]
async fn going_back_hides_the_county_information() {
  let dir = tempfile::tempdir().unwrap();
  write_assets(dir.path(), &["Kiambu"]);
  let mut harness = harness(create_test_app(dir.path(), Arc::new(Scripted::default())));
  assert!(step_until(&mut harness, |app| app.map().drawing().is_some()).await);

  let kiambu = county(harness.state(), "Kiambu");
  harness
    .state_mut()
    .pointer_event(&PointerEvent::Click(kiambu), Instant::now());
  assert!(
    step_until(&mut harness, |app| {
      overview_of(app).is_some() && matches!(app.state().phase(), Phase::Detail { .. })
    })
    .await
  );
  harness.step();
  harness.get_by_label("Information about Kiambu County");

  harness.state_mut().back(Instant::now());
  harness.step();
  assert!(harness.state().state().is_transitioning());
  assert_eq!(harness.state().info_status(), &FetchStatus::Idle);
  assert!(harness.query_by_label("Information about Kiambu County").is_none());

  assert!(step_until(&mut harness, |app| matches!(app.state().phase(), Phase::Overview)).await);
  harness.step();
  assert_eq!(harness.state().map().drawing().unwrap().scope(), &Scope::Country);
}

#[tokio::test]
async fn country_failure_survives_a_county_click() {
  let dir = tempfile::tempdir().unwrap();
  let mut harness = harness(create_test_app(dir.path(), Arc::new(Offline)));
  assert!(step_until(&mut harness, |app| app.load_error().is_some()).await);

  let nairobi = kenya().find("Nairobi").unwrap().clone();
  harness
    .state_mut()
    .pointer_event(&PointerEvent::Click(nairobi), Instant::now());
  assert!(step_until(&mut harness, |app| matches!(app.state().phase(), Phase::Detail { .. })).await);
  tokio::time::sleep(Duration::from_millis(50)).await;
  harness.step();

  assert!(harness.state().load_error().unwrap().contains("kenya.geojson"));
  harness.get_by_label("Could not load the map");
}

#[tokio::test]
async fn running_tasks_are_listed() {
  let dir = tempfile::tempdir().unwrap();
  let mut harness = harness(create_test_app(dir.path(), Arc::new(Offline)));
  let _guard = TaskGuard::new("Turkana boundary".to_string(), TaskCategory::GeometryLoad);
  harness.step();

  harness.get_by_label_contains("Turkana boundary (");
  harness.get_by_label_contains("info requests");
}
