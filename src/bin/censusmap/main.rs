use std::sync::Arc;

use censusmap::{CensusApp, config::Config, geometry_loader::GeometryLoader, info::GeminiProvider};
use clap::Parser as CliParser;
use log::{info, warn};

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Directory or http(s) base url holding the boundary files.
  #[arg(short, long)]
  assets: Option<String>,

  /// Gemini API key. Falls back to GEMINI_API_KEY and the config file.
  #[arg(short = 'k', long)]
  api_key: Option<String>,

  /// Gemini model used for county information.
  #[arg(short, long)]
  model: Option<String>,

  /// Shades the country map by this numeric feature property.
  #[arg(short, long)]
  choropleth: Option<String>,

  /// Milliseconds the pointer has to rest on a county before it is described.
  #[arg(short, long)]
  debounce_ms: Option<u64>,
}

impl Args {
  fn apply(self, mut config: Config) -> Config {
    config.asset_root = self.assets.or(config.asset_root);
    config.gemini.api_key = self.api_key.or(config.gemini.api_key);
    config.gemini.model = self.model.or(config.gemini.model);
    config.choropleth_property = self.choropleth.or(config.choropleth_property);
    config.timings.debounce_ms = self.debounce_ms.or(config.timings.debounce_ms);
    config
  }
}

fn main() -> eframe::Result {
  let args = Args::parse();

  // init logger.
  env_logger::init();
  censusmap::profiling::init_profiling();

  // Tokio runtime.
  let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
  let _enter = rt.enter();

  let config = args.apply(Config::new());
  info!("Reading boundaries from {}", config.asset_root());
  if config.gemini.api_key.is_none() {
    warn!("No Gemini API key configured, county information will be unavailable");
  }

  let options = eframe::NativeOptions {
    viewport: egui::ViewportBuilder {
      inner_size: Some(egui::vec2(1400.0, 900.0)),
      clamp_size_to_monitor_size: Some(true),
      title: Some("Kenya 2019 Census".to_string()),
      ..Default::default()
    },
    ..Default::default()
  };

  eframe::run_native(
    "censusmap",
    options,
    Box::new(move |cc| {
      let loader = GeometryLoader::from_config(&config);
      let provider = Arc::new(GeminiProvider::new(&config.gemini));
      Ok(Box::new(CensusApp::new(
        cc.egui_ctx.clone(),
        &config,
        loader,
        provider,
      )))
    }),
  )
}
