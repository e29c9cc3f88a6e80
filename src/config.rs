use std::{path::PathBuf, time::Duration};

use dirs::home_dir;
use log::error;
use serde::{Deserialize, Serialize};

const DEFAULT_ASSET_ROOT: &str = "assets";
const DEFAULT_COUNTRY_PATH: &str = "geojson/kenya.geojson";
const DEFAULT_REGION_PATH: &str = "counties/geojson/{key}.json";
const DEFAULT_REGION_FALLBACK_PATH: &str = "geojson/{key}.json";
const DEFAULT_DIRECTORY_PATH: &str = "county-information/counties.json";
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

const DEFAULT_DEBOUNCE_MS: u64 = 2000;
const DEFAULT_TRANSITION_MS: u64 = 500;
const DEFAULT_HIGHLIGHT_MS: u64 = 200;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Access to the generative text service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
  pub base_url: Option<String>,
  pub model: Option<String>,
  /// Never written back to the config file.
  #[serde(skip_serializing)]
  pub api_key: Option<String>,
}

impl GeminiConfig {
  fn merge(self, other: &Self) -> Self {
    Self {
      base_url: self.base_url.or(other.base_url.clone()),
      model: self.model.or(other.model.clone()),
      api_key: self.api_key.or(other.api_key.clone()),
    }
  }

  #[must_use]
  pub fn base_url(&self) -> &str {
    self.base_url.as_deref().unwrap_or(DEFAULT_GEMINI_URL)
  }

  #[must_use]
  pub fn model(&self) -> &str {
    self.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL)
  }
}

/// Delays of the map view, all in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
  pub debounce_ms: Option<u64>,
  pub transition_ms: Option<u64>,
  pub highlight_ms: Option<u64>,
  pub retry_delay_ms: Option<u64>,
  pub max_retries: Option<u32>,
}

impl Timings {
  fn merge(self, other: &Self) -> Self {
    Self {
      debounce_ms: self.debounce_ms.or(other.debounce_ms),
      transition_ms: self.transition_ms.or(other.transition_ms),
      highlight_ms: self.highlight_ms.or(other.highlight_ms),
      retry_delay_ms: self.retry_delay_ms.or(other.retry_delay_ms),
      max_retries: self.max_retries.or(other.max_retries),
    }
  }

  /// Continuous hover time before county info is requested.
  #[must_use]
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS))
  }

  /// Length of the switch between country and county view.
  #[must_use]
  pub fn transition(&self) -> Duration {
    Duration::from_millis(self.transition_ms.unwrap_or(DEFAULT_TRANSITION_MS))
  }

  /// Fade time of the hover highlight.
  #[must_use]
  pub fn highlight(&self) -> Duration {
    Duration::from_millis(self.highlight_ms.unwrap_or(DEFAULT_HIGHLIGHT_MS))
  }

  #[must_use]
  pub fn retry_delay(&self) -> Duration {
    Duration::from_millis(self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS))
  }

  #[must_use]
  pub fn max_retries(&self) -> u32 {
    self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  #[serde(skip)]
  pub config_path: Option<PathBuf>,
  /// A directory or an `http(s)://` base url.
  pub asset_root: Option<String>,
  pub country_path: Option<String>,
  /// Templates containing `{key}`, the sanitized county name.
  pub region_path: Option<String>,
  pub region_fallback_path: Option<String>,
  pub directory_path: Option<String>,
  pub gemini: GeminiConfig,
  pub timings: Timings,
  /// Numeric feature property used to shade the country map.
  pub choropleth_property: Option<String>,
}

impl Config {
  /// Environment, then the config file, then defaults.
  #[must_use]
  pub fn new() -> Self {
    let from_env = Self::from_env();
    let from_file = Self::from_file();
    let default = Self::defaults();

    let mut merged = from_env;
    if let Some(from_file) = &from_file {
      merged = merged.merge(from_file);
    }
    merged = merged.merge(&default);

    if merged.config_path.is_some() && from_file.is_none() {
      merged.init_cfg_file();
    }

    merged
  }

  fn config_dir() -> Option<PathBuf> {
    std::env::var("CENSUSMAP_CONFIG")
      .ok()
      .map(PathBuf::from)
      .or_else(|| home_dir().map(|p| p.join(".config").join("censusmap")))
  }

  fn from_env() -> Self {
    Self {
      config_path: std::env::var("CENSUSMAP_CONFIG").ok().map(PathBuf::from),
      asset_root: std::env::var("CENSUSMAP_ASSETS").ok(),
      gemini: GeminiConfig {
        base_url: None,
        model: std::env::var("CENSUSMAP_GEMINI_MODEL").ok(),
        api_key: std::env::var("GEMINI_API_KEY")
          .ok()
          .filter(|k| !k.trim().is_empty()),
      },
      ..Self::default()
    }
  }

  /// Fields set in `self` win over the ones in `other`.
  #[must_use]
  pub fn merge(self, other: &Self) -> Self {
    Self {
      config_path: self.config_path.or(other.config_path.clone()),
      asset_root: self.asset_root.or(other.asset_root.clone()),
      country_path: self.country_path.or(other.country_path.clone()),
      region_path: self.region_path.or(other.region_path.clone()),
      region_fallback_path: self
        .region_fallback_path
        .or(other.region_fallback_path.clone()),
      directory_path: self.directory_path.or(other.directory_path.clone()),
      gemini: self.gemini.merge(&other.gemini),
      timings: self.timings.merge(&other.timings),
      choropleth_property: self
        .choropleth_property
        .or(other.choropleth_property.clone()),
    }
  }

  fn from_file() -> Option<Self> {
    let config_path = Self::config_dir()?.join("config.json");

    serde_json::from_str(&std::fs::read_to_string(&config_path).ok()?)
      .inspect_err(|e| error!("Failed to read config file: {e}"))
      .ok()
  }

  fn init_cfg_file(&self) {
    if let Some(path) = &self.config_path {
      if !path.exists() {
        let _ = std::fs::create_dir_all(path).inspect_err(|e| {
          error!("Failed to create config directory: {e}");
        });
      }

      let path = path.join("config.json");
      if !path.exists() {
        match serde_json::to_string_pretty(self) {
          Ok(config) => {
            let _ = std::fs::write(path, config).inspect_err(|e| {
              error!("Failed to write config file: {e}");
            });
          }
          Err(e) => error!("Failed to serialize config: {e}"),
        }
      }
    }
  }

  /// The built-in values every field falls back to.
  #[must_use]
  pub fn defaults() -> Self {
    Self {
      config_path: Self::config_dir(),
      asset_root: Some(DEFAULT_ASSET_ROOT.to_string()),
      country_path: Some(DEFAULT_COUNTRY_PATH.to_string()),
      region_path: Some(DEFAULT_REGION_PATH.to_string()),
      region_fallback_path: Some(DEFAULT_REGION_FALLBACK_PATH.to_string()),
      directory_path: Some(DEFAULT_DIRECTORY_PATH.to_string()),
      gemini: GeminiConfig {
        base_url: Some(DEFAULT_GEMINI_URL.to_string()),
        model: Some(DEFAULT_GEMINI_MODEL.to_string()),
        api_key: None,
      },
      timings: Timings {
        debounce_ms: Some(DEFAULT_DEBOUNCE_MS),
        transition_ms: Some(DEFAULT_TRANSITION_MS),
        highlight_ms: Some(DEFAULT_HIGHLIGHT_MS),
        retry_delay_ms: Some(DEFAULT_RETRY_DELAY_MS),
        max_retries: Some(DEFAULT_MAX_RETRIES),
      },
      choropleth_property: None,
    }
  }

  #[must_use]
  pub fn asset_root(&self) -> &str {
    self.asset_root.as_deref().unwrap_or(DEFAULT_ASSET_ROOT)
  }

  #[must_use]
  pub fn country_path(&self) -> &str {
    self.country_path.as_deref().unwrap_or(DEFAULT_COUNTRY_PATH)
  }

  #[must_use]
  pub fn region_path(&self) -> &str {
    self.region_path.as_deref().unwrap_or(DEFAULT_REGION_PATH)
  }

  #[must_use]
  pub fn region_fallback_path(&self) -> &str {
    self
      .region_fallback_path
      .as_deref()
      .unwrap_or(DEFAULT_REGION_FALLBACK_PATH)
  }

  #[must_use]
  pub fn directory_path(&self) -> &str {
    self.directory_path.as_deref().unwrap_or(DEFAULT_DIRECTORY_PATH)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn earlier_values_win() {
    let env = Config {
      asset_root: Some("/srv/kenya".into()),
      ..Config::default()
    };
    let file: Config = serde_json::from_str(
      r#"{ "asset_root": "/ignored", "timings": { "debounce_ms": 1500 }, "choropleth_property": "Shape_Area" }"#,
    )
    .unwrap();
    let merged = env.merge(&file).merge(&Config::defaults());

    assert_eq!(merged.asset_root(), "/srv/kenya");
    assert_eq!(merged.timings.debounce(), Duration::from_millis(1500));
    assert_eq!(merged.timings.transition(), Duration::from_millis(500));
    assert_eq!(merged.timings.max_retries(), 3);
    assert_eq!(merged.choropleth_property.as_deref(), Some("Shape_Area"));
    assert_eq!(merged.region_path(), "counties/geojson/{key}.json");
    assert_eq!(merged.region_fallback_path(), "geojson/{key}.json");
  }

  #[test]
  fn api_key_is_not_written() {
    let config = Config {
      gemini: GeminiConfig {
        api_key: Some("secret".into()),
        ..GeminiConfig::default()
      },
      ..Config::defaults()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert!(!json.contains("secret"));
    assert!(json.contains("gemini-pro"));
  }

  #[test]
  fn empty_config_uses_defaults() {
    let config = Config::default();
    assert_eq!(config.asset_root(), "assets");
    assert_eq!(config.country_path(), "geojson/kenya.geojson");
    assert_eq!(config.gemini.model(), "gemini-pro");
    assert_eq!(config.timings.retry_delay(), Duration::from_secs(1));
  }
}
