//! Fetching county boundaries from the static assets.
//!
//! The country file holds all counties, every county additionally has a file of its own that is
//! looked up under a primary and a fallback path.

use std::{path::PathBuf, sync::Arc, time::Duration};

use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use surf::Config;
use thiserror::Error;

use crate::{
  config,
  directory::CountyDirectory,
  map::region::{Region, RegionCollection, Scope},
  parser::{GeoJsonParser, ParseError},
  profile_scope,
};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static NOT_KEY_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("valid regex"));

/// The url and file name safe key of a county name.
///
/// `"Taita Taveta"` becomes `"taita-taveta"`, `"Murang'a"` becomes `"muranga"`.
#[must_use]
pub fn sanitize(name: &str) -> String {
  let lower = name.to_lowercase();
  let dashed = WHITESPACE.replace_all(&lower, "-");
  NOT_KEY_CHAR.replace_all(&dashed, "").into_owned()
}

#[derive(Error, Debug)]
pub enum AssetError {
  #[error("asset {0} does not exist")]
  NotFound(String),
  #[error("failed to fetch {path}: {reason}")]
  Network { path: String, reason: String },
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum LoaderError {
  #[error("no boundary for {name} (tried {})", .tried.join(", "))]
  AssetNotFound { name: String, tried: Vec<String> },
  #[error("{path} holds no usable boundary: {source}")]
  Malformed { path: String, source: ParseError },
  #[error("{path} holds no areal features")]
  Empty { path: String },
  #[error(transparent)]
  Asset(#[from] AssetError),
}

/// Where the raw boundary files come from.
#[async_trait::async_trait]
pub trait AssetSource: Send + Sync {
  /// The content of the asset at `path`, relative to the source's root.
  async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError>;

  /// Human readable location of `path`, used in error messages.
  fn describe(&self, path: &str) -> String {
    path.to_string()
  }
}

/// Assets below a directory.
#[derive(Debug, Clone)]
pub struct FileAssets {
  root: PathBuf,
}

impl FileAssets {
  #[must_use]
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }
}

#[async_trait::async_trait]
impl AssetSource for FileAssets {
  async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
    let full = self.root.join(path.trim_start_matches('/'));
    match tokio::fs::read(&full).await {
      Ok(data) => Ok(data),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        Err(AssetError::NotFound(full.display().to_string()))
      }
      Err(e) => Err(e.into()),
    }
  }

  fn describe(&self, path: &str) -> String {
    self.root.join(path.trim_start_matches('/')).display().to_string()
  }
}

/// Assets served below a base url.
#[derive(Debug, Clone)]
pub struct HttpAssets {
  base_url: String,
  client: surf::Client,
}

impl HttpAssets {
  #[must_use]
  pub fn new(base_url: &str) -> Self {
    let client: surf::Client = Config::new()
      .set_timeout(Some(Duration::from_secs(10)))
      .try_into()
      .unwrap_or_else(|e| {
        error!("Failed to configure http client, using defaults: {e}");
        surf::Client::new()
      });
    Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      client,
    }
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path.trim_start_matches('/'))
  }
}

#[async_trait::async_trait]
impl AssetSource for HttpAssets {
  async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
    let url = self.url(path);
    let mut response = self
      .client
      .get(&url)
      .await
      .map_err(|e| AssetError::Network {
        path: url.clone(),
        reason: e.to_string(),
      })?;

    match response.status() {
      surf::StatusCode::Ok => response.body_bytes().await.map_err(|e| AssetError::Network {
        path: url.clone(),
        reason: e.to_string(),
      }),
      surf::StatusCode::NotFound => Err(AssetError::NotFound(url)),
      status => Err(AssetError::Network {
        path: url,
        reason: format!("status {status}"),
      }),
    }
  }

  fn describe(&self, path: &str) -> String {
    self.url(path)
  }
}

/// A file or http source depending on the shape of `root`.
#[must_use]
pub fn asset_source(root: &str) -> Arc<dyn AssetSource> {
  if root.starts_with("http://") || root.starts_with("https://") {
    Arc::new(HttpAssets::new(root))
  } else {
    Arc::new(FileAssets::new(root))
  }
}

/// Path templates of the boundary files. `{key}` is replaced by the sanitized county name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
  pub country: String,
  pub region_primary: String,
  pub region_fallback: String,
}

impl Default for AssetPaths {
  fn default() -> Self {
    Self::from_config(&config::Config::default())
  }
}

impl AssetPaths {
  #[must_use]
  pub fn from_config(config: &config::Config) -> Self {
    Self {
      country: config.country_path().to_string(),
      region_primary: config.region_path().to_string(),
      region_fallback: config.region_fallback_path().to_string(),
    }
  }
}

/// Loads and normalizes boundaries. Has no state besides its source.
#[derive(Clone)]
pub struct GeometryLoader {
  source: Arc<dyn AssetSource>,
  paths: AssetPaths,
}

impl GeometryLoader {
  #[must_use]
  pub fn new(source: Arc<dyn AssetSource>, paths: AssetPaths) -> Self {
    Self { source, paths }
  }

  #[must_use]
  pub fn from_config(config: &config::Config) -> Self {
    Self::new(asset_source(config.asset_root()), AssetPaths::from_config(config))
  }

  /// Candidate paths for a county in lookup order.
  #[must_use]
  pub fn region_paths(&self, name: &str) -> [String; 2] {
    let key = sanitize(name);
    [
      self.paths.region_primary.replace("{key}", &key),
      self.paths.region_fallback.replace("{key}", &key),
    ]
  }

  /// All counties of the country.
  pub async fn load_country_boundaries(&self) -> Result<RegionCollection, LoaderError> {
    let path = &self.paths.country;
    let data = self.source.fetch(path).await.map_err(|e| match e {
      AssetError::NotFound(_) => LoaderError::AssetNotFound {
        name: "country".to_string(),
        tried: vec![self.source.describe(path)],
      },
      e => LoaderError::Asset(e),
    })?;
    let regions = Self::parse(path, &data)?;
    info!("Loaded {} county boundaries from {path}", regions.len());
    Ok(RegionCollection::new(Scope::Country, regions))
  }

  /// The boundary of a single county, primary path first. A path that cannot be fetched or
  /// does not hold a boundary moves on to the next one.
  pub async fn load_region_boundary(&self, name: &str) -> Result<Region, LoaderError> {
    let key = sanitize(name);
    let mut tried = Vec::new();
    let mut unusable = None;

    for path in self.region_paths(name) {
      let data = match self.source.fetch(&path).await {
        Ok(data) => data,
        Err(e) => {
          debug!("{name}: {e}, trying next path");
          tried.push(self.source.describe(&path));
          continue;
        }
      };

      let regions = match Self::parse(&path, &data) {
        Ok(regions) => regions,
        Err(e) => {
          warn!("{name}: {e}, trying next path");
          tried.push(self.source.describe(&path));
          unusable = Some(e);
          continue;
        }
      };
      let region = match regions.iter().position(|r| r.key() == key) {
        Some(i) => regions.into_iter().nth(i),
        None => {
          if regions.len() > 1 {
            warn!("{path} holds {} features, none named {name}", regions.len());
          }
          regions.into_iter().next()
        }
      };
      if let Some(region) = region {
        return Ok(region);
      }
    }

    error!("No boundary for {name}");
    Err(unusable.unwrap_or_else(|| LoaderError::AssetNotFound {
      name: name.to_string(),
      tried,
    }))
  }

  /// The county directory, read from the same assets as the boundaries.
  pub async fn load_directory(&self, path: &str) -> anyhow::Result<CountyDirectory> {
    CountyDirectory::load(self.source.as_ref(), path).await
  }

  fn parse(path: &str, data: &[u8]) -> Result<Vec<Region>, LoaderError> {
    profile_scope!("GeometryLoader::parse");
    let text = String::from_utf8_lossy(data);
    let regions = GeoJsonParser::new()
      .parse_str(&text)
      .map_err(|source| LoaderError::Malformed {
        path: path.to_string(),
        source,
      })?;
    if regions.is_empty() {
      return Err(LoaderError::Empty {
        path: path.to_string(),
      });
    }
    Ok(regions)
  }
}
