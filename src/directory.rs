use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::geometry_loader::AssetSource;

/// Administrative facts about a county that do not need to be generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyEntry {
  pub name: String,
  pub capital: String,
  pub code: u32,
  #[serde(default)]
  pub sub_counties: Vec<String>,
}

/// All counties by lower case name.
#[derive(Debug, Clone, Default)]
pub struct CountyDirectory {
  entries: HashMap<String, CountyEntry>,
}

impl CountyDirectory {
  pub fn from_json(data: &[u8]) -> Result<Self> {
    let entries: Vec<CountyEntry> =
      serde_json::from_slice(data).context("county directory is not a list of counties")?;
    Ok(entries.into_iter().collect())
  }

  pub async fn load(source: &dyn AssetSource, path: &str) -> Result<Self> {
    let data = source
      .fetch(path)
      .await
      .with_context(|| format!("failed to read {}", source.describe(path)))?;
    Self::from_json(&data)
  }

  #[must_use]
  pub fn get(&self, name: &str) -> Option<&CountyEntry> {
    self.entries.get(&name.to_lowercase())
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl FromIterator<CountyEntry> for CountyDirectory {
  fn from_iter<I: IntoIterator<Item = CountyEntry>>(iter: I) -> Self {
    Self {
      entries: iter
        .into_iter()
        .map(|entry| (entry.name.to_lowercase(), entry))
        .collect(),
    }
  }
}
