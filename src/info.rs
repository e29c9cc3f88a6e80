//! Generated descriptions of a county.

pub mod coordinator;
pub mod gemini;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use coordinator::{FetchStatus, InfoCoordinator, RetryPolicy, fetch_region_info};
pub use gemini::GeminiProvider;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Description {
  pub overview: String,
  pub main_income_sources: Vec<String>,
  pub tribes: Vec<String>,
  pub landmarks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Leader {
  pub name: String,
  pub position: String,
  pub period: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Statistics {
  pub leader: Leader,
  pub constituencies: Vec<String>,
  /// Relative share of the national economy.
  #[serde(deserialize_with = "lenient_number")]
  pub gdp_contribution: f64,
}

/// What is shown about a county besides its boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionInfo {
  pub description: Description,
  pub statistics: Statistics,
}

impl RegionInfo {
  /// Placeholder content for when the service answered with something unusable.
  #[must_use]
  pub fn fallback(name: &str) -> Self {
    let strings = |items: &[&str]| -> Vec<String> { items.iter().map(ToString::to_string).collect() };
    Self {
      description: Description {
        overview: format!("Information about {name} County"),
        main_income_sources: strings(&["Agriculture", "Trade"]),
        tribes: strings(&["Various ethnic groups"]),
        landmarks: strings(&["Notable locations"]),
      },
      statistics: Statistics {
        leader: Leader {
          name: "Current Governor".to_string(),
          position: "Governor".to_string(),
          period: "Current Term".to_string(),
        },
        constituencies: strings(&["Main Constituencies"]),
        gdp_contribution: 0.,
      },
    }
  }
}

/// Numbers may arrive as strings, anything unusable counts as zero.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
  Ok(match Value::deserialize(deserializer)? {
    Value::Number(n) => n.as_f64().unwrap_or_default(),
    Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or_default(),
    _ => 0.,
  })
}

#[derive(Error, Debug)]
pub enum InfoError {
  #[error("request failed: {0}")]
  Network(String),
  #[error("service answered with status {status}: {body}")]
  Status { status: u16, body: String },
  #[error("no api key configured, set GEMINI_API_KEY")]
  MissingApiKey,
  #[error("giving up after {attempts} attempts: {last}")]
  RetriesExhausted { attempts: u32, last: Box<InfoError> },
}

/// A source of county descriptions.
#[async_trait::async_trait]
pub trait InfoProvider: Send + Sync {
  fn name(&self) -> &str;

  async fn region_info(&self, region: &str) -> Result<RegionInfo, InfoError>;
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn camel_case_fields() {
    let info: RegionInfo = serde_json::from_value(json!({
      "description": {
        "overview": "Coastal county",
        "mainIncomeSources": ["Tourism", "Fishing"],
        "tribes": ["Bajuni", "Swahili"],
        "landmarks": ["Lamu Old Town"]
      },
      "statistics": {
        "leader": { "name": "Issa Timamy", "position": "Governor", "period": "2022-2027" },
        "constituencies": ["Lamu East", "Lamu West"],
        "gdpContribution": "0.3"
      }
    }))
    .unwrap();

    assert_eq!(info.description.main_income_sources, vec!["Tourism", "Fishing"]);
    assert_eq!(info.statistics.leader.period, "2022-2027");
    assert!((info.statistics.gdp_contribution - 0.3).abs() < 1e-9);

    let back = serde_json::to_value(&info).unwrap();
    assert_eq!(back["statistics"]["gdpContribution"], json!(0.3));
  }

  #[test]
  fn unusable_contribution_is_zero() {
    let stats: Statistics =
      serde_json::from_value(json!({ "gdpContribution": "about five" })).unwrap();
    assert!(stats.gdp_contribution.abs() < f64::EPSILON);
    let stats: Statistics = serde_json::from_value(json!({ "gdpContribution": null })).unwrap();
    assert!(stats.gdp_contribution.abs() < f64::EPSILON);
  }

  #[test]
  fn fallback_names_the_county() {
    let info = RegionInfo::fallback("Turkana");
    assert_eq!(info.description.overview, "Information about Turkana County");
    assert_eq!(info.statistics.leader.name, "Current Governor");
    assert_eq!(info.statistics.constituencies, vec!["Main Constituencies"]);
  }
}
