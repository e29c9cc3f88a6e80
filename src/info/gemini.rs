use std::time::Duration;

use log::{debug, error, warn};
use serde_json::{Value, json};
use surf::Config;

use super::{InfoError, InfoProvider, RegionInfo};
use crate::config::GeminiConfig;

const PROMPT_STRUCTURE: &str = r#"{
  "description": {
    "overview": "brief overview",
    "mainIncomeSources": ["source1", "source2"],
    "tribes": ["tribe1", "tribe2"],
    "landmarks": ["landmark1", "landmark2"]
  },
  "statistics": {
    "leader": {
      "name": "current governor name",
      "position": "Governor",
      "period": "current term period"
    },
    "constituencies": ["constituency1", "constituency2"],
    "gdpContribution": 5
  }
}"#;

/// Asks Google's Gemini models to describe a county.
pub struct GeminiProvider {
  base_url: String,
  model: String,
  api_key: Option<String>,
  client: surf::Client,
}

impl GeminiProvider {
  #[must_use]
  pub fn new(config: &GeminiConfig) -> Self {
    let client: surf::Client = Config::new()
      .set_timeout(Some(Duration::from_secs(30)))
      .try_into()
      .unwrap_or_else(|e| {
        error!("Failed to configure http client, using defaults: {e}");
        surf::Client::new()
      });
    Self {
      base_url: config.base_url().trim_end_matches('/').to_string(),
      model: config.model().to_string(),
      api_key: config.api_key.clone(),
      client,
    }
  }

  fn url(&self, api_key: &str) -> String {
    format!(
      "{}/v1beta/models/{}:generateContent?key={}",
      self.base_url,
      self.model,
      urlencoding::encode(api_key)
    )
  }
}

#[must_use]
pub fn prompt(region: &str) -> String {
  format!(
    "Return ONLY valid JSON data without markdown formatting or code blocks about {region} County \
     in Kenya with this exact structure:\n{PROMPT_STRUCTURE}\n\nImportant: Return ONLY the JSON, \
     no additional text, no markdown formatting, no code blocks."
  )
}

/// The text parts of the first candidate of a `generateContent` reply.
fn reply_text(reply: &Value) -> Option<String> {
  let parts = reply
    .get("candidates")?
    .get(0)?
    .get("content")?
    .get("parts")?
    .as_array()?;
  let text: String = parts
    .iter()
    .filter_map(|p| p.get("text").and_then(Value::as_str))
    .collect();
  (!text.is_empty()).then_some(text)
}

/// Reads the model's answer, falling back to placeholder content if it is not the requested
/// structure.
#[must_use]
pub fn parse_region_info(region: &str, text: &str) -> RegionInfo {
  let cleaned = strip_code_fences(text);
  let value = match serde_json::from_str::<Value>(&cleaned) {
    Ok(value) => value,
    Err(e) => {
      warn!("Malformed reply for {region}: {e}");
      debug!("Raw reply: {text}");
      return RegionInfo::fallback(region);
    }
  };

  let complete = ["description", "statistics"]
    .iter()
    .all(|key| value.get(key).is_some_and(Value::is_object));
  if !complete {
    warn!("Reply for {region} lacks description or statistics");
    return RegionInfo::fallback(region);
  }

  serde_json::from_value(value).unwrap_or_else(|e| {
    warn!("Reply for {region} has the wrong shape: {e}");
    RegionInfo::fallback(region)
  })
}

fn strip_code_fences(text: &str) -> String {
  let mut out = text.to_string();
  while let Some(start) = out.to_ascii_lowercase().find("```json") {
    out.replace_range(start..start + "```json".len(), "");
  }
  out.replace("```", "").trim().to_string()
}

#[async_trait::async_trait]
impl InfoProvider for GeminiProvider {
  fn name(&self) -> &str {
    "Gemini"
  }

  async fn region_info(&self, region: &str) -> Result<RegionInfo, InfoError> {
    let api_key = self.api_key.as_deref().ok_or(InfoError::MissingApiKey)?;
    let body = json!({ "contents": [{ "parts": [{ "text": prompt(region) }] }] });

    let mut response = self
      .client
      .post(self.url(api_key))
      .body_json(&body)
      .map_err(|e| InfoError::Network(e.to_string()))?
      .await
      .map_err(|e| InfoError::Network(e.to_string()))?;

    if !response.status().is_success() {
      let body = response.body_string().await.unwrap_or_default();
      return Err(InfoError::Status {
        status: response.status().into(),
        body,
      });
    }

    let reply: Value = response
      .body_json()
      .await
      .map_err(|e| InfoError::Network(e.to_string()))?;

    Ok(match reply_text(&reply) {
      Some(text) => parse_region_info(region, &text),
      None => {
        warn!("Reply for {region} holds no text");
        RegionInfo::fallback(region)
      }
    })
  }
}
