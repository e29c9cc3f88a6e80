use std::{
  sync::{
    Arc,
    mpsc::{Receiver, Sender},
  },
  time::Duration,
};

use log::{debug, info, warn};

use super::{InfoError, InfoProvider, RegionInfo};
use crate::{
  config::Timings,
  task_tracker::{TaskCategory, TaskGuard},
};

/// How often and how patiently a failed request is repeated. No backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_retries: u32,
  pub delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_retries: 3,
      delay: Duration::from_secs(1),
    }
  }
}

impl From<&Timings> for RetryPolicy {
  fn from(timings: &Timings) -> Self {
    Self {
      max_retries: timings.max_retries(),
      delay: timings.retry_delay(),
    }
  }
}

/// One attempt plus up to `max_retries` retries.
pub async fn fetch_region_info(
  provider: &dyn InfoProvider,
  region: &str,
  policy: RetryPolicy,
) -> Result<RegionInfo, InfoError> {
  let attempts = policy.max_retries + 1;
  let mut attempt = 1;
  loop {
    match provider.region_info(region).await {
      Ok(info) => return Ok(info),
      Err(InfoError::MissingApiKey) => return Err(InfoError::MissingApiKey),
      Err(e) if attempt < attempts => {
        warn!(
          "{} failed for {region} (attempt {attempt}/{attempts}): {e}",
          provider.name()
        );
        tokio::time::sleep(policy.delay).await;
        attempt += 1;
      }
      Err(e) => {
        return Err(InfoError::RetriesExhausted {
          attempts,
          last: Box::new(e),
        });
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchStatus {
  #[default]
  Idle,
  Loading {
    region: String,
  },
  Success(RegionInfo),
  Failed {
    region: String,
    error: String,
  },
}

struct Outcome {
  generation: u64,
  region: String,
  result: Result<RegionInfo, InfoError>,
}

/// Runs at most one authoritative info request; results of superseded ones are dropped.
pub struct InfoCoordinator {
  provider: Arc<dyn InfoProvider>,
  policy: RetryPolicy,
  generation: u64,
  target: Option<String>,
  status: FetchStatus,
  sender: Sender<Outcome>,
  receiver: Receiver<Outcome>,
  repaint: Option<egui::Context>,
}

impl InfoCoordinator {
  #[must_use]
  pub fn new(provider: Arc<dyn InfoProvider>, policy: RetryPolicy) -> Self {
    let (sender, receiver) = std::sync::mpsc::channel();
    Self {
      provider,
      policy,
      generation: 0,
      target: None,
      status: FetchStatus::Idle,
      sender,
      receiver,
      repaint: None,
    }
  }

  /// Repaints `ctx` whenever a result arrives.
  #[must_use]
  pub fn with_repaint(mut self, ctx: egui::Context) -> Self {
    self.repaint = Some(ctx);
    self
  }

  #[must_use]
  pub fn status(&self) -> &FetchStatus {
    &self.status
  }

  /// The region the current status belongs to.
  #[must_use]
  pub fn target(&self) -> Option<&str> {
    self.target.as_deref()
  }

  #[must_use]
  pub fn generation(&self) -> u64 {
    self.generation
  }

  /// Supersedes whatever was requested before. Needs a running tokio runtime.
  pub fn request(&mut self, region: &str) {
    self.generation += 1;
    let generation = self.generation;
    debug!("Requesting info for {region} (generation {generation})");
    self.target = Some(region.to_string());
    self.status = FetchStatus::Loading {
      region: region.to_string(),
    };

    let provider = Arc::clone(&self.provider);
    let policy = self.policy;
    let sender = self.sender.clone();
    let repaint = self.repaint.clone();
    let region = region.to_string();
    tokio::spawn(async move {
      let _guard = TaskGuard::new(format!("{region} info"), TaskCategory::InfoFetch);
      let result = fetch_region_info(provider.as_ref(), &region, policy).await;
      let _ = sender
        .send(Outcome {
          generation,
          region,
          result,
        })
        .inspect_err(|e| debug!("Info receiver gone: {e}"));
      if let Some(ctx) = repaint {
        ctx.request_repaint();
      }
    });
  }

  /// Forgets the current target; anything still in flight is ignored.
  pub fn clear(&mut self) {
    self.generation += 1;
    self.target = None;
    self.status = FetchStatus::Idle;
  }

  /// Commits arrived results of the current generation. Returns whether the status changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(outcome) = self.receiver.try_recv() {
      if outcome.generation != self.generation {
        info!(
          "Dropping stale info for {} (generation {}, current {})",
          outcome.region, outcome.generation, self.generation
        );
        continue;
      }
      self.status = match outcome.result {
        Ok(info) => FetchStatus::Success(info),
        Err(e) => {
          warn!("No information for {}: {e}", outcome.region);
          FetchStatus::Failed {
            region: outcome.region,
            error: e.to_string(),
          }
        }
      };
      changed = true;
    }
    changed
  }
}
