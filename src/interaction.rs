//! Hover and selection of counties.
//!
//! The machine owns no timers. The caller feeds it pointer events together with the current time
//! and calls [`InteractionState::tick`] every frame; side effects come back as [`Command`]s.

use std::time::{Duration, Instant};

use log::debug;

use crate::map::region::Region;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);
pub const DEFAULT_TRANSITION: Duration = Duration::from_millis(500);

/// Where a running transition ends.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
  Detail(Region),
  Overview,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
  Overview,
  HoverPending { region: Region, since: Instant },
  HoverResolved { region: Region },
  Transitioning { to: Target, until: Instant },
  Detail { region: Region },
}

/// Work the caller has to do after a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  FetchInfo(Region),
  LoadRegion(Region),
  ShowCountry,
  ClearInfo,
}

#[derive(Debug, Clone)]
pub struct InteractionState {
  phase: Phase,
  selected: Option<Region>,
  debounce: Duration,
  transition: Duration,
}

impl Default for InteractionState {
  fn default() -> Self {
    Self::new(DEFAULT_DEBOUNCE, DEFAULT_TRANSITION)
  }
}

impl InteractionState {
  #[must_use]
  pub fn new(debounce: Duration, transition: Duration) -> Self {
    Self {
      phase: Phase::Overview,
      selected: None,
      debounce,
      transition,
    }
  }

  #[must_use]
  pub fn phase(&self) -> &Phase {
    &self.phase
  }

  /// Never set while a region is selected.
  #[must_use]
  pub fn hovered(&self) -> Option<&Region> {
    match &self.phase {
      Phase::HoverPending { region, .. } | Phase::HoverResolved { region } => Some(region),
      _ => None,
    }
  }

  #[must_use]
  pub fn selected(&self) -> Option<&Region> {
    self.selected.as_ref()
  }

  #[must_use]
  pub fn is_transitioning(&self) -> bool {
    matches!(self.phase, Phase::Transitioning { .. })
  }

  fn set_phase(&mut self, phase: Phase) {
    debug!("{:?} -> {phase:?}", self.phase);
    self.phase = phase;
  }

  pub fn pointer_enter(&mut self, region: &Region, now: Instant) -> Vec<Command> {
    match &self.phase {
      Phase::HoverPending { region: current, .. } | Phase::HoverResolved { region: current }
        if current.same_as(region) =>
      {
        Vec::new()
      }
      Phase::HoverResolved { .. } => {
        self.set_phase(Phase::HoverPending {
          region: region.clone(),
          since: now,
        });
        vec![Command::ClearInfo]
      }
      Phase::Overview | Phase::HoverPending { .. } => {
        self.set_phase(Phase::HoverPending {
          region: region.clone(),
          since: now,
        });
        Vec::new()
      }
      Phase::Transitioning { .. } | Phase::Detail { .. } => Vec::new(),
    }
  }

  pub fn pointer_leave(&mut self, region: &Region, _now: Instant) -> Vec<Command> {
    if self.hovered().is_some_and(|h| h.same_as(region)) {
      self.set_phase(Phase::Overview);
      vec![Command::ClearInfo]
    } else {
      Vec::new()
    }
  }

  /// Resolves an elapsed debounce window and finishes transitions.
  pub fn tick(&mut self, now: Instant) -> Vec<Command> {
    match &self.phase {
      Phase::HoverPending { region, since } if now.duration_since(*since) >= self.debounce => {
        let region = region.clone();
        self.set_phase(Phase::HoverResolved {
          region: region.clone(),
        });
        vec![Command::FetchInfo(region)]
      }
      Phase::Transitioning { to, until } if now >= *until => match to.clone() {
        Target::Detail(region) => {
          self.set_phase(Phase::Detail { region });
          Vec::new()
        }
        Target::Overview => {
          self.selected = None;
          self.set_phase(Phase::Overview);
          vec![Command::ShowCountry]
        }
      },
      _ => Vec::new(),
    }
  }

  pub fn click(&mut self, region: &Region, now: Instant) -> Vec<Command> {
    match self.phase {
      Phase::Overview | Phase::HoverPending { .. } | Phase::HoverResolved { .. } => {
        self.selected = Some(region.clone());
        self.set_phase(Phase::Transitioning {
          to: Target::Detail(region.clone()),
          until: now + self.transition,
        });
        vec![
          Command::FetchInfo(region.clone()),
          Command::LoadRegion(region.clone()),
        ]
      }
      Phase::Transitioning { .. } | Phase::Detail { .. } => Vec::new(),
    }
  }

  /// Starts the way back to the country. `selected` is kept until the transition ends, the
  /// county's information goes right away.
  pub fn back(&mut self, now: Instant) -> Vec<Command> {
    if !matches!(self.phase, Phase::Detail { .. }) {
      return Vec::new();
    }
    self.set_phase(Phase::Transitioning {
      to: Target::Overview,
      until: now + self.transition,
    });
    vec![Command::ClearInfo]
  }

  /// Share of the debounce window that has passed, for the progress ring.
  #[must_use]
  pub fn hover_progress(&self, now: Instant) -> Option<f32> {
    match &self.phase {
      Phase::HoverPending { since, .. } => Some(fraction(now.duration_since(*since), self.debounce)),
      Phase::HoverResolved { .. } => Some(1.),
      _ => None,
    }
  }

  /// Share of the running transition that has passed.
  #[must_use]
  pub fn transition_progress(&self, now: Instant) -> Option<f32> {
    match &self.phase {
      Phase::Transitioning { until, .. } => {
        let remaining = until.saturating_duration_since(now);
        Some(1. - fraction(remaining, self.transition))
      }
      _ => None,
    }
  }

  /// Time until [`InteractionState::tick`] has something to do.
  #[must_use]
  pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
    match &self.phase {
      Phase::HoverPending { since, .. } => {
        Some((*since + self.debounce).saturating_duration_since(now))
      }
      Phase::Transitioning { until, .. } => Some(until.saturating_duration_since(now)),
      _ => None,
    }
  }
}

fn fraction(part: Duration, whole: Duration) -> f32 {
  if whole.is_zero() {
    1.
  } else {
    (part.as_secs_f32() / whole.as_secs_f32()).clamp(0., 1.)
  }
}
