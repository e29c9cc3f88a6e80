//! Interactive census map of Kenya's counties.

/// The census dashboard.
pub mod census_ui;
pub mod config;
/// Administrative facts about the counties.
pub mod directory;
/// Fetches boundary files.
pub mod geometry_loader;
/// Generated information about a county.
pub mod info;
/// Hover, selection and transitions.
pub mod interaction;
/// Everything needed to draw the counties.
pub mod map;
/// Boundary file formats.
pub mod parser;
pub mod profiling;
pub mod task_tracker;

pub use census_ui::CensusApp;
pub use map::region::{Region, RegionCollection};
