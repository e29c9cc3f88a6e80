/// The county map widget.
pub mod census_egui;
/// Contains everything needed to handle coordinates.
pub mod coordinates;
/// Fitting the map into the viewport.
pub mod projection;
/// Counties and the collections they are drawn in.
pub mod region;
/// Turns a collection into shapes on screen.
pub mod render;
