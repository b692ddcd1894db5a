//! Render pipelines, bind group layouts and default shaders per renderable.
//!
//! - `basic` contains the shared pipeline builder and layout entry helpers
//! - `cube`, `plane`, `pixel_grid` and `model` each provide a default shader,
//!   the bind group layout their renderable binds against and its pipeline

pub mod basic;
pub mod cube;
pub mod model;
pub mod pixel_grid;
pub mod plane;
