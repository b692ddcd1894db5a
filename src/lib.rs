//! gpulab
//!
//! A small rendering playground over wgpu. An [`engine::Engine`] owns the GPU
//! and a camera, a [`scene::Scene`] holds renderables in insertion order, and
//! each frame draws every renderable in one render pass. Renderables are
//! cubes, textured planes, instanced pixel grids and glTF models. Runs
//! natively and in the browser.
//!
//! High-level modules
//! - `matrix`: 4x4 transform helpers
//! - `camera`: perspective/orthographic camera shared by the renderables
//! - `context`: device acquisition and the context renderables are built with
//! - `engine`: output surface, render targets and frame submission
//! - `scene`: renderable container and per-frame fan-out
//! - `objects`: the renderables and their lifecycle
//! - `pipelines`: shaders and render pipeline construction
//! - `data_structures`: vertices, uniforms, geometry and textures
//! - `resources`: asset loading, glTF extraction and texture caching
//! - `app`: the windowed playground and its event loop
//!

pub mod animation;
pub mod app;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod engine;
pub mod matrix;
pub mod objects;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use app::{Demo, PlaygroundConfig, run};
pub use engine::{Engine, EngineConfig};
pub use scene::Scene;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run(PlaygroundConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
