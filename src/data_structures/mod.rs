//! Engine data structures: textures, vertex formats, geometry and uniforms.
//!
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `vertex` holds the vertex formats and their buffer layouts
//! - `geometry` holds the static cube/plane/grid geometry and its GPU buffers
//! - `transform` is the position/rotation/scale placement of a renderable
//! - `uniforms` mirrors the WGSL uniform structs

pub mod geometry;
pub mod texture;
pub mod transform;
pub mod uniforms;
pub mod vertex;
