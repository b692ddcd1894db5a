//! Uniform buffer layouts.
//!
//! Each struct mirrors a WGSL uniform struct byte for byte (all members are
//! 16-byte aligned vec4/mat4 columns, so no padding is needed). Renderables
//! keep the last value they wrote so it can be inspected without reading the
//! GPU buffer back.

use crate::matrix::{self, Mat4};

/// `[model | view | proj | color]`, used by cubes and by every model sub-mesh.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl ObjectUniform {
    pub fn new(model: &Mat4, view: &Mat4, proj: &Mat4, color: [f32; 4]) -> Self {
        Self {
            model: matrix::to_cols(model),
            view: matrix::to_cols(view),
            proj: matrix::to_cols(proj),
            color,
        }
    }
}

/// `[model | view | proj | color | flags | params[2]]`.
///
/// `flags.x` is 1.0 when the plane samples its texture. The two `params`
/// slots are free-form and interpreted by the plane's shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PlaneUniform {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub flags: [f32; 4],
    pub params: [[f32; 4]; 2],
}

/// `[model | view | proj]` of a pixel grid.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GridTransformUniform {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}

impl GridTransformUniform {
    pub fn new(model: &Mat4, view: &Mat4, proj: &Mat4) -> Self {
        Self {
            model: matrix::to_cols(model),
            view: matrix::to_cols(view),
            proj: matrix::to_cols(proj),
        }
    }
}
