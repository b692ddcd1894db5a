//! Placement of a renderable: position, Euler rotation and scale.

use crate::matrix::{self, Mat4};

/// Position, rotation (Euler angles in radians, applied X, then Y, then Z)
/// and scale.
///
/// Negative scale components mirror the geometry and are allowed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Transform {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }

    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    /// `T * R * S`.
    pub fn to_matrix(&self) -> Mat4 {
        matrix::compose(self.position, self.rotation, self.scale)
    }

    /// Component-wise linear interpolation.
    pub fn lerp(&self, other: &Transform, t: f32) -> Transform {
        let mix = |a: [f32; 3], b: [f32; 3]| {
            [
                a[0] + (b[0] - a[0]) * t,
                a[1] + (b[1] - a[1]) * t,
                a[2] + (b[2] - a[2]) * t,
            ]
        };
        Transform {
            position: mix(self.position, other.position),
            rotation: mix(self.rotation, other.rotation),
            scale: mix(self.scale, other.scale),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl From<[f32; 3]> for Transform {
    fn from(position: [f32; 3]) -> Self {
        Transform::at(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::assert_mat_eq;

    #[test]
    fn default_is_identity() {
        assert_mat_eq(&Transform::default().to_matrix(), &matrix::identity());
    }

    #[test]
    fn lerp_halfway() {
        let a = Transform::at([0.0, 0.0, 0.0]);
        let b = Transform::at([2.0, 4.0, 6.0]);
        assert_eq!(a.lerp(&b, 0.5).position, [1.0, 2.0, 3.0]);
    }
}
