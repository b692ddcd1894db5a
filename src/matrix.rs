//! Matrix helpers for building model transforms.
//!
//! All matrices are column-major [`cgmath::Matrix4<f32>`], which is also the
//! layout WGSL expects for `mat4x4<f32>`. Rotations take Euler angles in
//! radians and are applied X first, then Y, then Z (`R = Rz * Ry * Rx`).

use cgmath::{Matrix4, Rad, SquareMatrix};

pub type Mat4 = Matrix4<f32>;

pub fn identity() -> Mat4 {
    Matrix4::identity()
}

pub fn scale_matrix(scale: [f32; 3]) -> Mat4 {
    Matrix4::from_nonuniform_scale(scale[0], scale[1], scale[2])
}

/// Rotation from Euler angles `[x, y, z]` in radians, composed as `Rz * Ry * Rx`.
pub fn rotation_matrix(rotation: [f32; 3]) -> Mat4 {
    let rx = Matrix4::from_angle_x(Rad(rotation[0]));
    let ry = Matrix4::from_angle_y(Rad(rotation[1]));
    let rz = Matrix4::from_angle_z(Rad(rotation[2]));
    rz * ry * rx
}

pub fn translation_matrix(translation: [f32; 3]) -> Mat4 {
    Matrix4::from_translation(translation.into())
}

pub fn multiply(a: &Mat4, b: &Mat4) -> Mat4 {
    a * b
}

/// Model matrix `T * R * S`: scale first, then rotate, then translate.
pub fn compose(translation: [f32; 3], rotation: [f32; 3], scale: [f32; 3]) -> Mat4 {
    translation_matrix(translation) * rotation_matrix(rotation) * scale_matrix(scale)
}

/// Column arrays as written into uniform buffers.
pub fn to_cols(m: &Mat4) -> [[f32; 4]; 4] {
    (*m).into()
}

#[cfg(test)]
pub(crate) fn assert_mat_eq(actual: &Mat4, expected: &Mat4) {
    let a = to_cols(actual);
    let e = to_cols(expected);
    for c in 0..4 {
        for r in 0..4 {
            assert!(
                (a[c][r] - e[c][r]).abs() < 1e-5,
                "mismatch at column {c}, row {r}: {} != {}\nactual: {:?}\nexpected: {:?}",
                a[c][r],
                e[c][r],
                a,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use cgmath::{Vector4, vec4};

    use super::*;

    #[test]
    fn identity_compose_is_identity() {
        let m = compose([0.0; 3], [0.0; 3], [1.0; 3]);
        assert_mat_eq(&m, &identity());
    }

    #[test]
    fn translation_lands_in_last_column() {
        let m = translation_matrix([1.0, 2.0, 3.0]);
        assert_eq!(to_cols(&m)[3], [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn rotation_applies_x_before_z() {
        // +Y rotated 90deg about X becomes +Z, which a Z rotation leaves alone.
        let m = rotation_matrix([FRAC_PI_2, 0.0, FRAC_PI_2]);
        let p: Vector4<f32> = m * vec4(0.0, 1.0, 0.0, 0.0);
        assert!((p.x).abs() < 1e-5);
        assert!((p.y).abs() < 1e-5);
        assert!((p.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn compose_scales_before_translating() {
        let m = compose([10.0, 0.0, 0.0], [0.0; 3], [2.0, 2.0, 2.0]);
        let p = m * vec4(1.0, 0.0, 0.0, 1.0);
        assert!((p.x - 12.0).abs() < 1e-5);
    }

    #[test]
    fn negative_scale_mirrors() {
        let m = scale_matrix([-1.0, 1.0, 1.0]);
        let p = m * vec4(3.0, 1.0, 0.0, 1.0);
        assert_eq!(p, vec4(-3.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn multiply_matches_operator() {
        let a = translation_matrix([1.0, 0.0, 0.0]);
        let b = rotation_matrix([0.0, 0.3, 0.0]);
        assert_mat_eq(&multiply(&a, &b), &(a * b));
    }
}
