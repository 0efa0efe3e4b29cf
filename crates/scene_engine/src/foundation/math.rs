//! Math utilities and types
//!
//! Provides fundamental math types for 3D scene management.

pub use nalgebra::{
    Matrix3, Matrix4,
    Quaternion,
    Unit,
    Vector2, Vector3, Vector4,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Extract the upper-left 3x3 rotation/scale block of a transform.
pub fn upper_left(matrix: &Mat4) -> Mat3 {
    matrix.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Compute the inverse-transpose of a world transform's rotation block.
///
/// This is the matrix that carries normal vectors into world space when the
/// transform contains non-uniform scale. A degenerate (non-invertible) world
/// transform is a precondition violation upstream; in release builds the
/// un-inverted block is propagated.
pub fn rotation_inverse_transpose(world: &Mat4) -> Mat3 {
    let block = upper_left(world);
    match block.try_inverse() {
        Some(inverse) => inverse.transpose(),
        None => {
            debug_assert!(false, "degenerate world transform has no normal matrix");
            block
        }
    }
}

/// Invert a transform, propagating the identity when it is degenerate.
///
/// Non-invertible parent transforms are a content bug; recovery would mask
/// them, so this asserts in debug builds and propagates garbage in release.
pub fn invert_transform(matrix: &Mat4) -> Mat4 {
    match matrix.try_inverse() {
        Some(inverse) => inverse,
        None => {
            debug_assert!(false, "attempted to invert a degenerate transform");
            Mat4::identity()
        }
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a perspective projection matrix with [0, 1] clip-space depth
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix (Y-down, Z-into-screen)
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // Depth maps to [0, 1] with +Z into the screen, the convention the
        // draw backend consumes.
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = far / (far - near);
        result[(2, 3)] = -(near * far) / (far - near);
        result[(3, 2)] = 1.0;

        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            forward.x, forward.y, forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }
}

/// Loose float tolerance for transform comparisons
pub const LOOSE_TOLERANCE: f32 = 1.0e-4;

/// Compare two transforms component-wise against [`LOOSE_TOLERANCE`].
pub fn about_equal(a: &Mat4, b: &Mat4) -> bool {
    (a - b).iter().all(|c| c.abs() < LOOSE_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_inverse_transpose_identity() {
        let it = rotation_inverse_transpose(&Mat4::identity());
        assert_relative_eq!(it, Mat3::identity());
    }

    #[test]
    fn test_rotation_inverse_transpose_nonuniform_scale() {
        let world = Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 1.0, 1.0));
        let it = rotation_inverse_transpose(&world);

        // A normal along +X must shrink by the scale factor, not grow.
        let normal = it * Vec3::x();
        assert_relative_eq!(normal.x, 0.5);
    }

    #[test]
    fn test_about_equal() {
        let a = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let mut b = a;
        assert!(about_equal(&a, &b));

        b[(0, 3)] += 1.0;
        assert!(!about_equal(&a, &b));
    }
}
