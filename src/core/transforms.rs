//! Orientation representation conversions.
//!
//! Export files report orientation as a 3x3 rotation matrix; channel tables
//! store unit quaternions. The conversion here is purely representational.

use nalgebra::{Matrix3, Quaternion as RawQuaternion, Rotation3, UnitQuaternion};

use super::tables::{Quaternion, Vec3};

/// Build a rotation matrix from nine entries keyed by 1-based `(row, col)`.
///
/// `entries[(r - 1) * 3 + (c - 1)]` holds `Mat[r][c]`.
pub fn matrix_from_entries(entries: &[f64; 9]) -> Matrix3<f64> {
    Matrix3::from_row_slice(entries)
}

/// Convert a rotation matrix to a unit quaternion.
///
/// Uses the trace-based branch selection of `UnitQuaternion::from_rotation_matrix`
/// and renormalizes, since exported matrices are only orthonormal to the
/// printed precision. Returns `None` if the result has no finite,
/// non-zero norm.
pub fn matrix_to_quaternion(matrix: &Matrix3<f64>) -> Option<Quaternion> {
    let rotation = Rotation3::from_matrix_unchecked(*matrix);
    let q = UnitQuaternion::from_rotation_matrix(&rotation).into_inner();
    normalize(q)
}

/// Build a unit quaternion from scalar-first components.
///
/// Returns `None` for a zero or non-finite quaternion.
pub fn quaternion_from_components(w: f64, x: f64, y: f64, z: f64) -> Option<Quaternion> {
    normalize(RawQuaternion::new(w, x, y, z))
}

fn normalize(q: RawQuaternion<f64>) -> Option<Quaternion> {
    if !q.coords.iter().all(|c| c.is_finite()) {
        return None;
    }
    UnitQuaternion::try_new(q, f64::EPSILON)
}

/// Build a vector from its three components.
#[inline]
pub fn vec3(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity_matrix() {
        let q = matrix_to_quaternion(&Matrix3::identity()).unwrap();
        assert!((q.w - 1.0).abs() < 1e-12);
        assert!(q.i.abs() < 1e-12 && q.j.abs() < 1e-12 && q.k.abs() < 1e-12);
    }

    #[test]
    fn test_quarter_turn_about_z() {
        let expected = UnitQuaternion::from_axis_angle(&Vec3::z_axis(), FRAC_PI_2);
        let matrix = expected.to_rotation_matrix().into_inner();

        let q = matrix_to_quaternion(&matrix).unwrap();
        assert!(q.angle_to(&expected) < 1e-9);
    }

    #[test]
    fn test_half_turn_uses_stable_branch() {
        // Trace is -1 here, the case where the naive w-first formula breaks down.
        let expected = UnitQuaternion::from_axis_angle(&Vec3::x_axis(), std::f64::consts::PI);
        let matrix = expected.to_rotation_matrix().into_inner();

        let q = matrix_to_quaternion(&matrix).unwrap();
        assert!((q.norm() - 1.0).abs() < 1e-12);
        assert!(q.angle_to(&expected) < 1e-9);
    }

    #[test]
    fn test_exported_matrix_gives_unit_norm() {
        // Mat[r][c] entries as printed with six decimals.
        let entries = [
            0.609684, 0.519480, 0.598686,
            0.730843, -0.660808, -0.170885,
            0.306845, 0.541732, -0.782543,
        ];
        let q = matrix_to_quaternion(&matrix_from_entries(&entries)).unwrap();
        assert!((q.norm() - 1.0).abs() < 1e-12);

        let back = q.to_rotation_matrix().into_inner();
        let original = matrix_from_entries(&entries);
        assert!((back - original).abs().max() < 1e-4);
    }

    #[test]
    fn test_quaternion_components_are_normalized() {
        let q = quaternion_from_components(2.0, 0.0, 0.0, 0.0).unwrap();
        assert!((q.w - 1.0).abs() < 1e-12);
        assert!((q.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_quaternion_rejected() {
        assert!(quaternion_from_components(0.0, 0.0, 0.0, 0.0).is_none());
        assert!(quaternion_from_components(f64::NAN, 0.0, 0.0, 1.0).is_none());
        assert!(quaternion_from_components(f64::INFINITY, 0.0, 0.0, 0.0).is_none());
    }

    #[test]
    fn test_non_finite_matrix_rejected() {
        let mut entries = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        entries[0] = f64::NAN;
        assert!(matrix_to_quaternion(&matrix_from_entries(&entries)).is_none());
    }
}
