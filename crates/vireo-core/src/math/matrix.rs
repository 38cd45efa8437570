// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Provides 3x3 and 4x4 column-major matrix types.

use super::vector::{Vec3, Vec4};
use std::ops::Mul;

// --- Mat3 ---

/// A 3x3 column-major matrix, used for pure rotations (e.g. oriented
/// bounding box axes).
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Mat3 {
    /// The columns of the matrix. `cols[0]` is the first column, and so on.
    pub cols: [Vec3; 3],
}

impl Mat3 {
    /// The 3x3 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec3::X, Vec3::Y, Vec3::Z],
    };

    /// Creates a new matrix from three column vectors.
    #[inline]
    pub fn from_cols(c0: Vec3, c1: Vec3, c2: Vec3) -> Self {
        Self { cols: [c0, c1, c2] }
    }

    /// Creates a matrix for a rotation around the X-axis.
    #[inline]
    pub fn from_rotation_x(angle: f32) -> Self {
        let c = angle.cos();
        let s = angle.sin();
        Self::from_cols(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, c, s),
            Vec3::new(0.0, -s, c),
        )
    }

    /// Creates a matrix for a rotation around the Y-axis.
    #[inline]
    pub fn from_rotation_y(angle: f32) -> Self {
        let c = angle.cos();
        let s = angle.sin();
        Self::from_cols(
            Vec3::new(c, 0.0, -s),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(s, 0.0, c),
        )
    }

    /// Creates a matrix for a rotation around the Z-axis.
    #[inline]
    pub fn from_rotation_z(angle: f32) -> Self {
        let c = angle.cos();
        let s = angle.sin();
        Self::from_cols(
            Vec3::new(c, s, 0.0),
            Vec3::new(-s, c, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        )
    }

    /// Returns a column of the matrix.
    #[inline]
    pub fn col(&self, index: usize) -> Vec3 {
        self.cols[index]
    }

    /// Returns the transpose of the matrix, where rows and columns are swapped.
    #[inline]
    pub fn transpose(&self) -> Self {
        Self::from_cols(
            Vec3::new(self.cols[0].x, self.cols[1].x, self.cols[2].x),
            Vec3::new(self.cols[0].y, self.cols[1].y, self.cols[2].y),
            Vec3::new(self.cols[0].z, self.cols[1].z, self.cols[2].z),
        )
    }
}

impl Default for Mat3 {
    /// Returns the 3x3 identity matrix.
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;
    /// Transforms a `Vec3` by this matrix.
    #[inline]
    fn mul(self, rhs: Vec3) -> Self::Output {
        self.cols[0] * rhs.x + self.cols[1] * rhs.y + self.cols[2] * rhs.z
    }
}

// --- Mat4 ---

/// A 4x4 column-major matrix, used for 3D affine transformations.
///
/// This is the primary type for representing transformations (translation,
/// rotation, scale) in 3D space. It is also used for camera view and
/// projection matrices. The memory layout is column-major, compatible with
/// modern graphics APIs like Vulkan, Metal, and DirectX.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Mat4 {
    /// The columns of the matrix. `cols[0]` is the first column, and so on.
    pub cols: [Vec4; 4],
}

impl Mat4 {
    /// The 4x4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec4::X, Vec4::Y, Vec4::Z, Vec4::W],
    };

    /// Creates a new matrix from four column vectors.
    #[inline]
    pub fn from_cols(c0: Vec4, c1: Vec4, c2: Vec4, c3: Vec4) -> Self {
        Self {
            cols: [c0, c1, c2, c3],
        }
    }

    /// Returns a row of the matrix as a `Vec4`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not in `0..4`.
    #[inline]
    pub fn get_row(&self, index: usize) -> Vec4 {
        match index {
            0 => Vec4::new(self.cols[0].x, self.cols[1].x, self.cols[2].x, self.cols[3].x),
            1 => Vec4::new(self.cols[0].y, self.cols[1].y, self.cols[2].y, self.cols[3].y),
            2 => Vec4::new(self.cols[0].z, self.cols[1].z, self.cols[2].z, self.cols[3].z),
            3 => Vec4::new(self.cols[0].w, self.cols[1].w, self.cols[2].w, self.cols[3].w),
            _ => panic!("Mat4 row index out of range: {index}"),
        }
    }

    /// Creates a translation matrix.
    #[inline]
    pub fn from_translation(v: Vec3) -> Self {
        Self::from_cols(
            Vec4::X,
            Vec4::Y,
            Vec4::Z,
            Vec4::new(v.x, v.y, v.z, 1.0),
        )
    }

    /// Creates a matrix for a rotation around the X-axis.
    #[inline]
    pub fn from_rotation_x(angle: f32) -> Self {
        let c = angle.cos();
        let s = angle.sin();
        Self::from_cols(
            Vec4::new(1.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, c, s, 0.0),
            Vec4::new(0.0, -s, c, 0.0),
            Vec4::W,
        )
    }

    /// Creates a matrix for a right-handed rotation around the Y-axis.
    #[inline]
    pub fn from_rotation_y(angle: f32) -> Self {
        let c = angle.cos();
        let s = angle.sin();
        Self::from_cols(
            Vec4::new(c, 0.0, -s, 0.0),
            Vec4::new(0.0, 1.0, 0.0, 0.0),
            Vec4::new(s, 0.0, c, 0.0),
            Vec4::W,
        )
    }

    /// Creates a matrix for a rotation around the Z-axis.
    #[inline]
    pub fn from_rotation_z(angle: f32) -> Self {
        let c = angle.cos();
        let s = angle.sin();
        Self::from_cols(
            Vec4::new(c, s, 0.0, 0.0),
            Vec4::new(-s, c, 0.0, 0.0),
            Vec4::Z,
            Vec4::W,
        )
    }

    /// Builds a rigid transform from a rotation and a translation.
    #[inline]
    pub fn from_rotation_translation(rotation: Mat3, translation: Vec3) -> Self {
        Self::from_cols(
            Vec4::from_vec3(rotation.cols[0], 0.0),
            Vec4::from_vec3(rotation.cols[1], 0.0),
            Vec4::from_vec3(rotation.cols[2], 0.0),
            Vec4::from_vec3(translation, 1.0),
        )
    }

    /// Creates a right-handed perspective projection matrix with a [0, 1]
    /// depth range (ZO).
    ///
    /// # Arguments
    ///
    /// * `fov_y_radians`: Vertical field of view in radians.
    /// * `aspect_ratio`: Width divided by height of the viewport.
    /// * `z_near`: Distance to the near clipping plane (must be positive).
    /// * `z_far`: Distance to the far clipping plane (must be positive and > `z_near`).
    #[inline]
    pub fn perspective_rh_zo(
        fov_y_radians: f32,
        aspect_ratio: f32,
        z_near: f32,
        z_far: f32,
    ) -> Self {
        assert!(z_near > 0.0 && z_far > z_near);
        let f = 1.0 / (fov_y_radians / 2.0).tan();
        let aa = f / aspect_ratio;
        let cc = z_far / (z_near - z_far);
        let dd = (z_near * z_far) / (z_near - z_far);

        Self::from_cols(
            Vec4::new(aa, 0.0, 0.0, 0.0),
            Vec4::new(0.0, f, 0.0, 0.0),
            Vec4::new(0.0, 0.0, cc, -1.0),
            Vec4::new(0.0, 0.0, dd, 0.0),
        )
    }

    /// Extracts the perspective unprojection parameters from a projection
    /// matrix built with [`Mat4::perspective_rh_zo`].
    ///
    /// Given a view-space depth `z` and NDC coordinates, the view-space
    /// position is `(ndc.x * p.x, ndc.y * p.y, 1, 0) * z`. The `z`/`w`
    /// components reconstruct view depth from NDC depth.
    #[inline]
    pub fn perspective_unprojection_params(&self) -> Vec4 {
        Vec4::new(
            -1.0 / self.cols[0].x,
            -1.0 / self.cols[1].y,
            -self.cols[3].z,
            self.cols[2].z,
        )
    }

    /// Creates a right-handed view matrix for a camera looking from `eye`
    /// towards `target`.
    ///
    /// # Returns
    ///
    /// Returns `Some(Mat4)` if a valid view matrix can be constructed, or
    /// `None` if `eye` and `target` are too close, or if `up` is parallel
    /// to the view direction.
    #[inline]
    pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Option<Self> {
        let forward = target - eye;
        if forward.length_squared() < super::EPSILON * super::EPSILON {
            return None;
        }
        let f = forward.normalize();
        let s = f.cross(up);
        if s.length_squared() < super::EPSILON * super::EPSILON {
            return None;
        }
        let s = s.normalize();
        let u = s.cross(f);

        Some(Self::from_cols(
            Vec4::new(s.x, u.x, -f.x, 0.0),
            Vec4::new(s.y, u.y, -f.y, 0.0),
            Vec4::new(s.z, u.z, -f.z, 0.0),
            Vec4::new(-eye.dot(s), -eye.dot(u), eye.dot(f), 1.0),
        ))
    }

    /// Computes the inverse of an affine transformation matrix (rotation,
    /// translation, scale only).
    ///
    /// # Returns
    ///
    /// `None` if the matrix is not invertible.
    pub fn affine_inverse(&self) -> Option<Self> {
        let c0 = self.cols[0].truncate();
        let c1 = self.cols[1].truncate();
        let c2 = self.cols[2].truncate();
        let translation = self.cols[3].truncate();
        let det = c0.x * (c1.y * c2.z - c2.y * c1.z) - c1.x * (c0.y * c2.z - c2.y * c0.z)
            + c2.x * (c0.y * c1.z - c1.y * c0.z);

        if det.abs() < super::EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let inv00 = (c1.y * c2.z - c2.y * c1.z) * inv_det;
        let inv10 = -(c2.y * c0.z - c0.y * c2.z) * inv_det;
        let inv20 = (c0.y * c1.z - c1.y * c0.z) * inv_det;
        let inv01 = -(c2.x * c1.z - c1.x * c2.z) * inv_det;
        let inv11 = (c0.x * c2.z - c2.x * c0.z) * inv_det;
        let inv21 = -(c1.x * c0.z - c0.x * c1.z) * inv_det;
        let inv02 = (c1.x * c2.y - c2.x * c1.y) * inv_det;
        let inv12 = -(c2.x * c0.y - c0.x * c2.y) * inv_det;
        let inv22 = (c0.x * c1.y - c1.x * c0.y) * inv_det;
        let inv_tx = -(inv00 * translation.x + inv01 * translation.y + inv02 * translation.z);
        let inv_ty = -(inv10 * translation.x + inv11 * translation.y + inv12 * translation.z);
        let inv_tz = -(inv20 * translation.x + inv21 * translation.y + inv22 * translation.z);

        Some(Self::from_cols(
            Vec4::new(inv00, inv10, inv20, 0.0),
            Vec4::new(inv01, inv11, inv21, 0.0),
            Vec4::new(inv02, inv12, inv22, 0.0),
            Vec4::new(inv_tx, inv_ty, inv_tz, 1.0),
        ))
    }
}

impl Default for Mat4 {
    /// Returns the 4x4 identity matrix.
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Mat4> for Mat4 {
    type Output = Self;
    /// Multiplies this matrix by another `Mat4`. Note that matrix
    /// multiplication is not commutative.
    #[inline]
    fn mul(self, rhs: Mat4) -> Self::Output {
        Self::from_cols(
            self * rhs.cols[0],
            self * rhs.cols[1],
            self * rhs.cols[2],
            self * rhs.cols[3],
        )
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    /// Transforms a `Vec4` by this matrix.
    #[inline]
    fn mul(self, rhs: Vec4) -> Self::Output {
        self.cols[0] * rhs.x + self.cols[1] * rhs.y + self.cols[2] * rhs.z + self.cols[3] * rhs.w
    }
}

// --- Tests ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{approx_eq, FRAC_PI_2, PI};

    fn vec4_approx_eq(a: Vec4, b: Vec4) -> bool {
        approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z) && approx_eq(a.w, b.w)
    }

    #[test]
    fn test_mat4_identity_mul() {
        let v = Vec4::new(1.0, 2.0, 3.0, 1.0);
        assert_eq!(Mat4::IDENTITY * v, v);

        let t = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(Mat4::IDENTITY * t, t);
    }

    #[test]
    fn test_mat4_translation() {
        let m = Mat4::from_translation(Vec3::new(10.0, -5.0, 2.0));
        let p = m * Vec4::new(1.0, 1.0, 1.0, 1.0);
        assert!(vec4_approx_eq(p, Vec4::new(11.0, -4.0, 3.0, 1.0)));

        // Directions (w = 0) are unaffected by translation.
        let d = m * Vec4::new(1.0, 0.0, 0.0, 0.0);
        assert!(vec4_approx_eq(d, Vec4::new(1.0, 0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_mat4_rotation_y() {
        let m = Mat4::from_rotation_y(FRAC_PI_2);
        let p = m * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert!(vec4_approx_eq(p, Vec4::new(0.0, 0.0, -1.0, 1.0)));
    }

    #[test]
    fn test_mat3_rotation_roundtrip() {
        let r = Mat3::from_rotation_z(PI / 3.0);
        let v = Vec3::new(1.0, 2.0, 3.0);
        let back = r.transpose() * (r * v);
        assert!(approx_eq(back.x, v.x) && approx_eq(back.y, v.y) && approx_eq(back.z, v.z));
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, 1.0, 100.0);

        // A view-space point on the near plane maps to NDC depth 0.
        let near_clip = proj * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert!(approx_eq(near_clip.z / near_clip.w, 0.0));

        // A view-space point on the far plane maps to NDC depth 1.
        let far_clip = proj * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert!(approx_eq(far_clip.z / far_clip.w, 1.0));
    }

    #[test]
    fn test_unprojection_roundtrip() {
        let proj = Mat4::perspective_rh_zo(FRAC_PI_2, 16.0 / 9.0, 0.5, 50.0);
        let params = proj.perspective_unprojection_params();

        let view_point = Vec4::new(2.0, -1.0, -10.0, 1.0);
        let clip = proj * view_point;
        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;

        let unprojected =
            Vec4::new(ndc_x * params.x, ndc_y * params.y, 1.0, 0.0) * view_point.z;
        approx::assert_abs_diff_eq!(unprojected.x, view_point.x, epsilon = 1e-4);
        approx::assert_abs_diff_eq!(unprojected.y, view_point.y, epsilon = 1e-4);
        approx::assert_abs_diff_eq!(unprojected.z, view_point.z, epsilon = 1e-4);
    }

    #[test]
    fn test_look_at_rh() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y).unwrap();
        // The target is straight ahead, 5 units down -Z in view space.
        let p = view * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(vec4_approx_eq(p, Vec4::new(0.0, 0.0, -5.0, 1.0)));

        // Degenerate inputs are rejected.
        assert!(Mat4::look_at_rh(Vec3::ZERO, Vec3::ZERO, Vec3::Y).is_none());
    }

    #[test]
    fn test_affine_inverse_roundtrip() {
        let m = Mat4::from_translation(Vec3::new(3.0, -2.0, 7.0)) * Mat4::from_rotation_y(0.7);
        let inv = m.affine_inverse().unwrap();
        let p = Vec4::new(1.0, 2.0, 3.0, 1.0);
        assert!(vec4_approx_eq(m * (inv * p), p));
    }
}
