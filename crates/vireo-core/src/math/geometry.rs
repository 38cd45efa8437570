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

//! Provides geometric primitive shapes and the intersection predicates
//! used for spatial binning and culling.
//!
//! All predicates are conservative overlap tests: shapes that only touch
//! at a boundary count as intersecting.

use super::matrix::Mat3;
use super::vector::{Vec3, Vec4};
use super::EPSILON;

// --- Aabb ---

/// Represents an Axis-Aligned Bounding Box (AABB).
///
/// An AABB is a rectangular prism aligned with the coordinate axes, defined
/// by its minimum and maximum corner points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Aabb {
    /// The corner of the box with the smallest coordinates on all axes.
    pub min: Vec3,
    /// The corner of the box with the largest coordinates on all axes.
    pub max: Vec3,
}

impl Aabb {
    /// An invalid `Aabb` where `min` components are positive infinity and
    /// `max` are negative infinity.
    ///
    /// This is a neutral starting point for merging operations.
    pub const INVALID: Self = Self {
        min: Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
        max: Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    /// Creates a new `Aabb` from two corner points.
    ///
    /// The `min` field receives the component-wise minimum and `max` the
    /// component-wise maximum, regardless of argument order.
    #[inline]
    pub fn from_min_max(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min_components(b),
            max: a.max_components(b),
        }
    }

    /// Creates an `Aabb` that tightly encloses a set of points.
    ///
    /// Returns `None` if the input slice is empty.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        let mut aabb = Self {
            min: first,
            max: first,
        };
        for point in points.iter().skip(1) {
            aabb.min = aabb.min.min_components(*point);
            aabb.max = aabb.max.max_components(*point);
        }
        Some(aabb)
    }

    /// Calculates the center point of the `Aabb`.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Calculates the half-extents (half the size on each axis) of the `Aabb`.
    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Checks if the `Aabb` is valid (i.e., `min <= max` on all axes).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Checks if this `Aabb` intersects with another `Aabb`.
    ///
    /// Two `Aabb`s intersect if they overlap on all three axes. Boxes that
    /// only touch at the boundary are considered to be intersecting.
    #[inline]
    pub fn intersects_aabb(&self, other: &Aabb) -> bool {
        (self.min.x <= other.max.x && self.max.x >= other.min.x)
            && (self.min.y <= other.max.y && self.max.y >= other.min.y)
            && (self.min.z <= other.max.z && self.max.z >= other.min.z)
    }
}

impl Default for Aabb {
    /// Returns the default `Aabb`, which is `Aabb::INVALID`.
    #[inline]
    fn default() -> Self {
        Self::INVALID
    }
}

// --- Sphere ---

/// A bounding sphere defined by a center point and a radius.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Sphere {
    /// The center of the sphere in the shape's space.
    pub center: Vec3,
    /// The radius of the sphere. Must be non-negative.
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere from a center and a radius.
    #[inline]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Checks if this sphere intersects an `Aabb`.
    ///
    /// Clamps the sphere center to the box to find the closest point, then
    /// compares the squared distance against the squared radius.
    #[inline]
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let closest = self
            .center
            .max_components(aabb.min)
            .min_components(aabb.max);
        (self.center - closest).length_squared() <= self.radius * self.radius
    }
}

// --- Obb ---

/// An oriented bounding box defined by a center, a rotation, and half-extents.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Obb {
    /// The center of the box in world space.
    pub center: Vec3,
    /// The orientation of the box. Columns are the local axes in world space.
    pub rotation: Mat3,
    /// Half the size of the box along each local axis.
    pub half_extents: Vec3,
}

impl Obb {
    /// Creates a new oriented box.
    #[inline]
    pub fn new(center: Vec3, rotation: Mat3, half_extents: Vec3) -> Self {
        Self {
            center,
            rotation,
            half_extents,
        }
    }

    /// Checks if this oriented box intersects an `Aabb` using the
    /// separating-axis test.
    ///
    /// Fifteen candidate axes are tested: the three world axes, the three
    /// box axes, and their nine cross products. A small epsilon is folded
    /// into the projected radii so near-parallel edge pairs do not produce
    /// a spurious separating axis.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let a_extents = aabb.half_extents();
        let a_e = [a_extents.x, a_extents.y, a_extents.z];
        let b_e = [self.half_extents.x, self.half_extents.y, self.half_extents.z];

        // r[i][j] projects the j-th box axis onto the i-th world axis.
        let b0 = self.rotation.col(0);
        let b1 = self.rotation.col(1);
        let b2 = self.rotation.col(2);
        let r = [
            [b0.x, b1.x, b2.x],
            [b0.y, b1.y, b2.y],
            [b0.z, b1.z, b2.z],
        ];
        let mut abs_r = [[0.0f32; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                abs_r[i][j] = r[i][j].abs() + EPSILON;
            }
        }

        let t_vec = self.center - aabb.center();
        let t = [t_vec.x, t_vec.y, t_vec.z];

        // World axes.
        for i in 0..3 {
            let rb = b_e[0] * abs_r[i][0] + b_e[1] * abs_r[i][1] + b_e[2] * abs_r[i][2];
            if t[i].abs() > a_e[i] + rb {
                return false;
            }
        }

        // Box axes.
        for j in 0..3 {
            let ra = a_e[0] * abs_r[0][j] + a_e[1] * abs_r[1][j] + a_e[2] * abs_r[2][j];
            let t_proj = t[0] * r[0][j] + t[1] * r[1][j] + t[2] * r[2][j];
            if t_proj.abs() > ra + b_e[j] {
                return false;
            }
        }

        // Cross products of world axis i and box axis j.
        for i in 0..3 {
            let i1 = (i + 1) % 3;
            let i2 = (i + 2) % 3;
            for j in 0..3 {
                let j1 = (j + 1) % 3;
                let j2 = (j + 2) % 3;
                let ra = a_e[i1] * abs_r[i2][j] + a_e[i2] * abs_r[i1][j];
                let rb = b_e[j1] * abs_r[i][j2] + b_e[j2] * abs_r[i][j1];
                let t_proj = t[i2] * r[i1][j] - t[i1] * r[i2][j];
                if t_proj.abs() > ra + rb {
                    return false;
                }
            }
        }

        true
    }
}

// --- Cone ---

/// A finite cone defined by an apex, a direction, a length, and a half-angle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Cone {
    /// The apex of the cone.
    pub origin: Vec3,
    /// The direction the cone opens towards. Must be a unit vector.
    pub direction: Vec3,
    /// The distance from the apex to the cap plane.
    pub length: f32,
    /// Half the apex aperture, in radians.
    pub half_angle: f32,
}

impl Cone {
    /// Creates a new cone. `direction` must be normalized.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3, length: f32, half_angle: f32) -> Self {
        Self {
            origin,
            direction,
            length,
            half_angle,
        }
    }

    /// Checks if this cone intersects a sphere.
    ///
    /// Uses the closest-point-on-cone-axis formulation: with `V` the vector
    /// from the apex to the sphere center and `v1 = V·dir`,
    /// `distanceClosest = cos(halfAngle)·sqrt(|V|² − v1²) − v1·sin(halfAngle)`
    /// is the distance from the sphere center to the cone surface. The
    /// sphere is rejected if that distance exceeds the radius, or if its
    /// center projects outside `[-radius, length + radius]` along the axis.
    ///
    /// A sphere centered on the cap plane exactly `length` along the axis is
    /// accepted.
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        let v = sphere.center - self.origin;
        let v_len_sq = v.dot(v);
        let v1 = v.dot(self.direction);
        // The clamp guards against a tiny negative radicand when the center
        // sits numerically on the axis.
        let axis_dist_sq = (v_len_sq - v1 * v1).max(0.0);
        let distance_closest =
            self.half_angle.cos() * axis_dist_sq.sqrt() - v1 * self.half_angle.sin();

        let angle_cull = distance_closest > sphere.radius;
        let front_cull = v1 > sphere.radius + self.length;
        let back_cull = v1 < -sphere.radius;
        !(angle_cull || front_cull || back_cull)
    }
}

// --- Plane ---

/// An infinite plane in `n·p = offset` form, with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Plane {
    /// The unit normal of the plane.
    pub normal: Vec3,
    /// The signed distance of the plane from the origin along the normal.
    pub offset: f32,
}

impl Plane {
    /// Creates a plane from a unit normal and an offset.
    #[inline]
    pub fn new(normal: Vec3, offset: f32) -> Self {
        Self { normal, offset }
    }

    /// Creates a plane from homogeneous clip-space coefficients
    /// `(a, b, c, d)` of the half-space `a·x + b·y + c·z + d ≥ 0`.
    ///
    /// Used to extract frustum planes from a view-projection matrix row
    /// (Gribb–Hartmann). The resulting normal points into the half-space.
    #[inline]
    pub fn from_clip_row(row: Vec4) -> Self {
        let normal = row.truncate();
        let inv_len = 1.0 / normal.length();
        Self {
            normal: normal * inv_len,
            offset: -row.w * inv_len,
        }
    }

    /// Returns the signed distance of a point from the plane.
    #[inline]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }
}

// --- Tests ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{approx_eq, FRAC_PI_4};

    #[test]
    fn test_aabb_from_min_max_sorts() {
        let aabb = Aabb::from_min_max(Vec3::new(4.0, 5.0, 6.0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.min, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.max, Vec3::new(4.0, 5.0, 6.0));
        assert!(aabb.is_valid());
        assert!(!Aabb::INVALID.is_valid());
    }

    #[test]
    fn test_aabb_from_points() {
        assert!(Aabb::from_points(&[]).is_none());

        let points = [
            Vec3::new(1.0, 5.0, -1.0),
            Vec3::new(0.0, 2.0, 3.0),
            Vec3::new(4.0, 8.0, 0.0),
        ];
        let aabb = Aabb::from_points(&points).unwrap();
        assert_eq!(aabb.min, Vec3::new(0.0, 2.0, -1.0));
        assert_eq!(aabb.max, Vec3::new(4.0, 8.0, 3.0));
    }

    #[test]
    fn test_aabb_intersects_aabb() {
        let a = Aabb::from_min_max(Vec3::ZERO, Vec3::splat(2.0));

        // Overlapping, touching, contained.
        assert!(a.intersects_aabb(&Aabb::from_min_max(Vec3::splat(1.0), Vec3::splat(3.0))));
        assert!(a.intersects_aabb(&Aabb::from_min_max(
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(3.0, 2.0, 2.0)
        )));
        assert!(a.intersects_aabb(&Aabb::from_min_max(Vec3::splat(0.5), Vec3::splat(1.5))));

        // Separated on each axis.
        assert!(!a.intersects_aabb(&Aabb::from_min_max(
            Vec3::new(2.1, 0.0, 0.0),
            Vec3::new(3.0, 2.0, 2.0)
        )));
        assert!(!a.intersects_aabb(&Aabb::from_min_max(
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(2.0, -0.1, 2.0)
        )));
    }

    #[test]
    fn test_sphere_intersects_aabb() {
        let aabb = Aabb::from_min_max(Vec3::ZERO, Vec3::splat(2.0));

        // Center inside.
        assert!(Sphere::new(Vec3::splat(1.0), 0.1).intersects_aabb(&aabb));
        // Touching a face.
        assert!(Sphere::new(Vec3::new(3.0, 1.0, 1.0), 1.0).intersects_aabb(&aabb));
        // Just past a face.
        assert!(!Sphere::new(Vec3::new(3.1, 1.0, 1.0), 1.0).intersects_aabb(&aabb));
        // Near a corner the diagonal distance is what matters.
        assert!(!Sphere::new(Vec3::new(3.0, 3.0, 3.0), 1.0).intersects_aabb(&aabb));
        assert!(Sphere::new(Vec3::new(3.0, 3.0, 3.0), 2.0).intersects_aabb(&aabb));
    }

    #[test]
    fn test_sphere_aabb_translation_invariance() {
        let sphere = Sphere::new(Vec3::new(3.0, 1.0, -2.0), 1.5);
        let aabb = Aabb::from_min_max(Vec3::new(1.0, 0.0, -3.0), Vec3::new(2.0, 2.0, -1.0));
        let expected = sphere.intersects_aabb(&aabb);

        for offset in [
            Vec3::new(10.0, -20.0, 5.0),
            Vec3::new(-1000.0, 0.0, 0.25),
            Vec3::splat(0.125),
        ] {
            let moved_sphere = Sphere::new(sphere.center + offset, sphere.radius);
            let moved_aabb = Aabb::from_min_max(aabb.min + offset, aabb.max + offset);
            assert_eq!(moved_sphere.intersects_aabb(&moved_aabb), expected);
        }
    }

    #[test]
    fn test_obb_intersects_aabb_axis_aligned() {
        let aabb = Aabb::from_min_max(Vec3::ZERO, Vec3::splat(2.0));

        let inside = Obb::new(Vec3::splat(1.0), Mat3::IDENTITY, Vec3::splat(0.5));
        assert!(inside.intersects_aabb(&aabb));

        let apart = Obb::new(Vec3::new(4.0, 1.0, 1.0), Mat3::IDENTITY, Vec3::splat(0.5));
        assert!(!apart.intersects_aabb(&aabb));
    }

    #[test]
    fn test_obb_intersects_aabb_rotated() {
        let aabb = Aabb::from_min_max(Vec3::splat(-1.0), Vec3::splat(1.0));

        // A thin slab rotated 45 degrees around Z, sitting diagonally next
        // to the box corner: its unrotated AABB would overlap, the SAT must
        // still separate it.
        let rot = Mat3::from_rotation_z(FRAC_PI_4);
        let slab = Obb::new(Vec3::new(2.2, 2.2, 0.0), rot, Vec3::new(2.0, 0.2, 1.0));
        assert!(!slab.intersects_aabb(&aabb));

        // Moved down the diagonal it clips the corner.
        let slab = Obb::new(Vec3::new(1.5, 1.5, 0.0), rot, Vec3::new(2.0, 0.8, 1.0));
        assert!(slab.intersects_aabb(&aabb));
    }

    #[test]
    fn test_cone_sphere_far_cap_boundary() {
        let length = 10.0;
        let radius = 2.0;
        let cone = Cone::new(Vec3::ZERO, Vec3::X, length, 0.5);

        // Center exactly on the far cap along the axis: accepted.
        let on_cap = Sphere::new(Vec3::new(length, 0.0, 0.0), radius);
        assert!(cone.intersects_sphere(&on_cap));

        // Still touching while within `length + radius` along the axis.
        let touching = Sphere::new(Vec3::new(length + radius, 0.0, 0.0), radius);
        assert!(cone.intersects_sphere(&touching));

        // Just past `length + radius`: rejected.
        let past = Sphere::new(Vec3::new(length + radius + 1e-3, 0.0, 0.0), radius);
        assert!(!cone.intersects_sphere(&past));
    }

    #[test]
    fn test_cone_sphere_angle_and_back_cull() {
        let cone = Cone::new(Vec3::ZERO, Vec3::X, 10.0, FRAC_PI_4);

        // Far off-axis: outside the cone surface by more than the radius.
        let off_axis = Sphere::new(Vec3::new(1.0, 8.0, 0.0), 1.0);
        assert!(!cone.intersects_sphere(&off_axis));

        // Slightly off-axis within the aperture.
        let near_axis = Sphere::new(Vec3::new(5.0, 2.0, 0.0), 0.5);
        assert!(cone.intersects_sphere(&near_axis));

        // Behind the apex beyond the radius.
        let behind = Sphere::new(Vec3::new(-2.0, 0.0, 0.0), 1.0);
        assert!(!cone.intersects_sphere(&behind));

        // Behind the apex but overlapping it.
        let overlapping_apex = Sphere::new(Vec3::new(-0.5, 0.0, 0.0), 1.0);
        assert!(cone.intersects_sphere(&overlapping_apex));
    }

    #[test]
    fn test_plane_from_clip_row() {
        // The half-space 2y - 4 >= 0 is the region above y = 2.
        let plane = Plane::from_clip_row(Vec4::new(0.0, 2.0, 0.0, -4.0));
        assert!(approx_eq(plane.normal.y, 1.0));
        assert!(approx_eq(plane.offset, 2.0));
        assert!(plane.distance_to_point(Vec3::new(0.0, 5.0, 0.0)) > 0.0);
        assert!(plane.distance_to_point(Vec3::new(0.0, 1.0, 0.0)) < 0.0);
        assert!(approx_eq(plane.distance_to_point(Vec3::new(7.0, 2.0, -3.0)), 0.0));
    }
}
