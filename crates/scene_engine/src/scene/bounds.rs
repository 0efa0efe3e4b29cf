//! Bounding volumes and intersection predicates
//!
//! Provides the bounding primitives used for visibility determination:
//! axis-aligned boxes, bounding spheres, planes, frusta, and rays.

use crate::foundation::math::{Mat4, Point3, Vec3};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given half-extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// The largest representable box.
    pub fn max_bounds() -> Self {
        Self {
            min: Vec3::repeat(f32::MIN),
            max: Vec3::repeat(f32::MAX),
        }
    }

    /// An inverted box that merges as the identity: any merge replaces it.
    pub fn inverted() -> Self {
        Self {
            min: Vec3::repeat(f32::MAX),
            max: Vec3::repeat(f32::MIN),
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Smallest box enclosing both operands.
    pub fn merged(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Surface area of the box. Degenerate boxes report zero or negative area.
    pub fn surface_area(&self) -> f32 {
        let d = self.max - self.min;
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB fully contains another AABB
    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        other.min.x >= self.min.x && other.max.x <= self.max.x &&
        other.min.y >= self.min.y && other.max.y <= self.max.y &&
        other.min.z >= self.min.z && other.max.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// The box enclosing this box carried through a transform.
    pub fn transformed(&self, transform: &Mat4) -> Self {
        let mut result = Self::inverted();
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 != 0 { self.max.x } else { self.min.x },
                if i & 2 != 0 { self.max.y } else { self.min.y },
                if i & 4 != 0 { self.max.z } else { self.min.z },
            );
            let moved = transform.transform_point(&Point3::from(corner));
            result.min = result.min.inf(&moved.coords);
            result.max = result.max.sup(&moved.coords);
        }
        result
    }

    /// Test ray intersection with this AABB using the slab method.
    /// Returns the distance to the entry point if the ray intersects, None otherwise.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inv_dir = Vec3::new(
            if ray.direction.x != 0.0 { 1.0 / ray.direction.x } else { f32::INFINITY },
            if ray.direction.y != 0.0 { 1.0 / ray.direction.y } else { f32::INFINITY },
            if ray.direction.z != 0.0 { 1.0 / ray.direction.z } else { f32::INFINITY },
        );

        let t1 = (self.min.x - ray.origin.x) * inv_dir.x;
        let t2 = (self.max.x - ray.origin.x) * inv_dir.x;
        let t3 = (self.min.y - ray.origin.y) * inv_dir.y;
        let t4 = (self.max.y - ray.origin.y) * inv_dir.y;
        let t5 = (self.min.z - ray.origin.z) * inv_dir.z;
        let t6 = (self.max.z - ray.origin.z) * inv_dir.z;

        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

/// Bounding sphere used for hierarchical scene-graph bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Center of the sphere in world space
    pub center: Vec3,
    /// Radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Create a new bounding sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// The tightest sphere enclosing an AABB.
    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self {
            center: aabb.center(),
            radius: aabb.half_extents().norm(),
        }
    }

    /// Smallest sphere enclosing both operands.
    pub fn merged(&self, other: &BoundingSphere) -> Self {
        let offset = other.center - self.center;
        let distance = offset.norm();

        // One sphere already encloses the other.
        if distance + other.radius <= self.radius {
            return *self;
        }
        if distance + self.radius <= other.radius {
            return *other;
        }

        let radius = (distance + self.radius + other.radius) * 0.5;
        let center = if distance > f32::EPSILON {
            self.center + offset * ((radius - self.radius) / distance)
        } else {
            self.center
        };

        Self { center, radius }
    }

    /// Check whether the sphere overlaps an AABB.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let closest = Vec3::new(
            self.center.x.clamp(aabb.min.x, aabb.max.x),
            self.center.y.clamp(aabb.min.y, aabb.max.y),
            self.center.z.clamp(aabb.min.z, aabb.max.z),
        );
        (closest - self.center).norm_squared() <= self.radius * self.radius
    }
}

/// Result of classifying a volume against a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Entirely on the negative side of the plane
    Behind,
    /// Straddling the plane
    Intersecting,
    /// Entirely on the positive side of the plane
    InFront,
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Normal vector (should be normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal: normal.normalize(), distance }
    }

    /// Create a plane from unnormalized coefficients `(a, b, c, d)`.
    pub fn from_coefficients(a: f32, b: f32, c: f32, d: f32) -> Self {
        let normal = Vec3::new(a, b, c);
        let length = normal.norm();
        if length > f32::EPSILON {
            Self {
                normal: normal / length,
                distance: d / length,
            }
        } else {
            // Degenerate rows produce a plane that rejects nothing.
            Self { normal: Vec3::zeros(), distance: 0.0 }
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }

    /// Classify an AABB against the plane using its positive/negative vertices.
    pub fn classify_aabb(&self, aabb: &Aabb) -> PlaneSide {
        let mut p = aabb.min;
        let mut n = aabb.max;
        if self.normal.x >= 0.0 { p.x = aabb.max.x; n.x = aabb.min.x; }
        if self.normal.y >= 0.0 { p.y = aabb.max.y; n.y = aabb.min.y; }
        if self.normal.z >= 0.0 { p.z = aabb.max.z; n.z = aabb.min.z; }

        if self.distance_to_point(p) < 0.0 {
            PlaneSide::Behind
        } else if self.distance_to_point(n) > 0.0 {
            PlaneSide::InFront
        } else {
            PlaneSide::Intersecting
        }
    }
}

/// Test an AABB against an arbitrary convex set of inward-facing planes.
///
/// Returns false only when the box is provably outside one of the planes;
/// an empty plane set rejects nothing.
pub fn planes_intersect_aabb(planes: &[Plane], aabb: &Aabb) -> bool {
    planes
        .iter()
        .all(|plane| plane.classify_aabb(aabb) != PlaneSide::Behind)
}

/// Frustum for visibility culling
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Index of the left plane
    pub const LEFT: usize = 0;
    /// Index of the right plane
    pub const RIGHT: usize = 1;
    /// Index of the bottom plane
    pub const BOTTOM: usize = 2;
    /// Index of the top plane
    pub const TOP: usize = 3;
    /// Index of the near plane
    pub const NEAR: usize = 4;
    /// Index of the far plane
    pub const FAR: usize = 5;

    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a view-projection matrix.
    ///
    /// This uses the Gribb-Hartmann method. Assumes a [0, 1] clip-space depth
    /// range (Vulkan/D3D convention). Normals face inward.
    pub fn from_matrix(view_projection: &Mat4) -> Self {
        let m = view_projection;
        let row = |i: usize| {
            Vec3::new(m[(i, 0)], m[(i, 1)], m[(i, 2)])
        };
        let w = |i: usize| m[(i, 3)];

        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let (w0, w1, w2, w3) = (w(0), w(1), w(2), w(3));

        let plane = |n: Vec3, d: f32| Plane::from_coefficients(n.x, n.y, n.z, d);

        Self {
            planes: [
                plane(r3 + r0, w3 + w0), // left
                plane(r3 - r0, w3 - w0), // right
                plane(r3 + r1, w3 + w1), // bottom
                plane(r3 - r1, w3 - w1), // top
                plane(r2, w2),           // near ([0, 1] depth)
                plane(r3 - r2, w3 - w2), // far
            ],
        }
    }

    /// The near plane of the frustum.
    pub fn near_plane(&self) -> &Plane {
        &self.planes[Self::NEAR]
    }

    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        planes_intersect_aabb(&self.planes, aabb)
    }
}

/// Ray for picking queries
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin of the ray in world space
    pub origin: Vec3,
    /// Direction of the ray (need not be normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }
}
