use glam::{Mat4, Vec2, Vec3};
use vantage_common::PrimitiveShape;

const PARALLEL_EPSILON: f32 = 1e-8;

/// Half extent of every unit primitive.
pub const UNIT_HALF_EXTENT: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Not necessarily unit length once transformed into a local space.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// World-space ray through a cursor at `ndc`, from the near plane toward
    /// the far plane. `None` when the matrices are degenerate.
    pub fn from_ndc(view: Mat4, projection: Mat4, ndc: Vec2) -> Option<Self> {
        let inverse = invert(projection * view)?;
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        let direction = (far - near).try_normalize()?;
        Some(Self::new(near, direction))
    }

    /// Map the ray through an affine transform. The parameter `t` keeps its
    /// meaning: `transformed.at(t)` is the image of `self.at(t)`.
    pub fn transformed(&self, matrix: Mat4) -> Self {
        Self {
            origin: matrix.transform_point3(self.origin),
            direction: matrix.transform_vector3(self.direction),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Inverse of `matrix`, or `None` when it is singular.
fn invert(matrix: Mat4) -> Option<Mat4> {
    if matrix.determinant() == 0.0 {
        return None;
    }
    Some(matrix.inverse()).filter(|inverse| inverse.is_finite())
}

/// Slab test. Returns the smallest non-negative `t` at which the ray is
/// inside the box.
pub fn intersect_aabb(ray: &Ray, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    for axis in 0..3 {
        let origin = ray.origin[axis];
        let direction = ray.direction[axis];
        if direction.abs() < PARALLEL_EPSILON {
            if origin < min[axis] || origin > max[axis] {
                return None;
            }
            continue;
        }
        let t1 = (min[axis] - origin) / direction;
        let t2 = (max[axis] - origin) / direction;
        t_near = t_near.max(t1.min(t2));
        t_far = t_far.min(t1.max(t2));
        if t_near > t_far {
            return None;
        }
    }
    if t_far < 0.0 {
        return None;
    }
    Some(t_near.max(0.0))
}

/// Returns the smallest non-negative `t` on the sphere surface, or `0` when
/// the origin is inside.
pub fn intersect_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let offset = ray.origin - center;
    let a = ray.direction.length_squared();
    if a < PARALLEL_EPSILON {
        return None;
    }
    let b = 2.0 * offset.dot(ray.direction);
    let c = offset.length_squared() - radius * radius;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let t0 = (-b - root) / (2.0 * a);
    let t1 = (-b + root) / (2.0 * a);
    if t1 < 0.0 {
        return None;
    }
    Some(t0.max(0.0))
}

/// Hit-test volume used for a primitive shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitVolume {
    /// Axis-aligned unit box in local space.
    Box,
    /// Unit-diameter sphere at the local origin.
    Sphere,
}

impl HitVolume {
    /// Cones, triangles, quads and lines are not hit-tested.
    pub fn for_shape(shape: PrimitiveShape) -> Option<Self> {
        match shape {
            PrimitiveShape::Cube | PrimitiveShape::Cylinder => Some(Self::Box),
            PrimitiveShape::Sphere => Some(Self::Sphere),
            PrimitiveShape::Cone
            | PrimitiveShape::Triangle
            | PrimitiveShape::Quad
            | PrimitiveShape::Line => None,
        }
    }
}

/// Intersect a world-space ray with a primitive placed by `world_matrix`.
/// Returns the world-space distance from the ray origin to the hit point.
pub fn intersect_primitive(ray: &Ray, shape: PrimitiveShape, world_matrix: Mat4) -> Option<f32> {
    let volume = HitVolume::for_shape(shape)?;
    let local = ray.transformed(invert(world_matrix)?);
    let t = match volume {
        HitVolume::Box => intersect_aabb(
            &local,
            Vec3::splat(-UNIT_HALF_EXTENT),
            Vec3::splat(UNIT_HALF_EXTENT),
        ),
        HitVolume::Sphere => intersect_sphere(&local, Vec3::ZERO, UNIT_HALF_EXTENT),
    }?;
    let hit = world_matrix.transform_point3(local.at(t));
    Some((hit - ray.origin).length())
}
