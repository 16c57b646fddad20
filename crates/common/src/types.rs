use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-bit identifier shared by actors, components and worlds.
///
/// The same value is encoded into the picking target, so it must stay
/// representable in four 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Reserved value meaning "no object". Matches the picking clear color.
    pub const NONE: Self = Self(u32::MAX);

    /// Whether this id can name a live object.
    pub fn is_valid(self) -> bool {
        self.0 != 0 && self != Self::NONE
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Build a transform from Euler angles in degrees (XYZ order).
    pub fn from_euler_degrees(position: Vec3, euler_degrees: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::from_euler(
                EulerRot::XYZ,
                euler_degrees.x.to_radians(),
                euler_degrees.y.to_radians(),
                euler_degrees.z.to_radians(),
            ),
            scale,
        }
    }

    /// Rotation as Euler angles in degrees (XYZ order).
    pub fn euler_degrees(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
    }

    /// Local-to-parent matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Unit vector the transform looks along (-Z in local space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }
}

/// Primitive geometry classification used for drawing and hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveShape {
    Line,
    Triangle,
    Quad,
    Cube,
    Sphere,
    Cylinder,
    Cone,
}

impl PrimitiveShape {
    pub const ALL: [Self; 7] = [
        Self::Line,
        Self::Triangle,
        Self::Quad,
        Self::Cube,
        Self::Sphere,
        Self::Cylinder,
        Self::Cone,
    ];
}

/// Viewport dimensions in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height, guarding against a zero height.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_ids_are_invalid() {
        assert!(!ObjectId(0).is_valid());
        assert!(!ObjectId::NONE.is_valid());
        assert!(ObjectId(7).is_valid());
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn euler_degrees_roundtrip() {
        let t = Transform::from_euler_degrees(Vec3::ZERO, Vec3::new(10.0, 20.0, 30.0), Vec3::ONE);
        let back = t.euler_degrees();
        assert!((back - Vec3::new(10.0, 20.0, 30.0)).length() < 1e-3);
    }

    #[test]
    fn default_forward_is_negative_z() {
        assert_eq!(Transform::default().forward(), Vec3::NEG_Z);
    }

    #[test]
    fn aspect_ratio_guards_zero_height() {
        assert_eq!(Viewport::new(800, 0).aspect_ratio(), 800.0);
        assert_eq!(Viewport::new(1600, 800).aspect_ratio(), 2.0);
    }
}
