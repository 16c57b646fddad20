//! Component model for actors.
//!
//! An actor holds a [`ComponentSet`]: components grouped by kind, kept in a
//! `BTreeMap` so iteration is deterministic. Rendering behavior is expressed
//! through the [`RenderComponent`] capability rather than a class hierarchy.
//!
//! # Invariants
//! - A component id appears at most once in a set.
//! - Iteration order is kind order, then insertion order within a kind.

use glam::{Mat4, Vec4};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vantage_common::{ObjectId, PrimitiveShape, Transform};
use vantage_render::picking::encode_id;
use vantage_render::{CameraParams, GpuDevice, PrimitiveDraw, Renderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    Primitive,
    Camera,
}

/// Capability of components that can be drawn and picked.
pub trait RenderComponent {
    fn id(&self) -> ObjectId;

    /// Draw with the owner's world matrix applied.
    fn render<D: GpuDevice>(&self, renderer: &mut Renderer<D>, owner: Mat4);

    /// Upload this component's identifier color for the picking pass.
    fn update_constant_picking<D: GpuDevice>(&self, renderer: &mut Renderer<D>) {
        renderer.update_constant_picking(encode_id(self.id()));
    }
}

/// A primitive mesh drawn relative to its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveComponent {
    pub id: ObjectId,
    pub shape: PrimitiveShape,
    pub color: Vec4,
    pub use_vertex_color: bool,
    /// Offset from the owning actor's transform.
    pub relative: Transform,
}

impl PrimitiveComponent {
    pub fn new(id: ObjectId, shape: PrimitiveShape) -> Self {
        Self {
            id,
            shape,
            color: Vec4::ONE,
            use_vertex_color: true,
            relative: Transform::default(),
        }
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self.use_vertex_color = false;
        self
    }

    pub fn with_relative(mut self, relative: Transform) -> Self {
        self.relative = relative;
        self
    }

    /// Component-to-world matrix for an owner at `owner`.
    pub fn world_matrix(&self, owner: Mat4) -> Mat4 {
        owner * self.relative.matrix()
    }
}

impl RenderComponent for PrimitiveComponent {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn render<D: GpuDevice>(&self, renderer: &mut Renderer<D>, owner: Mat4) {
        let draw = PrimitiveDraw {
            shape: self.shape,
            color: self.color,
            use_vertex_color: self.use_vertex_color,
        };
        renderer.render_primitive(&draw, self.world_matrix(owner));
    }
}

/// Projection parameters attached to a camera actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraComponent {
    pub id: ObjectId,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraComponent {
    pub fn new(id: ObjectId) -> Self {
        let defaults = CameraParams::default();
        Self {
            id,
            fov_degrees: defaults.fov_degrees,
            near: defaults.near,
            far: defaults.far,
        }
    }

    pub fn params(&self) -> CameraParams {
        CameraParams {
            fov_degrees: self.fov_degrees,
            near: self.near,
            far: self.far,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Primitive(PrimitiveComponent),
    Camera(CameraComponent),
}

impl Component {
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Primitive(p) => p.id,
            Self::Camera(c) => c.id,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Primitive(_) => ComponentKind::Primitive,
            Self::Camera(_) => ComponentKind::Camera,
        }
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveComponent> {
        match self {
            Self::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_camera(&self) -> Option<&CameraComponent> {
        match self {
            Self::Camera(c) => Some(c),
            _ => None,
        }
    }
}

impl From<PrimitiveComponent> for Component {
    fn from(value: PrimitiveComponent) -> Self {
        Self::Primitive(value)
    }
}

impl From<CameraComponent> for Component {
    fn from(value: CameraComponent) -> Self {
        Self::Camera(value)
    }
}

/// Components owned by one actor, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentSet {
    by_kind: BTreeMap<ComponentKind, Vec<Component>>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component. Returns `false` if its id is already present.
    pub fn insert(&mut self, component: impl Into<Component>) -> bool {
        let component = component.into();
        if self.get(component.id()).is_some() {
            return false;
        }
        self.by_kind
            .entry(component.kind())
            .or_default()
            .push(component);
        true
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<Component> {
        for list in self.by_kind.values_mut() {
            if let Some(index) = list.iter().position(|c| c.id() == id) {
                return Some(list.remove(index));
            }
        }
        None
    }

    pub fn get(&self, id: ObjectId) -> Option<&Component> {
        self.iter().find(|c| c.id() == id)
    }

    pub fn of_kind(&self, kind: ComponentKind) -> &[Component] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.by_kind.values().flatten()
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.iter().map(Component::id).collect()
    }

    pub fn primitives(&self) -> impl Iterator<Item = &PrimitiveComponent> {
        self.of_kind(ComponentKind::Primitive)
            .iter()
            .filter_map(Component::as_primitive)
    }

    pub fn primitive(&self, id: ObjectId) -> Option<&PrimitiveComponent> {
        self.get(id).and_then(Component::as_primitive)
    }

    pub fn first_primitive(&self) -> Option<&PrimitiveComponent> {
        self.primitives().next()
    }

    pub fn camera(&self) -> Option<&CameraComponent> {
        self.of_kind(ComponentKind::Camera)
            .iter()
            .find_map(Component::as_camera)
    }

    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use vantage_render::RecordingDevice;

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut set = ComponentSet::new();
        assert!(set.insert(PrimitiveComponent::new(ObjectId(3), PrimitiveShape::Cube)));
        assert!(!set.insert(CameraComponent::new(ObjectId(3))));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn iteration_groups_by_kind_in_insertion_order() {
        let mut set = ComponentSet::new();
        set.insert(CameraComponent::new(ObjectId(1)));
        set.insert(PrimitiveComponent::new(ObjectId(5), PrimitiveShape::Cone));
        set.insert(PrimitiveComponent::new(ObjectId(2), PrimitiveShape::Cylinder));
        assert_eq!(set.ids(), vec![ObjectId(5), ObjectId(2), ObjectId(1)]);
        assert_eq!(set.first_primitive().map(|p| p.shape), Some(PrimitiveShape::Cone));
        assert_eq!(set.camera().map(|c| c.id), Some(ObjectId(1)));
    }

    #[test]
    fn remove_returns_the_component() {
        let mut set = ComponentSet::new();
        set.insert(PrimitiveComponent::new(ObjectId(4), PrimitiveShape::Sphere));
        let removed = set.remove(ObjectId(4)).unwrap();
        assert_eq!(removed.kind(), ComponentKind::Primitive);
        assert!(set.is_empty());
        assert!(set.remove(ObjectId(4)).is_none());
    }

    #[test]
    fn relative_transform_composes_with_owner() {
        let p = PrimitiveComponent::new(ObjectId(1), PrimitiveShape::Cone)
            .with_relative(Transform::from_position(Vec3::new(0.0, 1.0, 0.0)));
        let owner = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
        let origin = p.world_matrix(owner).transform_point3(Vec3::ZERO);
        assert_eq!(origin, Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn picking_update_writes_encoded_id() {
        let mut renderer = Renderer::new(RecordingDevice::new(16, 16));
        let p = PrimitiveComponent::new(ObjectId(0x0102), PrimitiveShape::Cube);
        renderer.prepare_picking();
        renderer.prepare_picking_shader();
        p.update_constant_picking(&mut renderer);
        p.render(&mut renderer, Mat4::IDENTITY);
        let draw = renderer.device().draws().last().unwrap().clone();
        assert_eq!(draw.picking_color, Some([2.0 / 255.0, 1.0 / 255.0, 0.0, 0.0]));
    }

    #[test]
    fn camera_defaults() {
        let c = CameraComponent::new(ObjectId(9));
        assert_eq!((c.fov_degrees, c.near, c.far), (45.0, 1.0, 100.0));
    }
}
