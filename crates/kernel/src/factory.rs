use crate::world::{PrimitiveSpec, World};
use glam::{Vec3, Vec4};
use std::collections::BTreeMap;
use vantage_common::{ObjectId, PrimitiveShape, Transform};

/// Constructs a fully-assembled actor in `world` and returns its id.
pub type ActorFactory = fn(&mut World) -> ObjectId;

/// Type tags recognized by a default world.
pub const BUILTIN_TAGS: [&str; 6] = ["Actor", "Cube", "Sphere", "Cylinder", "Cone", "Arrow"];

/// Open registration table from persisted type tag to factory.
#[derive(Debug, Clone, Default)]
pub struct FactoryRegistry {
    factories: BTreeMap<String, ActorFactory>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("Actor", spawn_empty);
        registry.register("Cube", spawn_cube);
        registry.register("Sphere", spawn_sphere);
        registry.register("Cylinder", spawn_cylinder);
        registry.register("Cone", spawn_cone);
        registry.register("Arrow", spawn_arrow);
        registry
    }

    /// Register `factory` under `tag`, returning any factory it replaces.
    pub fn register(&mut self, tag: impl Into<String>, factory: ActorFactory) -> Option<ActorFactory> {
        self.factories.insert(tag.into(), factory)
    }

    pub fn get(&self, tag: &str) -> Option<ActorFactory> {
        self.factories.get(tag).copied()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

fn spawn_empty(world: &mut World) -> ObjectId {
    world.spawn_actor("Actor", Transform::default())
}

fn spawn_shape(world: &mut World, tag: &str, shape: PrimitiveShape) -> ObjectId {
    let id = world.spawn_actor(tag, Transform::default());
    world.add_primitive(id, PrimitiveSpec::new(shape));
    id
}

fn spawn_cube(world: &mut World) -> ObjectId {
    spawn_shape(world, "Cube", PrimitiveShape::Cube)
}

fn spawn_sphere(world: &mut World) -> ObjectId {
    spawn_shape(world, "Sphere", PrimitiveShape::Sphere)
}

fn spawn_cylinder(world: &mut World) -> ObjectId {
    spawn_shape(world, "Cylinder", PrimitiveShape::Cylinder)
}

fn spawn_cone(world: &mut World) -> ObjectId {
    spawn_shape(world, "Cone", PrimitiveShape::Cone)
}

/// Cylinder shaft along +Y with a cone head. The shaft comes first, so ray
/// casting tests it.
fn spawn_arrow(world: &mut World) -> ObjectId {
    let id = world.spawn_actor("Arrow", Transform::default());
    let color = Vec4::new(1.0, 0.8, 0.1, 1.0);
    let shaft = Transform {
        position: Vec3::new(0.0, 0.4, 0.0),
        scale: Vec3::new(0.1, 0.8, 0.1),
        ..Transform::default()
    };
    let head = Transform {
        position: Vec3::new(0.0, 0.95, 0.0),
        scale: Vec3::new(0.25, 0.3, 0.25),
        ..Transform::default()
    };
    world.add_primitive(
        id,
        PrimitiveSpec::new(PrimitiveShape::Cylinder)
            .relative(shaft)
            .color(color),
    );
    world.add_primitive(
        id,
        PrimitiveSpec::new(PrimitiveShape::Cone)
            .relative(head)
            .color(color),
    );
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_cover_every_persisted_tag() {
        let registry = FactoryRegistry::with_builtins();
        for tag in BUILTIN_TAGS {
            assert!(registry.get(tag).is_some(), "{tag}");
        }
        assert!(registry.get("Camera").is_none());
    }

    #[test]
    fn arrow_has_shaft_then_head() {
        let mut world = World::new();
        let id = spawn_arrow(&mut world);
        let shapes: Vec<_> = world
            .actor(id)
            .unwrap()
            .components()
            .primitives()
            .map(|p| p.shape)
            .collect();
        assert_eq!(shapes, vec![PrimitiveShape::Cylinder, PrimitiveShape::Cone]);
    }

    #[test]
    fn custom_factories_can_be_registered() {
        fn spawn_quad(world: &mut World) -> ObjectId {
            spawn_shape(world, "Quad", PrimitiveShape::Quad)
        }
        let mut registry = FactoryRegistry::with_builtins();
        assert!(registry.register("Quad", spawn_quad).is_none());
        assert!(registry.tags().any(|t| t == "Quad"));
    }
}
