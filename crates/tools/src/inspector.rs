use serde::Serialize;
use vantage_common::{ObjectId, PrimitiveShape};
use vantage_kernel::{Actor, World};

/// World inspector for developer tooling.
///
/// Provides read-only queries against the world for debugging and the CLI.
pub struct WorldInspector;

impl WorldInspector {
    pub fn summary(world: &World) -> WorldSummary {
        let gizmo_count = world.actors().filter(|a| a.is_gizmo()).count();
        WorldSummary {
            scene_name: world.scene_name().to_string(),
            version: world.version(),
            actor_count: world.actor_count(),
            gizmo_count,
            pending_spawn: world.pending_spawn_count(),
            pending_destroy: world.pending_destroy_count(),
            render_components: world.render_components().len(),
            z_ignore_components: world.z_ignore_components().len(),
            live_objects: world.registry().len(),
            camera: world.camera(),
            selected: world.billboard().target(),
        }
    }

    pub fn inspect_actor(world: &World, id: ObjectId) -> Option<ActorInfo> {
        world.actor(id).map(ActorInfo::from_actor)
    }

    /// Every actor in the active sequence, in order.
    pub fn list_actors(world: &World) -> Vec<ActorInfo> {
        world.actors().map(ActorInfo::from_actor).collect()
    }
}

/// Counts describing the world at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSummary {
    pub scene_name: String,
    pub version: u32,
    pub actor_count: usize,
    pub gizmo_count: usize,
    pub pending_spawn: usize,
    pub pending_destroy: usize,
    pub render_components: usize,
    pub z_ignore_components: usize,
    /// World, actors and components currently registered.
    pub live_objects: usize,
    pub camera: Option<ObjectId>,
    pub selected: Option<ObjectId>,
}

impl std::fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "World '{}' v{}: actors={} gizmos={} components={}+{} pending_spawn={} pending_destroy={}",
            self.scene_name,
            self.version,
            self.actor_count,
            self.gizmo_count,
            self.render_components,
            self.z_ignore_components,
            self.pending_spawn,
            self.pending_destroy,
        )
    }
}

/// Detailed info about a single actor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorInfo {
    pub id: ObjectId,
    pub type_name: String,
    pub position: [f32; 3],
    /// Euler angles in degrees.
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub depth: u32,
    pub gizmo: bool,
    pub shapes: Vec<PrimitiveShape>,
}

impl ActorInfo {
    fn from_actor(actor: &Actor) -> Self {
        let t = actor.transform();
        Self {
            id: actor.id(),
            type_name: actor.type_name().to_string(),
            position: t.position.to_array(),
            rotation: t.euler_degrees().to_array(),
            scale: t.scale.to_array(),
            depth: actor.depth(),
            gizmo: actor.is_gizmo(),
            shapes: actor.components().primitives().map(|p| p.shape).collect(),
        }
    }
}

impl std::fmt::Display for ActorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] pos=({:.2}, {:.2}, {:.2}) scale=({:.2}, {:.2}, {:.2})",
            self.type_name,
            self.id,
            self.position[0],
            self.position[1],
            self.position[2],
            self.scale[0],
            self.scale[1],
            self.scale[2],
        )?;
        if self.gizmo {
            write!(f, " gizmo")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use vantage_common::Transform;
    use vantage_kernel::{CameraController, spawn_editor_gizmos};

    #[test]
    fn summary_empty_world() {
        let world = World::new();
        let summary = WorldInspector::summary(&world);
        assert_eq!(summary.actor_count, 0);
        assert_eq!(summary.live_objects, 1);
        assert_eq!(summary.camera, None);
    }

    #[test]
    fn summary_counts_gizmos_and_sets() {
        let mut world = World::new();
        spawn_editor_gizmos(&mut world, CameraController::default());
        world.spawn_by_tag("Arrow");

        let summary = WorldInspector::summary(&world);
        assert_eq!(summary.actor_count, 4);
        assert_eq!(summary.gizmo_count, 3);
        assert_eq!(summary.render_components, 2);
        assert_eq!(summary.z_ignore_components, 3);
        assert_eq!(summary.pending_spawn, 4);
        assert!(summary.camera.is_some());
    }

    #[test]
    fn inspect_actor_found() {
        let mut world = World::new();
        let id = world.spawn_by_tag("Sphere").unwrap();
        world
            .actor_mut(id)
            .unwrap()
            .set_transform(Transform::from_position(Vec3::new(1.0, 2.0, 3.0)));

        let info = WorldInspector::inspect_actor(&world, id).unwrap();
        assert_eq!(info.position, [1.0, 2.0, 3.0]);
        assert_eq!(info.shapes, vec![PrimitiveShape::Sphere]);
        assert!(WorldInspector::inspect_actor(&world, ObjectId(999)).is_none());
    }

    #[test]
    fn list_follows_spawn_order() {
        let mut world = World::new();
        let a = world.spawn_by_tag("Cube").unwrap();
        let b = world.spawn_by_tag("Cone").unwrap();
        let ids: Vec<_> = WorldInspector::list_actors(&world)
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn summary_display_and_json() {
        let mut world = World::new();
        world.set_scene_name("demo");
        let summary = WorldInspector::summary(&world);
        assert!(format!("{summary}").contains("World 'demo' v1"));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["actor_count"], 0);
    }
}
