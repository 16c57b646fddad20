use crate::actor::{Actor, ActorBehavior};
use crate::factory::{ActorFactory, FactoryRegistry};
use crate::ray::{Ray, intersect_primitive};
use crate::registry::{ObjectKind, ObjectRegistry};
use crate::scene::{ActorDescription, SceneError, SceneStore, WorldDescription};
use crate::selection::{SelectionListener, UuidBillboard};
use glam::{Mat4, Vec2, Vec3, Vec4};
use std::collections::BTreeMap;
use vantage_common::{ObjectId, PrimitiveShape, Transform};
use vantage_ecs::{CameraComponent, PrimitiveComponent, RenderComponent};
use vantage_input::{InputState, MouseButton, PlayerInput};
use vantage_render::picking::decode_color;
use vantage_render::{CameraParams, GpuDevice, PIXEL_FALLBACK, Renderer};

/// Which renderer-visible set a primitive is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderSet {
    /// Depth-tested; skipped for actors with depth > 0.
    #[default]
    Default,
    /// Drawn after the default set with an always-pass depth test.
    ZIgnore,
}

/// Request for a primitive component. The world assigns its id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveSpec {
    pub shape: PrimitiveShape,
    pub relative: Transform,
    pub color: Option<Vec4>,
    pub set: RenderSet,
}

impl PrimitiveSpec {
    /// Default-set primitive at the owner's origin with vertex colors.
    pub fn new(shape: PrimitiveShape) -> Self {
        Self {
            shape,
            relative: Transform::default(),
            color: None,
            set: RenderSet::Default,
        }
    }

    pub fn relative(mut self, relative: Transform) -> Self {
        self.relative = relative;
        self
    }

    /// Solid color instead of per-vertex colors.
    pub fn color(mut self, color: Vec4) -> Self {
        self.color = Some(color);
        self
    }

    /// Draw in the overlay set instead of the depth-tested one.
    pub fn z_ignore(mut self) -> Self {
        self.set = RenderSet::ZIgnore;
        self
    }
}

/// Owns the actors and drives them through a frame.
///
/// A frame is [`World::tick`], [`World::render`], [`World::late_tick`], in
/// that order. Actors are spawned into the active sequence immediately and
/// receive `begin_play` at the start of the next tick. Destruction is
/// two-phase: [`World::destroy_actor`] hides the actor at once and the
/// following late tick releases it from the object registry.
///
/// Iteration over actors during tick and late tick walks a snapshot of the
/// active sequence, so hooks may spawn or destroy freely.
pub struct World {
    id: ObjectId,
    registry: ObjectRegistry,
    actors: BTreeMap<ObjectId, Actor>,
    order: Vec<ObjectId>,
    pending_spawn: Vec<ObjectId>,
    pending_destroy: Vec<ObjectId>,
    /// `(owner, component)` pairs, in registration order.
    render_components: Vec<(ObjectId, ObjectId)>,
    z_ignore_components: Vec<(ObjectId, ObjectId)>,
    component_owners: BTreeMap<ObjectId, ObjectId>,
    camera: Option<ObjectId>,
    factories: FactoryRegistry,
    billboard: UuidBillboard,
    scene_name: String,
    version: u32,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Empty world with the built-in actor factories registered.
    pub fn new() -> Self {
        let mut registry = ObjectRegistry::new();
        let id = registry.allocate(ObjectKind::World);
        Self {
            id,
            registry,
            actors: BTreeMap::new(),
            order: Vec::new(),
            pending_spawn: Vec::new(),
            pending_destroy: Vec::new(),
            render_components: Vec::new(),
            z_ignore_components: Vec::new(),
            component_owners: BTreeMap::new(),
            camera: None,
            factories: FactoryRegistry::with_builtins(),
            billboard: UuidBillboard::default(),
            scene_name: String::new(),
            version: 1,
        }
    }

    /// Identifier the world subscribes to input under.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Every live world, actor and component id.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Name used by `save_world`; empty until set or loaded.
    pub fn scene_name(&self) -> &str {
        &self.scene_name
    }

    /// Rename the scene the next save writes to.
    pub fn set_scene_name(&mut self, name: impl Into<String>) {
        self.scene_name = name.into();
    }

    /// Scene format version carried through save and load.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Label of the current selection.
    pub fn billboard(&self) -> &UuidBillboard {
        &self.billboard
    }

    /// Tag-to-factory table used by `spawn_by_tag` and loading.
    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    /// Add or replace the factory for `tag`.
    pub fn register_factory(&mut self, tag: impl Into<String>, factory: ActorFactory) {
        self.factories.register(tag, factory);
    }

    // --- Actors ---

    /// Create an actor in the active sequence and queue it for `begin_play`.
    pub fn spawn_actor(&mut self, type_name: &str, transform: Transform) -> ObjectId {
        let id = self.registry.allocate(ObjectKind::Actor);
        self.actors.insert(id, Actor::new(id, type_name, transform));
        self.order.push(id);
        self.pending_spawn.push(id);
        tracing::debug!(actor = %id, type_name, "spawned actor");
        id
    }

    /// Construct an actor through the factory registered for `tag`.
    pub fn spawn_by_tag(&mut self, tag: &str) -> Option<ObjectId> {
        let Some(factory) = self.factories.get(tag) else {
            tracing::warn!(tag, "unknown actor type tag; skipping");
            return None;
        };
        Some(factory(self))
    }

    /// Attach a primitive and register it in the requested render set.
    pub fn add_primitive(&mut self, actor: ObjectId, spec: PrimitiveSpec) -> Option<ObjectId> {
        if !self.is_alive(actor) {
            return None;
        }
        let component = self.registry.allocate(ObjectKind::Component);
        let mut primitive =
            PrimitiveComponent::new(component, spec.shape).with_relative(spec.relative);
        if let Some(color) = spec.color {
            primitive = primitive.with_color(color);
        }
        self.actors
            .get_mut(&actor)?
            .components
            .insert(primitive);
        self.component_owners.insert(component, actor);
        match spec.set {
            RenderSet::Default => self.render_components.push((actor, component)),
            RenderSet::ZIgnore => self.z_ignore_components.push((actor, component)),
        }
        Some(component)
    }

    /// Attach a camera component. `None` for a dead or unknown actor.
    pub fn add_camera(&mut self, actor: ObjectId) -> Option<ObjectId> {
        if !self.is_alive(actor) {
            return None;
        }
        let component = self.registry.allocate(ObjectKind::Component);
        self.actors
            .get_mut(&actor)?
            .components
            .insert(CameraComponent::new(component));
        self.component_owners.insert(component, actor);
        Some(component)
    }

    /// Install the hooks the actor receives from now on.
    pub fn set_behavior(&mut self, actor: ObjectId, behavior: Box<dyn ActorBehavior>) {
        if let Some(a) = self.actors.get_mut(&actor) {
            a.behavior = Some(behavior);
        }
    }

    /// Move a primitive from the default set into the Z-ignore set.
    pub fn move_to_z_ignore(&mut self, component: ObjectId) -> bool {
        let Some(index) = self
            .render_components
            .iter()
            .position(|(_, c)| *c == component)
        else {
            return false;
        };
        let entry = self.render_components.remove(index);
        self.z_ignore_components.push(entry);
        true
    }

    /// Look up an actor, including one pending destruction.
    pub fn actor(&self, id: ObjectId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    /// Mutable lookup, including an actor pending destruction.
    pub fn actor_mut(&mut self, id: ObjectId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    /// Actors in the active sequence, in spawn order.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.order.iter().filter_map(|id| self.actors.get(id))
    }

    /// Ids in the active sequence.
    pub fn active_ids(&self) -> &[ObjectId] {
        &self.order
    }

    /// Number of actors in the active sequence.
    pub fn actor_count(&self) -> usize {
        self.order.len()
    }

    /// Actors still waiting for `begin_play`.
    pub fn pending_spawn_count(&self) -> usize {
        self.pending_spawn.len()
    }

    /// Actors destroyed but not yet released.
    pub fn pending_destroy_count(&self) -> usize {
        self.pending_destroy.len()
    }

    /// Present and not pending destruction.
    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.actors.get(&id).is_some_and(|a| !a.pending_destroy)
    }

    /// Depth-tested `(owner, component)` pairs, in draw order.
    pub fn render_components(&self) -> &[(ObjectId, ObjectId)] {
        &self.render_components
    }

    /// Overlay `(owner, component)` pairs, drawn after the default set.
    pub fn z_ignore_components(&self) -> &[(ObjectId, ObjectId)] {
        &self.z_ignore_components
    }

    /// Actor owning `component`, until that actor is released.
    pub fn component_owner(&self, component: ObjectId) -> Option<ObjectId> {
        self.component_owners.get(&component).copied()
    }

    // --- Camera ---

    /// Choose the actor whose camera drives view and projection.
    pub fn set_camera(&mut self, camera: Option<ObjectId>) {
        self.camera = camera;
    }

    /// The active camera actor.
    pub fn camera(&self) -> Option<ObjectId> {
        self.camera
    }

    /// View matrix and projection parameters of the active camera.
    pub fn camera_view(&self) -> Option<(Mat4, CameraParams)> {
        let actor = self.actors.get(&self.camera?)?;
        let transform = actor.transform();
        let up = transform.rotation * Vec3::Y;
        let view = Mat4::look_to_rh(transform.position, transform.forward(), up);
        let params = actor
            .components()
            .camera()
            .map(CameraComponent::params)
            .unwrap_or_default();
        Some((view, params))
    }

    /// Push the active camera's view and projection into the renderer.
    pub fn update_camera_matrix<D: GpuDevice>(&self, renderer: &mut Renderer<D>) {
        match self.camera_view() {
            Some((view, params)) => {
                renderer.update_view_matrix(view);
                renderer.update_projection_matrix(params);
            }
            None => {
                renderer.update_view_matrix(Mat4::IDENTITY);
                renderer.update_projection_matrix(CameraParams::default());
            }
        }
    }

    // --- Frame ---

    /// Flush the spawn queue and subscribe to primary mouse-down.
    pub fn begin_play(&mut self, input: &mut PlayerInput) {
        self.flush_spawns();
        input.register_mouse_down(self.id, MouseButton::Left);
        tracing::info!(world = %self.id, actors = self.order.len(), "world begin play");
    }

    /// Drop the world's input subscriptions.
    pub fn end_play(&mut self, input: &mut PlayerInput) {
        input.unregister_owner(self.id);
    }

    /// Ray cast for every primary mouse-down queued since the last call.
    /// Returns the last actor selected.
    pub fn process_input(
        &mut self,
        input: &mut PlayerInput,
        listener: &mut dyn SelectionListener,
    ) -> Option<ObjectId> {
        let aspect = input.state().viewport().aspect_ratio();
        let mut selected = None;
        for event in input.drain_events(self.id) {
            if event.button != MouseButton::Left {
                continue;
            }
            if let Some(hit) = self.ray_casting(event.ndc, aspect, listener) {
                selected = Some(hit);
            }
        }
        selected
    }

    /// Run `begin_play` for last frame's spawns, then tick every activated
    /// actor. Actors spawned from inside these hooks wait for the next frame.
    pub fn tick(&mut self, input: &InputState, dt: f32) {
        self.flush_spawns();
        let snapshot = self.order.clone();
        for id in snapshot {
            let eligible = self
                .actors
                .get(&id)
                .is_some_and(|a| !a.pending_destroy && a.can_tick() && a.begun_play);
            if eligible {
                self.run_behavior(id, |behavior, world| behavior.tick(world, id, input, dt));
            }
        }
    }

    /// Late hooks, then release every actor destroyed this frame.
    pub fn late_tick(&mut self, dt: f32) {
        let snapshot = self.order.clone();
        for id in snapshot {
            let eligible = self
                .actors
                .get(&id)
                .is_some_and(|a| !a.pending_destroy && a.can_tick() && a.begun_play);
            if eligible {
                self.run_behavior(id, |behavior, world| behavior.late_tick(world, id, dt));
            }
        }
        self.release_pending();
    }

    fn flush_spawns(&mut self) {
        let spawned = std::mem::take(&mut self.pending_spawn);
        for id in spawned {
            let Some(actor) = self.actors.get_mut(&id) else {
                continue;
            };
            if actor.pending_destroy || actor.begun_play {
                continue;
            }
            actor.begun_play = true;
            self.run_behavior(id, |behavior, world| behavior.begin_play(world, id));
        }
    }

    /// Check the actor's behavior out, run `f`, and put it back. If the actor
    /// was destroyed from inside `f`, its teardown hook runs before returning.
    fn run_behavior(&mut self, id: ObjectId, f: impl FnOnce(&mut dyn ActorBehavior, &mut World)) {
        let Some(actor) = self.actors.get_mut(&id) else {
            return;
        };
        let Some(mut behavior) = actor.behavior.take() else {
            return;
        };
        actor.behavior_busy = true;

        f(behavior.as_mut(), self);

        let needs_teardown = self
            .actors
            .get(&id)
            .is_some_and(|a| a.pending_destroy && !a.teardown_done);
        if needs_teardown {
            if let Some(actor) = self.actors.get_mut(&id) {
                actor.teardown_done = true;
            }
            behavior.destroyed(self, id);
        }
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.behavior_busy = false;
            if actor.behavior.is_none() {
                actor.behavior = Some(behavior);
            }
        }
    }

    fn release_pending(&mut self) {
        for id in std::mem::take(&mut self.pending_destroy) {
            let Some(actor) = self.actors.remove(&id) else {
                continue;
            };
            for component in actor.components().ids() {
                self.registry.remove(component);
                self.component_owners.remove(&component);
            }
            if self.registry.remove(id).is_none() {
                tracing::warn!(actor = %id, "released actor was not registered");
            }
            if self.billboard.target() == Some(id) {
                self.billboard.clear();
            }
            tracing::debug!(actor = %id, "released actor");
        }
    }

    /// Mark an actor for destruction. Idempotent; returns `false` only for an
    /// unknown id.
    pub fn destroy_actor(&mut self, id: ObjectId) -> bool {
        let Some(actor) = self.actors.get_mut(&id) else {
            tracing::debug!(actor = %id, "destroy of unknown actor");
            return false;
        };
        if actor.pending_destroy {
            return true;
        }
        actor.pending_destroy = true;
        let busy = actor.behavior_busy;
        if !busy {
            actor.teardown_done = true;
        }

        self.order.retain(|a| *a != id);
        self.pending_spawn.retain(|a| *a != id);
        self.render_components.retain(|(owner, _)| *owner != id);
        self.z_ignore_components.retain(|(owner, _)| *owner != id);
        if self.camera == Some(id) {
            self.camera = None;
        }
        self.pending_destroy.push(id);

        if !busy {
            self.run_behavior(id, |behavior, world| behavior.destroyed(world, id));
        }
        true
    }

    /// Destroy every non-gizmo actor.
    pub fn clear_world(&mut self) {
        let doomed: Vec<ObjectId> = self
            .actors()
            .filter(|a| !a.is_gizmo())
            .map(Actor::id)
            .collect();
        let count = doomed.len();
        for id in doomed {
            self.destroy_actor(id);
        }
        tracing::info!(destroyed = count, "cleared world");
    }

    // --- Render ---

    /// Main pass, then the picking pass while the primary button is held.
    pub fn render<D: GpuDevice>(&self, renderer: &mut Renderer<D>, input: &InputState) {
        self.update_camera_matrix(renderer);
        renderer.begin_frame();
        renderer.prepare();
        renderer.prepare_shader();
        renderer.prepare_main();
        self.render_tiers(renderer, false);

        if input.is_button_held(MouseButton::Left) && renderer.prepare_picking() {
            renderer.prepare_picking_shader();
            self.render_tiers(renderer, true);
        }
    }

    /// Depth-tested default set (depth-0 owners only), then the Z-ignore set.
    fn render_tiers<D: GpuDevice>(&self, renderer: &mut Renderer<D>, picking: bool) {
        for &(owner, component) in &self.render_components {
            let Some((actor, primitive)) = self.renderable(owner, component) else {
                continue;
            };
            if actor.depth() > 0 {
                continue;
            }
            draw_component(renderer, actor, primitive, picking);
        }

        renderer.prepare_z_ignore();
        for &(owner, component) in &self.z_ignore_components {
            let Some((actor, primitive)) = self.renderable(owner, component) else {
                continue;
            };
            draw_component(renderer, actor, primitive, picking);
        }
    }

    fn renderable(
        &self,
        owner: ObjectId,
        component: ObjectId,
    ) -> Option<(&Actor, &PrimitiveComponent)> {
        let actor = self.actors.get(&owner).filter(|a| !a.pending_destroy)?;
        let primitive = actor.components().primitive(component)?;
        Some((actor, primitive))
    }

    // --- Selection ---

    /// Select the nearest actor whose first primitive the cursor ray hits.
    ///
    /// Distances are compared with strict less-than, so among equal hits the
    /// actor earliest in the active sequence wins. A miss changes nothing.
    pub fn ray_casting(
        &mut self,
        ndc: Vec2,
        aspect_ratio: f32,
        listener: &mut dyn SelectionListener,
    ) -> Option<ObjectId> {
        let Some((view, params)) = self.camera_view() else {
            tracing::debug!("ray cast without an active camera");
            return None;
        };
        let ray = Ray::from_ndc(view, params.projection(aspect_ratio), ndc)?;

        let mut best: Option<(ObjectId, f32)> = None;
        for actor in self.actors() {
            let Some(primitive) = actor.components().first_primitive() else {
                continue;
            };
            let world_matrix = primitive.world_matrix(actor.world_matrix());
            let Some(distance) = intersect_primitive(&ray, primitive.shape, world_matrix) else {
                continue;
            };
            tracing::debug!(actor = %actor.id(), shape = ?primitive.shape, distance, "ray hit");
            if best.is_none_or(|(_, nearest)| distance < nearest) {
                best = Some((actor.id(), distance));
            }
        }

        let (selected, _) = best?;
        self.select(selected, listener);
        Some(selected)
    }

    /// Select the actor whose identifier is under `screen_pos` in the
    /// picking target.
    pub fn pick_pixel<D: GpuDevice>(
        &mut self,
        renderer: &mut Renderer<D>,
        screen_pos: Vec2,
        listener: &mut dyn SelectionListener,
    ) -> Option<ObjectId> {
        let color = renderer.get_pixel(screen_pos);
        if color == PIXEL_FALLBACK {
            return None;
        }
        let component = decode_color(color);
        if !component.is_valid() {
            return None;
        }
        let owner = self
            .component_owner(component)
            .filter(|owner| self.is_alive(*owner))?;
        self.select(owner, listener);
        Some(owner)
    }

    /// Forget the billboard target.
    pub fn clear_selection(&mut self) {
        self.billboard.clear();
    }

    fn select(&mut self, actor: ObjectId, listener: &mut dyn SelectionListener) {
        self.billboard.set_target(actor);
        listener.select_actor(actor);
        tracing::debug!(actor = %actor, "selected actor");
    }

    // --- Persistence ---

    /// Non-gizmo actors in active-sequence order.
    pub fn describe(&self) -> WorldDescription {
        WorldDescription {
            scene_name: self.scene_name.clone(),
            version: self.version,
            actors: self
                .actors()
                .filter(|a| !a.is_gizmo())
                .map(|a| ActorDescription::new(a.type_name(), a.id(), a.transform()))
                .collect(),
        }
    }

    /// Write `describe()` under the current scene name.
    pub fn save_world(&self, store: &mut dyn SceneStore) -> Result<(), SceneError> {
        let scene = self.describe();
        store.save_scene(&scene).map_err(|source| SceneError::Save {
            name: scene.scene_name.clone(),
            source,
        })?;
        tracing::info!(scene = %scene.scene_name, actors = scene.actors.len(), "saved world");
        Ok(())
    }

    /// Replace the world's content with the named scene. Returns `Ok(false)`
    /// for an empty name or a scene the store does not have; the world is
    /// left untouched in both cases.
    pub fn load_world(&mut self, store: &dyn SceneStore, name: &str) -> Result<bool, SceneError> {
        if name.is_empty() {
            return Ok(false);
        }
        let scene = store.load_scene(name).map_err(|source| SceneError::Load {
            name: name.to_string(),
            source,
        })?;
        let Some(scene) = scene else {
            tracing::warn!(scene = name, "scene not found");
            return Ok(false);
        };
        self.apply_description(&scene);
        Ok(true)
    }

    /// Clear the world and rebuild actors from `scene`. Entries with an
    /// unknown type tag are skipped. Returns the number of actors built.
    pub fn apply_description(&mut self, scene: &WorldDescription) -> usize {
        self.clear_world();
        self.scene_name = scene.scene_name.clone();
        self.version = scene.version;

        let mut constructed = 0;
        for entry in &scene.actors {
            let Some(id) = self.spawn_by_tag(&entry.type_tag) else {
                continue;
            };
            if let Some(actor) = self.actors.get_mut(&id) {
                actor.transform = entry.transform();
            }
            constructed += 1;
        }
        tracing::info!(
            scene = %scene.scene_name,
            constructed,
            skipped = scene.actors.len() - constructed,
            "loaded world"
        );
        constructed
    }
}

fn draw_component<D: GpuDevice>(
    renderer: &mut Renderer<D>,
    actor: &Actor,
    primitive: &PrimitiveComponent,
    picking: bool,
) {
    renderer.update_constant_depth(actor.depth());
    if picking {
        primitive.update_constant_picking(renderer);
    }
    primitive.render(renderer, actor.world_matrix());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::StoreError;
    use crate::selection::LastSelection;
    use std::cell::RefCell;
    use std::rc::Rc;
    use vantage_common::Viewport;
    use vantage_render::picking::{encode_id, normalize_color};
    use vantage_render::device::DepthStencilDesc;
    use vantage_render::{RecordingDevice, RenderTarget, ShaderProgram};

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every hook it receives.
    struct Recorder {
        name: &'static str,
        log: Log,
    }

    impl Recorder {
        fn boxed(name: &'static str, log: &Log) -> Box<dyn ActorBehavior> {
            Box::new(Self {
                name,
                log: Rc::clone(log),
            })
        }

        fn push(&self, event: &str) {
            self.log.borrow_mut().push(format!("{}:{event}", self.name));
        }
    }

    impl ActorBehavior for Recorder {
        fn begin_play(&mut self, _world: &mut World, _me: ObjectId) {
            self.push("begin");
        }

        fn tick(&mut self, _world: &mut World, _me: ObjectId, _input: &InputState, _dt: f32) {
            self.push("tick");
        }

        fn late_tick(&mut self, _world: &mut World, _me: ObjectId, _dt: f32) {
            self.push("late");
        }

        fn destroyed(&mut self, _world: &mut World, _me: ObjectId) {
            self.push("destroyed");
        }
    }

    fn count(log: &Log, event: &str) -> usize {
        log.borrow().iter().filter(|e| e.as_str() == event).count()
    }

    fn input() -> InputState {
        InputState::new(Viewport::new(64, 64))
    }

    /// World with a camera at the origin looking down -Z.
    fn world_with_camera() -> World {
        let mut world = World::new();
        let camera = world.spawn_actor("Camera", Transform::default());
        world.add_camera(camera);
        world.set_camera(Some(camera));
        if let Some(actor) = world.actor_mut(camera) {
            actor.set_gizmo(true);
        }
        world
    }

    fn cube_at(world: &mut World, position: Vec3) -> ObjectId {
        let id = world.spawn_actor("Cube", Transform::from_position(position));
        world.add_primitive(id, PrimitiveSpec::new(PrimitiveShape::Cube));
        id
    }

    #[derive(Default)]
    struct MemoryStore(BTreeMap<String, WorldDescription>);

    impl SceneStore for MemoryStore {
        fn save_scene(&mut self, scene: &WorldDescription) -> Result<(), StoreError> {
            self.0.insert(scene.scene_name.clone(), scene.clone());
            Ok(())
        }

        fn load_scene(&self, name: &str) -> Result<Option<WorldDescription>, StoreError> {
            Ok(self.0.get(name).cloned())
        }
    }

    #[test]
    fn ray_cast_selects_the_only_hit() {
        let mut world = world_with_camera();
        let off_axis = cube_at(&mut world, Vec3::new(4.0, 0.0, -5.0));
        let on_axis = cube_at(&mut world, Vec3::new(0.0, 0.0, -8.0));
        let mut listener = LastSelection::default();

        let hit = world.ray_casting(Vec2::ZERO, 1.0, &mut listener);

        assert_eq!(hit, Some(on_axis));
        assert_ne!(hit, Some(off_axis));
        assert_eq!(listener.0, Some(on_axis));
        assert_eq!(world.billboard().target(), Some(on_axis));
    }

    #[test]
    fn ray_cast_prefers_the_nearer_actor() {
        let mut world = world_with_camera();
        let _far = cube_at(&mut world, Vec3::new(0.0, 0.0, -10.0));
        let near = cube_at(&mut world, Vec3::new(0.0, 0.0, -5.0));
        let mut listener = LastSelection::default();

        assert_eq!(world.ray_casting(Vec2::ZERO, 1.0, &mut listener), Some(near));
    }

    #[test]
    fn ray_cast_ties_go_to_the_first_actor() {
        let mut world = world_with_camera();
        let first = cube_at(&mut world, Vec3::new(0.0, 0.0, -5.0));
        let _second = cube_at(&mut world, Vec3::new(0.0, 0.0, -5.0));
        let mut listener = LastSelection::default();

        assert_eq!(world.ray_casting(Vec2::ZERO, 1.0, &mut listener), Some(first));
    }

    #[test]
    fn ray_cast_miss_leaves_selection_alone() {
        let mut world = world_with_camera();
        cube_at(&mut world, Vec3::new(0.0, 0.0, 5.0));
        let mut listener = LastSelection(Some(ObjectId(42)));

        assert_eq!(world.ray_casting(Vec2::ZERO, 1.0, &mut listener), None);
        assert_eq!(listener.0, Some(ObjectId(42)));
        assert_eq!(world.billboard().target(), None);
    }

    #[test]
    fn process_input_ray_casts_primary_clicks() {
        let mut world = world_with_camera();
        let cube = cube_at(&mut world, Vec3::new(0.0, 0.0, -5.0));
        let mut player = PlayerInput::new(InputState::new(Viewport::new(100, 100)));
        world.begin_play(&mut player);
        player.state_mut().set_cursor(Vec2::new(50.0, 50.0));
        player.button_down(MouseButton::Left);

        let mut listener = LastSelection::default();
        assert_eq!(world.process_input(&mut player, &mut listener), Some(cube));

        world.end_play(&mut player);
        assert!(!player.is_subscribed(world.id()));
    }

    #[test]
    fn double_destroy_releases_once() {
        let log = Log::default();
        let mut world = World::new();
        let id = world.spawn_actor("Actor", Transform::default());
        world.set_behavior(id, Recorder::boxed("a", &log));

        assert!(world.destroy_actor(id));
        assert!(world.destroy_actor(id));
        assert_eq!(world.pending_destroy_count(), 1);
        assert_eq!(world.actor_count(), 0);
        assert!(world.registry().contains(id));

        world.late_tick(0.016);
        assert!(world.actor(id).is_none());
        assert!(!world.registry().contains(id));
        assert_eq!(count(&log, "a:destroyed"), 1);
        assert!(!world.destroy_actor(id));
    }

    #[test]
    fn destroying_a_primitive_owner_releases_its_components() {
        let mut world = World::new();
        let id = world.spawn_actor("Cube", Transform::default());
        let component = world
            .add_primitive(id, PrimitiveSpec::new(PrimitiveShape::Cube))
            .unwrap();
        world.destroy_actor(id);
        assert!(world.render_components().is_empty());

        world.late_tick(0.0);
        assert!(!world.registry().contains(component));
        assert_eq!(world.component_owner(component), None);
    }

    struct Spawner {
        log: Log,
        spawned: Option<ObjectId>,
    }

    impl ActorBehavior for Spawner {
        fn tick(&mut self, world: &mut World, _me: ObjectId, _input: &InputState, _dt: f32) {
            if self.spawned.is_none() {
                let child = world.spawn_by_tag("Cube");
                if let Some(child) = child {
                    world.set_behavior(child, Recorder::boxed("child", &self.log));
                }
                self.spawned = child;
            }
        }
    }

    #[test]
    fn actor_spawned_during_tick_renders_now_and_ticks_next_frame() {
        let log = Log::default();
        let mut world = world_with_camera();
        let spawner = world.spawn_actor("Actor", Transform::default());
        world.set_behavior(
            spawner,
            Box::new(Spawner {
                log: Rc::clone(&log),
                spawned: None,
            }),
        );
        let mut renderer = Renderer::new(RecordingDevice::new(64, 64));

        world.tick(&input(), 0.016);
        assert_eq!(count(&log, "child:tick"), 0);
        assert_eq!(world.pending_spawn_count(), 1);

        world.render(&mut renderer, &input());
        assert_eq!(renderer.device().draws().count(), 1);

        world.late_tick(0.016);
        assert_eq!(count(&log, "child:late"), 0);

        world.tick(&input(), 0.016);
        assert_eq!(
            *log.borrow(),
            vec!["child:begin".to_string(), "child:tick".to_string()]
        );
    }

    /// Spawns a logged child from its own `begin_play`.
    struct EagerParent {
        log: Log,
    }

    impl ActorBehavior for EagerParent {
        fn begin_play(&mut self, world: &mut World, _me: ObjectId) {
            let child = world.spawn_actor("Actor", Transform::default());
            world.set_behavior(child, Recorder::boxed("child", &self.log));
        }
    }

    #[test]
    fn actor_spawned_in_begin_play_waits_a_frame() {
        let log = Log::default();
        let mut world = World::new();
        let parent = world.spawn_actor("Actor", Transform::default());
        world.set_behavior(
            parent,
            Box::new(EagerParent {
                log: Rc::clone(&log),
            }),
        );

        world.tick(&input(), 0.016);
        world.late_tick(0.016);
        assert!(log.borrow().is_empty());
        assert_eq!(world.pending_spawn_count(), 1);

        world.tick(&input(), 0.016);
        world.late_tick(0.016);
        assert_eq!(
            *log.borrow(),
            vec![
                "child:begin".to_string(),
                "child:tick".to_string(),
                "child:late".to_string()
            ]
        );
    }

    #[test]
    fn tick_disabled_actor_gets_no_tick_hooks() {
        let log = Log::default();
        let mut world = World::new();
        let id = world.spawn_actor("Actor", Transform::default());
        world.set_behavior(id, Recorder::boxed("a", &log));
        world.actor_mut(id).unwrap().set_tick_enabled(false);

        for _ in 0..2 {
            world.tick(&input(), 0.016);
            world.late_tick(0.016);
        }
        assert_eq!(*log.borrow(), vec!["a:begin".to_string()]);
    }

    struct SelfDestruct {
        log: Log,
    }

    impl ActorBehavior for SelfDestruct {
        fn tick(&mut self, world: &mut World, me: ObjectId, _input: &InputState, _dt: f32) {
            world.destroy_actor(me);
            self.log.borrow_mut().push("after-destroy".into());
        }

        fn destroyed(&mut self, _world: &mut World, _me: ObjectId) {
            self.log.borrow_mut().push("destroyed".into());
        }
    }

    #[test]
    fn self_destroy_in_tick_tears_down_once_after_the_hook() {
        let log = Log::default();
        let mut world = World::new();
        let id = world.spawn_actor("Actor", Transform::default());
        world.set_behavior(
            id,
            Box::new(SelfDestruct {
                log: Rc::clone(&log),
            }),
        );

        world.tick(&input(), 0.016);
        assert_eq!(
            *log.borrow(),
            vec!["after-destroy".to_string(), "destroyed".to_string()]
        );
        assert!(world.actor(id).is_some_and(Actor::is_pending_destroy));

        world.late_tick(0.016);
        world.tick(&input(), 0.016);
        assert_eq!(log.borrow().len(), 2);
        assert!(world.actor(id).is_none());
    }

    #[test]
    fn destroyed_before_begin_play_never_begins() {
        let log = Log::default();
        let mut world = World::new();
        let id = world.spawn_actor("Actor", Transform::default());
        world.set_behavior(id, Recorder::boxed("a", &log));
        world.destroy_actor(id);

        world.tick(&input(), 0.016);
        assert_eq!(*log.borrow(), vec!["a:destroyed".to_string()]);
    }

    #[test]
    fn clear_and_save_skip_gizmos() {
        let mut world = world_with_camera();
        world.set_scene_name("demo");
        let cube = cube_at(&mut world, Vec3::new(1.0, 2.0, 3.0));

        let scene = world.describe();
        assert_eq!(scene.actors.len(), 1);
        assert_eq!(scene.actors[0].type_tag, "Cube");
        assert_eq!(scene.actors[0].id, cube);

        world.clear_world();
        world.late_tick(0.0);
        assert_eq!(world.actor_count(), 1);
        assert!(world.actors().all(Actor::is_gizmo));
    }

    #[test]
    fn load_builds_known_tags_and_skips_unknown_ones() {
        let mut store = MemoryStore::default();
        let mut scene = WorldDescription::new("level");
        scene.version = 3;
        let placed = Transform::from_position(Vec3::new(0.0, 1.0, -4.0));
        scene
            .actors
            .push(ActorDescription::new("Sphere", ObjectId(900), &placed));
        scene
            .actors
            .push(ActorDescription::new("Teapot", ObjectId(901), &placed));
        store.save_scene(&scene).unwrap();

        let mut world = world_with_camera();
        let stale = cube_at(&mut world, Vec3::ZERO);
        assert!(world.load_world(&store, "level").unwrap());

        assert_eq!(world.scene_name(), "level");
        assert_eq!(world.version(), 3);
        assert!(!world.is_alive(stale));
        let loaded: Vec<_> = world.actors().filter(|a| !a.is_gizmo()).collect();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].type_name(), "Sphere");
        assert!(loaded[0].transform().position.abs_diff_eq(placed.position, 1e-5));
    }

    #[test]
    fn load_of_missing_or_unnamed_scene_changes_nothing() {
        let store = MemoryStore::default();
        let mut world = World::new();
        let cube = cube_at(&mut world, Vec3::ZERO);

        assert!(!world.load_world(&store, "").unwrap());
        assert!(!world.load_world(&store, "nowhere").unwrap());
        assert!(world.is_alive(cube));
    }

    #[test]
    fn save_then_load_restores_the_actor_list() {
        let mut store = MemoryStore::default();
        let mut world = world_with_camera();
        world.set_scene_name("roundtrip");
        world.spawn_by_tag("Cone");
        world.spawn_by_tag("Arrow");
        world.save_world(&mut store).unwrap();

        let mut other = World::new();
        assert!(other.load_world(&store, "roundtrip").unwrap());
        let tags: Vec<_> = other.actors().map(|a| a.type_name().to_string()).collect();
        assert_eq!(tags, vec!["Cone".to_string(), "Arrow".to_string()]);
    }

    fn picking_draws(renderer: &Renderer<RecordingDevice>) -> usize {
        renderer
            .device()
            .draws()
            .filter(|d| d.pixel_shader == Some(ShaderProgram::PickingPixel))
            .count()
    }

    #[test]
    fn picking_pass_only_runs_while_primary_is_held() {
        let mut world = world_with_camera();
        let cube = cube_at(&mut world, Vec3::new(0.0, 0.0, -5.0));
        let component = world.render_components()[0].1;
        let mut renderer = Renderer::new(RecordingDevice::new(64, 64));
        let mut input = input();

        world.render(&mut renderer, &input);
        assert_eq!(picking_draws(&renderer), 0);

        renderer.device_mut().clear_calls();
        input.button_down(MouseButton::Left);
        world.render(&mut renderer, &input);
        assert_eq!(picking_draws(&renderer), 1);

        let texture = renderer.picking_target().unwrap().texture;
        let picking = renderer
            .device()
            .draws()
            .find(|d| d.pixel_shader == Some(ShaderProgram::PickingPixel))
            .unwrap();
        assert_eq!(picking.target, RenderTarget::Texture(texture));
        assert_eq!(
            picking.picking_color,
            Some(normalize_color(encode_id(component)).to_array())
        );
        assert_eq!(world.component_owner(component), Some(cube));
    }

    #[test]
    fn picking_pass_repeats_both_tiers() {
        let mut world = world_with_camera();
        cube_at(&mut world, Vec3::new(0.0, 0.0, -5.0));
        let deep = cube_at(&mut world, Vec3::new(1.0, 0.0, -5.0));
        world.actor_mut(deep).unwrap().set_depth(1);
        let deep_component = world.render_components()[1].1;
        crate::gizmo::spawn_axis(&mut world);
        let overlay: Vec<[f32; 4]> = world
            .z_ignore_components()
            .iter()
            .map(|(_, c)| normalize_color(encode_id(*c)).to_array())
            .collect();
        assert_eq!(overlay.len(), 3);

        let mut renderer = Renderer::new(RecordingDevice::new(64, 64));
        let mut input = input();
        input.button_down(MouseButton::Left);
        world.render(&mut renderer, &input);

        let texture = renderer.picking_target().unwrap().texture;
        let (main, picking): (Vec<_>, Vec<_>) = renderer
            .device()
            .draws()
            .partition(|d| d.target == RenderTarget::Main);
        // Shallow cube plus three axis lines in each pass.
        assert_eq!(main.len(), 4);
        assert_eq!(picking.len(), 4);
        assert!(picking
            .iter()
            .all(|d| d.target == RenderTarget::Texture(texture)));

        let overlay_draws: Vec<_> = picking
            .iter()
            .filter(|d| d.picking_color.is_some_and(|c| overlay.contains(&c)))
            .collect();
        assert_eq!(overlay_draws.len(), 3);
        assert!(overlay_draws
            .iter()
            .all(|d| d.depth_state == Some(DepthStencilDesc::IGNORE_DEPTH)));

        let deep_color = normalize_color(encode_id(deep_component)).to_array();
        assert!(picking.iter().all(|d| d.picking_color != Some(deep_color)));
    }

    #[test]
    fn overlay_actors_skip_the_depth_tested_set() {
        let mut world = world_with_camera();
        let cube = cube_at(&mut world, Vec3::new(0.0, 0.0, -5.0));
        world.actor_mut(cube).unwrap().set_depth(1);
        let mut renderer = Renderer::new(RecordingDevice::new(64, 64));

        world.render(&mut renderer, &input());
        assert_eq!(renderer.device().draws().count(), 0);

        let component = world.render_components()[0].1;
        assert!(world.move_to_z_ignore(component));
        world.render(&mut renderer, &input());
        let draws: Vec<_> = renderer.device().draws().collect();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].depth.map(|d| d.depth_offset), Some(1));
    }

    #[test]
    fn pick_pixel_selects_the_owner_of_the_identifier() {
        let mut world = world_with_camera();
        let cube = cube_at(&mut world, Vec3::new(0.0, 0.0, -5.0));
        let component = world.render_components()[0].1;
        let mut renderer = Renderer::new(RecordingDevice::new(64, 64));
        let mut input = input();
        input.button_down(MouseButton::Left);
        world.render(&mut renderer, &input);

        let texture = renderer.picking_target().unwrap().texture;
        renderer
            .device_mut()
            .paint_pixel(texture, 10, 12, component.0.to_le_bytes());

        let mut listener = LastSelection::default();
        let picked = world.pick_pixel(&mut renderer, Vec2::new(10.0, 12.0), &mut listener);
        assert_eq!(picked, Some(cube));
        assert_eq!(listener.0, Some(cube));

        // Background holds the cleared sentinel.
        let mut listener = LastSelection::default();
        assert_eq!(
            world.pick_pixel(&mut renderer, Vec2::new(1.0, 1.0), &mut listener),
            None
        );
        assert_eq!(listener.0, None);
    }

    #[test]
    fn pick_pixel_ignores_readback_failure() {
        let mut world = world_with_camera();
        cube_at(&mut world, Vec3::new(0.0, 0.0, -5.0));
        let mut renderer = Renderer::new(RecordingDevice::new(64, 64));
        renderer.device_mut().fail_staging_creation(true);

        let mut listener = LastSelection::default();
        assert_eq!(
            world.pick_pixel(&mut renderer, Vec2::new(5.0, 5.0), &mut listener),
            None
        );
    }
}
