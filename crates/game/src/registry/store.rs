use std::collections::{BTreeMap, HashMap};

use rapier3d::dynamics::RigidBodyHandle;

use crate::ids::{BodyId, PlayerId};
use crate::ownership::Holder;
use crate::physics::{BodyProperties, PhysicsWorld, Transform};

use super::body::{PhysicsBody, RenderProxy};

#[derive(Debug)]
pub struct BodyRegistry {
    bodies: BTreeMap<BodyId, PhysicsBody>,
    handles: HashMap<RigidBodyHandle, BodyId>,
    id_prefix: String,
    next_id: u64,
}

impl BodyRegistry {
    pub fn new(owner: &PlayerId) -> Self {
        Self {
            bodies: BTreeMap::new(),
            handles: HashMap::new(),
            id_prefix: owner.as_str().to_owned(),
            next_id: 1,
        }
    }

    /// Creates a body, or returns `explicit_id` untouched if it is already known.
    pub fn create(
        &mut self,
        world: &mut PhysicsWorld,
        properties: BodyProperties,
        transform: Transform,
        explicit_id: Option<BodyId>,
    ) -> BodyId {
        if let Some(id) = &explicit_id {
            if self.bodies.contains_key(id) {
                log::trace!("body {} already registered", id);
                return id.clone();
            }
        }

        let id = explicit_id.unwrap_or_else(|| self.allocate_id());
        let properties = properties.sanitized();
        let transform = if transform.is_finite() {
            transform.normalized()
        } else {
            log::warn!("body {} created with non-finite pose, resetting", id);
            Transform::IDENTITY
        };

        let handle = world.insert_body(&properties, transform.position, transform.orientation);
        let proxy = RenderProxy::new(id.clone(), &properties, transform);

        self.handles.insert(handle, id.clone());
        self.bodies.insert(
            id.clone(),
            PhysicsBody {
                id: id.clone(),
                properties,
                handle,
                proxy,
            },
        );

        log::debug!("registered body {}", id);
        id
    }

    pub fn remove(&mut self, world: &mut PhysicsWorld, id: &BodyId) -> Option<PhysicsBody> {
        let body = self.bodies.remove(id)?;
        self.handles.remove(&body.handle);
        world.remove_body(body.handle);
        log::debug!("removed body {}", id);
        Some(body)
    }

    pub fn clear(&mut self, world: &mut PhysicsWorld) {
        for body in self.bodies.values() {
            world.remove_body(body.handle);
        }
        self.bodies.clear();
        self.handles.clear();
    }

    pub fn get(&self, id: &BodyId) -> Option<&PhysicsBody> {
        self.bodies.get(id)
    }

    pub fn contains(&self, id: &BodyId) -> bool {
        self.bodies.contains_key(id)
    }

    pub fn handle(&self, id: &BodyId) -> Option<RigidBodyHandle> {
        self.bodies.get(id).map(|b| b.handle)
    }

    pub fn body_for_handle(&self, handle: RigidBodyHandle) -> Option<&BodyId> {
        self.handles.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &BodyId> {
        self.bodies.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhysicsBody> {
        self.bodies.values()
    }

    pub fn for_each(&self, mut visitor: impl FnMut(&RenderProxy)) {
        for body in self.bodies.values() {
            visitor(&body.proxy);
        }
    }

    pub fn set_holder(&mut self, id: &BodyId, holder: Option<Holder>) {
        if let Some(body) = self.bodies.get_mut(id) {
            body.proxy.held_by = holder;
        }
    }

    pub fn sync_render_proxies(&mut self, world: &PhysicsWorld) {
        for body in self.bodies.values_mut() {
            Self::sync_proxy(body, world);
        }
    }

    pub fn sync_render_proxy(&mut self, world: &PhysicsWorld, id: &BodyId) {
        if let Some(body) = self.bodies.get_mut(id) {
            Self::sync_proxy(body, world);
        }
    }

    fn sync_proxy(body: &mut PhysicsBody, world: &PhysicsWorld) {
        if let Some(state) = world.kinematics(body.handle) {
            body.proxy.position = state.position;
            body.proxy.orientation = state.orientation;
        }
    }

    fn allocate_id(&mut self) -> BodyId {
        loop {
            let id = BodyId(format!("{}:{}", self.id_prefix, self.next_id));
            self.next_id += 1;
            if !self.bodies.contains_key(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::physics::WorldConfig;

    fn setup() -> (PhysicsWorld, BodyRegistry) {
        let world = PhysicsWorld::with_config(&WorldConfig {
            ground_height: None,
            ..Default::default()
        });
        (world, BodyRegistry::new(&PlayerId::from("p1")))
    }

    #[test]
    fn create_allocates_prefixed_ids() {
        let (mut world, mut registry) = setup();
        let props = BodyProperties::sphere(0.5, 1.0);

        let a = registry.create(&mut world, props.clone(), Transform::IDENTITY, None);
        let b = registry.create(&mut world, props, Transform::IDENTITY, None);

        assert_ne!(a, b);
        assert!(a.as_str().starts_with("p1:"));
        assert_eq!(registry.len(), 2);
        assert_eq!(world.body_count(), 2);
    }

    #[test]
    fn creation_is_idempotent() {
        let (mut world, mut registry) = setup();
        let id = BodyId::from("obj_1");

        registry.create(
            &mut world,
            BodyProperties::dynamic_box(Vec3::splat(0.5), 2.0),
            Transform::from_position(Vec3::new(0.0, 5.0, 0.0)),
            Some(id.clone()),
        );
        let again = registry.create(
            &mut world,
            BodyProperties::sphere(3.0, 9.0),
            Transform::from_position(Vec3::new(7.0, 7.0, 7.0)),
            Some(id.clone()),
        );

        assert_eq!(again, id);
        assert_eq!(registry.len(), 1);
        assert_eq!(world.body_count(), 1);
        assert_eq!(registry.get(&id).unwrap().properties.mass, 2.0);
        assert_eq!(
            registry.get(&id).unwrap().proxy().position,
            Vec3::new(0.0, 5.0, 0.0)
        );
    }

    #[test]
    fn remove_unknown_is_noop() {
        let (mut world, mut registry) = setup();
        assert!(registry.remove(&mut world, &BodyId::from("ghost")).is_none());
    }

    #[test]
    fn remove_detaches_body_and_proxy() {
        let (mut world, mut registry) = setup();
        let id = registry.create(
            &mut world,
            BodyProperties::sphere(0.5, 1.0),
            Transform::IDENTITY,
            None,
        );
        let handle = registry.handle(&id).unwrap();

        registry.remove(&mut world, &id);

        assert!(!world.contains(handle));
        assert!(registry.body_for_handle(handle).is_none());
        let mut visited = 0;
        registry.for_each(|_| visited += 1);
        assert_eq!(visited, 0);
    }

    #[test]
    fn proxies_follow_simulation() {
        let (mut world, mut registry) = setup();
        let id = registry.create(
            &mut world,
            BodyProperties::sphere(0.5, 1.0),
            Transform::from_position(Vec3::new(0.0, 10.0, 0.0)),
            None,
        );

        for _ in 0..20 {
            world.step(1.0 / 60.0 + 0.0001);
        }
        registry.sync_render_proxies(&world);

        let proxy = registry.get(&id).unwrap().proxy();
        assert!(proxy.position.y < 10.0);
        assert_eq!(Some(proxy.position), world.body_position(registry.handle(&id).unwrap()));
    }

    #[test]
    fn clear_empties_world() {
        let (mut world, mut registry) = setup();
        for _ in 0..3 {
            registry.create(
                &mut world,
                BodyProperties::sphere(0.5, 1.0),
                Transform::IDENTITY,
                None,
            );
        }

        registry.clear(&mut world);

        assert!(registry.is_empty());
        assert_eq!(world.body_count(), 0);
    }
}
