//! In-memory scene implementing the rule engine's collaborator traits

use crate::entity::SimObject;
use crate::error::{Error, Result};
use glam::{Quat, Vec3};
use logic::{
    Aabb, AssetResolver, BodyHandle, FillVolume, InstancerId, ObjectAttrs, ObjectId, ObjectPart, ObjectRegistry,
    ParticleInstancer, Pose, RuleContext, RuleExecutor, StateKind, StateValue,
};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// An object plus the handles the scene allocated for it
#[derive(Debug, Clone)]
struct Record {
    object: SimObject,
    bodies: Vec<BodyHandle>,
    blade: Option<Vec<BodyHandle>>,
}

/// Scene of simulated objects, fluid particles and contacts
///
/// Objects are kept in insertion order. Contacts are recorded per body pair
/// with the impulse between them; only pairs with a non-zero impulse count
/// as touching. Removed objects stay detached and can be re-inserted by
/// handle until the end of the next commit.
#[derive(Default)]
pub struct Scene {
    objects: BTreeMap<ObjectId, Record>,
    detached: HashMap<ObjectId, Record>,
    names: HashMap<String, ObjectId>,
    next_id: u64,
    next_body: u64,

    /// Impulse per unordered body pair
    contacts: HashMap<(BodyHandle, BodyHandle), f32>,

    /// Particle instancers per fluid system
    fluids: BTreeMap<String, Vec<ParticleInstancer>>,
    next_instancer: u64,

    /// Templates for objects spawned by category
    prototypes: HashMap<String, SimObject>,

    assets: Option<Box<dyn AssetResolver>>,
}

fn pair(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve spawned objects' assets with `resolver`
    pub fn with_assets(mut self, resolver: impl AssetResolver + 'static) -> Self {
        self.assets = Some(Box::new(resolver));
        self
    }

    /// Register the template used for spawned objects of the prototype's category
    ///
    /// Spawned objects take abilities, states, parts and geometry from the
    /// template; name, pose and scale come from the spawn request.
    pub fn add_prototype(&mut self, prototype: SimObject) {
        self.prototypes.insert(prototype.category.clone(), prototype);
    }

    /// Insert an object, allocating its collision bodies
    pub fn insert(&mut self, object: SimObject) -> Result<ObjectId> {
        if self.names.contains_key(&object.name) {
            return Err(Error::DuplicateName(object.name));
        }
        Ok(self.attach(object))
    }

    fn attach(&mut self, object: SimObject) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);

        let bodies = (0..object.links.max(1)).map(|_| self.alloc_body()).collect();
        let blade = object.blade.then(|| vec![self.alloc_body()]);

        self.names.insert(object.name.clone(), id);
        self.objects.insert(
            id,
            Record {
                object,
                bodies,
                blade,
            },
        );
        id
    }

    fn alloc_body(&mut self) -> BodyHandle {
        self.next_body += 1;
        BodyHandle(self.next_body)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SimObject> {
        self.objects.get(&id).map(|r| &r.object)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SimObject> {
        self.objects.get_mut(&id).map(|r| &mut r.object)
    }

    /// Look up a live object by name
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).copied()
    }

    /// Live objects of a category, in insertion order
    pub fn find_by_category(&self, category: &str) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, r)| r.object.category == category)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Move an object
    pub fn set_pose(&mut self, id: ObjectId, position: Vec3, rotation: Quat) -> Result<()> {
        let object = self
            .get_mut(id)
            .ok_or_else(|| Error::ObjectNotFound(id.to_string()))?;
        object.set_pose(Pose::new(position, rotation));
        Ok(())
    }

    /// Record a contact impulse between two bodies; zero clears the contact
    pub fn set_contact(&mut self, a: BodyHandle, b: BodyHandle, impulse: f32) {
        if impulse == 0.0 {
            self.contacts.remove(&pair(a, b));
        } else {
            self.contacts.insert(pair(a, b), impulse);
        }
    }

    /// Press `slicer`'s contact region against `target`'s base body
    pub fn touch(&mut self, slicer: ObjectId, target: ObjectId, impulse: f32) -> Result<()> {
        let blade = self
            .objects
            .get(&slicer)
            .ok_or_else(|| Error::ObjectNotFound(slicer.to_string()))?
            .blade
            .clone()
            .ok_or(Error::NoContactRegion(slicer))?;
        let body = self
            .objects
            .get(&target)
            .and_then(|r| r.bodies.first().copied())
            .ok_or_else(|| Error::ObjectNotFound(target.to_string()))?;

        for b in blade {
            self.set_contact(b, body, impulse);
        }
        Ok(())
    }

    pub fn clear_contacts(&mut self) {
        self.contacts.clear();
    }

    /// Add a particle instancer to a fluid system, creating the system if needed
    pub fn add_fluid(&mut self, fluid: &str, positions: Vec<Vec3>) -> InstancerId {
        self.next_instancer += 1;
        let id = InstancerId(self.next_instancer);
        let visibilities = vec![true; positions.len()];
        self.fluids
            .entry(fluid.to_string())
            .or_default()
            .push(ParticleInstancer {
                id,
                positions,
                visibilities,
            });
        id
    }

    pub fn instancer(&self, id: InstancerId) -> Option<&ParticleInstancer> {
        self.fluids.values().flatten().find(|inst| inst.id == id)
    }

    /// Number of visible particles across a fluid's instancers
    pub fn visible_particles(&self, fluid: &str) -> usize {
        self.fluids
            .get(fluid)
            .map(|insts| {
                insts
                    .iter()
                    .map(|inst| inst.visibilities.iter().filter(|v| **v).count())
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Names of live objects, in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.objects.values().map(|r| r.object.name.as_str()).collect()
    }

    /// `name`, or the first free `{name}_{n}` counting up from `id`
    fn unique_name(&self, name: String, id: u64) -> String {
        if !self.names.contains_key(&name) {
            return name;
        }
        let mut n = id;
        loop {
            let candidate = format!("{name}_{n}");
            if !self.names.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Number of removed objects still held for re-insertion
    pub fn detached_len(&self) -> usize {
        self.detached.len()
    }
}

impl RuleContext for Scene {
    fn objects(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    fn name(&self, object: ObjectId) -> Option<&str> {
        self.get(object).map(|o| o.name.as_str())
    }

    fn category(&self, object: ObjectId) -> Option<&str> {
        self.get(object).map(|o| o.category.as_str())
    }

    fn has_ability(&self, object: ObjectId, ability: &str) -> bool {
        self.get(object).is_some_and(|o| o.has_ability(ability))
    }

    fn state(&self, object: ObjectId, kind: &StateKind) -> Option<StateValue> {
        self.get(object)?.state(kind).cloned()
    }

    fn pose(&self, object: ObjectId) -> Option<Pose> {
        self.get(object).map(SimObject::pose)
    }

    fn scale(&self, object: ObjectId) -> Option<Vec3> {
        self.get(object).map(|o| o.scale)
    }

    fn aabb(&self, object: ObjectId) -> Option<Aabb> {
        self.get(object).map(SimObject::aabb)
    }

    fn object_parts(&self, object: ObjectId) -> Vec<ObjectPart> {
        self.get(object).map(|o| o.parts.clone()).unwrap_or_default()
    }

    fn contact_region(&self, object: ObjectId) -> Option<Vec<BodyHandle>> {
        self.objects.get(&object)?.blade.clone()
    }

    fn collision_bodies(&self, object: ObjectId) -> Vec<BodyHandle> {
        self.objects
            .get(&object)
            .map(|r| r.bodies.clone())
            .unwrap_or_default()
    }

    fn in_contact(&self, a: &[BodyHandle], b: &[BodyHandle]) -> bool {
        a.iter().any(|&x| {
            b.iter().any(|&y| {
                self.contacts
                    .get(&pair(x, y))
                    .is_some_and(|impulse| *impulse != 0.0)
            })
        })
    }

    fn fill_volume(&self, object: ObjectId) -> Option<FillVolume> {
        self.get(object)?.fill_volume
    }

    fn particle_instancers(&self, fluid: &str) -> Vec<ParticleInstancer> {
        self.fluids.get(fluid).cloned().unwrap_or_default()
    }

    fn produced_by(&self, object: ObjectId) -> Option<&str> {
        self.get(object)?.produced_by.as_deref()
    }

    fn resolve_asset(&self, category: &str, model: &str) -> Option<PathBuf> {
        self.assets.as_ref()?.resolve(category, model)
    }
}

impl RuleExecutor for Scene {
    fn set_state(&mut self, object: ObjectId, kind: &StateKind, value: StateValue) -> bool {
        match self.get_mut(object) {
            Some(o) if o.state(kind).is_some() => {
                o.set_state(kind.clone(), value);
                true
            }
            _ => false,
        }
    }

    fn set_particle_visibility(&mut self, instancer: InstancerId, indices: &[usize], visible: bool) {
        let Some(inst) = self
            .fluids
            .values_mut()
            .flatten()
            .find(|inst| inst.id == instancer)
        else {
            tracing::warn!(instancer = instancer.0, "unknown particle instancer");
            return;
        };
        for &i in indices {
            if let Some(v) = inst.visibilities.get_mut(i) {
                *v = visible;
            }
        }
    }

    fn as_context(&self) -> &dyn RuleContext {
        self
    }
}

impl ObjectRegistry for Scene {
    fn spawn(&mut self, attrs: ObjectAttrs) -> logic::Result<ObjectId> {
        // Re-insert a previously removed object
        if let Some(id) = attrs.object {
            let mut record = self.detached.remove(&id).ok_or(logic::Error::UnknownObject(id))?;
            if let (Some(position), Some(orientation)) = (attrs.position, attrs.orientation) {
                record.object.set_pose(Pose::new(position, orientation));
            }
            record.object.name = self.unique_name(record.object.name, id.0);
            self.names.insert(record.object.name.clone(), id);
            self.objects.insert(id, record);
            return Ok(id);
        }

        let category = attrs.category.ok_or(logic::Error::MissingAttribute("category"))?;
        let model = attrs.model.ok_or(logic::Error::MissingAttribute("model"))?;

        let mut object = match self.prototypes.get(&category) {
            Some(prototype) => prototype.clone(),
            None => SimObject::new(String::new(), category.clone(), model.clone()),
        };
        let base = attrs
            .name
            .unwrap_or_else(|| format!("{}_{}", category, self.next_id + 1));
        object.name = self.unique_name(base, self.next_id + 1);
        object.model = model;
        object.position = attrs.position.unwrap_or(Vec3::ZERO);
        object.rotation = attrs.orientation.unwrap_or(Quat::IDENTITY);
        if let Some(scale) = attrs.scale {
            object.scale = scale;
        }
        object.produced_by = attrs.produced_by;
        object.asset = attrs.asset_path;

        let name = object.name.clone();
        let id = self.attach(object);
        tracing::debug!(object = %id, name = %name, category = %category, "spawned object");
        Ok(id)
    }

    fn remove(&mut self, object: ObjectId) -> logic::Result<()> {
        let record = self
            .objects
            .remove(&object)
            .ok_or(logic::Error::UnknownObject(object))?;
        self.names.remove(&record.object.name);

        let bodies: Vec<BodyHandle> = record
            .bodies
            .iter()
            .chain(record.blade.iter().flatten())
            .copied()
            .collect();
        self.contacts
            .retain(|(a, b), _| !bodies.contains(a) && !bodies.contains(b));

        tracing::debug!(object = %object, name = %record.object.name, "removed object");
        self.detached.insert(object, record);
        Ok(())
    }

    fn end_commit(&mut self) {
        if !self.detached.is_empty() {
            tracing::trace!(count = self.detached.len(), "dropping detached objects");
            self.detached.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knife_and_apple() -> (Scene, ObjectId, ObjectId) {
        let mut scene = Scene::new();
        let knife = scene
            .insert(SimObject::new("knife", "knife", "k0").with_ability("slicer").with_blade())
            .unwrap();
        let apple = scene
            .insert(SimObject::new("apple", "apple", "a0").with_links(2))
            .unwrap();
        (scene, knife, apple)
    }

    #[test]
    fn test_insert_and_lookup() {
        let (scene, knife, apple) = knife_and_apple();
        assert_eq!(scene.objects(), vec![knife, apple]);
        assert_eq!(scene.find("apple"), Some(apple));
        assert_eq!(scene.collision_bodies(apple).len(), 2);
        assert!(scene.contact_region(knife).is_some());
        assert!(scene.contact_region(apple).is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (mut scene, _, _) = knife_and_apple();
        let result = scene.insert(SimObject::new("apple", "apple", "a1"));
        assert!(matches!(result, Err(Error::DuplicateName(_))));
    }

    #[test]
    fn test_contacts_need_impulse() {
        let (mut scene, knife, apple) = knife_and_apple();
        let blade = scene.contact_region(knife).unwrap();
        let bodies = scene.collision_bodies(apple);
        assert!(!scene.in_contact(&blade, &bodies));

        scene.touch(knife, apple, 2.5).unwrap();
        assert!(scene.in_contact(&blade, &bodies));
        assert!(scene.in_contact(&bodies, &blade), "contacts are symmetric");

        scene.touch(knife, apple, 0.0).unwrap();
        assert!(!scene.in_contact(&blade, &bodies));
    }

    #[test]
    fn test_touch_without_blade() {
        let (mut scene, knife, apple) = knife_and_apple();
        assert!(matches!(
            scene.touch(apple, knife, 1.0),
            Err(Error::NoContactRegion(id)) if id == apple
        ));
    }

    #[test]
    fn test_set_state_requires_facet() {
        let mut scene = Scene::new();
        let lamp = scene
            .insert(SimObject::new("lamp", "lamp", "l0").with_state(StateKind::ToggledOn, false))
            .unwrap();

        assert!(scene.set_state(lamp, &StateKind::ToggledOn, StateValue::Bool(true)));
        assert_eq!(scene.state(lamp, &StateKind::ToggledOn), Some(StateValue::Bool(true)));
        assert!(!scene.set_state(lamp, &StateKind::Open, StateValue::Bool(true)));
        assert_eq!(scene.state(lamp, &StateKind::Open), None);
    }

    #[test]
    fn test_spawn_uses_prototype() {
        let mut scene = Scene::new();
        scene.add_prototype(
            SimObject::new("", "half_apple", "ha0")
                .with_ability("sliceable")
                .with_state(StateKind::Cooked, false),
        );

        let attrs = ObjectAttrs::new("half_apple", "ha1")
            .named("apple_part_0")
            .with_pose(Vec3::X, Quat::IDENTITY)
            .produced_by("slicing");
        let id = scene.spawn(attrs).unwrap();

        let half = scene.get(id).unwrap();
        assert_eq!(half.name, "apple_part_0");
        assert_eq!(half.model, "ha1");
        assert!(half.has_ability("sliceable"));
        assert_eq!(half.position, Vec3::X);
        assert_eq!(scene.produced_by(id), Some("slicing"));
    }

    #[test]
    fn test_spawn_requires_category() {
        let mut scene = Scene::new();
        let result = scene.spawn(ObjectAttrs::default());
        assert!(matches!(result, Err(logic::Error::MissingAttribute("category"))));
    }

    #[test]
    fn test_spawn_name_collision_gets_suffix() {
        let (mut scene, _, _) = knife_and_apple();
        let id = scene.spawn(ObjectAttrs::new("apple", "a0").named("apple")).unwrap();
        assert_eq!(scene.name(id), Some("apple_3"));
    }

    #[test]
    fn test_spawn_name_suffix_skips_taken() {
        let (mut scene, _, _) = knife_and_apple();
        let taken = scene.insert(SimObject::new("apple_4", "apple", "a0")).unwrap();

        let id = scene.spawn(ObjectAttrs::new("apple", "a0").named("apple")).unwrap();
        assert_eq!(scene.name(id), Some("apple_5"));
        assert_eq!(scene.find("apple_4"), Some(taken));
        assert_eq!(scene.find("apple_5"), Some(id));
    }

    #[test]
    fn test_commit_drops_detached() {
        let (mut scene, knife, apple) = knife_and_apple();
        scene.remove(apple).unwrap();
        assert_eq!(scene.detached_len(), 1);

        scene.end_commit();
        assert_eq!(scene.detached_len(), 0);
        let attrs = ObjectAttrs {
            object: Some(apple),
            ..Default::default()
        };
        assert!(matches!(scene.spawn(attrs), Err(logic::Error::UnknownObject(id)) if id == apple));
        assert_eq!(scene.objects(), vec![knife]);
    }

    #[test]
    fn test_remove_and_reinsert() {
        let (mut scene, knife, apple) = knife_and_apple();
        scene.touch(knife, apple, 1.0).unwrap();

        scene.remove(apple).unwrap();
        assert_eq!(scene.objects(), vec![knife]);
        assert!(scene.find("apple").is_none());
        assert!(matches!(scene.remove(apple), Err(logic::Error::UnknownObject(_))));

        let attrs = ObjectAttrs {
            object: Some(apple),
            ..Default::default()
        };
        assert_eq!(scene.spawn(attrs).unwrap(), apple);
        assert_eq!(scene.find("apple"), Some(apple));
        let blade = scene.contact_region(knife).unwrap();
        assert!(
            !scene.in_contact(&blade, &scene.collision_bodies(apple)),
            "contacts are dropped on removal"
        );
    }

    #[test]
    fn test_particle_visibility() {
        let mut scene = Scene::new();
        let inst = scene.add_fluid("milk", vec![Vec3::ZERO; 4]);
        scene.set_particle_visibility(inst, &[0, 2, 9], false);

        assert_eq!(scene.instancer(inst).unwrap().visibilities, vec![false, true, false, true]);
        assert_eq!(scene.visible_particles("milk"), 2);
        assert_eq!(scene.visible_particles("water"), 0);
        assert!(scene.particle_instancers("water").is_empty());
    }
}
