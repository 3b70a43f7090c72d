//! In-memory scene for unit tests

use crate::context::{InstancerId, ObjectRegistry, ParticleInstancer, RuleContext, RuleExecutor};
use crate::geometry::{Aabb, FillVolume, Pose};
use crate::object::{BodyHandle, ObjectId, ObjectPart, StateKind, StateValue};
use crate::transaction::ObjectAttrs;
use crate::{Error, Result};
use glam::{Quat, Vec3};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

pub struct MockObject {
    pub name: String,
    pub category: String,
    pub abilities: HashSet<String>,
    pub states: HashMap<StateKind, StateValue>,
    pub pose: Pose,
    pub scale: Vec3,
    pub half_size: Vec3,
    pub parts: Vec<ObjectPart>,
    pub blade: Option<Vec<BodyHandle>>,
    pub bodies: Vec<BodyHandle>,
    pub fill_volume: Option<FillVolume>,
    pub produced_by: Option<String>,
}

#[derive(Default)]
pub struct MockScene {
    objects: BTreeMap<ObjectId, MockObject>,
    next_id: u64,
    contacts: HashSet<(BodyHandle, BodyHandle)>,
    fluids: HashMap<String, Vec<ParticleInstancer>>,
    next_instancer: u64,
    pub spawned: Vec<ObjectAttrs>,
}

impl MockScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, category: &str) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        self.objects.insert(
            id,
            MockObject {
                name: format!("{}_{}", category, id.0),
                category: category.to_string(),
                abilities: HashSet::new(),
                states: HashMap::new(),
                pose: Pose::default(),
                scale: Vec3::ONE,
                half_size: Vec3::splat(0.05),
                parts: Vec::new(),
                blade: None,
                bodies: vec![BodyHandle(id.0 * 10)],
                fill_volume: None,
                produced_by: None,
            },
        );
        id
    }

    pub fn get_mut(&mut self, id: ObjectId) -> &mut MockObject {
        self.objects.get_mut(&id).expect("unknown mock object")
    }

    pub fn set(&mut self, id: ObjectId, kind: StateKind, value: impl Into<StateValue>) {
        self.get_mut(id).states.insert(kind, value.into());
    }

    pub fn ability(&mut self, id: ObjectId, ability: &str) {
        self.get_mut(id).abilities.insert(ability.to_string());
    }

    pub fn place(&mut self, id: ObjectId, position: Vec3) {
        self.get_mut(id).pose = Pose::new(position, Quat::IDENTITY);
    }

    pub fn touch(&mut self, a: BodyHandle, b: BodyHandle) {
        self.contacts.insert((a, b));
    }

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

    pub fn visibilities(&self, instancer: InstancerId) -> Vec<bool> {
        self.fluids
            .values()
            .flatten()
            .find(|inst| inst.id == instancer)
            .map(|inst| inst.visibilities.clone())
            .unwrap_or_default()
    }
}

impl RuleContext for MockScene {
    fn objects(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    fn name(&self, object: ObjectId) -> Option<&str> {
        self.objects.get(&object).map(|o| o.name.as_str())
    }

    fn category(&self, object: ObjectId) -> Option<&str> {
        self.objects.get(&object).map(|o| o.category.as_str())
    }

    fn has_ability(&self, object: ObjectId, ability: &str) -> bool {
        self.objects
            .get(&object)
            .map(|o| o.abilities.contains(ability))
            .unwrap_or(false)
    }

    fn state(&self, object: ObjectId, kind: &StateKind) -> Option<StateValue> {
        self.objects.get(&object)?.states.get(kind).cloned()
    }

    fn pose(&self, object: ObjectId) -> Option<Pose> {
        self.objects.get(&object).map(|o| o.pose)
    }

    fn scale(&self, object: ObjectId) -> Option<Vec3> {
        self.objects.get(&object).map(|o| o.scale)
    }

    fn aabb(&self, object: ObjectId) -> Option<Aabb> {
        let o = self.objects.get(&object)?;
        Some(Aabb::from_center_half_size(o.pose.position, o.half_size * o.scale))
    }

    fn object_parts(&self, object: ObjectId) -> Vec<ObjectPart> {
        self.objects
            .get(&object)
            .map(|o| o.parts.clone())
            .unwrap_or_default()
    }

    fn contact_region(&self, object: ObjectId) -> Option<Vec<BodyHandle>> {
        self.objects.get(&object)?.blade.clone()
    }

    fn collision_bodies(&self, object: ObjectId) -> Vec<BodyHandle> {
        self.objects
            .get(&object)
            .map(|o| o.bodies.clone())
            .unwrap_or_default()
    }

    fn in_contact(&self, a: &[BodyHandle], b: &[BodyHandle]) -> bool {
        a.iter().any(|x| {
            b.iter()
                .any(|y| self.contacts.contains(&(*x, *y)) || self.contacts.contains(&(*y, *x)))
        })
    }

    fn fill_volume(&self, object: ObjectId) -> Option<FillVolume> {
        self.objects.get(&object)?.fill_volume
    }

    fn particle_instancers(&self, fluid: &str) -> Vec<ParticleInstancer> {
        self.fluids.get(fluid).cloned().unwrap_or_default()
    }

    fn produced_by(&self, object: ObjectId) -> Option<&str> {
        self.objects.get(&object)?.produced_by.as_deref()
    }

    fn resolve_asset(&self, category: &str, model: &str) -> Option<PathBuf> {
        Some(PathBuf::from(format!("objects/{category}/{model}/usd/{model}.usd")))
    }
}

impl RuleExecutor for MockScene {
    fn set_state(&mut self, object: ObjectId, kind: &StateKind, value: StateValue) -> bool {
        match self.objects.get_mut(&object) {
            Some(o) if o.states.contains_key(kind) => {
                o.states.insert(kind.clone(), value);
                true
            }
            _ => false,
        }
    }

    fn set_particle_visibility(&mut self, instancer: InstancerId, indices: &[usize], visible: bool) {
        for inst in self.fluids.values_mut().flatten() {
            if inst.id == instancer {
                for &i in indices {
                    if let Some(v) = inst.visibilities.get_mut(i) {
                        *v = visible;
                    }
                }
            }
        }
    }

    fn as_context(&self) -> &dyn RuleContext {
        self
    }
}

impl ObjectRegistry for MockScene {
    fn spawn(&mut self, attrs: ObjectAttrs) -> Result<ObjectId> {
        let category = attrs.category.clone().ok_or(Error::MissingAttribute("category"))?;
        let id = self.add(&category);
        let object = self.get_mut(id);
        if let Some(name) = &attrs.name {
            object.name = name.clone();
        }
        object.pose = Pose::new(
            attrs.position.unwrap_or(Vec3::ZERO),
            attrs.orientation.unwrap_or(Quat::IDENTITY),
        );
        object.scale = attrs.scale.unwrap_or(Vec3::ONE);
        object.produced_by = attrs.produced_by.clone();
        self.spawned.push(attrs);
        Ok(id)
    }

    fn remove(&mut self, object: ObjectId) -> Result<()> {
        self.objects
            .remove(&object)
            .map(|_| ())
            .ok_or(Error::UnknownObject(object))
    }
}
