//! Simulated objects
//!
//! A [`SimObject`] is everything the scene knows about one object: identity,
//! transform, capability tags, state facets and the geometry the transition
//! rules query.

use glam::{Quat, Vec3};
use logic::{Aabb, FillVolume, ObjectPart, Pose, StateKind, StateValue};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn one() -> Vec3 {
    Vec3::ONE
}

fn default_half_extents() -> Vec3 {
    Vec3::splat(0.05)
}

fn default_links() -> usize {
    1
}

/// An object in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimObject {
    /// Unique name
    pub name: String,
    pub category: String,
    pub model: String,

    /// Position of the base link in world space
    #[serde(default)]
    pub position: Vec3,
    /// Rotation as quaternion
    #[serde(default)]
    pub rotation: Quat,
    #[serde(default = "one")]
    pub scale: Vec3,
    /// Unscaled half size of the bounding box around the base link
    #[serde(default = "default_half_extents")]
    pub half_extents: Vec3,

    /// Capability tags such as `slicer` or `sliceable`
    #[serde(default)]
    pub abilities: Vec<String>,
    /// State facets the object exposes, with their initial values
    #[serde(default)]
    pub states: Vec<(StateKind, StateValue)>,
    /// Parts spawned in place of this object once sliced
    #[serde(default)]
    pub parts: Vec<ObjectPart>,

    /// Number of collision bodies
    #[serde(default = "default_links")]
    pub links: usize,
    /// Whether the object carries a contact-sensitive region (a blade)
    #[serde(default)]
    pub blade: bool,
    /// Interior volume, local frame
    #[serde(default)]
    pub fill_volume: Option<FillVolume>,

    /// Tag of the rule that produced this object
    #[serde(default)]
    pub produced_by: Option<String>,
    /// Asset the object was loaded from
    #[serde(default)]
    pub asset: Option<PathBuf>,
}

impl SimObject {
    /// Create an object at the origin
    pub fn new(name: impl Into<String>, category: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            model: model.into(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            half_extents: default_half_extents(),
            abilities: Vec::new(),
            states: Vec::new(),
            parts: Vec::new(),
            links: 1,
            blade: false,
            fill_volume: None,
            produced_by: None,
            asset: None,
        }
    }

    pub fn at_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_transform(mut self, position: Vec3, rotation: Quat) -> Self {
        self.position = position;
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_half_extents(mut self, half_extents: Vec3) -> Self {
        self.half_extents = half_extents;
        self
    }

    pub fn with_ability(mut self, ability: impl Into<String>) -> Self {
        self.abilities.push(ability.into());
        self
    }

    /// Expose a state facet with an initial value
    pub fn with_state(mut self, kind: StateKind, value: impl Into<StateValue>) -> Self {
        self.set_state(kind, value.into());
        self
    }

    pub fn with_part(mut self, part: ObjectPart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn with_links(mut self, links: usize) -> Self {
        self.links = links;
        self
    }

    pub fn with_blade(mut self) -> Self {
        self.blade = true;
        self
    }

    pub fn with_fill_volume(mut self, volume: FillVolume) -> Self {
        self.fill_volume = Some(volume);
        self
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.position = pose.position;
        self.rotation = pose.orientation;
    }

    /// World-space bounding box
    pub fn aabb(&self) -> Aabb {
        Aabb::new(-self.half_extents, self.half_extents).to_world(self.position, self.rotation, self.scale)
    }

    pub fn has_ability(&self, ability: &str) -> bool {
        self.abilities.iter().any(|a| a == ability)
    }

    pub fn state(&self, kind: &StateKind) -> Option<&StateValue> {
        self.states.iter().find(|(k, _)| k == kind).map(|(_, v)| v)
    }

    /// Set a facet, adding it if missing
    pub fn set_state(&mut self, kind: StateKind, value: StateValue) {
        match self.states.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, slot)) => *slot = value,
            None => self.states.push((kind, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_defaults() {
        let apple = SimObject::new("apple_0", "apple", "apple_a");
        assert_eq!(apple.pose(), Pose::default());
        assert_eq!(apple.scale, Vec3::ONE);
        assert_eq!(apple.links, 1);
        assert!(!apple.blade);
    }

    #[test]
    fn test_state_facets() {
        let mut apple = SimObject::new("apple_0", "apple", "apple_a").with_state(StateKind::Sliced, false);
        assert_eq!(apple.state(&StateKind::Sliced), Some(&StateValue::Bool(false)));
        assert_eq!(apple.state(&StateKind::Cooked), None);

        apple.set_state(StateKind::Sliced, StateValue::Bool(true));
        assert_eq!(apple.states.len(), 1, "existing facet is overwritten");
        assert_eq!(apple.state(&StateKind::Sliced), Some(&StateValue::Bool(true)));
    }

    #[test]
    fn test_aabb_follows_transform() {
        let bowl = SimObject::new("bowl", "bowl", "bowl_a")
            .at_position(Vec3::new(1.0, 0.0, 0.0))
            .with_half_extents(Vec3::splat(0.5))
            .with_scale(Vec3::splat(2.0));
        let aabb = bowl.aabb();
        assert!(aabb.contains_point(Vec3::new(1.9, 0.9, -0.9)));
        assert!(!aabb.contains_point(Vec3::new(2.1, 0.0, 0.0)));
    }

    #[test]
    fn test_ron_defaults() {
        let knife: SimObject =
            ron::from_str(r#"(name: "knife", category: "knife", model: "k0", abilities: ["slicer"], blade: true)"#)
                .unwrap();
        assert!(knife.has_ability("slicer"));
        assert!(knife.blade);
        assert_eq!(knife.rotation, Quat::IDENTITY);
        assert_eq!(knife.half_extents, Vec3::splat(0.05));
    }
}
