//! Collaborator interfaces consumed by the rule engine
//!
//! The engine never owns simulation resources. Everything it knows about the
//! world comes through these traits:
//!
//! - [`RuleContext`]: read-only queries (population, categories, states,
//!   poses, spatial and contact tests, particles)
//! - [`RuleExecutor`]: the narrow set of in-place writes transitions may make
//!   (state facets, particle visibility)
//! - [`ObjectRegistry`]: spawning and destroying objects when a step's batch
//!   is committed
//! - [`AssetResolver`]: mapping a category/model pair to a loadable asset

use crate::geometry::{Aabb, FillVolume, Pose};
use crate::object::{BodyHandle, ObjectId, ObjectPart, StateKind, StateValue};
use crate::transaction::ObjectAttrs;
use crate::Result;
use glam::Vec3;
use std::path::PathBuf;

/// Handle to one particle instancer of a fluid system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstancerId(pub u64);

/// Snapshot of one particle instancer
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleInstancer {
    pub id: InstancerId,
    /// World-space particle positions
    pub positions: Vec<Vec3>,
    /// Per-particle visibility, parallel to `positions`
    pub visibilities: Vec<bool>,
}

/// Resolves category/model identifiers to loadable asset paths
pub trait AssetResolver {
    fn resolve(&self, category: &str, model: &str) -> Option<PathBuf>;
}

/// Read-only view of the simulated world
///
/// Queries about an object that no longer exists return `None`/`false`/empty;
/// they never panic.
pub trait RuleContext {
    /// Live objects in stable registry iteration order
    fn objects(&self) -> Vec<ObjectId>;

    /// Unique object name
    fn name(&self, object: ObjectId) -> Option<&str>;

    /// Declared object category
    fn category(&self, object: ObjectId) -> Option<&str>;

    /// Whether the object declares the capability tag
    fn has_ability(&self, object: ObjectId, ability: &str) -> bool;

    /// Current value of a state facet, `None` if the object lacks the facet
    fn state(&self, object: ObjectId, kind: &StateKind) -> Option<StateValue>;

    /// World pose of the object's base link
    fn pose(&self, object: ObjectId) -> Option<Pose>;

    /// Per-axis object scale
    fn scale(&self, object: ObjectId) -> Option<Vec3>;

    /// World-space bounding box
    fn aabb(&self, object: ObjectId) -> Option<Aabb>;

    /// Sub-parts spawned when the object is sliced
    fn object_parts(&self, object: ObjectId) -> Vec<ObjectPart>;

    /// Contact-sensitive region (e.g. a blade) of a slicing object
    fn contact_region(&self, object: ObjectId) -> Option<Vec<BodyHandle>>;

    /// All collision bodies of the object
    fn collision_bodies(&self, object: ObjectId) -> Vec<BodyHandle>;

    /// Whether any body in `a` currently has a non-zero contact impulse with any body in `b`
    fn in_contact(&self, a: &[BodyHandle], b: &[BodyHandle]) -> bool;

    /// Local-frame fill volume of a container
    fn fill_volume(&self, object: ObjectId) -> Option<FillVolume>;

    /// Particle instancers of a fluid system; empty when the fluid does not exist yet
    fn particle_instancers(&self, fluid: &str) -> Vec<ParticleInstancer>;

    /// Tag of the rule that produced this object, if any
    fn produced_by(&self, object: ObjectId) -> Option<&str>;

    /// Asset resolution for spawn requests
    fn resolve_asset(&self, category: &str, model: &str) -> Option<PathBuf>;
}

/// Writes a transition may apply immediately to live objects
pub trait RuleExecutor: RuleContext {
    /// Set a state facet. Returns `false` if the object does not expose it.
    fn set_state(&mut self, object: ObjectId, kind: &StateKind, value: StateValue) -> bool;

    /// Set visibility for the given particle indices of one instancer
    fn set_particle_visibility(&mut self, instancer: InstancerId, indices: &[usize], visible: bool);

    /// Read-only view of this executor
    fn as_context(&self) -> &dyn RuleContext;
}

/// Object lifecycle collaborator
///
/// Performs all actual allocation and deallocation of simulated objects.
pub trait ObjectRegistry {
    /// Construct and insert a new object at the requested pose
    fn spawn(&mut self, attrs: ObjectAttrs) -> Result<ObjectId>;

    /// Remove a live object from the scene
    fn remove(&mut self, object: ObjectId) -> Result<()>;

    /// Called once after a transaction's removals and spawns are applied
    fn end_commit(&mut self) {}
}

/// Objects whose position lies inside `container`'s bounding box
///
/// The container itself is never reported.
pub fn contained_objects(ctx: &dyn RuleContext, container: ObjectId) -> Vec<ObjectId> {
    let Some(bbox) = ctx.aabb(container) else {
        return Vec::new();
    };

    ctx.objects()
        .into_iter()
        .filter(|&obj| obj != container)
        .filter(|&obj| {
            ctx.pose(obj)
                .map(|pose| bbox.contains_point(pose.position))
                .unwrap_or(false)
        })
        .collect()
}

/// Whether a container is allowed to run: inactive only when it exposes
/// `ToggledOn` and that facet is false
pub fn is_active(ctx: &dyn RuleContext, container: ObjectId) -> bool {
    !matches!(
        ctx.state(container, &StateKind::ToggledOn),
        Some(StateValue::Bool(false))
    )
}
