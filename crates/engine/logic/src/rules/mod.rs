//! Concrete transition rules
//!
//! - [`SlicingRule`]: a slicer cuts a sliceable object into its parts
//! - [`ContainerRule`]: a container holding exactly a recipe's contents turns them into one product
//! - [`ContainerGarbageRule`]: catch-all turning leftover container contents into garbage
//! - [`BlenderRule`]: solids and fluids inside a blender become an output fluid
//! - [`GenericRule`]: closures for one-off rules

mod blender;
mod container;
mod garbage;
mod generic;
mod slicing;

pub use blender::{BlenderRecipe, BlenderRule};
pub use container::ContainerRule;
pub use garbage::ContainerGarbageRule;
pub use generic::GenericRule;
pub use slicing::SlicingRule;

use crate::context::{RuleContext, RuleExecutor};
use crate::geometry::{mean_pose, Pose};
use crate::object::{ObjectId, StateKind, StateValue};
use crate::transaction::{ObjectAttrs, TransitionResults};
use crate::{Error, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Attributes of the object a container rule produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectTemplate {
    pub category: String,
    pub model: String,
    /// Name prefix; produced objects are named `{name}_{n}`
    pub name: String,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

impl ObjectTemplate {
    pub fn new(category: impl Into<String>, model: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            model: model.into(),
            name: name.into(),
            scale: Vec3::ONE,
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }
}

/// Replace `contents` with one object built from `template` at their mean pose
///
/// Shared by the container rules: spawns the product tagged with the rule
/// name, removes every content object and switches the container off.
pub(crate) fn consume_into_product(
    rule: &str,
    exec: &mut dyn RuleExecutor,
    container: ObjectId,
    contents: &[ObjectId],
    template: &ObjectTemplate,
    counter: &mut u64,
) -> Result<TransitionResults> {
    let poses = contents
        .iter()
        .map(|&obj| exec.pose(obj).ok_or(Error::UnknownObject(obj)))
        .collect::<Result<Vec<Pose>>>()?;
    let pose = mean_pose(&poses).ok_or_else(|| {
        Error::degenerate(rule, container, "contents have no well-defined mean pose")
    })?;

    let name = format!("{}_{}", template.name, counter);
    *counter += 1;

    let mut results = TransitionResults::new();
    results.add.push(
        ObjectAttrs::new(&template.category, &template.model)
            .named(name)
            .with_scale(template.scale)
            .with_pose(pose.position, pose.orientation)
            .with_asset(exec.resolve_asset(&template.category, &template.model))
            .produced_by(rule),
    );
    results.remove.extend_from_slice(contents);

    // Switch the container off so leftovers are not processed again right away
    if exec.state(container, &StateKind::ToggledOn).is_some() {
        exec.set_state(container, &StateKind::ToggledOn, StateValue::Bool(false));
    }

    Ok(results)
}

/// Display name for log lines
pub(crate) fn label(ctx: &dyn RuleContext, object: ObjectId) -> String {
    ctx.name(object)
        .map(str::to_string)
        .unwrap_or_else(|| object.to_string())
}
