//! Slicing: a slicer in contact with a sliceable cuts it into its parts

use crate::context::{RuleContext, RuleExecutor};
use crate::filter::{named, AbilityFilter, FilterSet};
use crate::geometry::Pose;
use crate::matching::Binding;
use crate::object::{StateKind, StateValue};
use crate::rule::{TransitionRule, Verdict};
use crate::transaction::{ObjectAttrs, TransitionResults};
use crate::{Error, Result};

pub const SLICER: &str = "slicer";
pub const SLICEABLE: &str = "sliceable";

/// Transition rule for slicer / sliceable object pairs
///
/// Fires when the slicer's contact region touches any collision body of a
/// sliceable that is not yet sliced. The `Sliced` flag is set during the
/// transition and is the only guard against cutting the same object again
/// from further contact points.
#[derive(Debug)]
pub struct SlicingRule {
    name: String,
    filters: FilterSet,
}

impl SlicingRule {
    pub fn new() -> Result<Self> {
        Self::named("slicing")
    }

    pub fn named(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let filters = FilterSet::individual(
            &name,
            vec![
                named(SLICER, AbilityFilter::new(SLICER)),
                named(SLICEABLE, AbilityFilter::new(SLICEABLE)),
            ],
        )?;
        Ok(Self { name, filters })
    }
}

impl TransitionRule for SlicingRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn filters(&self) -> &FilterSet {
        &self.filters
    }

    fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.filters
    }

    fn condition(&mut self, ctx: &dyn RuleContext, binding: &Binding) -> Verdict {
        let (Some(slicer), Some(sliced)) = (
            binding.individual.get(SLICER),
            binding.individual.get(SLICEABLE),
        ) else {
            return Verdict::Unmet;
        };
        if slicer == sliced {
            return Verdict::Unmet;
        }

        let Some(blade) = ctx.contact_region(slicer) else {
            return Verdict::Unmet;
        };
        if !ctx.in_contact(&blade, &ctx.collision_bodies(sliced)) {
            return Verdict::Unmet;
        }

        // Only objects exposing the facet can be sliced, and only once
        (ctx.state(sliced, &StateKind::Sliced) == Some(StateValue::Bool(false))).into()
    }

    fn transition(&mut self, exec: &mut dyn RuleExecutor, binding: &Binding) -> Result<TransitionResults> {
        let sliced = binding
            .individual
            .get(SLICEABLE)
            .ok_or_else(|| Error::malformed(&self.name, "binding lacks a sliceable"))?;

        let pose = exec.pose(sliced).ok_or(Error::UnknownObject(sliced))?;
        let scale = exec.scale(sliced).ok_or(Error::UnknownObject(sliced))?;
        if !pose.is_valid() || !scale.is_finite() {
            return Err(Error::degenerate(&self.name, sliced, "object pose or scale is not finite"));
        }
        let base_name = exec
            .name(sliced)
            .map(str::to_string)
            .unwrap_or_else(|| format!("object_{}", sliced.0));

        let mut results = TransitionResults::new();
        for (index, part) in exec.object_parts(sliced).into_iter().enumerate() {
            // Part offsets are annotated w.r.t. the unscaled base link
            let position = pose.transform_point(part.offset * scale);
            let orientation = (pose.orientation * part.rotation).normalize();
            let part_pose = Pose::new(position, orientation);
            if !part_pose.is_valid() {
                return Err(Error::degenerate(
                    &self.name,
                    sliced,
                    format!("part {index} has no valid world pose"),
                ));
            }

            results.add.push(
                ObjectAttrs::new(&part.category, &part.model)
                    .named(format!("{base_name}_part_{index}"))
                    .with_scale(scale)
                    .with_pose(part_pose.position, part_pose.orientation)
                    .with_asset(exec.resolve_asset(&part.category, &part.model)),
            );
        }
        results.remove.push(sliced);

        exec.set_state(sliced, &StateKind::Sliced, StateValue::Bool(true));
        tracing::debug!(rule = %self.name, object = %sliced, parts = results.add.len(), "sliced object");

        Ok(results)
    }
}
