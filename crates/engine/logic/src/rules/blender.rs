//! Blending solids and fluids into an output fluid

use super::label;
use crate::context::{InstancerId, RuleContext, RuleExecutor};
use crate::filter::{named, CategoryFilter, FilterSet};
use crate::geometry::{FillVolume, Pose};
use crate::matching::{Binding, GroupObjects};
use crate::object::{ObjectId, StateKind, StateValue};
use crate::rule::{TransitionRule, Verdict};
use crate::transaction::TransitionResults;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const BLENDER: &str = "blender";

/// Ingredients and output of a blender rule
///
/// Requirements are minimum counts: objects per solid category and particles
/// per fluid system, all inside the blender's fill volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlenderRecipe {
    /// Fluid the blender is filled with on success
    pub output: String,
    #[serde(default)]
    pub solids: Vec<(String, usize)>,
    #[serde(default)]
    pub fluids: Vec<(String, usize)>,
}

impl BlenderRecipe {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            solids: Vec::new(),
            fluids: Vec::new(),
        }
    }

    pub fn solid(mut self, category: impl Into<String>, min: usize) -> Self {
        self.solids.push((category.into(), min));
        self
    }

    pub fn fluid(mut self, fluid: impl Into<String>, min: usize) -> Self {
        self.fluids.push((fluid.into(), min));
        self
    }
}

/// Blender transition rule
///
/// The blender role matches by category. Every required solid category is
/// a group, narrowed by the condition to the objects inside the blender; the
/// transition consumes exactly those, hides the in-volume fluid particles and
/// marks the blender filled with the output fluid.
#[derive(Debug)]
pub struct BlenderRule {
    name: String,
    filters: FilterSet,
    recipe: BlenderRecipe,
    /// Local-frame fill volume per blender, pruned to live blenders each step
    volumes: HashMap<ObjectId, FillVolume>,
}

impl BlenderRule {
    pub fn new(name: impl Into<String>, blender_category: &str, recipe: BlenderRecipe) -> Result<Self> {
        let name = name.into();
        let groups = recipe
            .solids
            .iter()
            .map(|(category, _)| named(category.clone(), CategoryFilter::new(category.clone())))
            .collect();
        let filters = FilterSet::new(
            &name,
            vec![named(BLENDER, CategoryFilter::new(blender_category))],
            groups,
        )?;
        Ok(Self {
            name,
            filters,
            recipe,
            volumes: HashMap::new(),
        })
    }

    pub fn recipe(&self) -> &BlenderRecipe {
        &self.recipe
    }

    /// Number of blenders whose fill volume has been cached
    pub fn cached_volumes(&self) -> usize {
        self.volumes.len()
    }

    fn volume(&mut self, ctx: &dyn RuleContext, blender: ObjectId) -> Option<FillVolume> {
        if let Some(volume) = self.volumes.get(&blender) {
            return Some(*volume);
        }
        let volume = ctx.fill_volume(blender)?;
        self.volumes.insert(blender, volume);
        Some(volume)
    }

    /// Indices of particles inside the volume, per instancer of `fluid`
    fn particles_inside(
        ctx: &dyn RuleContext,
        fluid: &str,
        volume: &FillVolume,
        pose: &Pose,
    ) -> Vec<(InstancerId, Vec<usize>)> {
        ctx.particle_instancers(fluid)
            .into_iter()
            .map(|inst| {
                let inside = inst
                    .positions
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| volume.contains(pose, **p))
                    .map(|(i, _)| i)
                    .collect();
                (inst.id, inside)
            })
            .collect()
    }
}

impl TransitionRule for BlenderRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn filters(&self) -> &FilterSet {
        &self.filters
    }

    fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.filters
    }

    fn begin_step(&mut self, ctx: &dyn RuleContext) {
        let live = ctx.objects();
        self.volumes.retain(|blender, _| live.contains(blender));
    }

    fn condition(&mut self, ctx: &dyn RuleContext, binding: &Binding) -> Verdict {
        let Some(blender) = binding.individual.get(BLENDER) else {
            return Verdict::Unmet;
        };
        let Some(volume) = self.volume(ctx, blender) else {
            return Verdict::Unmet;
        };
        let Some(pose) = ctx.pose(blender) else {
            return Verdict::Unmet;
        };

        let mut narrowed = GroupObjects::default();
        for (category, min) in &self.recipe.solids {
            let inside: Vec<ObjectId> = binding
                .group
                .get(category)
                .iter()
                .copied()
                .filter(|&obj| {
                    ctx.pose(obj)
                        .map(|p| volume.contains(&pose, p.position))
                        .unwrap_or(false)
                })
                .collect();
            if inside.len() < *min {
                return Verdict::Unmet;
            }
            narrowed.set(category, inside);
        }

        for (fluid, min) in &self.recipe.fluids {
            let per_instancer = Self::particles_inside(ctx, fluid, &volume, &pose);
            // Fluid system not spawned yet
            if per_instancer.is_empty() {
                return Verdict::Unmet;
            }
            let count: usize = per_instancer.iter().map(|(_, inside)| inside.len()).sum();
            if count < *min {
                return Verdict::Unmet;
            }
        }

        Verdict::Refined(Binding::new(binding.individual.clone(), narrowed))
    }

    fn transition(&mut self, exec: &mut dyn RuleExecutor, binding: &Binding) -> Result<TransitionResults> {
        let blender = binding
            .individual
            .get(BLENDER)
            .ok_or_else(|| Error::malformed(&self.name, "binding lacks a blender"))?;
        let volume = self
            .volume(exec.as_context(), blender)
            .ok_or_else(|| Error::degenerate(&self.name, blender, "blender has no fill volume"))?;
        let pose = exec.pose(blender).ok_or(Error::UnknownObject(blender))?;

        let mut results = TransitionResults::new();
        results.remove.extend(binding.group.objects());

        for (fluid, _) in &self.recipe.fluids {
            for (instancer, inside) in Self::particles_inside(exec.as_context(), fluid, &volume, &pose) {
                if !inside.is_empty() {
                    exec.set_particle_visibility(instancer, &inside, false);
                }
            }
        }

        let filled = StateKind::filled(&self.recipe.output);
        if !exec.set_state(blender, &filled, StateValue::Bool(true)) {
            tracing::debug!(rule = %self.name, blender = %blender, "blender has no {:?} facet", filled);
        }
        tracing::debug!(
            rule = %self.name,
            blender = %label(exec.as_context(), blender),
            consumed = results.remove.len(),
            "blended {}",
            self.recipe.output
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ObjectRegistry;
    use crate::engine::RuleEngine;
    use crate::geometry::Aabb;
    use crate::test_support::MockScene;
    use glam::Vec3;

    fn smoothie() -> BlenderRule {
        let recipe = BlenderRecipe::new("strawberry_smoothie")
            .solid("strawberry", 5)
            .solid("ice_cube", 5)
            .fluid("milk", 10);
        BlenderRule::new("strawberry_smoothie", "blender", recipe).unwrap()
    }

    fn blender_scene(strawberries: usize) -> (MockScene, ObjectId) {
        let mut scene = MockScene::new();
        let blender = scene.add("blender");
        scene.place(blender, Vec3::new(2.0, 0.0, 0.0));
        scene.set(blender, StateKind::filled("strawberry_smoothie"), false);
        scene.get_mut(blender).fill_volume = Some(FillVolume::Box(Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5))));

        for _ in 0..strawberries {
            let s = scene.add("strawberry");
            scene.place(s, Vec3::new(2.1, 0.0, 0.0));
        }
        for _ in 0..5 {
            let c = scene.add("ice_cube");
            scene.place(c, Vec3::new(1.9, 0.1, 0.0));
        }
        (scene, blender)
    }

    fn milk(scene: &mut MockScene, inside: usize, outside: usize) -> InstancerId {
        let mut positions = vec![Vec3::new(2.0, -0.2, 0.1); inside];
        positions.extend(std::iter::repeat(Vec3::new(8.0, 0.0, 0.0)).take(outside));
        scene.add_fluid("milk", positions)
    }

    #[test]
    fn test_blend_consumes_only_in_volume_ingredients() {
        let (mut scene, blender) = blender_scene(5);
        let outside = scene.add("strawberry");
        scene.place(outside, Vec3::new(5.0, 0.0, 0.0));
        let inst = milk(&mut scene, 10, 3);

        let mut engine = RuleEngine::new(vec![Box::new(smoothie()) as Box<dyn TransitionRule>]).unwrap();
        let (_, report) = engine.step(&mut scene).unwrap();

        assert_eq!(report.removed.len(), 10, "5 strawberries and 5 ice cubes");
        assert!(!report.removed.contains(&outside));
        let mut expected = vec![false; 10];
        expected.extend([true; 3]);
        assert_eq!(scene.visibilities(inst), expected);
        assert_eq!(
            scene.state(blender, &StateKind::filled("strawberry_smoothie")),
            Some(StateValue::Bool(true))
        );
    }

    #[test]
    fn test_missing_solid_is_unmet() {
        let (mut scene, _blender) = blender_scene(4);
        milk(&mut scene, 10, 0);

        let mut engine = RuleEngine::new(vec![Box::new(smoothie()) as Box<dyn TransitionRule>]).unwrap();
        assert!(engine.step(&mut scene).unwrap().0.is_empty());
    }

    #[test]
    fn test_missing_or_short_fluid_is_unmet() {
        let (mut scene, _blender) = blender_scene(5);
        let mut engine = RuleEngine::new(vec![Box::new(smoothie()) as Box<dyn TransitionRule>]).unwrap();
        assert!(engine.step(&mut scene).unwrap().0.is_empty(), "no milk system yet");

        milk(&mut scene, 9, 20);
        assert!(engine.step(&mut scene).unwrap().0.is_empty(), "only 9 particles inside");
    }

    #[test]
    fn test_volume_follows_blender_pose() {
        let (mut scene, blender) = blender_scene(5);
        milk(&mut scene, 10, 0);
        let mut rule = smoothie();

        // Moving the blender away after the volume was cached leaves everything outside
        let binding = crate::matching::bindings(&scene, rule.filters(), &scene.objects()).remove(0);
        assert!(rule.condition(&scene, &binding).is_met());
        assert_eq!(rule.cached_volumes(), 1);

        scene.place(blender, Vec3::new(20.0, 0.0, 0.0));
        assert_eq!(rule.condition(&scene, &binding), Verdict::Unmet);
    }

    #[test]
    fn test_removed_blender_volume_dropped() {
        let (mut scene, blender) = blender_scene(5);
        milk(&mut scene, 10, 0);
        let mut rule = smoothie();

        let binding = crate::matching::bindings(&scene, rule.filters(), &scene.objects()).remove(0);
        rule.condition(&scene, &binding);
        rule.begin_step(&scene);
        assert_eq!(rule.cached_volumes(), 1, "live blender keeps its volume");

        scene.remove(blender).unwrap();
        rule.begin_step(&scene);
        assert_eq!(rule.cached_volumes(), 0);
    }

    #[test]
    fn test_recipe_builder_keeps_order() {
        let recipe = BlenderRecipe::new("strawberry_smoothie")
            .solid("strawberry", 5)
            .solid("ice_cube", 5)
            .fluid("milk", 10);
        assert_eq!(recipe.solids[0], ("strawberry".to_string(), 5));
        assert_eq!(recipe.solids[1].0, "ice_cube");
        assert_eq!(recipe.fluids, vec![("milk".to_string(), 10)]);
    }

    #[test]
    fn test_groups_follow_solids() {
        let recipe = BlenderRecipe::new("juice").solid("orange", 2).solid("lemon", 1);
        let rule = BlenderRule::new("juicer", "blender", recipe).unwrap();
        let keys: Vec<_> = rule.filters().group_filters().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["orange", "lemon"]);
        assert!(rule.filters().requires_individual_filters());
    }
}
