//! Catch-all for containers: whatever is left inside becomes garbage

use super::{consume_into_product, label, ObjectTemplate};
use crate::context::{contained_objects, is_active, RuleContext, RuleExecutor};
use crate::filter::{named, FilterSet, ObjectFilter};
use crate::matching::Binding;
use crate::object::ObjectId;
use crate::rule::{TransitionRule, Verdict};
use crate::transaction::TransitionResults;
use crate::{Error, Result};
use std::collections::HashMap;

pub const CONTAINER: &str = "container";

/// Turns the contents of an active container into a single garbage object
///
/// Meant to be ordered after every legitimate container rule. A container
/// holding nothing but garbage this rule produced is left alone.
#[derive(Debug)]
pub struct ContainerGarbageRule {
    name: String,
    filters: FilterSet,
    template: ObjectTemplate,
    /// Contents observed by the last passing condition, per container
    contained: HashMap<ObjectId, Vec<ObjectId>>,
    counter: u64,
}

impl ContainerGarbageRule {
    pub fn new(
        name: impl Into<String>,
        template: ObjectTemplate,
        container: impl ObjectFilter + 'static,
    ) -> Result<Self> {
        let name = name.into();
        let filters = FilterSet::individual(&name, vec![named(CONTAINER, container)])?;
        Ok(Self {
            name,
            filters,
            template,
            contained: HashMap::new(),
            counter: 0,
        })
    }

    pub fn template(&self) -> &ObjectTemplate {
        &self.template
    }
}

impl TransitionRule for ContainerGarbageRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn filters(&self) -> &FilterSet {
        &self.filters
    }

    fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.filters
    }

    fn begin_step(&mut self, _ctx: &dyn RuleContext) {
        self.contained.clear();
    }

    fn condition(&mut self, ctx: &dyn RuleContext, binding: &Binding) -> Verdict {
        let Some(container) = binding.individual.get(CONTAINER) else {
            return Verdict::Unmet;
        };
        if !is_active(ctx, container) {
            return Verdict::Unmet;
        }

        let contents = contained_objects(ctx, container);
        if let [only] = contents.as_slice() {
            if ctx.produced_by(*only) == Some(self.name.as_str()) {
                return Verdict::Unmet;
            }
        }
        if contents.is_empty() {
            return Verdict::Unmet;
        }

        self.contained.insert(container, contents);
        Verdict::Met
    }

    fn transition(&mut self, exec: &mut dyn RuleExecutor, binding: &Binding) -> Result<TransitionResults> {
        let container = binding
            .individual
            .get(CONTAINER)
            .ok_or_else(|| Error::malformed(&self.name, "binding lacks a container"))?;
        let contents = match self.contained.remove(&container) {
            Some(contents) => contents,
            None => contained_objects(exec.as_context(), container),
        };

        let results = consume_into_product(
            &self.name,
            exec,
            container,
            &contents,
            &self.template,
            &mut self.counter,
        )?;
        tracing::info!(
            rule = %self.name,
            container = %label(exec.as_context(), container),
            consumed = contents.len(),
            "container contents turned into garbage"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RuleEngine;
    use crate::filter::CategoryFilter;
    use crate::test_support::MockScene;
    use glam::Vec3;

    fn garbage_engine() -> RuleEngine {
        let rule = ContainerGarbageRule::new(
            "bowl_garbage",
            ObjectTemplate::new("garbage", "garbage_0", "garbage"),
            CategoryFilter::new("bowl"),
        )
        .unwrap();
        RuleEngine::new(vec![Box::new(rule) as Box<dyn TransitionRule>]).unwrap()
    }

    fn bowl(scene: &mut MockScene) -> ObjectId {
        let bowl = scene.add("bowl");
        scene.get_mut(bowl).half_size = Vec3::splat(0.5);
        bowl
    }

    #[test]
    fn test_leftovers_become_garbage() {
        let mut scene = MockScene::new();
        bowl(&mut scene);
        let carrot = scene.add("carrot");
        let pepper = scene.add("pepper");
        scene.place(pepper, Vec3::new(0.2, 0.0, 0.0));

        let mut engine = garbage_engine();
        let (_, report) = engine.step(&mut scene).unwrap();
        assert_eq!(report.removed, vec![carrot, pepper]);
        assert_eq!(report.spawned.len(), 1);
        assert_eq!(scene.spawned[0].name.as_deref(), Some("garbage_0"));
        assert_eq!(scene.produced_by(report.spawned[0]), Some("bowl_garbage"));
    }

    #[test]
    fn test_lone_garbage_is_left_alone() {
        let mut scene = MockScene::new();
        bowl(&mut scene);
        scene.add("carrot");

        let mut engine = garbage_engine();
        let (_, report) = engine.step(&mut scene).unwrap();
        assert_eq!(report.spawned.len(), 1);

        // Only the garbage this rule produced remains inside
        let (tx, _) = engine.step(&mut scene).unwrap();
        assert!(tx.is_empty());
    }

    #[test]
    fn test_foreign_object_named_like_garbage_is_consumed() {
        let mut scene = MockScene::new();
        bowl(&mut scene);
        let impostor = scene.add("garbage");
        scene.get_mut(impostor).name = "garbage_7".to_string();

        let mut engine = garbage_engine();
        let (_, report) = engine.step(&mut scene).unwrap();
        assert_eq!(report.removed, vec![impostor], "only the produced_by tag exempts");
    }

    #[test]
    fn test_empty_or_inactive_container_is_unmet() {
        let mut scene = MockScene::new();
        let b = bowl(&mut scene);
        let mut engine = garbage_engine();
        assert!(engine.step(&mut scene).unwrap().0.is_empty());

        scene.set(b, crate::object::StateKind::ToggledOn, false);
        scene.add("carrot");
        assert!(engine.step(&mut scene).unwrap().0.is_empty());
    }
}
