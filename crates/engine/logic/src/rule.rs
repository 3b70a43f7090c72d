//! Transition rule protocol

use crate::context::{RuleContext, RuleExecutor};
use crate::filter::FilterSet;
use crate::matching::Binding;
use crate::transaction::TransitionResults;
use crate::Result;

/// Outcome of a rule's condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Condition not met; no transition this time
    Unmet,
    /// Condition met for the binding as given
    Met,
    /// Condition met for a narrowed binding, which the transition receives instead
    Refined(Binding),
}

impl Verdict {
    pub fn is_met(&self) -> bool {
        !matches!(self, Verdict::Unmet)
    }
}

impl From<bool> for Verdict {
    fn from(met: bool) -> Self {
        if met {
            Verdict::Met
        } else {
            Verdict::Unmet
        }
    }
}

/// A set of filters plus a condition deciding when matched objects transition
///
/// Conditions may update rule-internal state (counters, caches) as part of
/// evaluation. A transition is only ever invoked right after its condition
/// passed, on the same binding (or the refined one the condition returned).
pub trait TransitionRule {
    /// Unique rule name, also used to tag produced objects
    fn name(&self) -> &str;

    fn filters(&self) -> &FilterSet;

    fn filters_mut(&mut self) -> &mut FilterSet;

    /// Called once per step before any binding is processed
    fn begin_step(&mut self, _ctx: &dyn RuleContext) {}

    /// Decide whether the binding should transition
    fn condition(&mut self, ctx: &dyn RuleContext, binding: &Binding) -> Verdict;

    /// Compute the world mutation for a binding that just passed its condition
    fn transition(&mut self, exec: &mut dyn RuleExecutor, binding: &Binding) -> Result<TransitionResults>;

    /// Evaluate the condition and, if met, run the transition
    ///
    /// Returns `Ok(None)` when the condition is unmet and `Ok(Some(results))`
    /// when the transition ran.
    fn process(
        &mut self,
        exec: &mut dyn RuleExecutor,
        binding: &Binding,
    ) -> Result<Option<TransitionResults>> {
        match self.condition(exec.as_context(), binding) {
            Verdict::Unmet => Ok(None),
            Verdict::Met => self.transition(exec, binding).map(Some),
            Verdict::Refined(refined) => self.transition(exec, &refined).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{named, CategoryFilter};
    use crate::matching::{bindings, GroupObjects, IndividualObjects};
    use crate::object::{BodyHandle, StateKind, StateValue};
    use crate::rules::{GenericRule, SlicingRule};
    use crate::test_support::MockScene;
    use crate::transaction::ObjectAttrs;

    fn first_binding(rule: &dyn TransitionRule, scene: &MockScene) -> Binding {
        bindings(scene, rule.filters(), &scene.objects()).remove(0)
    }

    #[test]
    fn test_unmet_process_is_repeatable() {
        let mut scene = MockScene::new();
        let knife = scene.add("knife");
        scene.ability(knife, "slicer");
        scene.get_mut(knife).blade = Some(vec![BodyHandle(999)]);
        let apple = scene.add("apple");
        scene.ability(apple, "sliceable");
        scene.set(apple, StateKind::Sliced, false);

        let mut rule = SlicingRule::new().unwrap();
        let binding = first_binding(&rule, &scene);
        for _ in 0..2 {
            assert_eq!(rule.process(&mut scene, &binding).unwrap(), None);
        }
        assert_eq!(scene.state(apple, &StateKind::Sliced), Some(StateValue::Bool(false)));
        assert_eq!(scene.objects(), vec![knife, apple]);
    }

    #[test]
    fn test_process_without_writes_is_repeatable() {
        let filters = FilterSet::individual("peel", vec![named("fruit", CategoryFilter::new("orange"))]).unwrap();
        let mut rule = GenericRule::new(
            "peel",
            filters,
            |_ctx, _binding| true,
            |exec, binding| {
                let mut results = TransitionResults::new();
                let fruit = binding.individual.get("fruit");
                results.remove.extend(fruit);
                let mut attrs = ObjectAttrs::new("peel", "p0");
                if let Some(pose) = fruit.and_then(|f| exec.pose(f)) {
                    attrs = attrs.with_pose(pose.position, pose.orientation);
                }
                results.add.push(attrs);
                Ok(results)
            },
        );
        let mut scene = MockScene::new();
        scene.add("orange");

        let binding = first_binding(&rule, &scene);
        let first = rule.process(&mut scene, &binding).unwrap();
        let second = rule.process(&mut scene, &binding).unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(scene.objects().len(), 1, "process never mutates the population");
    }

    #[test]
    fn test_refined_binding_reaches_transition() {
        let filters = FilterSet::groups("count", vec![named("pears", CategoryFilter::new("pear"))]).unwrap();
        let mut rule = GenericRule::new(
            "count",
            filters,
            |_ctx, binding: &Binding| {
                let kept = binding.group.get("pears").iter().copied().take(1).collect();
                Verdict::Refined(Binding::new(
                    IndividualObjects::default(),
                    GroupObjects::new(vec![("pears".to_string(), kept)]),
                ))
            },
            |_exec, binding| {
                let mut results = TransitionResults::new();
                results.remove.extend_from_slice(binding.group.get("pears"));
                Ok(results)
            },
        );
        let mut scene = MockScene::new();
        let pear = scene.add("pear");
        scene.add("pear");

        let binding = first_binding(&rule, &scene);
        let results = rule.process(&mut scene, &binding).unwrap().unwrap();
        assert_eq!(results.remove, vec![pear]);
    }
}
