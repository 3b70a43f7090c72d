//! Closure-backed rules for simple one-off transitions

use crate::context::{RuleContext, RuleExecutor};
use crate::filter::FilterSet;
use crate::matching::Binding;
use crate::rule::{TransitionRule, Verdict};
use crate::transaction::TransitionResults;
use crate::Result;

type ConditionFn = Box<dyn FnMut(&dyn RuleContext, &Binding) -> Verdict>;
type TransitionFn = Box<dyn FnMut(&mut dyn RuleExecutor, &Binding) -> Result<TransitionResults>>;

/// Rule whose condition and transition are plain closures
///
/// ```ignore
/// let light_with_key = GenericRule::new(
///     "unlock",
///     FilterSet::individual("unlock", vec![
///         named("light", AndFilter::new(vec![
///             Box::new(CategoryFilter::new("light")),
///             Box::new(StateFilter::new(StateKind::ToggledOn, true)),
///         ])),
///         named("key", CategoryFilter::new("key")),
///     ])?,
///     |_ctx, _binding| true,
///     |_exec, binding| {
///         let mut results = TransitionResults::new();
///         results.remove.extend(binding.individual.get("key"));
///         Ok(results)
///     },
/// );
/// ```
pub struct GenericRule {
    name: String,
    filters: FilterSet,
    condition: ConditionFn,
    transition: TransitionFn,
}

impl GenericRule {
    pub fn new<C, V, T>(name: impl Into<String>, filters: FilterSet, mut condition: C, transition: T) -> Self
    where
        C: FnMut(&dyn RuleContext, &Binding) -> V + 'static,
        V: Into<Verdict>,
        T: FnMut(&mut dyn RuleExecutor, &Binding) -> Result<TransitionResults> + 'static,
    {
        Self {
            name: name.into(),
            filters,
            condition: Box::new(move |ctx, binding| condition(ctx, binding).into()),
            transition: Box::new(transition),
        }
    }
}

impl TransitionRule for GenericRule {
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
        (self.condition)(ctx, binding)
    }

    fn transition(&mut self, exec: &mut dyn RuleExecutor, binding: &Binding) -> Result<TransitionResults> {
        (self.transition)(exec, binding)
    }
}

impl std::fmt::Debug for GenericRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericRule")
            .field("name", &self.name)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}
