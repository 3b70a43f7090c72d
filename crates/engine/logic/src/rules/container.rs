//! Container recipes: fixed contents held long enough become one product

use super::{consume_into_product, label, ObjectTemplate};
use crate::context::{contained_objects, is_active, RuleContext, RuleExecutor};
use crate::filter::{named, FilterSet, ObjectFilter};
use crate::matching::Binding;
use crate::object::ObjectId;
use crate::rule::{TransitionRule, Verdict};
use crate::transaction::TransitionResults;
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap};

pub const CONTAINER: &str = "container";

/// Debounce bookkeeping for one container
#[derive(Debug, Default)]
struct Debounce {
    /// Contained set seen on the last evaluation
    observed: BTreeSet<ObjectId>,
    /// Consecutive steps the matching contents have been observed
    count: u32,
    /// Count already advanced this step
    advanced: bool,
    /// Rule already fired for this container this step
    fired: bool,
    /// Container seen by `condition` this step
    evaluated: bool,
}

/// Rule for a container holding exactly a recipe's contents
///
/// The container must be on (when it has a `ToggledOn` facet) and hold
/// exactly the objects bound to the content roles, nothing more, for
/// `trigger_steps` consecutive steps. Any change in what the container holds
/// restarts the count.
#[derive(Debug)]
pub struct ContainerRule {
    name: String,
    filters: FilterSet,
    content_roles: Vec<String>,
    trigger_steps: u32,
    template: ObjectTemplate,
    debounce: HashMap<ObjectId, Debounce>,
    counter: u64,
}

impl ContainerRule {
    /// Create a container rule
    ///
    /// `contents` are the ordered content roles; each binds one object.
    pub fn new(
        name: impl Into<String>,
        trigger_steps: u32,
        template: ObjectTemplate,
        container: impl ObjectFilter + 'static,
        contents: Vec<(String, Box<dyn ObjectFilter>)>,
    ) -> Result<Self> {
        let name = name.into();
        if trigger_steps == 0 {
            return Err(Error::malformed(&name, "trigger_steps must be at least 1"));
        }
        if contents.is_empty() {
            return Err(Error::malformed(&name, "container rule needs at least one content role"));
        }

        let content_roles = contents.iter().map(|(role, _)| role.clone()).collect();
        let mut individual = vec![named(CONTAINER, container)];
        individual.extend(contents);
        let filters = FilterSet::individual(&name, individual)?;

        Ok(Self {
            name,
            filters,
            content_roles,
            trigger_steps,
            template,
            debounce: HashMap::new(),
            counter: 0,
        })
    }

    pub fn trigger_steps(&self) -> u32 {
        self.trigger_steps
    }

    pub fn template(&self) -> &ObjectTemplate {
        &self.template
    }

    /// Current debounce count for a container
    pub fn pending_steps(&self, container: ObjectId) -> u32 {
        self.debounce.get(&container).map(|d| d.count).unwrap_or(0)
    }

    fn contents(&self, binding: &Binding) -> Option<Vec<ObjectId>> {
        self.content_roles
            .iter()
            .map(|role| binding.individual.get(role))
            .collect()
    }
}

impl TransitionRule for ContainerRule {
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
        self.debounce.retain(|_, d| d.evaluated);
        for d in self.debounce.values_mut() {
            d.evaluated = false;
            d.advanced = false;
            d.fired = false;
        }
    }

    fn condition(&mut self, ctx: &dyn RuleContext, binding: &Binding) -> Verdict {
        let Some(container) = binding.individual.get(CONTAINER) else {
            return Verdict::Unmet;
        };
        let Some(contents) = self.contents(binding) else {
            return Verdict::Unmet;
        };
        if !is_active(ctx, container) {
            return Verdict::Unmet;
        }

        let bound: BTreeSet<ObjectId> = contents.iter().copied().collect();
        if bound.len() != contents.len() || bound.contains(&container) {
            return Verdict::Unmet;
        }

        let contained: BTreeSet<ObjectId> = contained_objects(ctx, container).into_iter().collect();
        let entry = self.debounce.entry(container).or_default();
        entry.evaluated = true;
        if entry.observed != contained {
            entry.observed = contained;
            entry.count = 0;
            entry.advanced = false;
        }

        if entry.fired || bound != entry.observed {
            return Verdict::Unmet;
        }

        if !entry.advanced {
            entry.count += 1;
            entry.advanced = true;
        }
        if entry.count < self.trigger_steps {
            return Verdict::Unmet;
        }

        entry.count = 0;
        entry.fired = true;
        Verdict::Met
    }

    fn transition(&mut self, exec: &mut dyn RuleExecutor, binding: &Binding) -> Result<TransitionResults> {
        let container = binding
            .individual
            .get(CONTAINER)
            .ok_or_else(|| Error::malformed(&self.name, "binding lacks a container"))?;
        let contents = self
            .contents(binding)
            .ok_or_else(|| Error::malformed(&self.name, "binding lacks a content role"))?;

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
            "container produced {}",
            self.template.category
        );
        Ok(results)
    }
}
