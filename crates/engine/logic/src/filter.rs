//! Object filters and named filter sets
//!
//! A filter is a boolean test over one object. Filters compose through
//! [`AndFilter`], [`OrFilter`] and [`NotFilter`], which are filters
//! themselves, so arbitrary nesting is possible.

use crate::context::RuleContext;
use crate::object::{ObjectId, StateKind, StateValue};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Boolean test selecting objects of interest for a rule
pub trait ObjectFilter {
    /// Returns true if the object passes the filter
    ///
    /// Must not mutate the object or the world.
    fn matches(&self, ctx: &dyn RuleContext, object: ObjectId) -> bool;

    /// Refresh any cached state. Called once per step before matching.
    fn update(&mut self, _ctx: &dyn RuleContext) {}
}

/// Matches objects of a fixed category
#[derive(Debug, Clone)]
pub struct CategoryFilter {
    category: String,
}

impl CategoryFilter {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
        }
    }
}

impl ObjectFilter for CategoryFilter {
    fn matches(&self, ctx: &dyn RuleContext, object: ObjectId) -> bool {
        ctx.category(object) == Some(self.category.as_str())
    }
}

/// Matches objects whose state facet equals a target value
///
/// Objects without the facet never match.
#[derive(Debug, Clone)]
pub struct StateFilter {
    kind: StateKind,
    value: StateValue,
}

impl StateFilter {
    pub fn new(kind: StateKind, value: impl Into<StateValue>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

impl ObjectFilter for StateFilter {
    fn matches(&self, ctx: &dyn RuleContext, object: ObjectId) -> bool {
        ctx.state(object, &self.kind).as_ref() == Some(&self.value)
    }
}

/// Matches objects declaring a capability tag
#[derive(Debug, Clone)]
pub struct AbilityFilter {
    ability: String,
}

impl AbilityFilter {
    pub fn new(ability: impl Into<String>) -> Self {
        Self {
            ability: ability.into(),
        }
    }
}

impl ObjectFilter for AbilityFilter {
    fn matches(&self, ctx: &dyn RuleContext, object: ObjectId) -> bool {
        ctx.has_ability(object, &self.ability)
    }
}

/// Logical AND of a set of filters
pub struct AndFilter {
    filters: Vec<Box<dyn ObjectFilter>>,
}

impl AndFilter {
    pub fn new(filters: Vec<Box<dyn ObjectFilter>>) -> Self {
        Self { filters }
    }
}

impl ObjectFilter for AndFilter {
    fn matches(&self, ctx: &dyn RuleContext, object: ObjectId) -> bool {
        self.filters.iter().all(|f| f.matches(ctx, object))
    }

    fn update(&mut self, ctx: &dyn RuleContext) {
        for filter in &mut self.filters {
            filter.update(ctx);
        }
    }
}

/// Logical OR of a set of filters
pub struct OrFilter {
    filters: Vec<Box<dyn ObjectFilter>>,
}

impl OrFilter {
    pub fn new(filters: Vec<Box<dyn ObjectFilter>>) -> Self {
        Self { filters }
    }
}

impl ObjectFilter for OrFilter {
    fn matches(&self, ctx: &dyn RuleContext, object: ObjectId) -> bool {
        self.filters.iter().any(|f| f.matches(ctx, object))
    }

    fn update(&mut self, ctx: &dyn RuleContext) {
        for filter in &mut self.filters {
            filter.update(ctx);
        }
    }
}

/// Negation of a filter
pub struct NotFilter {
    inner: Box<dyn ObjectFilter>,
}

impl NotFilter {
    pub fn new(inner: Box<dyn ObjectFilter>) -> Self {
        Self { inner }
    }
}

impl ObjectFilter for NotFilter {
    fn matches(&self, ctx: &dyn RuleContext, object: ObjectId) -> bool {
        !self.inner.matches(ctx, object)
    }

    fn update(&mut self, ctx: &dyn RuleContext) {
        self.inner.update(ctx);
    }
}

/// Filter backed by a closure
pub struct FnFilter<F> {
    f: F,
}

impl<F> FnFilter<F>
where
    F: Fn(&dyn RuleContext, ObjectId) -> bool,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ObjectFilter for FnFilter<F>
where
    F: Fn(&dyn RuleContext, ObjectId) -> bool,
{
    fn matches(&self, ctx: &dyn RuleContext, object: ObjectId) -> bool {
        (self.f)(ctx, object)
    }
}

/// Caches the result of an inner filter per object
///
/// The cache is rebuilt on every [`ObjectFilter::update`] from the full live
/// population and belongs to this instance alone, so independent rule sets
/// never share cached results. Objects not seen at the last update fall back
/// to the inner filter.
pub struct CachedFilter<F> {
    inner: F,
    cache: HashMap<ObjectId, bool>,
}

impl<F: ObjectFilter> CachedFilter<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            cache: HashMap::new(),
        }
    }

    /// Number of cached results
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl<F: ObjectFilter> ObjectFilter for CachedFilter<F> {
    fn matches(&self, ctx: &dyn RuleContext, object: ObjectId) -> bool {
        match self.cache.get(&object) {
            Some(&hit) => hit,
            None => self.inner.matches(ctx, object),
        }
    }

    fn update(&mut self, ctx: &dyn RuleContext) {
        self.inner.update(ctx);
        self.cache.clear();
        for object in ctx.objects() {
            let hit = self.inner.matches(ctx, object);
            self.cache.insert(object, hit);
        }
    }
}

impl ObjectFilter for Box<dyn ObjectFilter> {
    fn matches(&self, ctx: &dyn RuleContext, object: ObjectId) -> bool {
        (**self).matches(ctx, object)
    }

    fn update(&mut self, ctx: &dyn RuleContext) {
        (**self).update(ctx);
    }
}

/// Named individual and group filters of one rule
///
/// Individual filters denote roles filled by exactly one object per binding;
/// group filters denote categories whose matches are collected as a list.
/// Declaration order is preserved and determines binding order.
pub struct FilterSet {
    individual: Vec<(String, Box<dyn ObjectFilter>)>,
    groups: Vec<(String, Box<dyn ObjectFilter>)>,
}

impl FilterSet {
    /// Create a filter set, rejecting sets with no filters or duplicate keys
    pub fn new(
        rule: &str,
        individual: Vec<(String, Box<dyn ObjectFilter>)>,
        groups: Vec<(String, Box<dyn ObjectFilter>)>,
    ) -> Result<Self> {
        if individual.is_empty() && groups.is_empty() {
            return Err(Error::malformed(
                rule,
                "at least one individual or group filter must be specified",
            ));
        }
        if let Some(key) = first_duplicate(&individual) {
            return Err(Error::malformed(rule, format!("duplicate individual role '{key}'")));
        }
        if let Some(key) = first_duplicate(&groups) {
            return Err(Error::malformed(rule, format!("duplicate group key '{key}'")));
        }
        Ok(Self { individual, groups })
    }

    /// Filter set with individual roles only
    pub fn individual(rule: &str, individual: Vec<(String, Box<dyn ObjectFilter>)>) -> Result<Self> {
        Self::new(rule, individual, Vec::new())
    }

    /// Filter set with group filters only
    pub fn groups(rule: &str, groups: Vec<(String, Box<dyn ObjectFilter>)>) -> Result<Self> {
        Self::new(rule, Vec::new(), groups)
    }

    pub fn individual_filters(&self) -> &[(String, Box<dyn ObjectFilter>)] {
        &self.individual
    }

    pub fn group_filters(&self) -> &[(String, Box<dyn ObjectFilter>)] {
        &self.groups
    }

    /// Whether this rule needs one object per individual role
    pub fn requires_individual_filters(&self) -> bool {
        !self.individual.is_empty()
    }

    /// Whether this rule collects any groups
    pub fn requires_group_filters(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Refresh every filter's cached state
    pub fn update(&mut self, ctx: &dyn RuleContext) {
        for (_, filter) in self.individual.iter_mut().chain(self.groups.iter_mut()) {
            filter.update(ctx);
        }
    }
}

impl fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = |v: &[(String, Box<dyn ObjectFilter>)]| -> Vec<String> {
            v.iter().map(|(k, _)| k.clone()).collect()
        };
        f.debug_struct("FilterSet")
            .field("individual", &keys(&self.individual))
            .field("groups", &keys(&self.groups))
            .finish()
    }
}

fn first_duplicate(entries: &[(String, Box<dyn ObjectFilter>)]) -> Option<&str> {
    entries.iter().enumerate().find_map(|(i, (key, _))| {
        entries[..i]
            .iter()
            .any(|(other, _)| other == key)
            .then_some(key.as_str())
    })
}

/// Box a filter under a name, for building filter sets
pub fn named(key: impl Into<String>, filter: impl ObjectFilter + 'static) -> (String, Box<dyn ObjectFilter>) {
    (key.into(), Box::new(filter))
}
