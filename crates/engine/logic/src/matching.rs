//! Matching of filter sets against the live population
//!
//! Individual filters produce the Cartesian product of per-role matches;
//! group filters produce one list of matches per key.

use crate::context::RuleContext;
use crate::filter::FilterSet;
use crate::object::ObjectId;

/// One object per individual role, in role declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndividualObjects {
    entries: Vec<(String, ObjectId)>,
}

impl IndividualObjects {
    pub fn new(entries: Vec<(String, ObjectId)>) -> Self {
        Self { entries }
    }

    /// Object bound to a role
    pub fn get(&self, role: &str) -> Option<ObjectId> {
        self.entries
            .iter()
            .find(|(key, _)| key == role)
            .map(|(_, id)| *id)
    }

    pub fn entries(&self) -> &[(String, ObjectId)] {
        &self.entries
    }

    /// Bound objects, in role order
    pub fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.entries.iter().map(|(_, id)| *id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every matching object per group key, in key declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupObjects {
    entries: Vec<(String, Vec<ObjectId>)>,
}

impl GroupObjects {
    pub fn new(entries: Vec<(String, Vec<ObjectId>)>) -> Self {
        Self { entries }
    }

    /// Objects collected under a key; empty if the key is unknown
    pub fn get(&self, key: &str) -> &[ObjectId] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, objs)| objs.as_slice())
            .unwrap_or(&[])
    }

    pub fn entries(&self) -> &[(String, Vec<ObjectId>)] {
        &self.entries
    }

    /// Replace the list under a key, appending the key if absent
    pub fn set(&mut self, key: &str, objects: Vec<ObjectId>) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = objects,
            None => self.entries.push((key.to_string(), objects)),
        }
    }

    /// Every collected object across all keys
    pub fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.entries.iter().flat_map(|(_, objs)| objs.iter().copied())
    }
}

/// Objects handed to one `process` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binding {
    pub individual: IndividualObjects,
    pub group: GroupObjects,
}

impl Binding {
    pub fn new(individual: IndividualObjects, group: GroupObjects) -> Self {
        Self { individual, group }
    }
}

/// Objects passing each individual role's filter, in role order
pub fn role_matches(
    ctx: &dyn RuleContext,
    filters: &FilterSet,
    population: &[ObjectId],
) -> Vec<(String, Vec<ObjectId>)> {
    filters
        .individual_filters()
        .iter()
        .map(|(role, filter)| {
            let hits = population
                .iter()
                .copied()
                .filter(|&obj| filter.matches(ctx, obj))
                .collect();
            (role.clone(), hits)
        })
        .collect()
}

/// Number of individual bindings the given per-role matches produce
pub fn product_size(roles: &[(String, Vec<ObjectId>)]) -> usize {
    if roles.is_empty() {
        return 0;
    }
    roles.iter().map(|(_, hits)| hits.len()).product()
}

/// Cartesian product over individual roles
///
/// The last role varies fastest. If any role has no match, or the rule has
/// no individual roles, the product is empty.
pub fn individual_bindings(
    ctx: &dyn RuleContext,
    filters: &FilterSet,
    population: &[ObjectId],
) -> Vec<IndividualObjects> {
    let roles = role_matches(ctx, filters, population);
    let total = product_size(&roles);
    let mut bindings = Vec::with_capacity(total);
    if total == 0 {
        return bindings;
    }

    let mut cursor = vec![0usize; roles.len()];
    loop {
        let entries = roles
            .iter()
            .zip(&cursor)
            .map(|((role, hits), &i)| (role.clone(), hits[i]))
            .collect();
        bindings.push(IndividualObjects::new(entries));

        // Odometer increment, last role fastest
        let mut axis = roles.len();
        loop {
            if axis == 0 {
                return bindings;
            }
            axis -= 1;
            cursor[axis] += 1;
            if cursor[axis] < roles[axis].1.len() {
                break;
            }
            cursor[axis] = 0;
        }
    }
}

/// All currently-matching objects for every group key
pub fn group_objects(
    ctx: &dyn RuleContext,
    filters: &FilterSet,
    population: &[ObjectId],
) -> GroupObjects {
    GroupObjects::new(
        filters
            .group_filters()
            .iter()
            .map(|(key, filter)| {
                let hits = population
                    .iter()
                    .copied()
                    .filter(|&obj| filter.matches(ctx, obj))
                    .collect();
                (key.clone(), hits)
            })
            .collect(),
    )
}

/// Every binding a rule should be processed with this step
///
/// Each individual binding is paired with the same group objects. A rule
/// without individual roles is processed exactly once with the groups alone.
pub fn bindings(ctx: &dyn RuleContext, filters: &FilterSet, population: &[ObjectId]) -> Vec<Binding> {
    let group = group_objects(ctx, filters, population);
    if !filters.requires_individual_filters() {
        return vec![Binding::new(IndividualObjects::default(), group)];
    }
    individual_bindings(ctx, filters, population)
        .into_iter()
        .map(|individual| Binding::new(individual, group.clone()))
        .collect()
}
