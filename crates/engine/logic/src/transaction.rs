//! Transition results and step-level transactions
//!
//! Rules never add or remove objects themselves. A transition describes what
//! it wants in a [`TransitionResults`], and the engine collects every rule's
//! results for one step into a [`RuleTx`] that is committed as one batch.

use crate::{Error, ObjectId};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Attributes of an object to be spawned by a transition
///
/// All fields are optional; the registry rejects requests lacking what it
/// needs to construct the object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectAttrs {
    pub category: Option<String>,
    pub model: Option<String>,
    pub name: Option<String>,
    pub scale: Option<Vec3>,
    /// Already-constructed object to insert instead of building a new one
    pub object: Option<ObjectId>,
    /// Loadable asset for `category`/`model`
    pub asset_path: Option<PathBuf>,
    pub position: Option<Vec3>,
    pub orientation: Option<Quat>,
    /// Tag of the rule that produced the object
    pub produced_by: Option<String>,
}

impl ObjectAttrs {
    pub fn new(category: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            model: Some(model.into()),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_pose(mut self, position: Vec3, orientation: Quat) -> Self {
        self.position = Some(position);
        self.orientation = Some(orientation);
        self
    }

    pub fn with_asset(mut self, asset_path: Option<PathBuf>) -> Self {
        self.asset_path = asset_path;
        self
    }

    pub fn produced_by(mut self, tag: impl Into<String>) -> Self {
        self.produced_by = Some(tag.into());
        self
    }
}

/// Objects a transition wants added and removed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionResults {
    pub add: Vec<ObjectAttrs>,
    pub remove: Vec<ObjectId>,
}

impl TransitionResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Results of one rule firing within a step
#[derive(Debug, Clone)]
pub struct TxEntry {
    /// Name of the rule that fired
    pub rule: String,
    pub results: TransitionResults,
}

/// Summary of a committed transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReport {
    /// Objects created, in request order
    pub spawned: Vec<ObjectId>,
    /// Objects destroyed
    pub removed: Vec<ObjectId>,
}

/// Transaction batching every rule's results for one step
///
/// Removals and additions are held back until the whole step has been
/// evaluated, so the population only changes between steps.
#[derive(Debug, Default)]
pub struct RuleTx {
    /// Step this transaction was built for
    step: u64,

    /// Fired rules in evaluation order
    entries: Vec<TxEntry>,

    /// Transitions that failed during evaluation
    failures: Vec<(String, Error)>,

    /// Whether the transaction has been committed
    committed: bool,
}

impl RuleTx {
    /// Create a new empty transaction
    pub fn new() -> Self {
        RuleTx::default()
    }

    pub(crate) fn for_step(step: u64) -> Self {
        RuleTx {
            step,
            ..Default::default()
        }
    }

    /// Step number this transaction belongs to
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Check if the transaction has nothing to apply
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.results.is_empty())
    }

    /// Number of rule firings recorded
    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }

    /// Check if the transaction has been committed
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Record the results of a fired rule
    pub fn push(&mut self, rule: impl Into<String>, results: TransitionResults) {
        self.entries.push(TxEntry {
            rule: rule.into(),
            results,
        });
    }

    /// Record a failed transition
    pub fn record_failure(&mut self, rule: impl Into<String>, error: Error) {
        self.failures.push((rule.into(), error));
    }

    pub fn entries(&self) -> &[TxEntry] {
        &self.entries
    }

    pub fn failures(&self) -> &[(String, Error)] {
        &self.failures
    }

    /// Every spawn request, in evaluation order
    pub fn additions(&self) -> impl Iterator<Item = &ObjectAttrs> {
        self.entries.iter().flat_map(|e| e.results.add.iter())
    }

    /// Every object to remove, each listed once, in first-requested order
    pub fn removals(&self) -> Vec<ObjectId> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .flat_map(|e| e.results.remove.iter().copied())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Mark the transaction as committed
    pub fn mark_committed(&mut self) {
        self.committed = true;
    }

    /// Merge another transaction into this one
    pub fn merge(&mut self, other: RuleTx) {
        self.entries.extend(other.entries);
        self.failures.extend(other.failures);
    }
}
