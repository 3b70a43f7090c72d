//! Rule driver: evaluates every rule once per step and commits the batch

use crate::context::{InstancerId, ObjectRegistry, ParticleInstancer, RuleContext, RuleExecutor};
use crate::geometry::{Aabb, FillVolume, Pose};
use crate::matching::{self, Binding, GroupObjects};
use crate::object::{BodyHandle, ObjectId, ObjectPart, StateKind, StateValue};
use crate::rule::TransitionRule;
use crate::transaction::{CommitReport, RuleTx};
use crate::{Error, Result};
use glam::Vec3;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Owns an ordered set of transition rules and runs them against a scene
///
/// Rules are fixed at construction. Each step, rules see one population
/// snapshot minus whatever earlier rules already claimed for removal. The
/// objects rules want added or removed are collected into a [`RuleTx`] and
/// only applied when the transaction is executed.
pub struct RuleEngine {
    /// Rules in evaluation order
    rules: Vec<Box<dyn TransitionRule>>,

    /// Number of evaluated steps
    step: u64,
}

impl RuleEngine {
    /// Create an engine from an ordered rule list
    pub fn new(rules: Vec<Box<dyn TransitionRule>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.name().to_string()) {
                return Err(Error::DuplicateRule(rule.name().to_string()));
            }
        }
        Ok(RuleEngine { rules, step: 0 })
    }

    /// Engine with the built-in rule set (slicing and strawberry smoothie)
    pub fn with_default_rules() -> Result<Self> {
        crate::config::RuleSetConfig::default().build()
    }

    /// Get the number of rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Rule names in evaluation order
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name())
    }

    /// Get a rule by name
    pub fn get_rule(&self, name: &str) -> Option<&dyn TransitionRule> {
        self.rules
            .iter()
            .find(|r| r.name() == name)
            .map(|r| r.as_ref())
    }

    /// Number of steps evaluated so far
    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Evaluate all rules against the current scene
    ///
    /// State facets and particle visibility are written immediately through
    /// `exec`; additions and removals are returned in the transaction. A rule
    /// whose transition fails is logged and recorded, and evaluation goes on
    /// with the remaining bindings and rules.
    ///
    /// Objects a fired rule removes are claimed for the rest of the step:
    /// later bindings never see them, so one object is consumed by at most
    /// one transition.
    pub fn evaluate(&mut self, exec: &mut dyn RuleExecutor) -> RuleTx {
        self.step += 1;
        let mut tx = RuleTx::for_step(self.step);
        let population = exec.objects();
        let mut claimed: HashSet<ObjectId> = HashSet::new();

        for rule in &mut self.rules {
            let available: Vec<ObjectId> = population
                .iter()
                .copied()
                .filter(|obj| !claimed.contains(obj))
                .collect();
            let bindings = {
                let view = Unclaimed::new(&mut *exec, &claimed);
                rule.filters_mut().update(&view);
                rule.begin_step(&view);
                matching::bindings(&view, rule.filters(), &available)
            };

            for binding in &bindings {
                if binding.individual.objects().any(|obj| claimed.contains(&obj)) {
                    continue;
                }
                let binding = without_claimed(binding, &claimed);

                let outcome = rule.process(&mut Unclaimed::new(&mut *exec, &claimed), &binding);
                match outcome {
                    Ok(Some(results)) => {
                        tracing::debug!(
                            step = self.step,
                            rule = rule.name(),
                            add = results.add.len(),
                            remove = results.remove.len(),
                            "rule fired"
                        );
                        claimed.extend(results.remove.iter().copied());
                        tx.push(rule.name(), results);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(step = self.step, rule = rule.name(), "transition failed: {}", err);
                        tx.record_failure(rule.name(), err);
                    }
                }
            }
        }

        tx
    }

    /// Apply a transaction's removals, then its additions
    ///
    /// The transaction is marked committed before anything is applied, so a
    /// commit that fails part-way is never replayed.
    pub fn execute(&self, tx: &mut RuleTx, registry: &mut dyn ObjectRegistry) -> Result<CommitReport> {
        if tx.is_committed() {
            return Err(Error::AlreadyCommitted);
        }
        tx.mark_committed();

        let mut report = CommitReport::default();
        for object in tx.removals() {
            match registry.remove(object) {
                Ok(()) => report.removed.push(object),
                Err(Error::UnknownObject(_)) => {
                    tracing::warn!(step = tx.step(), object = %object, "object already gone, skipping removal");
                }
                Err(err) => return Err(err),
            }
        }
        for attrs in tx.additions() {
            report.spawned.push(registry.spawn(attrs.clone())?);
        }
        registry.end_commit();

        if !report.spawned.is_empty() || !report.removed.is_empty() {
            tracing::info!(
                step = tx.step(),
                spawned = report.spawned.len(),
                removed = report.removed.len(),
                "committed transitions"
            );
        }
        Ok(report)
    }

    /// Evaluate and immediately execute one step
    pub fn step<S: RuleExecutor + ObjectRegistry>(&mut self, scene: &mut S) -> Result<(RuleTx, CommitReport)> {
        let mut tx = self.evaluate(scene);
        let report = self.execute(&mut tx, scene)?;
        Ok((tx, report))
    }
}

/// Drop claimed objects from a binding's groups
fn without_claimed(binding: &Binding, claimed: &HashSet<ObjectId>) -> Binding {
    if claimed.is_empty() {
        return binding.clone();
    }
    let groups = binding
        .group
        .entries()
        .iter()
        .map(|(key, objects)| {
            let kept = objects.iter().copied().filter(|obj| !claimed.contains(obj)).collect();
            (key.clone(), kept)
        })
        .collect();
    Binding::new(binding.individual.clone(), GroupObjects::new(groups))
}

/// Scene view hiding objects already claimed for removal this step
///
/// Only the population listing is filtered; direct queries on a claimed
/// object still answer, since its removal is not committed yet.
struct Unclaimed<'a, 'b> {
    inner: &'a mut (dyn RuleExecutor + 'b),
    claimed: &'a HashSet<ObjectId>,
}

impl<'a, 'b> Unclaimed<'a, 'b> {
    fn new(inner: &'a mut (dyn RuleExecutor + 'b), claimed: &'a HashSet<ObjectId>) -> Self {
        Self { inner, claimed }
    }
}

impl RuleContext for Unclaimed<'_, '_> {
    fn objects(&self) -> Vec<ObjectId> {
        let mut objects = self.inner.objects();
        objects.retain(|obj| !self.claimed.contains(obj));
        objects
    }

    fn name(&self, object: ObjectId) -> Option<&str> {
        self.inner.name(object)
    }

    fn category(&self, object: ObjectId) -> Option<&str> {
        self.inner.category(object)
    }

    fn has_ability(&self, object: ObjectId, ability: &str) -> bool {
        self.inner.has_ability(object, ability)
    }

    fn state(&self, object: ObjectId, kind: &StateKind) -> Option<StateValue> {
        self.inner.state(object, kind)
    }

    fn pose(&self, object: ObjectId) -> Option<Pose> {
        self.inner.pose(object)
    }

    fn scale(&self, object: ObjectId) -> Option<Vec3> {
        self.inner.scale(object)
    }

    fn aabb(&self, object: ObjectId) -> Option<Aabb> {
        self.inner.aabb(object)
    }

    fn object_parts(&self, object: ObjectId) -> Vec<ObjectPart> {
        self.inner.object_parts(object)
    }

    fn contact_region(&self, object: ObjectId) -> Option<Vec<BodyHandle>> {
        self.inner.contact_region(object)
    }

    fn collision_bodies(&self, object: ObjectId) -> Vec<BodyHandle> {
        self.inner.collision_bodies(object)
    }

    fn in_contact(&self, a: &[BodyHandle], b: &[BodyHandle]) -> bool {
        self.inner.in_contact(a, b)
    }

    fn fill_volume(&self, object: ObjectId) -> Option<FillVolume> {
        self.inner.fill_volume(object)
    }

    fn particle_instancers(&self, fluid: &str) -> Vec<ParticleInstancer> {
        self.inner.particle_instancers(fluid)
    }

    fn produced_by(&self, object: ObjectId) -> Option<&str> {
        self.inner.produced_by(object)
    }

    fn resolve_asset(&self, category: &str, model: &str) -> Option<PathBuf> {
        self.inner.resolve_asset(category, model)
    }
}

impl RuleExecutor for Unclaimed<'_, '_> {
    fn set_state(&mut self, object: ObjectId, kind: &StateKind, value: StateValue) -> bool {
        self.inner.set_state(object, kind, value)
    }

    fn set_particle_visibility(&mut self, instancer: InstancerId, indices: &[usize], visible: bool) {
        self.inner.set_particle_visibility(instancer, indices, visible)
    }

    fn as_context(&self) -> &dyn RuleContext {
        self
    }
}

impl fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rule_names().collect::<Vec<_>>())
            .field("step", &self.step)
            .finish()
    }
}
