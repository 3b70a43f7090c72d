//! Logic crate - Object transition rules for simkit scenes
//!
//! This crate provides a declarative rule system that turns configurations of
//! simulated objects into new configurations: a knife slicing an apple into
//! halves, a bowl of flour and water becoming dough, a blender full of fruit
//! and milk becoming a smoothie.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Rule Engine                          │
//! ├─────────────────────────────────────────────────────────┤
//! │  Filters                                                │
//! │  ├── Category / State / Ability predicates              │
//! │  ├── And / Or / Not combinators                         │
//! │  └── Cached filters refreshed once per step             │
//! ├─────────────────────────────────────────────────────────┤
//! │  Matching                                               │
//! │  ├── Cartesian product over individual roles            │
//! │  └── Group collection per key                           │
//! ├─────────────────────────────────────────────────────────┤
//! │  Rules                                                  │
//! │  ├── Slicing, Container, ContainerGarbage, Blender      │
//! │  └── Generic (closure-backed)                           │
//! ├─────────────────────────────────────────────────────────┤
//! │  Transactions                                           │
//! │  ├── Batch all adds/removes of one step                 │
//! │  └── Deduplicated removal, then spawn, on commit        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine owns no simulation resources. Scenes plug in by implementing
//! [`RuleContext`], [`RuleExecutor`] and [`ObjectRegistry`].
//!
//! # Example
//!
//! ```rust,ignore
//! use logic::RuleEngine;
//!
//! let mut engine = RuleEngine::with_default_rules()?;
//! loop {
//!     let (_tx, report) = engine.step(&mut scene)?;
//!     for id in &report.spawned {
//!         println!("spawned {}", id);
//!     }
//! }
//! ```

mod config;
mod context;
mod engine;
mod error;
mod filter;
mod geometry;
mod matching;
mod object;
mod predicate;
mod rule;
pub mod rules;
mod transaction;

#[cfg(test)]
mod test_support;

pub use config::{RuleConfig, RuleSetConfig};
pub use context::{
    contained_objects, is_active, AssetResolver, InstancerId, ObjectRegistry, ParticleInstancer, RuleContext,
    RuleExecutor,
};
pub use engine::RuleEngine;
pub use error::{Error, Result};
pub use filter::{
    named, AbilityFilter, AndFilter, CachedFilter, CategoryFilter, FilterSet, FnFilter, NotFilter, ObjectFilter,
    OrFilter, StateFilter,
};
pub use geometry::{mean_pose, Aabb, FillVolume, Pose};
pub use matching::{bindings, group_objects, individual_bindings, product_size, Binding, GroupObjects, IndividualObjects};
pub use object::{BodyHandle, ObjectId, ObjectPart, StateKind, StateValue};
pub use predicate::Predicate;
pub use rule::{TransitionRule, Verdict};
pub use rules::{BlenderRecipe, BlenderRule, ContainerGarbageRule, ContainerRule, GenericRule, ObjectTemplate, SlicingRule};
pub use transaction::{CommitReport, ObjectAttrs, RuleTx, TransitionResults, TxEntry};

// Re-export glam for convenience
pub use glam;
