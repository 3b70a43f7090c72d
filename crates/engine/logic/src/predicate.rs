//! Declarative predicates for rule set configuration
//!
//! A [`Predicate`] is the serializable form of an object filter. Rule set
//! files describe filters with it; [`Predicate::build`] turns it into a boxed
//! [`ObjectFilter`].

use crate::context::RuleContext;
use crate::filter::{
    AbilityFilter, AndFilter, CategoryFilter, NotFilter, ObjectFilter, OrFilter, StateFilter,
};
use crate::object::{ObjectId, StateKind, StateValue};
use serde::{Deserialize, Serialize};

/// Declarative object predicate
///
/// Multiple predicates are combined with [`Predicate::and`] / [`Predicate::or`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Match objects of a category
    Category(String),

    /// Match objects declaring a capability tag
    Ability(String),

    /// Match if the state facet is present and equals the value
    State {
        /// Facet to inspect
        kind: StateKind,
        /// Value to match
        value: StateValue,
    },

    /// Logical AND of multiple predicates
    And(Vec<Predicate>),

    /// Logical OR of multiple predicates
    Or(Vec<Predicate>),

    /// Negate a predicate
    Not(Box<Predicate>),

    /// Always matches
    Always,

    /// Never matches (useful for disabled roles)
    Never,
}

impl Predicate {
    /// Match objects of a category
    pub fn category(category: impl Into<String>) -> Self {
        Predicate::Category(category.into())
    }

    /// Match objects declaring an ability
    pub fn ability(ability: impl Into<String>) -> Self {
        Predicate::Ability(ability.into())
    }

    /// Match objects whose facet equals a value
    pub fn state(kind: StateKind, value: impl Into<StateValue>) -> Self {
        Predicate::State {
            kind,
            value: value.into(),
        }
    }

    /// Combine this predicate with another using AND
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::And(mut a), Predicate::And(b)) => {
                a.extend(b);
                Predicate::And(a)
            }
            (Predicate::And(mut a), other) => {
                a.push(other);
                Predicate::And(a)
            }
            (this, Predicate::And(mut a)) => {
                a.insert(0, this);
                Predicate::And(a)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    /// Combine this predicate with another using OR
    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::Or(mut a), Predicate::Or(b)) => {
                a.extend(b);
                Predicate::Or(a)
            }
            (Predicate::Or(mut a), other) => {
                a.push(other);
                Predicate::Or(a)
            }
            (this, Predicate::Or(mut a)) => {
                a.insert(0, this);
                Predicate::Or(a)
            }
            (a, b) => Predicate::Or(vec![a, b]),
        }
    }

    /// Negate this predicate
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Compile into a filter
    pub fn build(&self) -> Box<dyn ObjectFilter> {
        match self {
            Predicate::Category(c) => Box::new(CategoryFilter::new(c.clone())),
            Predicate::Ability(a) => Box::new(AbilityFilter::new(a.clone())),
            Predicate::State { kind, value } => Box::new(StateFilter::new(kind.clone(), value.clone())),
            Predicate::And(ps) => Box::new(AndFilter::new(ps.iter().map(Predicate::build).collect())),
            Predicate::Or(ps) => Box::new(OrFilter::new(ps.iter().map(Predicate::build).collect())),
            Predicate::Not(p) => Box::new(NotFilter::new(p.build())),
            Predicate::Always => Box::new(Constant(true)),
            Predicate::Never => Box::new(Constant(false)),
        }
    }
}

struct Constant(bool);

impl ObjectFilter for Constant {
    fn matches(&self, _ctx: &dyn RuleContext, _object: ObjectId) -> bool {
        self.0
    }
}
