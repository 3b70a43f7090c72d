//! World crate - In-memory reference scene for the transition rule engine
//!
//! [`Scene`] stores objects, collision bodies, contacts and fluid particles
//! and implements the collaborator traits of the `logic` crate, so a
//! [`logic::RuleEngine`] can be stepped against it directly:
//!
//! ```rust,ignore
//! use logic::RuleEngine;
//! use world::SceneConfig;
//!
//! let mut scene = SceneConfig::load_from_file("kitchen.ron")?.build()?;
//! let mut engine = RuleEngine::with_default_rules()?;
//! let (_tx, report) = engine.step(&mut scene)?;
//! ```
//!
//! Contacts are not simulated. Callers record them with [`Scene::touch`] or
//! [`Scene::set_contact`], standing in for a physics backend's contact report.

mod assets;
mod config;
mod entity;
mod error;
mod scene;

pub use assets::DatasetLayout;
pub use config::{ContactConfig, FluidConfig, ParticleCluster, SceneConfig};
pub use entity::SimObject;
pub use error::{Error, Result};
pub use scene::Scene;
