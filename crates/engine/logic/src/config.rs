//! Rule set configuration files
//!
//! Rule sets are written in RON:
//!
//! ```ron
//! (
//!     rules: [
//!         Slicing(name: "slicing"),
//!         Container(
//!             name: "dough",
//!             trigger_steps: 3,
//!             container: Category("bowl"),
//!             contents: [("flour", Category("flour")), ("water", Category("water"))],
//!             product: (category: "dough", model: "dough_0", name: "dough"),
//!         ),
//!         Garbage(
//!             name: "bowl_garbage",
//!             container: Category("bowl"),
//!             garbage: (category: "garbage", model: "garbage_0", name: "garbage"),
//!         ),
//!     ],
//! )
//! ```

use crate::engine::RuleEngine;
use crate::predicate::Predicate;
use crate::rule::TransitionRule;
use crate::rules::{BlenderRecipe, BlenderRule, ContainerGarbageRule, ContainerRule, ObjectTemplate, SlicingRule};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One rule entry in a rule set file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleConfig {
    /// Slicer / sliceable pairs
    Slicing {
        #[serde(default = "default_slicing_name")]
        name: String,
    },

    /// Container with a fixed recipe
    Container {
        name: String,
        #[serde(default = "default_trigger_steps")]
        trigger_steps: u32,
        container: Predicate,
        /// Ordered content roles
        contents: Vec<(String, Predicate)>,
        product: ObjectTemplate,
    },

    /// Catch-all turning container leftovers into garbage
    Garbage {
        name: String,
        container: Predicate,
        garbage: ObjectTemplate,
    },

    /// Blender turning solids and fluids into an output fluid
    Blender {
        name: String,
        #[serde(default = "default_blender_category")]
        blender: String,
        output: String,
        #[serde(default)]
        solids: Vec<(String, usize)>,
        #[serde(default)]
        fluids: Vec<(String, usize)>,
    },
}

fn default_slicing_name() -> String {
    "slicing".to_string()
}

fn default_trigger_steps() -> u32 {
    1
}

fn default_blender_category() -> String {
    "blender".to_string()
}

impl RuleConfig {
    /// Rule name this entry builds
    pub fn name(&self) -> &str {
        match self {
            RuleConfig::Slicing { name }
            | RuleConfig::Container { name, .. }
            | RuleConfig::Garbage { name, .. }
            | RuleConfig::Blender { name, .. } => name,
        }
    }

    /// Construct the rule
    pub fn build(&self) -> Result<Box<dyn TransitionRule>> {
        let rule: Box<dyn TransitionRule> = match self {
            RuleConfig::Slicing { name } => Box::new(SlicingRule::named(name.clone())?),
            RuleConfig::Container {
                name,
                trigger_steps,
                container,
                contents,
                product,
            } => Box::new(ContainerRule::new(
                name.clone(),
                *trigger_steps,
                product.clone(),
                container.build(),
                contents
                    .iter()
                    .map(|(role, predicate)| (role.clone(), predicate.build()))
                    .collect(),
            )?),
            RuleConfig::Garbage {
                name,
                container,
                garbage,
            } => Box::new(ContainerGarbageRule::new(
                name.clone(),
                garbage.clone(),
                container.build(),
            )?),
            RuleConfig::Blender {
                name,
                blender,
                output,
                solids,
                fluids,
            } => Box::new(BlenderRule::new(
                name.clone(),
                blender,
                BlenderRecipe {
                    output: output.clone(),
                    solids: solids.clone(),
                    fluids: fluids.clone(),
                },
            )?),
        };
        Ok(rule)
    }
}

/// Ordered rule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetConfig {
    pub rules: Vec<RuleConfig>,
}

impl Default for RuleSetConfig {
    /// Slicing plus the strawberry smoothie blender
    fn default() -> Self {
        Self {
            rules: vec![
                RuleConfig::Slicing {
                    name: default_slicing_name(),
                },
                RuleConfig::Blender {
                    name: "strawberry_smoothie".to_string(),
                    blender: default_blender_category(),
                    output: "strawberry_smoothie".to_string(),
                    solids: vec![("strawberry".to_string(), 5), ("ice_cube".to_string(), 5)],
                    fluids: vec![("milk".to_string(), 10)],
                },
            ],
        }
    }
}

impl RuleSetConfig {
    /// Parse a rule set from RON text
    pub fn from_ron_str(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Load a rule set from a RON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Pretty-printed RON
    pub fn to_ron_string(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Get a rule entry by name
    pub fn get_rule(&self, name: &str) -> Option<&RuleConfig> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// Build an engine running these rules in order
    pub fn build(&self) -> Result<RuleEngine> {
        let rules = self
            .rules
            .iter()
            .map(RuleConfig::build)
            .collect::<Result<Vec<_>>>()?;
        RuleEngine::new(rules)
    }
}
