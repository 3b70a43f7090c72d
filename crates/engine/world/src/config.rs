//! Scene configuration
//!
//! Scenes are described in RON: the objects to insert, templates for objects
//! the rules spawn, fluid particle systems and initial contacts.

use crate::assets::DatasetLayout;
use crate::entity::SimObject;
use crate::error::{Error, Result};
use crate::scene::Scene;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_spacing() -> f32 {
    0.01
}

/// Block of particles laid out on a cubic lattice around `center`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleCluster {
    pub center: Vec3,
    pub count: usize,
    #[serde(default = "default_spacing")]
    pub spacing: f32,
}

impl ParticleCluster {
    /// Lattice positions, filled row by row until `count` is reached
    pub fn positions(&self) -> Vec<Vec3> {
        let side = (self.count as f32).cbrt().ceil().max(1.0) as usize;
        let offset = (side as f32 - 1.0) * self.spacing * 0.5;

        (0..self.count)
            .map(|i| {
                let x = i % side;
                let y = (i / side) % side;
                let z = i / (side * side);
                self.center + Vec3::new(x as f32, y as f32, z as f32) * self.spacing - Vec3::splat(offset)
            })
            .collect()
    }
}

/// One particle instancer of a fluid system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluidConfig {
    /// Fluid system the instancer belongs to
    pub name: String,
    /// Explicit particle positions
    #[serde(default)]
    pub positions: Vec<Vec3>,
    /// Generated particle blocks, appended after `positions`
    #[serde(default)]
    pub clusters: Vec<ParticleCluster>,
}

impl FluidConfig {
    pub fn particle_positions(&self) -> Vec<Vec3> {
        let mut positions = self.positions.clone();
        for cluster in &self.clusters {
            positions.extend(cluster.positions());
        }
        positions
    }
}

fn default_impulse() -> f32 {
    1.0
}

/// Initial contact between a slicer's contact region and a target object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactConfig {
    pub slicer: String,
    pub target: String,
    #[serde(default = "default_impulse")]
    pub impulse: f32,
}

/// Complete scene description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Dataset root for resolving spawned objects' assets
    #[serde(default)]
    pub dataset_root: Option<PathBuf>,
    #[serde(default)]
    pub objects: Vec<SimObject>,
    /// Templates for spawned objects, keyed by their category
    #[serde(default)]
    pub prototypes: Vec<SimObject>,
    #[serde(default)]
    pub fluids: Vec<FluidConfig>,
    #[serde(default)]
    pub contacts: Vec<ContactConfig>,
}

impl SceneConfig {
    /// Parse a scene from RON text
    pub fn from_ron_str(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Load a scene from a RON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Build the scene, inserting objects in declaration order
    pub fn build(&self) -> Result<Scene> {
        let mut scene = match &self.dataset_root {
            Some(root) => Scene::new().with_assets(DatasetLayout::new(root)),
            None => Scene::new(),
        };

        for prototype in &self.prototypes {
            scene.add_prototype(prototype.clone());
        }
        for object in &self.objects {
            scene.insert(object.clone())?;
        }
        for fluid in &self.fluids {
            scene.add_fluid(&fluid.name, fluid.particle_positions());
        }
        for contact in &self.contacts {
            let slicer = scene
                .find(&contact.slicer)
                .ok_or_else(|| Error::ObjectNotFound(contact.slicer.clone()))?;
            let target = scene
                .find(&contact.target)
                .ok_or_else(|| Error::ObjectNotFound(contact.target.clone()))?;
            scene.touch(slicer, target, contact.impulse)?;
        }

        tracing::info!(
            objects = self.objects.len(),
            fluids = self.fluids.len(),
            contacts = self.contacts.len(),
            "built scene"
        );
        Ok(scene)
    }
}
