//! Headless transition testbed
//!
//! Steps a rule engine against a scene for a fixed number of steps and
//! summarizes what each step changed.

pub mod demo;

use logic::{RuleContext, RuleEngine};
use world::Scene;

/// What one engine step did to the scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepSummary {
    pub step: u64,
    /// Rules that fired, in evaluation order
    pub fired: Vec<String>,
    /// Names of spawned objects
    pub spawned: Vec<String>,
    pub removed: usize,
    /// Rules whose transition failed
    pub failed: Vec<String>,
}

impl StepSummary {
    pub fn is_idle(&self) -> bool {
        self.fired.is_empty() && self.failed.is_empty()
    }
}

/// Run `steps` engine steps against `scene`
pub fn run(engine: &mut RuleEngine, scene: &mut Scene, steps: u64) -> logic::Result<Vec<StepSummary>> {
    let mut summaries = Vec::new();
    for _ in 0..steps {
        let (tx, report) = engine.step(scene)?;

        let summary = StepSummary {
            step: tx.step(),
            fired: tx.entries().iter().map(|e| e.rule.clone()).collect(),
            spawned: report
                .spawned
                .iter()
                .filter_map(|&id| scene.name(id).map(str::to_string))
                .collect(),
            removed: report.removed.len(),
            failed: tx.failures().iter().map(|(rule, _)| rule.clone()).collect(),
        };
        for (rule, err) in tx.failures() {
            tracing::warn!(step = summary.step, rule = %rule, "{}", err);
        }
        summaries.push(summary);
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use logic::{StateKind, StateValue};

    #[test]
    fn test_demo_kitchen_run() {
        let mut engine = demo::kitchen_rules().build().unwrap();
        let mut scene = demo::kitchen().unwrap();

        let summaries = run(&mut engine, &mut scene, 4).unwrap();
        assert_eq!(summaries.len(), 4);

        let first = &summaries[0];
        assert_eq!(first.fired, vec!["slicing", "pot_garbage", "strawberry_smoothie"]);
        assert_eq!(first.removed, 12);
        assert!(first.spawned.contains(&"apple_part_0".to_string()));
        assert!(first.spawned.contains(&"garbage_0".to_string()));

        assert!(summaries[1].is_idle());
        assert_eq!(summaries[2].fired, vec!["dough"]);
        assert_eq!(summaries[2].spawned, vec!["dough_0"]);
        assert!(summaries[3].is_idle());

        let blender = scene.find("blender").unwrap();
        assert_eq!(
            scene.state(blender, &StateKind::filled("strawberry_smoothie")),
            Some(StateValue::Bool(true))
        );
        assert_eq!(scene.visible_particles("milk"), 4);
    }

    #[test]
    fn test_bundled_config_matches_demo() {
        let rules = logic::RuleSetConfig::from_ron_str(include_str!("../config/rules.ron")).unwrap();
        assert_eq!(rules, demo::kitchen_rules());

        let mut engine = rules.build().unwrap();
        let mut scene = world::SceneConfig::from_ron_str(include_str!("../config/kitchen.ron"))
            .unwrap()
            .build()
            .unwrap();

        let summaries = run(&mut engine, &mut scene, 3).unwrap();
        assert_eq!(summaries[0].removed, 12);
        assert_eq!(summaries[2].spawned, vec!["dough_0"]);
        assert_eq!(scene.visible_particles("milk"), 4);
    }
}
