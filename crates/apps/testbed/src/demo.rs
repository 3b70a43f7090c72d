//! Built-in kitchen used when no scene file is given

use glam::Vec3;
use logic::{FillVolume, ObjectPart, ObjectTemplate, Predicate, RuleConfig, RuleSetConfig, StateKind};
use world::{Scene, SimObject};

const BLENDER_AT: Vec3 = Vec3::new(1.0, 0.9, 0.0);
const BOWL_AT: Vec3 = Vec3::new(-1.0, 0.9, 0.0);
const POT_AT: Vec3 = Vec3::new(0.0, 0.9, 1.0);

/// Rules for the demo kitchen: slicing, dough, pot garbage and the smoothie
pub fn kitchen_rules() -> RuleSetConfig {
    RuleSetConfig {
        rules: vec![
            RuleConfig::Slicing {
                name: "slicing".to_string(),
            },
            RuleConfig::Container {
                name: "dough".to_string(),
                trigger_steps: 3,
                container: Predicate::category("bowl").and(Predicate::state(StateKind::ToggledOn, true)),
                contents: vec![
                    ("flour".to_string(), Predicate::category("flour")),
                    ("water".to_string(), Predicate::category("water")),
                ],
                product: ObjectTemplate::new("dough", "dough_0", "dough"),
            },
            RuleConfig::Garbage {
                name: "pot_garbage".to_string(),
                container: Predicate::category("pot"),
                garbage: ObjectTemplate::new("garbage", "garbage_0", "garbage").with_scale(Vec3::splat(0.5)),
            },
            RuleConfig::Blender {
                name: "strawberry_smoothie".to_string(),
                blender: "blender".to_string(),
                output: "strawberry_smoothie".to_string(),
                solids: vec![("strawberry".to_string(), 5), ("ice_cube".to_string(), 5)],
                fluids: vec![("milk".to_string(), 10)],
            },
        ],
    }
}

/// Kitchen with one instance of every transition ready to fire
pub fn kitchen() -> world::Result<Scene> {
    let mut scene = Scene::new();

    let knife = scene.insert(
        SimObject::new("knife", "knife", "knife_a")
            .at_position(Vec3::new(0.0, 0.92, 0.0))
            .with_ability("slicer")
            .with_blade(),
    )?;
    let apple = scene.insert(
        SimObject::new("apple", "apple", "apple_a")
            .at_position(Vec3::new(0.0, 0.9, 0.0))
            .with_ability("sliceable")
            .with_state(StateKind::Sliced, false)
            .with_part(ObjectPart::new("half_apple", "half_apple_a", Vec3::new(0.0, 0.0, 0.02)))
            .with_part(ObjectPart::new("half_apple", "half_apple_a", Vec3::new(0.0, 0.0, -0.02))),
    )?;
    scene.touch(knife, apple, 1.5)?;

    scene.insert(
        SimObject::new("bowl", "bowl", "bowl_a")
            .at_position(BOWL_AT)
            .with_half_extents(Vec3::splat(0.15))
            .with_state(StateKind::ToggledOn, true),
    )?;
    scene.insert(SimObject::new("flour", "flour", "flour_a").at_position(BOWL_AT + Vec3::new(0.03, 0.0, 0.0)))?;
    scene.insert(SimObject::new("water", "water", "water_a").at_position(BOWL_AT - Vec3::new(0.03, 0.0, 0.0)))?;

    scene.insert(
        SimObject::new("pot", "pot", "pot_a")
            .at_position(POT_AT)
            .with_half_extents(Vec3::splat(0.2)),
    )?;
    scene.insert(SimObject::new("carrot", "carrot", "carrot_a").at_position(POT_AT + Vec3::new(0.0, 0.05, 0.0)))?;

    scene.insert(
        SimObject::new("blender", "blender", "blender_a")
            .at_position(BLENDER_AT)
            .with_state(StateKind::filled("strawberry_smoothie"), false)
            .with_fill_volume(FillVolume::Cylinder {
                base: Vec3::new(0.0, -0.1, 0.0),
                radius: 0.08,
                height: 0.25,
            }),
    )?;
    for i in 0..5 {
        let offset = Vec3::new(0.01 * i as f32 - 0.02, 0.0, 0.0);
        scene.insert(
            SimObject::new(format!("strawberry_{i}"), "strawberry", "strawberry_a").at_position(BLENDER_AT + offset),
        )?;
        scene.insert(
            SimObject::new(format!("ice_cube_{i}"), "ice_cube", "ice_cube_a")
                .at_position(BLENDER_AT + offset + Vec3::new(0.0, 0.05, 0.0)),
        )?;
    }

    // Milk poured into the blender, with some spilled on the counter
    let mut milk: Vec<Vec3> = (0..12)
        .map(|i| BLENDER_AT + Vec3::new(0.0, -0.08 + 0.005 * i as f32, 0.02))
        .collect();
    milk.extend((0..4).map(|i| BLENDER_AT + Vec3::new(0.4 + 0.01 * i as f32, -0.1, 0.0)));
    scene.add_fluid("milk", milk);

    Ok(scene)
}
