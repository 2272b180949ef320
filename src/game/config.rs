//! Tunable layout and timing constants.

use serde::{Deserialize, Serialize};

use crate::ecs::Vec2;

/// Canvas layout, animation timing and encounter tuning.
///
/// Every field has a default, so partial or older stored configs still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    pub canvas_size: Vec2,
    pub enemy_position: Vec2,
    pub player_position: Vec2,
    pub max_health: i32,

    /// Seconds for tweens that do not name their own duration.
    pub tween_duration: f32,
    pub lunge_distance: f32,
    pub lunge_duration: f32,
    pub shake_offset: f32,
    pub shake_repeat: u32,
    pub shake_duration: f32,
    /// Render-set slot a projectile is inserted at.
    pub projectile_index: usize,
    pub faint_drop: f32,

    pub overlay_fade_duration: f32,
    pub intro_flash_duration: f32,
    pub intro_flash_repeat: u32,

    /// Overworld walking speed in canvas pixels per second.
    pub walk_speed: f32,
    /// Chance per walk step inside an encounter zone.
    pub encounter_chance: f32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            canvas_size: Vec2::new(1024.0, 576.0),
            enemy_position: Vec2::new(800.0, 100.0),
            player_position: Vec2::new(280.0, 325.0),
            max_health: 100,

            tween_duration: 0.5,
            lunge_distance: 20.0,
            lunge_duration: 0.1,
            shake_offset: 10.0,
            shake_repeat: 5,
            shake_duration: 0.08,
            projectile_index: 2,
            faint_drop: 20.0,

            overlay_fade_duration: 0.5,
            intro_flash_duration: 0.4,
            intro_flash_repeat: 3,

            walk_speed: 180.0,
            encounter_chance: 0.01,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: BattleConfig =
            serde_json::from_str(r#"{"max_health": 50, "shake_repeat": 3}"#).expect("valid");
        assert_eq!(config.max_health, 50);
        assert_eq!(config.shake_repeat, 3);
        assert_eq!(config.canvas_size, BattleConfig::default().canvas_size);
    }
}
