//! Entity storage and core value types.
//!
//! This module owns the data layout for everything drawn on the battle canvas.
//! An [`Entity`] is a renderable [`Sprite`] with an optional [`Combatant`]
//! attached; decorative sprites (backgrounds, projectiles) simply leave the
//! combat half empty. It is intentionally free of battle logic and rendering.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// Map from entity IDs to their data.
pub type EntityMap = FxHashMap<EntityID, Entity>;

// ---------------------------------------------------------------------------
// Core value types
// ---------------------------------------------------------------------------

/// Unique identifier for an entity on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityID(pub u32);

/// Monotonically increasing generator for [`EntityID`] values.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityGenerator(u32);

impl EntityGenerator {
    pub fn next(&mut self) -> EntityID {
        self.0 += 1;
        EntityID(self.0)
    }
}

/// A point or size in canvas space.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ONE: Self = Self { x: 1.0, y: 1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in canvas (or source image) pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

/// Which side of the battle a combatant fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub const fn is_enemy(self) -> bool {
        matches!(self, Self::Enemy)
    }
}

// ---------------------------------------------------------------------------
// Attacks
// ---------------------------------------------------------------------------

/// Tag selecting how an attack is played out on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    /// Step back, lunge at the recipient, return.
    Melee,
    /// Fire a transient sprite that travels to the recipient.
    Projectile,
    /// Anything the catalog names that this build cannot play.
    #[serde(other)]
    Unknown,
}

/// An immutable attack definition, shared by every monster that lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    pub name: String,
    pub kind: AttackKind,
    pub damage: u32,
    /// Display category, e.g. "Normal" or "Fire".
    pub category: String,
    /// Display colour as RGB.
    pub color: [u8; 3],
}

// ---------------------------------------------------------------------------
// Renderable capability
// ---------------------------------------------------------------------------

/// Frame grid of a horizontal sprite sheet.
///
/// `value` is the frame currently shown, `elapsed` counts draw ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGrid {
    pub max: u32,
    pub hold: u32,
    #[serde(default)]
    pub value: u32,
    #[serde(default)]
    pub elapsed: u32,
}

impl FrameGrid {
    pub const fn new(max: u32, hold: u32) -> Self {
        Self {
            max,
            hold,
            value: 0,
            elapsed: 0,
        }
    }
}

impl Default for FrameGrid {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// Handle to a sprite sheet. `size` stays `None` until the image is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteImage {
    pub key: String,
    pub size: Option<Vec2>,
}

impl SpriteImage {
    pub fn new(key: impl Into<String>, size: Option<Vec2>) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// Everything the frame animator needs to draw an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub position: Vec2,
    pub image: SpriteImage,
    pub frames: FrameGrid,
    pub animate: bool,
    pub opacity: f32,
    /// Radians, applied about the sprite's own centre.
    pub rotation: f32,
    pub scale: Vec2,
}

impl Sprite {
    pub fn new(position: Vec2, image: SpriteImage, frames: FrameGrid) -> Self {
        Self {
            position,
            image,
            frames,
            animate: false,
            opacity: 1.0,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }

    pub fn animated(mut self) -> Self {
        self.animate = true;
        self
    }

    pub fn rotated(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }
}

// ---------------------------------------------------------------------------
// Combat capability
// ---------------------------------------------------------------------------

/// Health, side and attack set of a monster.
///
/// `health` may dip below zero between a hit and faint detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    pub side: Side,
    pub health: i32,
    pub max_health: i32,
    pub attacks: Vec<Rc<Attack>>,
}

impl Combatant {
    pub fn new(side: Side, max_health: i32, attacks: Vec<Rc<Attack>>) -> Self {
        Self {
            side,
            health: max_health,
            max_health,
            attacks,
        }
    }

    pub const fn is_fainted(&self) -> bool {
        self.health <= 0
    }

    /// Health as a display percentage, floored at 0 and capped at 100.
    pub fn health_percent(&self) -> f32 {
        if self.max_health <= 0 {
            return 0.0;
        }
        (self.health as f32 / self.max_health as f32 * 100.0).clamp(0.0, 100.0)
    }

    /// The attack called `name`, if this monster knows it.
    pub fn attack(&self, name: &str) -> Option<&Rc<Attack>> {
        self.attacks.iter().find(|a| a.name == name)
    }
}

/// An entity on the battle canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub sprite: Sprite,
    pub combatant: Option<Combatant>,
}

impl Entity {
    pub fn decoration(name: impl Into<String>, sprite: Sprite) -> Self {
        Self {
            name: name.into(),
            sprite,
            combatant: None,
        }
    }

    pub fn monster(name: impl Into<String>, sprite: Sprite, combatant: Combatant) -> Self {
        Self {
            name: name.into(),
            sprite,
            combatant: Some(combatant),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
