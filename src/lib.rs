#![warn(clippy::all, rust_2018_idioms)]

//! A two-combatant, turn-based monster battler drawn on an egui canvas.

pub mod ecs;
pub mod game;
pub mod ui;

mod app;
pub use app::BattleApp;
