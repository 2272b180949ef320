//! Shared fixtures for game tests.

use std::cell::Cell;
use std::rc::Rc;

use crate::ecs::Vec2;

use super::audio::tests::{Cue, RecordingAudio};
use super::catalog::BACKGROUND_SHEET;
use super::{BattleConfig, Catalog, Dice, GameEvent, GameState, battle};

/// Deterministic [`Dice`] that counts how often a reply was picked.
#[derive(Debug, Clone, Default)]
pub(crate) struct FixedDice {
    pick: usize,
    roll: f32,
    picks: Rc<Cell<u32>>,
}

impl FixedDice {
    pub(crate) fn with_pick(mut self, pick: usize) -> Self {
        self.pick = pick;
        self
    }

    pub(crate) fn with_roll(mut self, roll: f32) -> Self {
        self.roll = roll;
        self
    }

    pub(crate) fn picks(&self) -> u32 {
        self.picks.get()
    }
}

impl Dice for FixedDice {
    fn pick(&mut self, len: usize) -> usize {
        self.picks.set(self.picks.get() + 1);
        self.pick.min(len - 1)
    }

    fn roll(&mut self) -> f32 {
        self.roll
    }
}

/// Handles a test keeps on the injected seams.
pub(crate) struct Seams {
    audio: RecordingAudio,
    dice: FixedDice,
}

impl Seams {
    pub(crate) fn cues(&self) -> Vec<Cue> {
        self.audio.cues()
    }

    pub(crate) fn picks(&self) -> u32 {
        self.dice.picks()
    }
}

/// Built-in catalog, every sheet loaded, recorded audio.
pub(crate) fn test_game(dice: FixedDice) -> (GameState, RecordingAudio) {
    let catalog = Catalog::builtin().expect("builtin catalog is valid");
    let audio = RecordingAudio::default();
    let mut game = GameState::new(BattleConfig::default(), catalog)
        .with_audio(audio.clone())
        .with_dice(dice);
    for sheet in game.catalog.sheets() {
        let size = if sheet == BACKGROUND_SHEET {
            Vec2::new(1024.0, 576.0)
        } else {
            Vec2::new(256.0, 64.0)
        };
        game.register_sheet(sheet, size);
    }
    (game, audio)
}

/// Run time forward until no tweens remain, collecting events.
pub(crate) fn settle(game: &mut GameState) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for _ in 0..200 {
        events.extend(game.update(0.1));
        if game.tweens().is_empty() {
            break;
        }
    }
    events
}

/// A battle with Emby sent out and the turn loop open.
pub(crate) fn in_turn_loop(dice: FixedDice) -> (GameState, Seams) {
    let (mut game, audio) = test_game(dice.clone());
    game.start_battle().expect("trigger");
    settle(&mut game);
    battle::select_monster(&mut game, "Emby").expect("Emby is in the roster");
    (game, Seams { audio, dice })
}
