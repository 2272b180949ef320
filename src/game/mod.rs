//! Core game logic, free of `egui`.
//!
//! [`GameState`] is the single context every deferred step and tween
//! completion receives. Input arrives as [`GameAction`]s through the
//! [`apply`] function; time arrives through [`GameState::update`]; drawing
//! goes through the [`Canvas`] trait. All of it runs on one thread.

pub mod animator;
pub mod attack;
pub mod audio;
pub mod battle;
pub mod catalog;
pub mod config;
pub mod overworld;
pub mod queue;
pub mod tween;

#[cfg(test)]
pub(crate) mod testing;

use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

use crate::ecs::{EntityID, Side, Sprite, Vec2};

pub use animator::Canvas;
pub use audio::{AudioSink, LogAudio, Sound};
pub use battle::{BattleError, BattlePhase, BattleSession};
pub use catalog::{Catalog, CatalogError, Roster, SheetSizes};
pub use config::BattleConfig;
pub use overworld::Overworld;
pub use queue::{Advance, Narrated, StepQueue};
pub use tween::{TweenHost, TweenSpec, TweenTarget, Tweener};

// ---------------------------------------------------------------------------
// Actions & events
// ---------------------------------------------------------------------------

/// Every input the game reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum GameAction {
    /// Move the overworld walker by this many canvas pixels.
    Walk(Vec2),
    /// Start a wild encounter right away.
    StartBattle,
    /// Pick a roster entry to send into battle.
    SelectMonster(String),
    /// Use one of the player monster's attacks.
    UseAttack(String),
    /// Click on the dialogue box.
    AdvanceDialogue,
}

/// How a battle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Victory { defeated: String },
    Defeat,
}

/// Events emitted so upper layers know what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    BattleStarted { wild: String },
    BattleReady,
    MonsterSelected { name: String },
    AttackUsed { attacker: String, attack: String },
    Fainted { name: String, side: Side },
    BattleEnded { outcome: Outcome },
    RosterGrew { name: String },
}

/// Which render loop is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scene {
    Overworld,
    Battle,
}

// ---------------------------------------------------------------------------
// UI surface state
// ---------------------------------------------------------------------------

/// Everything the presentation layer shows around the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Hud {
    /// The whole battle interface (bars, attack box, dialogue).
    pub interface_visible: bool,
    pub choose_panel_visible: bool,
    /// Narration text; `None` hides the dialogue box.
    pub dialogue: Option<String>,
    pub enemy_bar: f32,
    pub player_bar: f32,
    pub enemy_label: String,
    pub player_label: String,
    /// Opacity of the black transition overlay.
    pub overlay: f32,
}

impl Default for Hud {
    fn default() -> Self {
        Self {
            interface_visible: false,
            choose_panel_visible: false,
            dialogue: None,
            enemy_bar: 100.0,
            player_bar: 100.0,
            enemy_label: String::new(),
            player_label: String::new(),
            overlay: 0.0,
        }
    }
}

impl Hud {
    pub fn bar_mut(&mut self, side: Side) -> &mut f32 {
        match side {
            Side::Player => &mut self.player_bar,
            Side::Enemy => &mut self.enemy_bar,
        }
    }

    pub fn bar(&self, side: Side) -> f32 {
        match side {
            Side::Player => self.player_bar,
            Side::Enemy => self.enemy_bar,
        }
    }
}

// ---------------------------------------------------------------------------
// Randomness
// ---------------------------------------------------------------------------

/// Source of the game's random choices.
pub trait Dice {
    /// Uniform index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;

    /// Uniform value in `0.0..1.0`.
    fn roll(&mut self) -> f32;
}

/// [`Dice`] backed by a seedable RNG.
pub struct RandomDice(StdRng);

impl RandomDice {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Dice for RandomDice {
    fn pick(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }

    fn roll(&mut self) -> f32 {
        self.0.r#gen()
    }
}

// ---------------------------------------------------------------------------
// Game state
// ---------------------------------------------------------------------------

pub struct GameState {
    pub config: BattleConfig,
    pub catalog: Catalog,
    pub sheets: SheetSizes,
    pub roster: Roster,
    pub overworld: Overworld,
    /// Present from the encounter trigger until the closing fade completes.
    pub battle: Option<BattleSession>,
    pub hud: Hud,
    pub last_outcome: Option<Outcome>,
    scene: Scene,
    tweens: Tweener<Self>,
    audio: Box<dyn AudioSink>,
    dice: Box<dyn Dice>,
    events: Vec<GameEvent>,
}

impl GameState {
    pub fn new(config: BattleConfig, catalog: Catalog) -> Self {
        Self {
            roster: catalog.starting_roster(),
            overworld: Overworld::new(config.canvas_size),
            config,
            catalog,
            sheets: SheetSizes::default(),
            battle: None,
            hud: Hud::default(),
            last_outcome: None,
            scene: Scene::Overworld,
            tweens: Tweener::default(),
            audio: Box::new(LogAudio),
            dice: Box::new(RandomDice::from_entropy()),
            events: Vec::new(),
        }
    }

    pub fn with_audio(mut self, audio: impl AudioSink + 'static) -> Self {
        self.audio = Box::new(audio);
        self
    }

    pub fn with_dice(mut self, dice: impl Dice + 'static) -> Self {
        self.dice = Box::new(dice);
        self
    }

    pub const fn scene(&self) -> Scene {
        self.scene
    }

    /// The flag the overworld consults before letting the walker move.
    pub const fn battle_active(&self) -> bool {
        self.battle.is_some()
    }

    pub fn phase(&self) -> BattlePhase {
        self.battle
            .as_ref()
            .map_or(BattlePhase::Idle, |session| session.phase)
    }

    pub fn audio(&mut self) -> &mut dyn AudioSink {
        self.audio.as_mut()
    }

    pub fn dice(&mut self) -> &mut dyn Dice {
        self.dice.as_mut()
    }

    pub fn tweens(&mut self) -> &mut Tweener<Self> {
        &mut self.tweens
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        log::info!("{event:?}");
        self.events.push(event);
    }

    fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Record a sheet's pixel size once its image is available.
    pub fn register_sheet(&mut self, key: impl Into<String>, size: Vec2) {
        self.sheets.insert(key, size);
    }

    /// Advance time-based animation by `dt` seconds.
    pub fn update(&mut self, dt: f32) -> Vec<GameEvent> {
        tween::advance(self, dt);
        self.take_events()
    }

    /// Draw whichever scene's render loop is running.
    pub fn draw(&mut self, canvas: &mut dyn Canvas) {
        match (self.scene, self.battle.as_mut()) {
            (Scene::Battle, Some(session)) => session.draw(canvas),
            _ => self.overworld.draw(canvas),
        }
    }

    /// Release one narration step, or hide the dialogue box.
    pub fn advance_dialogue(&mut self) -> Advance {
        queue::advance(self)
    }

    fn walk(&mut self, delta: Vec2) -> Result<(), BattleError> {
        if self.battle_active() {
            return Err(BattleError::NotAccepting("walking", self.phase()));
        }
        if !self.overworld.walk(delta) || !self.overworld.in_encounter_zone() {
            return Ok(());
        }
        if self.dice.roll() < self.config.encounter_chance {
            self.start_battle()?;
        }
        Ok(())
    }

    /// Idle → Initiating: flash the overlay, then set up the battle.
    pub fn start_battle(&mut self) -> Result<(), BattleError> {
        if self.battle_active() {
            return Err(BattleError::AlreadyInBattle);
        }
        let missing = self.sheets.missing(&self.catalog.sheets()).join(", ");
        if !missing.is_empty() {
            return Err(BattleError::AssetsNotReady(missing));
        }
        let wild = self.catalog.wild().to_owned();
        if self.catalog.monster(&wild).is_none() {
            return Err(BattleError::UnknownMonster(wild));
        }

        self.battle = Some(BattleSession::new());
        self.audio.stop(Sound::Map);
        self.audio.play(Sound::InitBattle);
        self.audio.play(Sound::Battle);
        self.emit(GameEvent::BattleStarted { wild });

        // A closing fade from the last battle may still be running.
        self.tweens.cancel_where(|t| t == TweenTarget::Overlay);
        let fade = self.config.intro_flash_duration;
        self.tweens.add(
            TweenSpec::to(TweenTarget::Overlay, 1.0)
                .duration(fade)
                .yoyo(self.config.intro_flash_repeat)
                .on_complete(move |game: &mut Self| {
                    game.tweens.add(
                        TweenSpec::to(TweenTarget::Overlay, 1.0)
                            .duration(fade)
                            .on_complete(move |game: &mut Self| {
                                battle::setup(game);
                                game.tweens
                                    .add(TweenSpec::to(TweenTarget::Overlay, 0.0).duration(fade));
                            }),
                    );
                }),
        );
        Ok(())
    }

    /// Hand control back to the overworld. Runs when the closing fade
    /// completes.
    pub(crate) fn finish_battle(&mut self, outcome: Outcome) {
        self.tweens.cancel_where(TweenTarget::is_battle_scoped);
        self.scene = Scene::Overworld;
        self.hud.interface_visible = false;
        self.hud.choose_panel_visible = false;
        self.hud.dialogue = None;
        self.tweens.add(
            TweenSpec::to(TweenTarget::Overlay, 0.0).duration(self.config.overlay_fade_duration),
        );
        self.battle = None;

        if let Outcome::Victory { defeated } = &outcome {
            if self.roster.add(defeated) {
                let name = defeated.clone();
                self.emit(GameEvent::RosterGrew { name });
            }
        }
        self.audio.play(Sound::Map);
        self.last_outcome = Some(outcome.clone());
        self.emit(GameEvent::BattleEnded { outcome });
    }

    pub(crate) fn enter_battle_scene(&mut self) {
        self.scene = Scene::Battle;
    }

    fn sprite(&self, id: EntityID) -> Option<&Sprite> {
        self.battle.as_ref()?.entities.get(&id).map(|e| &e.sprite)
    }

    fn sprite_mut(&mut self, id: EntityID) -> Option<&mut Sprite> {
        self.battle.as_mut()?.entities.get_mut(&id).map(|e| &mut e.sprite)
    }
}

impl TweenHost for GameState {
    fn tweener(&mut self) -> &mut Tweener<Self> {
        &mut self.tweens
    }

    fn read(&self, target: TweenTarget) -> Option<f32> {
        match target {
            TweenTarget::X(id) => self.sprite(id).map(|s| s.position.x),
            TweenTarget::Y(id) => self.sprite(id).map(|s| s.position.y),
            TweenTarget::Opacity(id) => self.sprite(id).map(|s| s.opacity),
            TweenTarget::HealthBar(side) => self.battle.as_ref().map(|_| self.hud.bar(side)),
            TweenTarget::Overlay => Some(self.hud.overlay),
        }
    }

    fn write(&mut self, target: TweenTarget, value: f32) -> bool {
        match target {
            TweenTarget::X(id) => self.sprite_mut(id).map(|s| s.position.x = value).is_some(),
            TweenTarget::Y(id) => self.sprite_mut(id).map(|s| s.position.y = value).is_some(),
            TweenTarget::Opacity(id) => self.sprite_mut(id).map(|s| s.opacity = value).is_some(),
            TweenTarget::HealthBar(side) => {
                if self.battle.is_none() {
                    return false;
                }
                *self.hud.bar_mut(side) = value;
                true
            }
            TweenTarget::Overlay => {
                self.hud.overlay = value;
                true
            }
        }
    }
}

impl Narrated for GameState {
    fn steps(&mut self) -> Option<&mut StepQueue<Self>> {
        self.battle.as_mut().map(|session| &mut session.queue)
    }

    fn hide_narration(&mut self) {
        self.hud.dialogue = None;
    }
}

// ---------------------------------------------------------------------------
// Pure apply function
// ---------------------------------------------------------------------------

/// Apply a single [`GameAction`] and return the events it produced.
///
/// Rejected actions (wrong phase, unknown names) are logged and produce no
/// events; they never panic.
pub fn apply(state: &mut GameState, action: &GameAction) -> Vec<GameEvent> {
    let result = match action {
        GameAction::Walk(delta) => state.walk(*delta),
        GameAction::StartBattle => state.start_battle(),
        GameAction::SelectMonster(name) => battle::select_monster(state, name),
        GameAction::UseAttack(name) => battle::use_attack(state, name),
        GameAction::AdvanceDialogue => {
            state.advance_dialogue();
            Ok(())
        }
    };
    if let Err(e) = result {
        log::debug!("ignored {action:?}: {e}");
    }
    state.take_events()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::audio::tests::Cue;
    use super::testing::{FixedDice, settle, test_game};
    use super::*;

    // -- start_battle -------------------------------------------------------

    #[test]
    fn battle_needs_loaded_sheets() {
        let (mut game, _) = test_game(FixedDice::default());
        game.sheets = SheetSizes::default();

        let result = game.start_battle();
        assert!(matches!(result, Err(BattleError::AssetsNotReady(_))));
        assert!(!game.battle_active());
    }

    #[test]
    fn trigger_flashes_then_sets_up_battle() {
        let (mut game, audio) = test_game(FixedDice::default());
        let events = apply(&mut game, &GameAction::StartBattle);

        assert_eq!(
            events,
            vec![GameEvent::BattleStarted {
                wild: "JabbaScript".into()
            }]
        );
        assert!(game.battle_active());
        assert_eq!(game.phase(), BattlePhase::Initiating);
        assert_eq!(game.scene(), Scene::Overworld);
        assert_eq!(
            audio.cues(),
            vec![
                Cue::Stop(Sound::Map),
                Cue::Play(Sound::InitBattle),
                Cue::Play(Sound::Battle)
            ]
        );

        let events = settle(&mut game);
        assert!(events.contains(&GameEvent::BattleReady));
        assert_eq!(game.phase(), BattlePhase::SelectingPlayerMonster);
        assert_eq!(game.scene(), Scene::Battle);
        assert_eq!(game.hud.overlay, 0.0);
        assert!(game.hud.choose_panel_visible);
    }

    #[test]
    fn new_battle_replaces_a_closing_fade() {
        let (mut game, _) = test_game(FixedDice::default());
        game.start_battle().expect("first trigger");
        settle(&mut game);
        battle::select_monster(&mut game, "Emby").expect("in roster");
        if let Some(session) = game.battle.as_mut() {
            let enemy = session.enemy.expect("spawned");
            session.combatant_mut(enemy).expect("combatant").health = 1;
        }
        battle::use_attack(&mut game, "Tackle").expect("attack");
        game.advance_dialogue();
        game.advance_dialogue();
        for _ in 0..50 {
            if !game.battle_active() {
                break;
            }
            game.update(0.1);
        }
        assert!(!game.battle_active());
        assert!(game.hud.overlay > 0.0, "fade-out still running");

        game.start_battle().expect("second trigger");
        assert_eq!(game.tweens().len(), 1);

        settle(&mut game);
        assert_eq!(game.phase(), BattlePhase::SelectingPlayerMonster);
        assert_eq!(game.hud.overlay, 0.0);
    }

    #[test]
    fn second_trigger_is_rejected() {
        let (mut game, _) = test_game(FixedDice::default());
        game.start_battle().expect("first trigger");
        assert_eq!(game.start_battle(), Err(BattleError::AlreadyInBattle));
    }

    // -- walking ------------------------------------------------------------

    #[test]
    fn walking_into_grass_can_trigger_encounter() {
        let (mut game, _) = test_game(FixedDice::default().with_roll(0.0));
        game.overworld.walker = Vec2::new(100.0, 70.0);

        let events = apply(&mut game, &GameAction::Walk(Vec2::new(4.0, 0.0)));
        assert!(matches!(
            events.as_slice(),
            [GameEvent::BattleStarted { .. }]
        ));
    }

    #[test]
    fn unlucky_roll_keeps_walking() {
        let (mut game, _) = test_game(FixedDice::default().with_roll(0.99));
        game.overworld.walker = Vec2::new(100.0, 70.0);

        let events = apply(&mut game, &GameAction::Walk(Vec2::new(4.0, 0.0)));
        assert!(events.is_empty());
        assert!(!game.battle_active());
    }

    #[test]
    fn walker_is_frozen_during_battle() {
        let (mut game, _) = test_game(FixedDice::default());
        game.start_battle().expect("trigger");
        let before = game.overworld.walker;

        apply(&mut game, &GameAction::Walk(Vec2::new(30.0, 0.0)));
        assert_eq!(game.overworld.walker, before);
    }

    // -- dialogue outside battle --------------------------------------------

    #[test]
    fn advance_without_battle_only_hides() {
        let (mut game, _) = test_game(FixedDice::default());
        game.hud.dialogue = Some("stale".into());
        assert_eq!(game.advance_dialogue(), Advance::Hidden);
        assert_eq!(game.hud.dialogue, None);
    }

    // -- randomness ---------------------------------------------------------

    #[test]
    fn seeded_dice_are_reproducible_and_in_range() {
        let mut a = RandomDice::seeded(7);
        let mut b = RandomDice::seeded(7);
        for _ in 0..32 {
            let pick = a.pick(3);
            assert_eq!(pick, b.pick(3));
            assert!(pick < 3);
            let roll = a.roll();
            assert!((0.0..1.0).contains(&roll));
            b.roll();
        }
    }
}
