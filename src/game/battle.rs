//! Battle session and the turn state machine.
//!
//! ```text
//! Idle → Initiating → SelectingPlayerMonster → TurnLoop → Resolving → Transitioning → Idle
//! ```
//!
//! One exchange is: resolve the player's attack; if the enemy fainted, queue
//! its faint and the closing transition and stop there; otherwise pick the
//! enemy's reply and queue it. The reply step checks the player for a faint
//! in turn. Because the acting side's faint is detected before the reply is
//! even chosen, a mutual knockout always goes to whoever acted first.

use std::rc::Rc;

use crate::ecs::{
    Attack, Combatant, Entity, EntityGenerator, EntityID, EntityMap, FrameGrid, Side, Sprite,
    SpriteImage, Vec2,
};

use super::animator::{self, Canvas};
use super::attack;
use super::catalog::BACKGROUND_SHEET;
use super::queue::StepQueue;
use super::tween::{TweenSpec, TweenTarget};
use super::{GameEvent, GameState, Outcome, Sound};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattlePhase {
    Idle,
    /// Intro flash is playing.
    Initiating,
    SelectingPlayerMonster,
    TurnLoop,
    /// A faint has been queued; no more attacks are accepted.
    Resolving,
    /// The closing fade is running.
    Transitioning,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BattleError {
    #[error("no battle in progress")]
    NoBattle,

    #[error("a battle is already in progress")]
    AlreadyInBattle,

    #[error("sprite sheets not loaded yet: {0}")]
    AssetsNotReady(String),

    #[error("unknown monster {0:?}")]
    UnknownMonster(String),

    #[error("{monster} does not know {attack}")]
    AttackNotKnown { monster: String, attack: String },

    #[error("{attacker} used {attack}, which has no known way to play out")]
    UnknownAttackKind { attacker: String, attack: String },

    #[error("entity {0:?} is not on the battlefield")]
    MissingEntity(EntityID),

    #[error("not accepting {0} while {1:?}")]
    NotAccepting(&'static str, BattlePhase),
}

/// A roster entry offered when the battle opens.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterChoice {
    pub name: String,
    /// Animated preview, positioned at the origin of its own little canvas.
    pub preview: Sprite,
    pub attacks: Vec<Rc<Attack>>,
}

/// Everything that lives exactly as long as one battle.
pub struct BattleSession {
    pub phase: BattlePhase,
    pub entities: EntityMap,
    entity_gen: EntityGenerator,
    /// Draw order, back to front.
    pub render_set: Vec<EntityID>,
    pub enemy: Option<EntityID>,
    pub player: Option<EntityID>,
    pub queue: StepQueue<GameState>,
    pub choices: Vec<RosterChoice>,
}

impl Default for BattleSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BattleSession {
    pub fn new() -> Self {
        Self {
            phase: BattlePhase::Initiating,
            entities: EntityMap::default(),
            entity_gen: EntityGenerator::default(),
            render_set: Vec::new(),
            enemy: None,
            player: None,
            queue: StepQueue::default(),
            choices: Vec::new(),
        }
    }

    /// Add an entity without drawing it.
    pub fn spawn(&mut self, entity: Entity) -> EntityID {
        let id = self.entity_gen.next();
        self.entities.insert(id, entity);
        id
    }

    /// Add an entity at the back of the render set.
    pub fn spawn_visible(&mut self, entity: Entity) -> EntityID {
        let id = self.spawn(entity);
        self.render_set.push(id);
        id
    }

    /// Splice `id` into the render set at `index`, clamped to its length.
    pub fn show_at(&mut self, index: usize, id: EntityID) {
        let index = index.min(self.render_set.len());
        self.render_set.insert(index, id);
    }

    pub fn hide(&mut self, id: EntityID) {
        self.render_set.retain(|shown| *shown != id);
    }

    pub fn despawn(&mut self, id: EntityID) {
        self.hide(id);
        self.entities.remove(&id);
    }

    pub fn entity(&self, id: EntityID) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn combatant(&self, id: EntityID) -> Option<&Combatant> {
        self.entities.get(&id)?.combatant.as_ref()
    }

    pub fn combatant_mut(&mut self, id: EntityID) -> Option<&mut Combatant> {
        self.entities.get_mut(&id)?.combatant.as_mut()
    }

    pub fn is_fainted(&self, id: EntityID) -> bool {
        self.combatant(id).is_some_and(Combatant::is_fainted)
    }

    /// Attacks the player monster can use, in menu order.
    pub fn player_attacks(&self) -> Vec<Rc<Attack>> {
        self.player
            .and_then(|id| self.combatant(id))
            .map(|c| c.attacks.clone())
            .unwrap_or_default()
    }

    /// Draw the render set, back to front.
    pub fn draw(&mut self, canvas: &mut dyn Canvas) {
        for id in &self.render_set {
            if let Some(entity) = self.entities.get_mut(id) {
                animator::draw(&mut entity.sprite, canvas);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Initiation and selection
// ---------------------------------------------------------------------------

/// Reset the interface, spawn the wild monster and offer the roster.
pub(crate) fn setup(game: &mut GameState) {
    let Some(template) = game.catalog.monster(game.catalog.wild()).cloned() else {
        log::warn!("wild monster {:?} vanished from the catalog", game.catalog.wild());
        return;
    };
    let choices: Vec<RosterChoice> = game
        .roster
        .names()
        .iter()
        .filter_map(|name| game.catalog.monster(name))
        .map(|m| RosterChoice {
            name: m.name.clone(),
            preview: Sprite::new(
                Vec2::default(),
                SpriteImage::new(m.sheet.clone(), game.sheets.get(&m.sheet)),
                FrameGrid::new(m.frames.max, m.frames.hold),
            )
            .animated(),
            attacks: m.attacks.clone(),
        })
        .collect();

    let background = Entity::decoration(
        "background",
        Sprite::new(
            Vec2::default(),
            SpriteImage::new(BACKGROUND_SHEET, game.sheets.get(BACKGROUND_SHEET)),
            FrameGrid::default(),
        ),
    );
    let enemy = template.spawn(
        Side::Enemy,
        game.config.enemy_position,
        game.config.max_health,
        &game.sheets,
    );

    let mut session = BattleSession::new();
    session.spawn_visible(background);
    let enemy_id = session.spawn_visible(enemy);
    session.enemy = Some(enemy_id);
    session.choices = choices;
    session.phase = BattlePhase::SelectingPlayerMonster;

    game.hud.interface_visible = true;
    game.hud.choose_panel_visible = true;
    game.hud.dialogue = None;
    game.hud.enemy_bar = 100.0;
    game.hud.player_bar = 100.0;
    game.hud.enemy_label = format!("Enemy {}", template.name);
    game.hud.player_label.clear();

    game.battle = Some(session);
    game.enter_battle_scene();
    game.emit(GameEvent::BattleReady);
}

/// SelectingPlayerMonster → TurnLoop.
pub fn select_monster(game: &mut GameState, name: &str) -> Result<(), BattleError> {
    let phase = game.phase();
    if phase != BattlePhase::SelectingPlayerMonster {
        return Err(BattleError::NotAccepting("monster selection", phase));
    }
    if !game.roster.contains(name) {
        return Err(BattleError::UnknownMonster(name.to_owned()));
    }
    let template = game
        .catalog
        .monster(name)
        .cloned()
        .ok_or_else(|| BattleError::UnknownMonster(name.to_owned()))?;
    let player = template.spawn(
        Side::Player,
        game.config.player_position,
        game.config.max_health,
        &game.sheets,
    );

    let session = game.battle.as_mut().ok_or(BattleError::NoBattle)?;
    let id = session.spawn_visible(player);
    session.player = Some(id);
    session.phase = BattlePhase::TurnLoop;

    game.hud.choose_panel_visible = false;
    game.hud.player_label = format!("Player {}", template.name);
    game.emit(GameEvent::MonsterSelected {
        name: template.name.clone(),
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// The exchange
// ---------------------------------------------------------------------------

/// Whether an attack button press would be accepted right now.
pub fn accepts_attack(game: &GameState) -> bool {
    game.phase() == BattlePhase::TurnLoop && game.hud.dialogue.is_none()
}

/// Run one exchange starting with the player's `attack_name`.
pub fn use_attack(game: &mut GameState, attack_name: &str) -> Result<(), BattleError> {
    if !accepts_attack(game) {
        return Err(BattleError::NotAccepting("attacks", game.phase()));
    }
    let session = game.battle.as_ref().ok_or(BattleError::NoBattle)?;
    let (player, enemy) = match (session.player, session.enemy) {
        (Some(player), Some(enemy)) => (player, enemy),
        _ => return Err(BattleError::NoBattle),
    };
    let attack = session
        .combatant(player)
        .and_then(|c| c.attack(attack_name).cloned())
        .ok_or_else(|| BattleError::AttackNotKnown {
            monster: session.entity(player).map(|e| e.name.clone()).unwrap_or_default(),
            attack: attack_name.to_owned(),
        })?;

    strike(game, player, &attack, enemy);

    if game.battle.as_ref().is_some_and(|s| s.is_fainted(enemy)) {
        queue_knockout(game, enemy);
        return Ok(());
    }

    let Some(reply) = pick_reply(game, enemy) else {
        return Ok(());
    };
    if let Some(session) = game.battle.as_mut() {
        session.queue.push(move |game: &mut GameState| {
            strike(game, enemy, &reply, player);
            if game.battle.as_ref().is_some_and(|s| s.is_fainted(player)) {
                queue_knockout(game, player);
            }
        });
    }
    Ok(())
}

/// Resolve an attack, reporting an unplayable one instead of failing.
fn strike(game: &mut GameState, attacker: EntityID, attack: &Rc<Attack>, recipient: EntityID) {
    let attacker_name = game
        .battle
        .as_ref()
        .and_then(|s| s.entity(attacker))
        .map(|e| e.name.clone())
        .unwrap_or_default();
    match attack::resolve(game, attacker, attack, recipient) {
        Ok(()) => game.emit(GameEvent::AttackUsed {
            attacker: attacker_name,
            attack: attack.name.clone(),
        }),
        Err(e) => log::warn!("{e}"),
    }
}

/// Choose the enemy's reply uniformly from its attack set.
fn pick_reply(game: &mut GameState, enemy: EntityID) -> Option<Rc<Attack>> {
    let attacks = game.battle.as_ref()?.combatant(enemy)?.attacks.clone();
    if attacks.is_empty() {
        return None;
    }
    let index = game.dice().pick(attacks.len()).min(attacks.len() - 1);
    attacks.get(index).cloned()
}

/// Queue the faint of `fallen` followed by the closing transition.
fn queue_knockout(game: &mut GameState, fallen: EntityID) {
    let Some(session) = game.battle.as_mut() else {
        return;
    };
    let Some(entity) = session.entity(fallen) else {
        return;
    };
    let outcome = match entity.combatant.as_ref().map(|c| c.side) {
        Some(Side::Enemy) => Outcome::Victory {
            defeated: entity.name.clone(),
        },
        _ => Outcome::Defeat,
    };
    session.phase = BattlePhase::Resolving;
    session.queue.push(move |game: &mut GameState| faint(game, fallen));
    session
        .queue
        .push(move |game: &mut GameState| transition(game, outcome));
}

/// Drop and fade the fallen monster, then take it off the canvas.
fn faint(game: &mut GameState, fallen: EntityID) {
    let Some(entity) = game.battle.as_ref().and_then(|s| s.entity(fallen)) else {
        return;
    };
    let name = entity.name.clone();
    let side = entity.combatant.as_ref().map_or(Side::Player, |c| c.side);
    let y = entity.sprite.position.y;

    game.hud.dialogue = Some(format!("{name} fainted!"));
    let drop = game.config.faint_drop;
    let fade = game.config.tween_duration;
    game.tweens()
        .add(TweenSpec::to(TweenTarget::Y(fallen), y + drop).duration(fade));
    game.tweens().add(
        TweenSpec::to(TweenTarget::Opacity(fallen), 0.0)
            .duration(fade)
            .on_complete(move |game: &mut GameState| {
                if let Some(session) = game.battle.as_mut() {
                    session.hide(fallen);
                }
            }),
    );

    game.audio().stop(Sound::Battle);
    if side.is_enemy() {
        game.audio().play(Sound::Victory);
    }
    game.emit(GameEvent::Fainted { name, side });
}

/// Fade to black; once dark, hand control back to the overworld.
fn transition(game: &mut GameState, outcome: Outcome) {
    if let Some(session) = game.battle.as_mut() {
        session.phase = BattlePhase::Transitioning;
    }
    let fade = game.config.overlay_fade_duration;
    game.tweens().add(
        TweenSpec::to(TweenTarget::Overlay, 1.0)
            .duration(fade)
            .on_complete(move |game: &mut GameState| game.finish_battle(outcome)),
    );
}
