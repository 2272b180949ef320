//! Attack resolution: damage, narration and the on-canvas choreography.
//!
//! Damage lands the moment an attack resolves. The animation that follows is
//! purely cosmetic; its impact callback plays the hit sound, eases the
//! recipient's health bar down, and shakes the recipient.

use crate::ecs::{Attack, AttackKind, Entity, EntityID, Side, Sprite, SpriteImage, Vec2};

use super::battle::BattleError;
use super::catalog::{FIREBALL_FRAMES, FIREBALL_SHEET};
use super::tween::{self, TweenSpec, TweenTarget};
use super::{GameState, Sound};

const PLAYER_FIREBALL_ROTATION: f32 = 1.0;
const ENEMY_FIREBALL_ROTATION: f32 = -2.2;

/// Resolve `attack` from `attacker` onto `recipient`.
///
/// Shows "X used Y", subtracts the damage, then starts the kind-specific
/// animation. An attack of unknown kind is narrated but deals no damage.
pub fn resolve(
    game: &mut GameState,
    attacker: EntityID,
    attack: &Attack,
    recipient: EntityID,
) -> Result<(), BattleError> {
    let session = game.battle.as_ref().ok_or(BattleError::NoBattle)?;
    let attacker_entity = session
        .entity(attacker)
        .ok_or(BattleError::MissingEntity(attacker))?;
    let attacker_name = attacker_entity.name.clone();
    let attacker_side = attacker_entity
        .combatant
        .as_ref()
        .map_or(Side::Player, |c| c.side);
    let origin = attacker_entity.sprite.position;

    game.hud.dialogue = Some(format!("{attacker_name} used {}", attack.name));

    if attack.kind == AttackKind::Unknown {
        return Err(BattleError::UnknownAttackKind {
            attacker: attacker_name,
            attack: attack.name.clone(),
        });
    }

    let session = game.battle.as_mut().ok_or(BattleError::NoBattle)?;
    let target = session
        .combatant_mut(recipient)
        .ok_or(BattleError::MissingEntity(recipient))?;
    let damage = i32::try_from(attack.damage).unwrap_or(i32::MAX);
    target.health = target.health.saturating_sub(damage);
    log::debug!(
        "{attacker_name} hit for {}, recipient at {}",
        attack.damage,
        target.health
    );

    match attack.kind {
        AttackKind::Melee => lunge(game, attacker, attacker_side, origin.x, recipient),
        AttackKind::Projectile => launch(game, attacker_side, origin, recipient),
        AttackKind::Unknown => {}
    }
    Ok(())
}

/// Step back, dash forward, return. The dash's end is the impact.
fn lunge(game: &mut GameState, attacker: EntityID, side: Side, x0: f32, recipient: EntityID) {
    let d = match side {
        Side::Player => game.config.lunge_distance,
        Side::Enemy => -game.config.lunge_distance,
    };
    let back = game.config.tween_duration;
    let dash = game.config.lunge_duration;
    let target = TweenTarget::X(attacker);

    let segments = vec![
        TweenSpec::to(target, x0 - d).duration(back),
        TweenSpec::to(target, x0 + 2.0 * d)
            .duration(dash)
            .on_complete(move |game: &mut GameState| hit(game, recipient, Sound::TackleHit)),
        TweenSpec::to(target, x0).duration(back),
    ];
    if let Some(timeline) = tween::timeline(segments) {
        game.tweens().add(timeline);
    }
}

/// Fire a transient sprite from the attacker to the recipient.
fn launch(game: &mut GameState, side: Side, origin: Vec2, recipient: EntityID) {
    let Some(destination) = game
        .battle
        .as_ref()
        .and_then(|s| s.entity(recipient))
        .map(|e| e.sprite.position)
    else {
        return;
    };
    game.audio().play(Sound::InitFireball);

    let rotation = match side {
        Side::Player => PLAYER_FIREBALL_ROTATION,
        Side::Enemy => ENEMY_FIREBALL_ROTATION,
    };
    let sprite = Sprite::new(
        origin,
        SpriteImage::new(FIREBALL_SHEET, game.sheets.get(FIREBALL_SHEET)),
        FIREBALL_FRAMES,
    )
    .animated()
    .rotated(rotation);

    let index = game.config.projectile_index;
    let Some(session) = game.battle.as_mut() else {
        return;
    };
    let fireball = session.spawn(Entity::decoration("fireball", sprite));
    session.show_at(index, fireball);

    let flight = game.config.tween_duration;
    game.tweens()
        .add(TweenSpec::to(TweenTarget::Y(fireball), destination.y).duration(flight));
    game.tweens().add(
        TweenSpec::to(TweenTarget::X(fireball), destination.x)
            .duration(flight)
            .on_complete(move |game: &mut GameState| {
                hit(game, recipient, Sound::FireballHit);
                if let Some(session) = game.battle.as_mut() {
                    session.despawn(fireball);
                }
            }),
    );
}

/// Impact feedback on the recipient.
fn hit(game: &mut GameState, recipient: EntityID, sound: Sound) {
    let Some((side, percent, x)) = game
        .battle
        .as_ref()
        .and_then(|s| s.entity(recipient))
        .and_then(|e| {
            let c = e.combatant.as_ref()?;
            Some((c.side, c.health_percent(), e.sprite.position.x))
        })
    else {
        return;
    };
    game.audio().play(sound);

    let config = &game.config;
    let bar = TweenSpec::to(TweenTarget::HealthBar(side), percent).duration(config.tween_duration);
    let shake = TweenSpec::to(TweenTarget::X(recipient), x + config.shake_offset)
        .duration(config.shake_duration)
        .yoyo(config.shake_repeat);
    let flicker = TweenSpec::to(TweenTarget::Opacity(recipient), 0.0)
        .duration(config.shake_duration)
        .yoyo(config.shake_repeat);

    let tweens = game.tweens();
    tweens.add(bar);
    tweens.add(shake);
    tweens.add(flicker);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::audio::tests::Cue;
    use crate::game::testing::{FixedDice, in_turn_loop, settle};

    fn attack(kind: AttackKind, damage: u32) -> Attack {
        Attack {
            name: "Slam".into(),
            kind,
            damage,
            category: "Normal".into(),
            color: [0, 0, 0],
        }
    }

    fn fighters(game: &GameState) -> (EntityID, EntityID) {
        let session = game.battle.as_ref().expect("battle");
        (
            session.player.expect("player"),
            session.enemy.expect("enemy"),
        )
    }

    fn health(game: &GameState, id: EntityID) -> i32 {
        game.battle
            .as_ref()
            .and_then(|s| s.combatant(id))
            .map(|c| c.health)
            .expect("combatant")
    }

    fn x(game: &GameState, id: EntityID) -> f32 {
        game.battle
            .as_ref()
            .and_then(|s| s.entity(id))
            .map(|e| e.sprite.position.x)
            .expect("entity")
    }

    #[test]
    fn damage_lands_before_any_animation() {
        let (mut game, _) = in_turn_loop(FixedDice::default());
        let (player, enemy) = fighters(&game);

        resolve(&mut game, player, &attack(AttackKind::Melee, 20), enemy).expect("resolves");

        assert_eq!(health(&game, enemy), 80);
        assert_eq!(game.hud.dialogue.as_deref(), Some("Emby used Slam"));
        // The bar only moves at impact.
        assert_eq!(game.hud.enemy_bar, 100.0);
    }

    #[test]
    fn huge_damage_saturates_instead_of_wrapping() {
        let (mut game, _) = in_turn_loop(FixedDice::default());
        let (player, enemy) = fighters(&game);

        // Larger than i32::MAX: must not wrap into a heal.
        resolve(&mut game, player, &attack(AttackKind::Melee, 3_000_000_000), enemy)
            .expect("resolves");
        assert_eq!(health(&game, enemy), 100 - i32::MAX);
        assert!(game.battle.as_ref().expect("battle").is_fainted(enemy));

        // Exactly i32::MAX + 1 on an already negative health: must not overflow.
        resolve(&mut game, enemy, &attack(AttackKind::Melee, 2_147_483_648), player)
            .expect("resolves");
        resolve(&mut game, player, &attack(AttackKind::Melee, 2_147_483_648), enemy)
            .expect("resolves");
        assert_eq!(health(&game, player), 100 - i32::MAX);
        assert_eq!(health(&game, enemy), i32::MIN);

        settle(&mut game);
        assert_eq!(game.hud.enemy_bar, 0.0);
        assert_eq!(game.hud.player_bar, 0.0);
    }

    #[test]
    fn melee_impact_drains_bar_and_attacker_returns() {
        let (mut game, audio) = in_turn_loop(FixedDice::default());
        let (player, enemy) = fighters(&game);
        let x0 = x(&game, player);

        resolve(&mut game, player, &attack(AttackKind::Melee, 20), enemy).expect("resolves");
        game.update(0.5);
        assert_eq!(x(&game, player), x0 - game.config.lunge_distance);

        settle(&mut game);
        assert_eq!(game.hud.enemy_bar, 80.0);
        assert_eq!(x(&game, player), x0);
        assert_eq!(audio.cues().last(), Some(&Cue::Play(Sound::TackleHit)));

        let session = game.battle.as_ref().expect("battle");
        assert_eq!(session.entity(enemy).map(|e| e.sprite.opacity), Some(1.0));
    }

    #[test]
    fn enemy_lunges_the_other_way() {
        let (mut game, _) = in_turn_loop(FixedDice::default());
        let (player, enemy) = fighters(&game);
        let x0 = x(&game, enemy);

        resolve(&mut game, enemy, &attack(AttackKind::Melee, 5), player).expect("resolves");
        game.update(0.5);
        assert_eq!(x(&game, enemy), x0 + game.config.lunge_distance);
    }

    #[test]
    fn projectile_flies_between_background_and_player() {
        let (mut game, audio) = in_turn_loop(FixedDice::default());
        let (player, enemy) = fighters(&game);

        resolve(&mut game, player, &attack(AttackKind::Projectile, 25), enemy).expect("resolves");
        assert_eq!(health(&game, enemy), 75);
        assert_eq!(audio.cues().last(), Some(&Cue::Play(Sound::InitFireball)));

        let session = game.battle.as_ref().expect("battle");
        assert_eq!(session.render_set.len(), 4);
        let fireball = session.render_set[2];
        let sprite = &session.entity(fireball).expect("spawned").sprite;
        assert_eq!(sprite.image.key, FIREBALL_SHEET);
        assert_eq!(sprite.rotation, PLAYER_FIREBALL_ROTATION);
        assert_eq!(session.render_set[3], player);

        settle(&mut game);
        let session = game.battle.as_ref().expect("battle");
        assert_eq!(session.render_set.len(), 3);
        assert!(session.entity(fireball).is_none());
        assert_eq!(game.hud.enemy_bar, 75.0);
        assert!(audio.cues().contains(&Cue::Play(Sound::FireballHit)));
    }

    #[test]
    fn projectile_index_is_clamped_to_render_set() {
        let (mut game, _) = in_turn_loop(FixedDice::default());
        game.config.projectile_index = 99;
        let (player, enemy) = fighters(&game);

        resolve(&mut game, enemy, &attack(AttackKind::Projectile, 1), player).expect("resolves");
        let session = game.battle.as_ref().expect("battle");
        let last = *session.render_set.last().expect("non-empty");
        let sprite = &session.entity(last).expect("fireball").sprite;
        assert_eq!(sprite.rotation, ENEMY_FIREBALL_ROTATION);
    }

    #[test]
    fn unknown_kind_is_narrated_without_damage() {
        let (mut game, _) = in_turn_loop(FixedDice::default());
        let (player, enemy) = fighters(&game);

        let result = resolve(&mut game, player, &attack(AttackKind::Unknown, 50), enemy);
        assert_eq!(
            result,
            Err(BattleError::UnknownAttackKind {
                attacker: "Emby".into(),
                attack: "Slam".into()
            })
        );
        assert_eq!(health(&game, enemy), 100);
        assert_eq!(game.hud.dialogue.as_deref(), Some("Emby used Slam"));
        assert!(game.tweens().is_empty());
    }

    #[test]
    fn missing_recipient_is_an_error() {
        let (mut game, _) = in_turn_loop(FixedDice::default());
        let (player, _) = fighters(&game);
        let ghost = EntityID(999);
        assert_eq!(
            resolve(&mut game, player, &attack(AttackKind::Melee, 1), ghost),
            Err(BattleError::MissingEntity(ghost))
        );
    }
}
