//! Application shell: wires game state, input, and UI together.

use crate::ecs::Vec2;
use crate::game::{self, BattleConfig, Catalog, GameAction, GameEvent, GameState, Outcome};
use crate::ui::{self, SpriteSheets};

pub struct BattleApp {
    /// `None` when the built-in catalog failed to load.
    game: Option<GameState>,
    sheets: SpriteSheets,
    /// Line shown in the overworld bar after something notable happened.
    status: Option<String>,
    load_error: Option<String>,
}

impl BattleApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config: BattleConfig = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();

        match Catalog::builtin() {
            Ok(catalog) => {
                let sheets = SpriteSheets::placeholders(&cc.egui_ctx, &catalog, &config);
                let mut game = GameState::new(config, catalog);
                sheets.register(&mut game);
                game.audio().play(game::Sound::Map);
                Self {
                    game: Some(game),
                    sheets,
                    status: None,
                    load_error: None,
                }
            }
            Err(e) => {
                log::error!("failed to load catalog: {e}");
                Self {
                    game: None,
                    sheets: SpriteSheets::default(),
                    status: None,
                    load_error: Some(e.to_string()),
                }
            }
        }
    }
}

impl eframe::App for BattleApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let Some(game) = &self.game {
            eframe::set_value(storage, eframe::APP_KEY, &game.config);
        }
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let Some(game) = self.game.as_mut() else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.heading("Could not start");
                if let Some(e) = &self.load_error {
                    ui.label(e);
                }
            });
            return;
        };

        let mut actions = input(ctx, game);
        ui::overworld_hud(ctx, game, self.status.as_deref(), &mut actions);
        ui::battle_hud(ctx, game, &self.sheets, &mut actions);
        ui::scene(ctx, game, &self.sheets);
        ui::overlay(ctx, game.hud.overlay);

        let dt = ctx.input(|i| i.stable_dt);
        let mut events = Vec::new();
        for action in &actions {
            events.extend(game::apply(game, action));
        }
        events.extend(game.update(dt));
        let lines: Vec<String> = events.iter().filter_map(status_line).collect();
        if !lines.is_empty() {
            self.status = Some(lines.join(" "));
        }

        // Tweens and sprite frames advance every frame.
        ctx.request_repaint();
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Keyboard → game actions.
fn input(ctx: &egui::Context, game: &GameState) -> Vec<GameAction> {
    let mut actions = Vec::new();
    let walking = !game.battle_active();
    let speed = game.config.walk_speed;

    ctx.input(|i| {
        if walking {
            let mut dir = Vec2::default();
            if i.key_down(egui::Key::W) || i.key_down(egui::Key::ArrowUp) {
                dir.y -= 1.0;
            }
            if i.key_down(egui::Key::S) || i.key_down(egui::Key::ArrowDown) {
                dir.y += 1.0;
            }
            if i.key_down(egui::Key::A) || i.key_down(egui::Key::ArrowLeft) {
                dir.x -= 1.0;
            }
            if i.key_down(egui::Key::D) || i.key_down(egui::Key::ArrowRight) {
                dir.x += 1.0;
            }
            if dir != Vec2::default() {
                let step = speed * i.stable_dt;
                actions.push(GameAction::Walk(Vec2::new(dir.x * step, dir.y * step)));
            }
        }
        if game.hud.dialogue.is_some()
            && (i.key_pressed(egui::Key::Space) || i.key_pressed(egui::Key::Enter))
        {
            actions.push(GameAction::AdvanceDialogue);
        }
    });
    actions
}

fn status_line(event: &GameEvent) -> Option<String> {
    match event {
        GameEvent::BattleEnded {
            outcome: Outcome::Victory { defeated },
        } => Some(format!("You defeated {defeated}!")),
        GameEvent::BattleEnded {
            outcome: Outcome::Defeat,
        } => Some("Your monster fainted. Rest up and try again.".to_owned()),
        GameEvent::RosterGrew { name } => Some(format!("{name} joined your roster!")),
        _ => None,
    }
}
