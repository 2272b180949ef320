//! UI / rendering helpers.
//!
//! This module owns everything that depends on `egui` for presentation.
//! It reads [`GameState`] and produces visual output and [`GameAction`]s;
//! no game logic lives here.

use egui::emath::Rot2;
use egui::{
    Align2, Color32, ColorImage, Id, LayerId, Mesh, Order, Painter, Pos2, RichText, Sense,
    TextureHandle, TextureId, TextureOptions,
};
use rustc_hash::FxHashMap;

use crate::ecs::{Attack, Rect, Side, SpriteImage, Vec2};
use crate::game::animator::{self, SpriteDraw};
use crate::game::battle;
use crate::game::catalog::{BACKGROUND_SHEET, FIREBALL_FRAMES, FIREBALL_SHEET};
use crate::game::{BattleConfig, Canvas, Catalog, GameAction, GameState, Scene};

/// Edge length of one generated monster frame.
const FRAME_PX: usize = 64;
/// Edge length of one generated projectile frame.
const FIREBALL_PX: usize = 32;

const BAR_GREEN: Color32 = Color32::from_rgb(0x4c, 0xaf, 0x50);

// ---------------------------------------------------------------------------
// Sprite sheets
// ---------------------------------------------------------------------------

/// GPU textures for every sheet the game draws, keyed like [`SpriteImage::key`].
#[derive(Default)]
pub struct SpriteSheets {
    textures: FxHashMap<String, TextureHandle>,
}

impl SpriteSheets {
    /// Generate flat-shaded placeholder sheets for the whole catalog.
    pub fn placeholders(ctx: &egui::Context, catalog: &Catalog, config: &BattleConfig) -> Self {
        let mut sheets = Self::default();
        for monster in catalog.monsters() {
            let image = monster_sheet(&monster.sheet, monster.frames.max.max(1) as usize);
            sheets.load(ctx, &monster.sheet, image);
        }
        sheets.load(
            ctx,
            FIREBALL_SHEET,
            fireball_sheet(FIREBALL_FRAMES.max.max(1) as usize),
        );
        sheets.load(ctx, BACKGROUND_SHEET, background(config));
        sheets
    }

    fn load(&mut self, ctx: &egui::Context, key: &str, image: ColorImage) {
        let handle = ctx.load_texture(key, image, TextureOptions::NEAREST);
        self.textures.insert(key.to_owned(), handle);
    }

    /// Report every loaded sheet's pixel size to the game.
    pub fn register(&self, game: &mut GameState) {
        for (key, handle) in &self.textures {
            let [w, h] = handle.size();
            game.register_sheet(key.clone(), Vec2::new(w as f32, h as f32));
        }
    }

    fn texture(&self, key: &str) -> Option<TextureId> {
        self.textures.get(key).map(TextureHandle::id)
    }
}

fn tint(key: &str) -> [u8; 3] {
    let h = key
        .bytes()
        .fold(7_u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    [
        96 + (h & 0x7f) as u8,
        96 + ((h >> 8) & 0x7f) as u8,
        96 + ((h >> 16) & 0x7f) as u8,
    ]
}

/// Fill a `w`×`h` image, pixel by pixel.
fn paint(w: usize, h: usize, shade: impl Fn(usize, usize) -> [u8; 4]) -> ColorImage {
    let mut rgba = vec![0_u8; w * h * 4];
    for (i, px) in rgba.chunks_exact_mut(4).enumerate() {
        px.copy_from_slice(&shade(i % w, i / w));
    }
    ColorImage::from_rgba_unmultiplied([w, h], &rgba)
}

/// A bobbing blob with one eye, one frame per column.
fn monster_sheet(key: &str, frames: usize) -> ColorImage {
    let [r, g, b] = tint(key);
    let half = FRAME_PX as f32 / 2.0;
    paint(FRAME_PX * frames, FRAME_PX, |x, y| {
        let frame = x / FRAME_PX;
        let bob = if frame % 2 == 1 { 3.0 } else { 0.0 };
        let fx = (x % FRAME_PX) as f32 + 0.5 - half;
        let fy = y as f32 + 0.5 - (half + 4.0 - bob);
        let body = (fx / 26.0).powi(2) + (fy / 22.0).powi(2);
        let eye = (fx - 8.0).powi(2) + (fy + 6.0).powi(2);
        if eye <= 16.0 {
            [20, 20, 20, 255]
        } else if body <= 1.0 {
            [r, g, b, 255]
        } else {
            [0, 0, 0, 0]
        }
    })
}

/// A pulsing orange disc.
fn fireball_sheet(frames: usize) -> ColorImage {
    let half = FIREBALL_PX as f32 / 2.0;
    paint(FIREBALL_PX * frames, FIREBALL_PX, |x, y| {
        let frame = x / FIREBALL_PX;
        let radius = 9.0 + (frame % 2) as f32 * 3.0;
        let dx = (x % FIREBALL_PX) as f32 + 0.5 - half;
        let dy = y as f32 + 0.5 - half;
        let d = (dx * dx + dy * dy).sqrt();
        if d <= radius * 0.5 {
            [255, 224, 120, 255]
        } else if d <= radius {
            [232, 96, 32, 255]
        } else {
            [0, 0, 0, 0]
        }
    })
}

/// Sky, ground, and a platform under each combatant's slot.
fn background(config: &BattleConfig) -> ColorImage {
    let w = config.canvas_size.x.max(1.0) as usize;
    let h = config.canvas_size.y.max(1.0) as usize;
    let horizon = h as f32 * 0.45;
    let pads = [config.enemy_position, config.player_position].map(|p| {
        Vec2::new(
            p.x + FRAME_PX as f32 / 2.0,
            p.y + FRAME_PX as f32 - 4.0,
        )
    });
    paint(w, h, |x, y| {
        let (x, y) = (x as f32, y as f32);
        let on_pad = pads
            .iter()
            .any(|p| ((x - p.x) / 70.0).powi(2) + ((y - p.y) / 14.0).powi(2) <= 1.0);
        if on_pad {
            [150, 128, 96, 255]
        } else if y < horizon {
            let t = y / horizon;
            [(140.0 + 60.0 * t) as u8, (190.0 + 40.0 * t) as u8, 240, 255]
        } else {
            [104, 160, 88, 255]
        }
    })
}

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// [`Canvas`] over an egui painter, letterboxing the game canvas into `screen`.
pub struct EguiCanvas<'a> {
    painter: &'a Painter,
    sheets: &'a SpriteSheets,
    origin: Pos2,
    scale: f32,
}

impl<'a> EguiCanvas<'a> {
    pub fn new(
        painter: &'a Painter,
        sheets: &'a SpriteSheets,
        screen: egui::Rect,
        canvas_size: Vec2,
    ) -> Self {
        let (origin, scale) = fit(screen, canvas_size);
        Self {
            painter,
            sheets,
            origin,
            scale,
        }
    }

    fn to_screen(&self, p: Vec2) -> Pos2 {
        self.origin + egui::vec2(p.x, p.y) * self.scale
    }

    fn to_screen_rect(&self, r: Rect) -> egui::Rect {
        egui::Rect::from_min_size(
            self.to_screen(Vec2::new(r.x, r.y)),
            egui::vec2(r.w, r.h) * self.scale,
        )
    }
}

/// Top-left corner and uniform scale that centre `canvas` inside `screen`.
fn fit(screen: egui::Rect, canvas: Vec2) -> (Pos2, f32) {
    if canvas.x <= 0.0 || canvas.y <= 0.0 {
        return (screen.min, 1.0);
    }
    let scale = (screen.width() / canvas.x).min(screen.height() / canvas.y);
    let size = egui::vec2(canvas.x, canvas.y) * scale;
    (screen.center() - size / 2.0, scale)
}

impl Canvas for EguiCanvas<'_> {
    fn draw_image(&mut self, image: &SpriteImage, draw: &SpriteDraw) {
        let (Some(texture), Some(size)) = (self.sheets.texture(&image.key), image.size) else {
            return;
        };
        let uv = egui::Rect::from_min_max(
            Pos2::new(draw.src.x / size.x, draw.src.y / size.y),
            Pos2::new(
                (draw.src.x + draw.src.w) / size.x,
                (draw.src.y + draw.src.h) / size.y,
            ),
        );
        let mut mesh = Mesh::with_texture(texture);
        mesh.add_rect_with_uv(
            self.to_screen_rect(draw.dst),
            uv,
            Color32::WHITE.gamma_multiply(draw.alpha),
        );
        if draw.rotation.abs() > f32::EPSILON {
            mesh.rotate(Rot2::from_angle(draw.rotation), self.to_screen(draw.pivot));
        }
        self.painter.add(egui::Shape::mesh(mesh));
    }

    fn fill_rect(&mut self, rect: Rect, [r, g, b, a]: [u8; 4]) {
        self.painter.rect_filled(
            self.to_screen_rect(rect),
            0.0,
            Color32::from_rgba_unmultiplied(r, g, b, a),
        );
    }
}

/// Paint whichever scene is running into the remaining central area.
pub fn scene(ctx: &egui::Context, game: &mut GameState, sheets: &SpriteSheets) {
    egui::CentralPanel::default()
        .frame(egui::Frame::NONE.fill(Color32::BLACK))
        .show(ctx, |ui| {
            let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::hover());
            let mut canvas =
                EguiCanvas::new(&painter, sheets, response.rect, game.config.canvas_size);
            game.draw(&mut canvas);
        });
}

/// Black full-screen fade above everything else.
pub fn overlay(ctx: &egui::Context, opacity: f32) {
    if opacity <= 0.0 {
        return;
    }
    let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("transition")));
    painter.rect_filled(
        ctx.content_rect(),
        0.0,
        Color32::BLACK.gamma_multiply(opacity.min(1.0)),
    );
}

// ---------------------------------------------------------------------------
// Battle interface
// ---------------------------------------------------------------------------

fn attack_color(attack: &Attack) -> Color32 {
    let [r, g, b] = attack.color;
    Color32::from_rgb(r, g, b)
}

fn health_bar(ctx: &egui::Context, game: &GameState, side: Side) {
    let (id, label, anchor, offset) = match side {
        Side::Enemy => (
            "enemy_bar",
            &game.hud.enemy_label,
            Align2::LEFT_TOP,
            egui::vec2(50.0, 50.0),
        ),
        Side::Player => (
            "player_bar",
            &game.hud.player_label,
            Align2::RIGHT_BOTTOM,
            egui::vec2(-50.0, -170.0),
        ),
    };
    if label.is_empty() {
        return;
    }
    egui::Area::new(Id::new(id))
        .anchor(anchor, offset)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.set_width(250.0);
                ui.label(RichText::new(label).strong());
                ui.add(
                    egui::ProgressBar::new(game.hud.bar(side) / 100.0)
                        .fill(BAR_GREEN)
                        .desired_height(8.0),
                );
            });
        });
}

/// Attack buttons, or the dialogue box while narration is showing.
fn attack_box(ctx: &egui::Context, game: &GameState, actions: &mut Vec<GameAction>) {
    egui::TopBottomPanel::bottom("attack_box")
        .exact_height(140.0)
        .show(ctx, |ui| {
            if let Some(text) = &game.hud.dialogue {
                let response = ui.add_sized(
                    ui.available_size(),
                    egui::Label::new(RichText::new(text).size(22.0)).sense(Sense::click()),
                );
                if response.clicked() {
                    actions.push(GameAction::AdvanceDialogue);
                }
                return;
            }

            let attacks = game
                .battle
                .as_ref()
                .map(battle::BattleSession::player_attacks)
                .unwrap_or_default();
            let enabled = battle::accepts_attack(game);
            let mut hovered = None;

            ui.horizontal_centered(|ui| {
                for attack in &attacks {
                    let response = ui.add_enabled(
                        enabled,
                        egui::Button::new(RichText::new(&attack.name).size(18.0))
                            .min_size(egui::vec2(180.0, 56.0)),
                    );
                    if response.contains_pointer() {
                        hovered = Some(attack);
                    }
                    if response.clicked() {
                        actions.push(GameAction::UseAttack(attack.name.clone()));
                    }
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.add_space(24.0);
                    match hovered {
                        Some(attack) => ui.label(
                            RichText::new(&attack.category)
                                .size(22.0)
                                .color(attack_color(attack)),
                        ),
                        None => ui.label(RichText::new("Attack Type").size(22.0)),
                    };
                });
            });
        });
}

/// The monster picker shown when a battle opens.
fn choose_panel(
    ctx: &egui::Context,
    game: &mut GameState,
    sheets: &SpriteSheets,
    actions: &mut Vec<GameAction>,
) {
    let Some(session) = game.battle.as_mut() else {
        return;
    };
    egui::Window::new("Choose your monster")
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                for choice in &mut session.choices {
                    ui.vertical(|ui| {
                        let (response, painter) =
                            ui.allocate_painter(egui::vec2(96.0, 96.0), Sense::click());
                        let frame = animator::crop_rect(&choice.preview)
                            .map_or(Vec2::new(1.0, 1.0), |r| Vec2::new(r.w, r.h));
                        let mut canvas = EguiCanvas::new(&painter, sheets, response.rect, frame);
                        animator::draw(&mut choice.preview, &mut canvas);
                        if response.hovered() {
                            painter.rect_stroke(
                                response.rect,
                                4.0,
                                ui.visuals().selection.stroke,
                                egui::StrokeKind::Inside,
                            );
                        }

                        let picked = ui.button(&choice.name).clicked() || response.clicked();
                        ui.horizontal(|ui| {
                            for attack in &choice.attacks {
                                ui.label(
                                    RichText::new(&attack.category)
                                        .small()
                                        .color(attack_color(attack)),
                                );
                            }
                        });
                        if picked {
                            actions.push(GameAction::SelectMonster(choice.name.clone()));
                        }
                    });
                }
            });
        });
}

/// Battle interface around the canvas. Call before [`scene`] so the bottom
/// panel claims its space first.
pub fn battle_hud(
    ctx: &egui::Context,
    game: &mut GameState,
    sheets: &SpriteSheets,
    actions: &mut Vec<GameAction>,
) {
    if !game.hud.interface_visible || game.scene() != Scene::Battle {
        return;
    }
    attack_box(ctx, game, actions);
    health_bar(ctx, game, Side::Enemy);
    health_bar(ctx, game, Side::Player);
    if game.hud.choose_panel_visible {
        choose_panel(ctx, game, sheets, actions);
    }
}

/// Roster strip and status line shown while walking.
pub fn overworld_hud(
    ctx: &egui::Context,
    game: &GameState,
    status: Option<&str>,
    actions: &mut Vec<GameAction>,
) {
    if game.scene() != Scene::Overworld {
        return;
    }
    egui::TopBottomPanel::top("overworld_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Roster:").strong());
            for name in game.roster.names() {
                ui.label(name);
            }
            ui.separator();
            let idle = !game.battle_active();
            if ui
                .add_enabled(idle, egui::Button::new("Look for trouble"))
                .clicked()
            {
                actions.push(GameAction::StartBattle);
            }
            if let Some(status) = status {
                ui.separator();
                ui.label(status);
            }
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_letterboxes_wide_screens() {
        let screen = egui::Rect::from_min_size(Pos2::ZERO, egui::vec2(2048.0, 576.0));
        let (origin, scale) = fit(screen, Vec2::new(1024.0, 576.0));
        assert_eq!(scale, 1.0);
        assert_eq!(origin, Pos2::new(512.0, 0.0));
    }

    #[test]
    fn fit_shrinks_to_the_tighter_axis() {
        let screen = egui::Rect::from_min_size(Pos2::ZERO, egui::vec2(512.0, 576.0));
        let (origin, scale) = fit(screen, Vec2::new(1024.0, 576.0));
        assert_eq!(scale, 0.5);
        assert_eq!(origin, Pos2::new(0.0, 144.0));
    }

    #[test]
    fn monster_sheet_lays_frames_side_by_side() {
        let image = monster_sheet("emby", 4);
        assert_eq!(image.size, [FRAME_PX * 4, FRAME_PX]);
        // Corners stay transparent so sprites sit on the backdrop.
        assert_eq!(image.pixels[0], Color32::TRANSPARENT);
    }

    #[test]
    fn background_matches_canvas() {
        let image = background(&BattleConfig::default());
        assert_eq!(image.size, [1024, 576]);
    }
}
