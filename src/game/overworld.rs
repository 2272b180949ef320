//! The overworld field the player walks between battles.

use crate::ecs::{Rect, Vec2};

use super::animator::Canvas;

/// Side length of the walker's square, in canvas pixels.
pub const WALKER_SIZE: f32 = 48.0;

const GROUND: [u8; 4] = [118, 170, 92, 255];
const GRASS: [u8; 4] = [58, 120, 54, 255];
const WALKER: [u8; 4] = [236, 224, 200, 255];

#[derive(Debug, Clone, PartialEq)]
pub struct Overworld {
    pub size: Vec2,
    /// Top-left corner of the walker.
    pub walker: Vec2,
    /// Tall-grass patches where wild monsters lurk.
    pub zones: Vec<Rect>,
}

impl Overworld {
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            walker: Vec2::new(size.x / 2.0 - WALKER_SIZE / 2.0, size.y / 2.0 - WALKER_SIZE / 2.0),
            zones: vec![
                Rect::new(96.0, 64.0, 240.0, 144.0),
                Rect::new(size.x - 336.0, size.y - 208.0, 240.0, 144.0),
            ],
        }
    }

    pub fn walker_rect(&self) -> Rect {
        Rect::new(self.walker.x, self.walker.y, WALKER_SIZE, WALKER_SIZE)
    }

    /// Move the walker by `delta`, clamped to the field. Returns whether it moved.
    pub fn walk(&mut self, delta: Vec2) -> bool {
        let before = self.walker;
        self.walker.x = (self.walker.x + delta.x).clamp(0.0, self.size.x - WALKER_SIZE);
        self.walker.y = (self.walker.y + delta.y).clamp(0.0, self.size.y - WALKER_SIZE);
        self.walker != before
    }

    /// True when at least half the walker stands inside one zone.
    pub fn in_encounter_zone(&self) -> bool {
        let walker = self.walker_rect();
        let half = walker.w * walker.h / 2.0;
        self.zones.iter().any(|zone| overlap_area(&walker, zone) > half)
    }

    pub fn draw(&self, canvas: &mut dyn Canvas) {
        canvas.fill_rect(Rect::new(0.0, 0.0, self.size.x, self.size.y), GROUND);
        for zone in &self.zones {
            canvas.fill_rect(*zone, GRASS);
        }
        canvas.fill_rect(self.walker_rect(), WALKER);
    }
}

fn overlap_area(a: &Rect, b: &Rect) -> f32 {
    let w = (a.x + a.w).min(b.x + b.w) - a.x.max(b.x);
    let h = (a.y + a.h).min(b.y + b.h) - a.y.max(b.y);
    w.max(0.0) * h.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::animator::tests::RecordingCanvas;

    fn field() -> Overworld {
        Overworld::new(Vec2::new(1024.0, 576.0))
    }

    #[test]
    fn walk_is_clamped_to_the_field() {
        let mut world = field();
        assert!(world.walk(Vec2::new(-5000.0, 0.0)));
        assert_eq!(world.walker.x, 0.0);
        assert!(!world.walk(Vec2::new(-10.0, 0.0)));
    }

    #[test]
    fn start_position_is_outside_grass() {
        assert!(!field().in_encounter_zone());
    }

    #[test]
    fn standing_mostly_in_grass_counts() {
        let mut world = field();
        world.walker = Vec2::new(100.0, 70.0);
        assert!(world.in_encounter_zone());

        // Only a sliver overlaps.
        world.walker = Vec2::new(96.0 - WALKER_SIZE + 4.0, 70.0);
        assert!(!world.in_encounter_zone());
    }

    #[test]
    fn draw_paints_ground_zones_and_walker() {
        let world = field();
        let mut canvas = RecordingCanvas::default();
        world.draw(&mut canvas);
        assert_eq!(canvas.rects.len(), 2 + world.zones.len());
        assert!(canvas.images.is_empty());
    }
}
