//! Frame animator: sprite-sheet cropping and per-draw frame cycling.
//!
//! Frames advance per draw call, not per elapsed second, so animation speed
//! follows the host's refresh rate.

use crate::ecs::{FrameGrid, Rect, Sprite, SpriteImage, Vec2};

/// The drawing primitives the animator and the overworld need.
pub trait Canvas {
    /// Draw `image` as `draw` describes it. See [`SpriteDraw`] for the crop,
    /// destination, rotation pivot and opacity.
    fn draw_image(&mut self, image: &SpriteImage, draw: &SpriteDraw);

    fn fill_rect(&mut self, rect: Rect, rgba: [u8; 4]);
}

/// One resolved draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDraw {
    pub src: Rect,
    pub dst: Rect,
    pub pivot: Vec2,
    pub rotation: f32,
    pub alpha: f32,
}

/// Source crop of the current frame: `[value * fw, 0, fw, height]`.
///
/// Returns `None` while the sheet's size is unknown.
pub fn crop_rect(sprite: &Sprite) -> Option<Rect> {
    let size = sprite.image.size?;
    let frame_width = size.x / sprite.frames.max.max(1) as f32;
    Some(Rect::new(
        sprite.frames.value as f32 * frame_width,
        0.0,
        frame_width,
        size.y,
    ))
}

/// Everything needed to draw `sprite` this frame, or `None` before its
/// sheet is loaded.
pub fn draw_params(sprite: &Sprite) -> Option<SpriteDraw> {
    let src = crop_rect(sprite)?;
    let dst = Rect::new(
        sprite.position.x,
        sprite.position.y,
        src.w * sprite.scale.x,
        src.h * sprite.scale.y,
    );
    // Rotation pivots on the unscaled frame's centre.
    let pivot = Vec2::new(
        sprite.position.x + src.w / 2.0,
        sprite.position.y + src.h / 2.0,
    );
    Some(SpriteDraw {
        src,
        dst,
        pivot,
        rotation: sprite.rotation,
        alpha: sprite.opacity.clamp(0.0, 1.0),
    })
}

/// Advance the frame counter by one draw tick.
///
/// `elapsed` counts within one full cycle of `hold * max` ticks and wraps to
/// zero, so a long-lived sprite never overflows it.
pub fn tick(frames: &mut FrameGrid) {
    let hold = frames.hold.max(1);
    if frames.max > 1 {
        let period = hold.saturating_mul(frames.max);
        frames.elapsed = (frames.elapsed % period + 1) % period;
    }
    if frames.elapsed % hold == 0 {
        frames.value = (frames.value + 1) % frames.max.max(1);
    }
}

/// Draw `sprite` and, if it animates, tick its frame grid.
///
/// Returns whether anything was drawn.
pub fn draw(sprite: &mut Sprite, canvas: &mut dyn Canvas) -> bool {
    let drawn = match draw_params(sprite) {
        Some(params) => {
            canvas.draw_image(&sprite.image, &params);
            true
        }
        None => false,
    };
    if sprite.animate {
        tick(&mut sprite.frames);
    }
    drawn
}
