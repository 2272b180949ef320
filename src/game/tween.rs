//! Timed interpolation of numeric fields with completion callbacks.
//!
//! A [`TweenSpec`] animates one field, addressed by [`TweenTarget`], from
//! whatever value it holds when the tween starts to a fixed target value.
//! Completion callbacks receive the host mutably and fire exactly once, in
//! completion order, on the calling thread. Specs can be chained into a
//! timeline where each segment starts when the previous one completes.

use crate::ecs::{EntityID, Side};

/// Duration used when a spec does not set one, in seconds.
pub const DEFAULT_DURATION: f32 = 0.5;

pub type Callback<H> = Box<dyn FnOnce(&mut H)>;

/// A numeric field a tween can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TweenTarget {
    X(EntityID),
    Y(EntityID),
    Opacity(EntityID),
    /// Width of a side's health bar, in percent.
    HealthBar(Side),
    /// Opacity of the full-screen transition overlay.
    Overlay,
}

impl TweenTarget {
    /// Battle-scoped targets die with the battle session.
    pub const fn is_battle_scoped(self) -> bool {
        !matches!(self, Self::Overlay)
    }
}

/// Description of a single tween, optionally followed by another.
pub struct TweenSpec<H> {
    pub target: TweenTarget,
    pub to: f32,
    pub duration: f32,
    pub yoyo: bool,
    pub repeat: u32,
    on_complete: Option<Callback<H>>,
    then: Option<Box<TweenSpec<H>>>,
}

impl<H> TweenSpec<H> {
    pub fn to(target: TweenTarget, to: f32) -> Self {
        Self {
            target,
            to,
            duration: DEFAULT_DURATION,
            yoyo: false,
            repeat: 0,
            on_complete: None,
            then: None,
        }
    }

    pub fn duration(mut self, secs: f32) -> Self {
        self.duration = secs;
        self
    }

    /// Play `repeat` extra times, reversing direction on every other pass.
    pub fn yoyo(mut self, repeat: u32) -> Self {
        self.yoyo = true;
        self.repeat = repeat;
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce(&mut H) + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Seconds from start to completion.
    pub fn total_duration(&self) -> f32 {
        self.duration.max(0.0) * (self.repeat + 1) as f32
    }

    /// Value held once the tween (not its continuation) has finished.
    fn final_value(&self, from: f32) -> f32 {
        if self.yoyo && self.repeat % 2 == 1 {
            from
        } else {
            self.to
        }
    }

    /// Value at `elapsed` seconds and whether the tween has finished.
    fn sample(&self, from: f32, elapsed: f32) -> (f32, bool) {
        if self.duration <= 0.0 || elapsed >= self.total_duration() {
            return (self.final_value(from), true);
        }
        let pass = (elapsed / self.duration) as u32;
        let mut t = (elapsed - pass as f32 * self.duration) / self.duration;
        if self.yoyo && pass % 2 == 1 {
            t = 1.0 - t;
        }
        (from + (self.to - from) * ease_out(t), false)
    }
}

/// Chain `segments` so each starts when the previous one completes.
pub fn timeline<H>(segments: Vec<TweenSpec<H>>) -> Option<TweenSpec<H>> {
    segments.into_iter().rev().fold(None, |next, mut segment| {
        segment.then = next.map(Box::new);
        Some(segment)
    })
}

fn ease_out(t: f32) -> f32 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv
}

struct Running<H> {
    spec: TweenSpec<H>,
    /// Captured on the first update, not when the spec is added.
    from: Option<f32>,
    elapsed: f32,
}

/// The set of tweens currently in flight.
pub struct Tweener<H> {
    running: Vec<Running<H>>,
}

impl<H> Default for Tweener<H> {
    fn default() -> Self {
        Self {
            running: Vec::new(),
        }
    }
}

impl<H> Tweener<H> {
    pub fn add(&mut self, spec: TweenSpec<H>) {
        self.running.push(Running {
            spec,
            from: None,
            elapsed: 0.0,
        });
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Drop every tween whose target matches, without firing callbacks.
    pub fn cancel_where(&mut self, pred: impl Fn(TweenTarget) -> bool) -> usize {
        let before = self.running.len();
        self.running.retain(|r| !pred(r.spec.target));
        before - self.running.len()
    }
}

/// Owner of a [`Tweener`] and of the fields its tweens drive.
pub trait TweenHost: Sized {
    fn tweener(&mut self) -> &mut Tweener<Self>;

    /// Current value of `target`, or `None` if it no longer exists.
    fn read(&self, target: TweenTarget) -> Option<f32>;

    /// Store `value`; returns `false` if the target no longer exists.
    fn write(&mut self, target: TweenTarget, value: f32) -> bool;
}

/// Step every running tween by `dt` seconds, then fire completions.
///
/// Tweens whose target has disappeared are abandoned silently.
pub fn advance<H: TweenHost>(host: &mut H, dt: f32) {
    let running = std::mem::take(&mut host.tweener().running);
    let mut still_running = Vec::with_capacity(running.len());
    let mut finished = Vec::new();

    for mut tween in running {
        let from = match tween.from {
            Some(from) => from,
            None => {
                let Some(current) = host.read(tween.spec.target) else {
                    log::trace!("abandoning tween on {:?}", tween.spec.target);
                    continue;
                };
                tween.from = Some(current);
                current
            }
        };
        tween.elapsed += dt;
        let (value, done) = tween.spec.sample(from, tween.elapsed);
        if !host.write(tween.spec.target, value) {
            log::trace!("abandoning tween on {:?}", tween.spec.target);
            continue;
        }
        if done {
            finished.push(tween.spec);
        } else {
            still_running.push(tween);
        }
    }

    let tweener = host.tweener();
    still_running.append(&mut tweener.running);
    tweener.running = still_running;

    for mut spec in finished {
        if let Some(next) = spec.then.take() {
            host.tweener().add(*next);
        }
        if let Some(on_complete) = spec.on_complete.take() {
            on_complete(host);
        }
    }
}
