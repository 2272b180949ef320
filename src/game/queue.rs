//! Deferred narration steps, released one per "advance" input.
//!
//! Steps are zero-argument actions over a context `C`. Each advance pops the
//! head step before running it, so a step may push further steps; those wait
//! for later advances. Advancing an empty queue hides the narration surface.

use std::collections::VecDeque;

pub type Step<C> = Box<dyn FnOnce(&mut C)>;

/// Ordered queue of pending steps.
pub struct StepQueue<C> {
    steps: VecDeque<Step<C>>,
}

impl<C> Default for StepQueue<C> {
    fn default() -> Self {
        Self {
            steps: VecDeque::new(),
        }
    }
}

impl<C> StepQueue<C> {
    pub fn push(&mut self, step: impl FnOnce(&mut C) + 'static) {
        self.steps.push_back(Box::new(step));
    }

    pub fn pop(&mut self) -> Option<Step<C>> {
        self.steps.pop_front()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A context that owns a step queue and a narration surface.
pub trait Narrated: Sized {
    /// The live queue, if any narration is possible right now.
    fn steps(&mut self) -> Option<&mut StepQueue<Self>>;

    fn hide_narration(&mut self);
}

/// What a single advance did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The head step ran.
    Ran,
    /// Nothing was pending; narration was hidden.
    Hidden,
}

/// Run exactly one pending step, or hide narration when none is pending.
pub fn advance<C: Narrated>(ctx: &mut C) -> Advance {
    match ctx.steps().and_then(StepQueue::pop) {
        Some(step) => {
            step(ctx);
            Advance::Ran
        }
        None => {
            ctx.hide_narration();
            Advance::Hidden
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Dialogue {
        queue: StepQueue<Self>,
        ran: Vec<char>,
        hidden: u32,
    }

    impl Narrated for Dialogue {
        fn steps(&mut self) -> Option<&mut StepQueue<Self>> {
            Some(&mut self.queue)
        }

        fn hide_narration(&mut self) {
            self.hidden += 1;
        }
    }

    #[test]
    fn steps_run_in_order_exactly_once() {
        let mut d = Dialogue::default();
        d.queue.push(|d: &mut Dialogue| d.ran.push('A'));
        d.queue.push(|d: &mut Dialogue| d.ran.push('B'));
        d.queue.push(|d: &mut Dialogue| d.ran.push('C'));

        assert_eq!(advance(&mut d), Advance::Ran);
        assert_eq!(d.ran, vec!['A']);
        assert_eq!(advance(&mut d), Advance::Ran);
        assert_eq!(advance(&mut d), Advance::Ran);
        assert_eq!(d.ran, vec!['A', 'B', 'C']);
        assert_eq!(d.hidden, 0);

        assert_eq!(advance(&mut d), Advance::Hidden);
        assert_eq!(d.ran, vec!['A', 'B', 'C']);
        assert_eq!(d.hidden, 1);
    }

    #[test]
    fn pushes_from_a_running_step_wait_for_later_advances() {
        let mut d = Dialogue::default();
        d.queue.push(|d: &mut Dialogue| {
            d.ran.push('A');
            d.queue.push(|d: &mut Dialogue| d.ran.push('C'));
        });
        d.queue.push(|d: &mut Dialogue| d.ran.push('B'));

        advance(&mut d);
        assert_eq!(d.ran, vec!['A']);
        assert_eq!(d.queue.len(), 2);

        advance(&mut d);
        advance(&mut d);
        assert_eq!(d.ran, vec!['A', 'B', 'C']);
        assert!(d.queue.is_empty());
    }

    #[test]
    fn empty_queue_only_hides() {
        let mut d = Dialogue::default();
        assert_eq!(advance(&mut d), Advance::Hidden);
        assert_eq!(advance(&mut d), Advance::Hidden);
        assert_eq!(d.hidden, 2);
        assert!(d.ran.is_empty());
    }
}
