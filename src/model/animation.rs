use glam::Vec3;

use crate::config::AnimationClock;

/// Linear camera move from `start` to `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothMove {
    pub start: Vec3,
    pub end: Vec3,
    progress: f32,
}

impl SmoothMove {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end, progress: 0.0 }
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_finished(&self) -> bool {
        self.progress >= 1.0
    }

    /// Advance by `step` (clamped into `[0, 1]`) and return the new position.
    pub fn advance(&mut self, step: f32) -> Vec3 {
        self.progress = (self.progress + step.max(0.0)).min(1.0);
        self.position()
    }

    pub fn position(&self) -> Vec3 {
        if self.is_finished() {
            return self.end;
        }
        self.start.lerp(self.end, self.progress)
    }
}

/// What a scalar animation writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarTarget {
    GiftScale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarAnimation {
    pub target: ScalarTarget,
    pub value: f32,
    pub end: f32,
    pub clock: AnimationClock,
}

impl ScalarAnimation {
    pub fn is_finished(&self) -> bool {
        self.value >= self.end
    }

    /// Step towards `end`; snaps to `end` once within float noise of it.
    fn tick(&mut self, dt: f32) -> f32 {
        self.value += self.clock.step(dt);
        if self.value >= self.end - 1e-4 {
            self.value = self.end;
        }
        self.value
    }
}

/// A started animation. `fresh` is set for the frame it was started on,
/// whose step `start` has already applied.
#[derive(Debug)]
struct Running {
    animation: ScalarAnimation,
    fresh: bool,
}

/// Active scalar animations, advanced once per frame by the frame driver.
#[derive(Debug, Default)]
pub struct ScalarAnimations {
    active: Vec<Running>,
}

impl ScalarAnimations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an animation, replacing any running one on the same target.
    /// The first step is applied immediately and its value returned; the
    /// next `advance` leaves it alone so that value is what gets drawn.
    pub fn start(&mut self, mut animation: ScalarAnimation, dt: f32) -> f32 {
        self.active.retain(|r| r.animation.target != animation.target);
        let value = animation.tick(dt);
        if !animation.is_finished() {
            self.active.push(Running { animation, fresh: true });
        }
        value
    }

    /// Step every animation, reporting each new value to `apply`, and drop
    /// the finished ones.
    pub fn advance(&mut self, dt: f32, mut apply: impl FnMut(ScalarTarget, f32)) {
        self.active.retain_mut(|r| {
            if std::mem::take(&mut r.fresh) {
                return true;
            }
            let value = r.animation.tick(dt);
            apply(r.animation.target, value);
            !r.animation.is_finished()
        });
    }

    pub fn is_active(&self, target: ScalarTarget) -> bool {
        self.active.iter().any(|r| r.animation.target == target)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smooth_move_ends_exactly_at_end() {
        let start = Vec3::new(0.0, 1.6, 9.0);
        let end = Vec3::new(-0.3778, 2.24, 1.9892);
        let mut mv = SmoothMove::new(start, end);
        let mut frames = 0;
        while !mv.is_finished() {
            let p = mv.advance(0.02);
            assert!((0.0..=1.0).contains(&mv.progress()));
            assert!(p.is_finite());
            frames += 1;
            assert!(frames <= 60);
        }
        assert_eq!(mv.position(), end);
        assert_eq!(mv.advance(0.5), end);
        assert_eq!(mv.progress(), 1.0);
    }

    #[test]
    fn smooth_move_ignores_negative_steps() {
        let mut mv = SmoothMove::new(Vec3::ZERO, Vec3::X);
        mv.advance(-3.0);
        assert_eq!(mv.progress(), 0.0);
        assert_eq!(mv.position(), Vec3::ZERO);
    }

    #[test]
    fn scale_in_runs_to_one_then_retires() {
        let mut anims = ScalarAnimations::new();
        let first = anims.start(
            ScalarAnimation {
                target: ScalarTarget::GiftScale,
                value: 0.05,
                end: 1.0,
                clock: AnimationClock::PerFrame { step: 0.05 },
            },
            0.016,
        );
        assert!((first - 0.1).abs() < 1e-6);
        assert!(anims.is_active(ScalarTarget::GiftScale));

        let mut last = first;
        let mut frames = 0;
        while anims.is_active(ScalarTarget::GiftScale) {
            anims.advance(0.016, |target, value| {
                assert_eq!(target, ScalarTarget::GiftScale);
                assert!(value >= last && value <= 1.0);
                last = value;
            });
            frames += 1;
            assert!(frames < 30);
        }
        assert_eq!(last, 1.0);
        // one frame showing the start value, then 18 steps of 0.05
        assert_eq!(frames, 19);
        assert!(anims.is_empty());
    }

    #[test]
    fn restarting_replaces_running_animation() {
        let mut anims = ScalarAnimations::new();
        let anim = ScalarAnimation {
            target: ScalarTarget::GiftScale,
            value: 0.0,
            end: 1.0,
            clock: AnimationClock::PerSecond { rate: 1.0 },
        };
        anims.start(anim.clone(), 0.1);
        anims.start(anim, 0.1);
        let mut calls = 0;
        anims.advance(0.1, |_, _| calls += 1);
        assert_eq!(calls, 0);
        anims.advance(0.1, |_, _| calls += 1);
        assert_eq!(calls, 1);
    }
}
