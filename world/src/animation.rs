//! Engine-owned registry of step animations.

use std::time::Duration;

use crate::clock::Stopwatch;

const MIN_DURATION: Duration = Duration::from_millis(1);

/// Index of an animation stored inside an [`AnimationSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct AnimationHandle(usize);

#[derive(Clone, Debug)]
struct Animation {
    duration: Duration,
    timer: Stopwatch,
    suspended: bool,
}

impl Animation {
    fn progress(&self) -> f32 {
        let progress = self.timer.elapsed().as_secs_f32() / self.duration.as_secs_f32();
        progress.min(1.0)
    }
}

/// Animations belonging to the actors of a single layout.
///
/// Pause, resume and reset are broadcast to every member so the runner can
/// freeze in-flight motion together with its play clock.
#[derive(Clone, Debug, Default)]
pub(crate) struct AnimationSet {
    entries: Vec<Animation>,
}

impl AnimationSet {
    /// Registers a new idle animation lasting `duration`.
    pub(crate) fn insert(&mut self, duration: Duration) -> AnimationHandle {
        self.entries.push(Animation {
            duration: duration.max(MIN_DURATION),
            timer: Stopwatch::new(),
            suspended: false,
        });
        AnimationHandle(self.entries.len() - 1)
    }

    /// Rewinds the animation and starts playing it.
    pub(crate) fn restart(&mut self, handle: AnimationHandle) {
        if let Some(animation) = self.entries.get_mut(handle.0) {
            animation.timer.reset();
            animation.timer.start();
            animation.suspended = false;
        }
    }

    /// Playback progress in `0.0..=1.0`; idle animations report `0.0`.
    pub(crate) fn progress(&self, handle: AnimationHandle) -> f32 {
        self.entries
            .get(handle.0)
            .map_or(1.0, Animation::progress)
    }

    /// Reports whether the animation played to its end.
    pub(crate) fn is_finished(&self, handle: AnimationHandle) -> bool {
        self.progress(handle) >= 1.0
    }

    /// Advances every playing animation.
    pub(crate) fn advance(&mut self, dt: Duration) {
        for animation in &mut self.entries {
            animation.timer.advance(dt);
        }
    }

    /// Freezes every playing animation.
    pub(crate) fn pause_all(&mut self) {
        for animation in &mut self.entries {
            if !animation.timer.is_stopped() {
                animation.timer.stop();
                animation.suspended = true;
            }
        }
    }

    /// Resumes every animation frozen by [`AnimationSet::pause_all`].
    pub(crate) fn resume_all(&mut self) {
        for animation in &mut self.entries {
            if animation.suspended {
                animation.timer.start();
                animation.suspended = false;
            }
        }
    }

    /// Rewinds every animation to its idle state.
    pub(crate) fn reset_all(&mut self) {
        for animation in &mut self.entries {
            animation.timer.reset();
            animation.suspended = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_animation_reports_zero_progress() {
        let mut set = AnimationSet::default();
        let handle = set.insert(Duration::from_millis(100));
        set.advance(Duration::from_millis(500));
        assert_eq!(set.progress(handle), 0.0);
        assert!(!set.is_finished(handle));
    }

    #[test]
    fn restarted_animation_finishes_after_duration() {
        let mut set = AnimationSet::default();
        let handle = set.insert(Duration::from_millis(100));
        set.restart(handle);
        set.advance(Duration::from_millis(50));
        assert!((set.progress(handle) - 0.5).abs() < 1e-4);
        set.advance(Duration::from_millis(80));
        assert!(set.is_finished(handle));
        assert_eq!(set.progress(handle), 1.0);
    }

    #[test]
    fn pause_and_resume_only_touch_playing_animations() {
        let mut set = AnimationSet::default();
        let playing = set.insert(Duration::from_millis(100));
        let idle = set.insert(Duration::from_millis(100));
        set.restart(playing);
        set.advance(Duration::from_millis(20));

        set.pause_all();
        set.advance(Duration::from_millis(1000));
        assert!((set.progress(playing) - 0.2).abs() < 1e-4);

        set.resume_all();
        set.advance(Duration::from_millis(20));
        assert!((set.progress(playing) - 0.4).abs() < 1e-4);
        assert_eq!(set.progress(idle), 0.0);
    }

    #[test]
    fn reset_all_rewinds_everything() {
        let mut set = AnimationSet::default();
        let handle = set.insert(Duration::ZERO);
        set.restart(handle);
        set.advance(Duration::from_millis(5));
        assert!(set.is_finished(handle));

        set.reset_all();
        set.advance(Duration::from_millis(5));
        assert_eq!(set.progress(handle), 0.0);
    }
}
