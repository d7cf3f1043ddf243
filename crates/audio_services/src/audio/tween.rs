//! Sound tweens
//!
//! A tween is a time-driven modifier of one sound's runtime parameters. The
//! owning sound runs its tweens strictly one after another:
//!
//! 1. the tween is dequeued and [`on_start`](SoundTween::on_start) runs once;
//! 2. [`on_update`](SoundTween::on_update) runs once per tick with the frame
//!    delta;
//! 3. once [`is_finished`](SoundTween::is_finished) reports `true` after an
//!    update, the sound detaches the tween and fires its
//!    [`completed`](SoundTween::completed) signal exactly once. The next
//!    queued tween starts on the following tick.
//!
//! Tweens never fire `completed` themselves: the hooks run while the sound's
//! playback handle is borrowed, and the signal is only emitted after that
//! borrow has ended.
//!
//! A tween that is still queued when its sound unloads is dropped without
//! ever starting.

use crate::audio::source::AudioSource;
use crate::events::Signal;
use crate::foundation::math::utils;

/// Time-driven modifier of a sound's playback parameters
pub trait SoundTween {
    /// Called once when the tween becomes the sound's current tween
    fn on_start(&mut self, source: &mut AudioSource);

    /// Called once per tick while current
    fn on_update(&mut self, source: &mut AudioSource, delta_time: f32);

    /// Whether the tween has reached its end; checked after every update
    fn is_finished(&self) -> bool;

    /// Fired by the owning sound exactly once, after the tween finished
    fn completed(&self) -> &Signal<()>;
}

/// Linear volume fade between two levels
#[derive(Debug)]
pub struct FadeVolumeTween {
    duration: f32,
    start_volume: f32,
    end_volume: f32,
    elapsed: f32,
    finished: bool,
    completed: Signal<()>,
}

impl FadeVolumeTween {
    /// Fade from `start_volume` to `end_volume` over `duration` seconds
    pub fn new(duration: f32, start_volume: f32, end_volume: f32) -> Self {
        Self {
            duration,
            start_volume,
            end_volume,
            elapsed: 0.0,
            finished: false,
            completed: Signal::new(),
        }
    }

    /// Fade from silence to full volume
    pub fn fade_in(duration: f32) -> Self {
        Self::new(duration, 0.0, 1.0)
    }

    /// Fade from `from` down to silence
    pub fn fade_out(duration: f32, from: f32) -> Self {
        Self::new(duration, from, 0.0)
    }

    /// Fade length in seconds
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Seconds accumulated so far
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Normalized progress, clamped to 0.0..=1.0
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }
}

impl SoundTween for FadeVolumeTween {
    fn on_start(&mut self, source: &mut AudioSource) {
        self.elapsed = 0.0;
        source.set_volume(self.start_volume);
    }

    fn on_update(&mut self, source: &mut AudioSource, delta_time: f32) {
        if self.finished {
            return;
        }

        self.elapsed += delta_time;
        let t = self.progress();
        source.set_volume(utils::lerp_clamped(self.start_volume, self.end_volume, t));

        self.finished = t >= 1.0;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn completed(&self) -> &Signal<()> {
        &self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::{HeadlessBackend, SharedBackend};
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn source() -> AudioSource {
        let backend: SharedBackend = Rc::new(RefCell::new(HeadlessBackend::initialized()));
        AudioSource::new(backend)
    }

    #[test]
    fn test_start_applies_start_volume() {
        let mut source = source();
        let mut tween = FadeVolumeTween::fade_in(1.0);

        tween.on_start(&mut source);
        assert_relative_eq!(source.volume(), 0.0);
        assert!(!tween.is_finished());
    }

    #[test]
    fn test_fade_interpolates_and_finishes() {
        let mut source = source();
        let mut tween = FadeVolumeTween::new(1.0, 0.0, 1.0);

        tween.on_start(&mut source);
        tween.on_update(&mut source, 0.5);
        assert_relative_eq!(source.volume(), 0.5);
        assert_relative_eq!(tween.progress(), 0.5);
        assert!(!tween.is_finished());

        tween.on_update(&mut source, 0.5);
        assert_relative_eq!(source.volume(), 1.0);
        assert!(tween.is_finished());
    }

    #[test]
    fn test_overshoot_is_clamped() {
        let mut source = source();
        let mut tween = FadeVolumeTween::fade_out(0.5, 0.8);

        tween.on_start(&mut source);
        tween.on_update(&mut source, 2.0);
        assert_relative_eq!(source.volume(), 0.0);
        assert!(tween.is_finished());
    }

    #[test]
    fn test_updates_after_finishing_are_ignored() {
        let mut source = source();
        let mut tween = FadeVolumeTween::fade_in(0.1);

        tween.on_start(&mut source);
        tween.on_update(&mut source, 0.2);
        source.set_volume(0.4);
        tween.on_update(&mut source, 0.2);

        assert_relative_eq!(source.volume(), 0.4);
        assert!(tween.is_finished());
    }

    #[test]
    fn test_tween_never_fires_its_own_signal() {
        let mut source = source();
        let mut tween = FadeVolumeTween::fade_in(0.1);
        tween.completed().subscribe(|()| panic!("emitted from inside on_update"));

        tween.on_start(&mut source);
        tween.on_update(&mut source, 0.2);
        assert!(tween.is_finished());
        assert_eq!(tween.completed().subscriber_count(), 1);
    }

    #[test]
    fn test_zero_duration_finishes_on_first_update() {
        let mut source = source();
        let mut tween = FadeVolumeTween::new(0.0, 1.0, 0.3);

        tween.on_start(&mut source);
        assert_relative_eq!(source.volume(), 1.0);

        tween.on_update(&mut source, 0.0);
        assert_relative_eq!(source.volume(), 0.3);
        assert!(tween.is_finished());
    }
}
