//! Sound instances
//!
//! A [`Sound`] is a cheap, clonable handle to one live sound. Clones share
//! state; equality is identity, so two sounds built with the same id are
//! still different sounds.
//!
//! # Per-tick update
//!
//! While playing, [`Sound::update`] does two things in order:
//!
//! 1. **Completion check**: when the clock shows at least one clip length
//!    since the last `play` and the sound does not loop, the sound leaves the
//!    playing state, fires `completed` and resolves every `play_async` waiter.
//!    The voice is left to run out on its own: at a pitch below 1 the clip
//!    is still audible after the clock says it ended.
//! 2. **Tween step**: with no current tween, the next queued tween is
//!    dequeued and started; the current tween then receives `on_update`. A
//!    tween that reports itself finished is detached and its `completed`
//!    signal fired once no borrow of the sound is held, but its successor
//!    only starts on the following tick.
//!
//! Both steps run on the tick that detects completion.

use crate::audio::builder::ClipLease;
use crate::audio::source::AudioSource;
use crate::audio::tween::SoundTween;
use crate::audio::AudioError;
use crate::events::{Signal, SubscriptionId};
use crate::foundation::time::Clock;
use crate::scene::{SceneObjectId, SharedScene};
use futures::channel::oneshot;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Lifecycle state of a sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundState {
    /// Inside `build`, resolving assets
    Configuring,
    /// Built, never played
    Ready,
    /// Playing since the last `play`
    Playing,
    /// Reached the end of a non-looping clip
    Completed,
    /// Halted by `stop`
    Stopped,
    /// Torn down; terminal
    Unloaded,
}

/// Future returned by [`Sound::play_async`]
///
/// Resolves to `Ok(())` at the next natural completion, or to
/// [`AudioError::PlaybackAbandoned`] when the sound is unloaded first.
/// Stopping the sound does not resolve it.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct PlayCompletion {
    receiver: oneshot::Receiver<()>,
}

impl Future for PlayCompletion {
    type Output = Result<(), AudioError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| AudioError::PlaybackAbandoned))
    }
}

struct Playback {
    state: SoundState,
    start_time: f64,
    waiters: Vec<oneshot::Sender<()>>,
    lease: ClipLease,
    unload_requested: bool,
}

#[derive(Default)]
struct TweenQueue {
    pending: VecDeque<Box<dyn SoundTween>>,
    current: Option<Box<dyn SoundTween>>,
}

struct SoundInner {
    id: String,
    category: Option<String>,
    clock: Rc<dyn Clock>,
    scene: SharedScene,
    scene_object: SceneObjectId,
    source: RefCell<AudioSource>,
    playback: RefCell<Playback>,
    tweens: RefCell<TweenQueue>,
    completed: Signal<Sound>,
    unloaded: Signal<Sound>,
}

/// Handle to one live sound
#[derive(Clone)]
pub struct Sound {
    inner: Rc<SoundInner>,
}

impl Sound {
    /// Create a sound in the `Configuring` state
    pub(crate) fn new(
        id: String,
        category: Option<String>,
        source: AudioSource,
        clock: Rc<dyn Clock>,
        scene: SharedScene,
        scene_object: SceneObjectId,
        tweens: Vec<Box<dyn SoundTween>>,
    ) -> Self {
        Self {
            inner: Rc::new(SoundInner {
                id,
                category,
                clock,
                scene,
                scene_object,
                source: RefCell::new(source),
                playback: RefCell::new(Playback {
                    state: SoundState::Configuring,
                    start_time: 0.0,
                    waiters: Vec::new(),
                    lease: ClipLease::default(),
                    unload_requested: false,
                }),
                tweens: RefCell::new(TweenQueue {
                    pending: tweens.into(),
                    current: None,
                }),
                completed: Signal::new(),
                unloaded: Signal::new(),
            }),
        }
    }

    /// Caller supplied id; not unique
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Caller supplied category
    pub fn category(&self) -> Option<&str> {
        self.inner.category.as_deref()
    }

    /// Current lifecycle state
    pub fn state(&self) -> SoundState {
        self.inner.playback.borrow().state
    }

    /// Whether the sound is playing and has not completed
    pub fn is_playing(&self) -> bool {
        self.state() == SoundState::Playing
    }

    /// Whether [`unload`](Self::unload) has run
    pub fn is_unloaded(&self) -> bool {
        self.state() == SoundState::Unloaded
    }

    /// Source gain
    pub fn volume(&self) -> f32 {
        self.inner.source.borrow().volume()
    }

    /// Scene object carrying this sound
    pub fn scene_object(&self) -> SceneObjectId {
        self.inner.scene_object
    }

    /// Tweens waiting behind the current one
    pub fn pending_tweens(&self) -> usize {
        self.inner.tweens.borrow().pending.len()
    }

    /// Whether a tween is running
    pub fn has_current_tween(&self) -> bool {
        self.inner.tweens.borrow().current.is_some()
    }

    /// Whether both handles point at the same sound
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read access to the playback handle
    pub fn with_source<R>(&self, f: impl FnOnce(&AudioSource) -> R) -> R {
        f(&self.inner.source.borrow())
    }

    /// Write access to the playback handle
    ///
    /// # Panics
    ///
    /// Panics if the sound has been unloaded.
    pub fn with_source_mut<R>(&self, f: impl FnOnce(&mut AudioSource) -> R) -> R {
        self.assert_loaded("with_source_mut");
        f(&mut self.inner.source.borrow_mut())
    }

    /// Signal fired each time non-looping playback reaches its end
    ///
    /// Subscriptions are one-shot; subscribe again for the next play cycle.
    pub fn completed(&self) -> &Signal<Sound> {
        &self.inner.completed
    }

    /// Signal fired once when the sound is unloaded
    pub fn unloaded(&self) -> &Signal<Sound> {
        &self.inner.unloaded
    }

    /// Run `f` at the next natural completion
    pub fn on_completed(&self, f: impl FnOnce(&Sound) + 'static) -> SubscriptionId {
        self.inner.completed.subscribe(f)
    }

    /// Run `f` when the sound is unloaded
    pub fn on_unloaded(&self, f: impl FnOnce(&Sound) + 'static) -> SubscriptionId {
        self.inner.unloaded.subscribe(f)
    }

    /// Append a tween to the queue; it starts on a later tick
    ///
    /// # Panics
    ///
    /// Panics if the sound has been unloaded.
    pub fn queue_tween(&self, tween: impl SoundTween + 'static) {
        self.assert_loaded("queue_tween");
        self.inner.tweens.borrow_mut().pending.push_back(Box::new(tween));
    }

    /// Start the clip from the beginning
    ///
    /// # Panics
    ///
    /// Panics if the sound has been unloaded.
    pub fn play(&self) -> Result<(), AudioError> {
        self.assert_loaded("play");
        self.inner.source.borrow_mut().play()?;

        let mut playback = self.inner.playback.borrow_mut();
        playback.start_time = self.inner.clock.now();
        playback.state = SoundState::Playing;
        log::debug!("Sound '{}' playing", self.inner.id);
        Ok(())
    }

    /// Play and wait for the next natural completion
    ///
    /// Every call gets its own future; all outstanding futures resolve on the
    /// same completion.
    ///
    /// # Panics
    ///
    /// Panics if the sound has been unloaded.
    pub fn play_async(&self) -> Result<PlayCompletion, AudioError> {
        self.play()?;
        let (sender, receiver) = oneshot::channel();
        self.inner.playback.borrow_mut().waiters.push(sender);
        Ok(PlayCompletion { receiver })
    }

    /// Fire an overlapping copy of the clip at `volume * volume_scale`
    ///
    /// Does not affect the playing state, completion or waiters.
    ///
    /// # Panics
    ///
    /// Panics if the sound has been unloaded.
    pub fn play_one_shot(&self, volume_scale: f32) -> Result<(), AudioError> {
        self.assert_loaded("play_one_shot");
        self.inner.source.borrow().play_one_shot(volume_scale)?;
        Ok(())
    }

    /// Halt playback without completing
    ///
    /// Neither fires `completed` nor resolves `play_async` waiters.
    ///
    /// # Panics
    ///
    /// Panics if the sound has been unloaded.
    pub fn stop(&self) {
        self.assert_loaded("stop");
        self.inner.source.borrow_mut().stop();

        let mut playback = self.inner.playback.borrow_mut();
        if playback.state != SoundState::Configuring {
            playback.state = SoundState::Stopped;
        }
    }

    /// Advance completion detection and the tween queue by one tick
    ///
    /// Does nothing unless the sound is playing. Completion callbacks, of the
    /// sound and of its tweens, run inside this call after every internal
    /// borrow has been released, so they may use the sound freely.
    pub fn update(&self, delta_time: f32) {
        if !self.is_playing() {
            return;
        }

        if self.reached_end() {
            self.complete();
        }
        if self.is_unloaded() {
            return;
        }

        self.advance_tweens(delta_time);

        if self.is_playing() {
            self.inner.source.borrow_mut().sync_volume();
        }
    }

    /// Tear the sound down
    ///
    /// Releases the clip lease, stops the voice, drops queued tweens, fires
    /// `unloaded` and destroys the scene object. Outstanding `play_async`
    /// futures resolve with [`AudioError::PlaybackAbandoned`]. Called while
    /// the sound is still being built, the unload is carried out by the build
    /// as soon as resolution finishes.
    ///
    /// # Panics
    ///
    /// Panics if the sound has already been unloaded.
    pub fn unload(&self) {
        {
            let mut playback = self.inner.playback.borrow_mut();
            match playback.state {
                SoundState::Unloaded => panic!("Sound '{}' unloaded twice", self.inner.id),
                SoundState::Configuring => {
                    log::debug!("Deferring unload of sound '{}' until its build finishes", self.inner.id);
                    playback.unload_requested = true;
                    return;
                }
                _ => {}
            }
        }
        self.teardown();
    }

    pub(crate) fn set_lease(&self, lease: ClipLease) {
        self.inner.playback.borrow_mut().lease = lease;
    }

    /// Finish configuration; returns `false` when an unload arrived meanwhile
    pub(crate) fn finish_configuring(&self) -> bool {
        let mut playback = self.inner.playback.borrow_mut();
        if playback.unload_requested {
            return false;
        }
        playback.state = SoundState::Ready;
        true
    }

    pub(crate) fn teardown(&self) {
        let (mut lease, waiters) = {
            let mut playback = self.inner.playback.borrow_mut();
            playback.state = SoundState::Unloaded;
            (std::mem::take(&mut playback.lease), std::mem::take(&mut playback.waiters))
        };
        lease.release();
        drop(waiters);

        self.inner.source.borrow_mut().stop();
        let abandoned = std::mem::take(&mut *self.inner.tweens.borrow_mut());
        drop(abandoned);

        self.inner.completed.clear();
        self.inner.unloaded.emit(self);

        self.inner.scene.borrow_mut().destroy(self.inner.scene_object);
        log::debug!("Sound '{}' unloaded", self.inner.id);
    }

    fn assert_loaded(&self, operation: &str) {
        assert!(
            !self.is_unloaded(),
            "Sound '{}' used after unload ({operation})",
            self.inner.id
        );
    }

    fn reached_end(&self) -> bool {
        let source = self.inner.source.borrow();
        if source.is_looping() {
            return false;
        }
        let Some(clip) = source.clip() else {
            return false;
        };
        let elapsed = self.inner.clock.now() - self.inner.playback.borrow().start_time;
        elapsed >= clip.duration().as_secs_f64()
    }

    fn complete(&self) {
        let waiters = {
            let mut playback = self.inner.playback.borrow_mut();
            playback.state = SoundState::Completed;
            std::mem::take(&mut playback.waiters)
        };
        log::debug!("Sound '{}' completed", self.inner.id);

        self.inner.completed.emit(self);
        for waiter in waiters {
            // Receiver dropped means nobody is waiting any more
            let _ = waiter.send(());
        }
    }

    fn advance_tweens(&self, delta_time: f32) {
        let (mut tween, starting) = {
            let mut queue = self.inner.tweens.borrow_mut();
            match queue.current.take() {
                Some(tween) => (tween, false),
                None => match queue.pending.pop_front() {
                    Some(tween) => (tween, true),
                    None => return,
                },
            }
        };

        {
            let mut source = self.inner.source.borrow_mut();
            if starting {
                tween.on_start(&mut source);
            }
            tween.on_update(&mut source, delta_time);
        }

        if tween.is_finished() {
            log::trace!("Sound '{}' finished a tween", self.inner.id);
            tween.completed().emit(&());
        } else if !self.is_unloaded() {
            self.inner.tweens.borrow_mut().current = Some(tween);
        }
    }
}

impl PartialEq for Sound {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Sound {}

impl fmt::Debug for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sound")
            .field("id", &self.inner.id)
            .field("category", &self.inner.category)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::{HeadlessBackend, SharedBackend};
    use crate::audio::clip::AudioClip;
    use crate::audio::tween::FadeVolumeTween;
    use crate::foundation::time::ManualClock;
    use crate::scene::{SceneGraph, SceneHost};
    use approx::assert_relative_eq;
    use futures::FutureExt;
    use std::cell::Cell;
    use std::time::Duration;

    struct Fixture {
        clock: Rc<ManualClock>,
        backend: Rc<RefCell<HeadlessBackend>>,
        scene: Rc<RefCell<SceneGraph>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                clock: Rc::new(ManualClock::new()),
                backend: Rc::new(RefCell::new(HeadlessBackend::initialized())),
                scene: Rc::new(RefCell::new(SceneGraph::new())),
            }
        }

        fn sound(&self, clip_secs: u64, looping: bool) -> Sound {
            let backend: SharedBackend = self.backend.clone();
            let mut source = AudioSource::new(backend);
            source.set_clip(Some(Rc::new(AudioClip::silent("beep", Duration::from_secs(clip_secs)))));
            source.set_looping(looping);

            let object = self.scene.borrow_mut().instantiate("Sound[beep]");
            let clock: Rc<dyn Clock> = self.clock.clone();
            let scene: SharedScene = self.scene.clone();
            let sound = Sound::new("beep".to_string(), None, source, clock, scene, object, Vec::new());
            assert!(sound.finish_configuring());
            sound
        }
    }

    fn counter(signal: &Signal<Sound>) -> Rc<Cell<u32>> {
        let hits = Rc::new(Cell::new(0));
        let inner = Rc::clone(&hits);
        signal.subscribe(move |_| inner.set(inner.get() + 1));
        hits
    }

    #[test]
    fn test_new_sound_is_ready_not_playing() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, false);
        assert_eq!(sound.state(), SoundState::Ready);
        assert!(!sound.is_playing());
    }

    #[test]
    fn test_completes_after_clip_length() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, false);
        let completed = counter(sound.completed());

        sound.play().unwrap();
        fixture.clock.advance(0.5);
        sound.update(0.5);
        assert!(sound.is_playing());

        fixture.clock.advance(0.5);
        sound.update(0.5);
        assert_eq!(sound.state(), SoundState::Completed);
        assert_eq!(completed.get(), 1);

        fixture.clock.advance(5.0);
        sound.update(5.0);
        assert_eq!(completed.get(), 1);
    }

    #[test]
    fn test_looping_never_completes() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, true);
        let completed = counter(sound.completed());

        sound.play().unwrap();
        for _ in 0..10 {
            fixture.clock.advance(1.0);
            sound.update(1.0);
        }
        assert!(sound.is_playing());
        assert_eq!(completed.get(), 0);
    }

    #[test]
    fn test_replay_restarts_completion_timer() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, false);

        sound.play().unwrap();
        fixture.clock.advance(0.9);
        sound.play().unwrap();
        fixture.clock.advance(0.9);
        sound.update(0.9);
        assert!(sound.is_playing());
    }

    #[test]
    fn test_stop_does_not_complete_or_resolve() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, false);
        let completed = counter(sound.completed());

        let mut waiter = sound.play_async().unwrap();
        sound.stop();
        fixture.clock.advance(2.0);
        sound.update(2.0);

        assert_eq!(sound.state(), SoundState::Stopped);
        assert_eq!(completed.get(), 0);
        assert!((&mut waiter).now_or_never().is_none());
    }

    #[test]
    fn test_play_async_resolves_at_completion() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, false);

        let mut first = sound.play_async().unwrap();
        let mut second = sound.play_async().unwrap();
        assert!((&mut first).now_or_never().is_none());

        fixture.clock.advance(1.0);
        sound.update(1.0);

        assert!(matches!(first.now_or_never(), Some(Ok(()))));
        assert!(matches!(second.now_or_never(), Some(Ok(()))));
    }

    #[test]
    fn test_unload_abandons_waiters() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, false);

        let waiter = sound.play_async().unwrap();
        sound.unload();

        assert!(matches!(waiter.now_or_never(), Some(Err(AudioError::PlaybackAbandoned))));
    }

    #[test]
    fn test_unload_fires_once_and_destroys_object() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, false);
        let unloaded = counter(sound.unloaded());
        let object = sound.scene_object();

        sound.queue_tween(FadeVolumeTween::fade_in(1.0));
        sound.unload();

        assert_eq!(unloaded.get(), 1);
        assert_eq!(sound.state(), SoundState::Unloaded);
        assert_eq!(sound.pending_tweens(), 0);
        assert!(!fixture.scene.borrow().contains(object));
    }

    #[test]
    #[should_panic(expected = "unloaded twice")]
    fn test_double_unload_panics() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, false);
        sound.unload();
        sound.unload();
    }

    #[test]
    #[should_panic(expected = "used after unload")]
    fn test_play_after_unload_panics() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, false);
        sound.unload();
        let _ = sound.play();
    }

    #[test]
    fn test_tween_starts_and_updates_on_first_tick() {
        let fixture = Fixture::new();
        let sound = fixture.sound(10, false);
        sound.queue_tween(FadeVolumeTween::fade_in(1.0));
        assert_relative_eq!(sound.volume(), 1.0);

        sound.play().unwrap();
        sound.update(0.25);

        assert!(sound.has_current_tween());
        assert_relative_eq!(sound.volume(), 0.25);
    }

    #[test]
    fn test_tweens_do_not_advance_while_not_playing() {
        let fixture = Fixture::new();
        let sound = fixture.sound(10, false);
        sound.queue_tween(FadeVolumeTween::fade_in(1.0));

        sound.update(0.5);
        assert!(!sound.has_current_tween());
        assert_eq!(sound.pending_tweens(), 1);
    }

    #[test]
    fn test_completing_tick_still_advances_tweens() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, false);
        sound.queue_tween(FadeVolumeTween::fade_out(2.0, 1.0));

        sound.play().unwrap();
        fixture.clock.advance(1.0);
        sound.update(1.0);

        assert_eq!(sound.state(), SoundState::Completed);
        assert!(sound.has_current_tween());
        assert_relative_eq!(sound.volume(), 0.5);
    }

    #[test]
    fn test_completion_leaves_slowed_voice_running() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, false);
        sound.with_source_mut(|source| source.set_pitch(0.5));

        sound.play().unwrap();
        fixture.clock.advance(1.0);
        sound.update(1.0);

        assert_eq!(sound.state(), SoundState::Completed);
        assert!(sound.with_source(AudioSource::is_voice_active));
        assert_eq!(fixture.backend.borrow().active_count(), 1);

        sound.unload();
        assert_eq!(fixture.backend.borrow().active_count(), 0);
    }

    #[test]
    fn test_replay_after_completion_replaces_the_voice() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, false);

        sound.play().unwrap();
        fixture.clock.advance(1.0);
        sound.update(1.0);
        sound.play().unwrap();

        let backend = fixture.backend.borrow();
        assert_eq!(backend.started_count(), 2);
        assert_eq!(backend.active_count(), 1);
    }

    #[test]
    fn test_tween_completion_callback_can_read_the_sound() {
        let fixture = Fixture::new();
        let sound = fixture.sound(10, false);
        let tween = FadeVolumeTween::fade_in(0.1);
        let seen = Rc::new(Cell::new(-1.0_f32));
        tween.completed().subscribe({
            let sound = sound.clone();
            let seen = Rc::clone(&seen);
            move |()| seen.set(sound.volume())
        });
        sound.queue_tween(tween);

        sound.play().unwrap();
        sound.update(0.25);

        assert_relative_eq!(seen.get(), 1.0);
        assert!(!sound.has_current_tween());
    }

    #[test]
    fn test_tween_completion_callback_can_unload_the_sound() {
        let fixture = Fixture::new();
        let sound = fixture.sound(10, false);
        let tween = FadeVolumeTween::fade_out(0.1, 1.0);
        tween.completed().subscribe({
            let sound = sound.clone();
            move |()| sound.unload()
        });
        sound.queue_tween(tween);
        sound.queue_tween(FadeVolumeTween::fade_in(1.0));

        sound.play().unwrap();
        sound.update(0.25);

        assert!(sound.is_unloaded());
        assert_eq!(sound.pending_tweens(), 0);
        assert_eq!(fixture.backend.borrow().active_count(), 0);
    }

    #[test]
    fn test_one_shot_leaves_state_alone() {
        let fixture = Fixture::new();
        let sound = fixture.sound(1, false);

        sound.play_one_shot(0.5).unwrap();
        assert_eq!(sound.state(), SoundState::Ready);
        assert_eq!(fixture.backend.borrow().started_count(), 1);
    }

    #[test]
    fn test_identity_equality() {
        let fixture = Fixture::new();
        let a = fixture.sound(1, false);
        let b = fixture.sound(1, false);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
