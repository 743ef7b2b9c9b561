//! Bounce-style automatic slice playback.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::navigation::Navigator;

/// Delay between playback frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackSpeed {
    /// 500 ms
    Slow,
    /// 200 ms
    #[default]
    Normal,
    /// 100 ms
    Fast,
    /// 50 ms
    VeryFast,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 4] = [
        PlaybackSpeed::Slow,
        PlaybackSpeed::Normal,
        PlaybackSpeed::Fast,
        PlaybackSpeed::VeryFast,
    ];

    pub fn millis(&self) -> u64 {
        match self {
            PlaybackSpeed::Slow => 500,
            PlaybackSpeed::Normal => 200,
            PlaybackSpeed::Fast => 100,
            PlaybackSpeed::VeryFast => 50,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.millis())
    }

    /// Speed with the given frame delay, if it is one of the offered ones.
    pub fn from_millis(millis: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|speed| speed.millis() == millis)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlaybackSpeed::Slow => "Slow",
            PlaybackSpeed::Normal => "Normal",
            PlaybackSpeed::Fast => "Fast",
            PlaybackSpeed::VeryFast => "Very Fast",
        }
    }
}

/// One playback step.
///
/// Returns the next index and direction. The direction flips to -1 when the
/// maximum is reached and back to +1 at zero.
pub fn bounce_step(index: usize, max: usize, direction: i8) -> (usize, i8) {
    let next = index as i64 + i64::from(direction);
    if next >= max as i64 {
        (max, -1)
    } else if next <= 0 {
        (0, 1)
    } else {
        (next as usize, direction)
    }
}

/// State shared with the timer task.
#[derive(Debug)]
struct Shared {
    direction: Cell<i8>,
    speed: Cell<PlaybackSpeed>,
    frames: Cell<u64>,
}

/// Aborts the timer task when dropped.
#[derive(Debug)]
struct TimerGuard(JoinHandle<()>);

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Drives the active plane's slice index back and forth on a timer.
///
/// The timer runs as a local task, so [`PlaybackController::start`] must be
/// called from within a `tokio::task::LocalSet`. A live timer exists exactly
/// while playing; it is cancelled on stop, disable and drop.
#[derive(Debug)]
pub struct PlaybackController {
    shared: Rc<Shared>,
    enabled: bool,
    timer: Option<TimerGuard>,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new(PlaybackSpeed::default())
    }
}

impl PlaybackController {
    pub fn new(speed: PlaybackSpeed) -> Self {
        Self {
            shared: Rc::new(Shared {
                direction: Cell::new(1),
                speed: Cell::new(speed),
                frames: Cell::new(0),
            }),
            enabled: true,
            timer: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.timer.is_some()
    }

    pub fn direction(&self) -> i8 {
        self.shared.direction.get()
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.shared.speed.get()
    }

    /// Frames advanced since creation.
    pub fn frames(&self) -> u64 {
        self.shared.frames.get()
    }

    /// Takes effect from the next frame.
    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.shared.speed.set(speed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling stops a running playback.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.stop();
        }
    }

    /// Start or stop playback. Returns whether playback is running afterwards.
    pub fn toggle(&mut self, navigator: &Rc<RefCell<Navigator>>) -> bool {
        if self.is_playing() {
            self.stop();
            false
        } else {
            self.start(navigator)
        }
    }

    /// Start playing from the current slice. Returns `false` when disabled.
    pub fn start(&mut self, navigator: &Rc<RefCell<Navigator>>) -> bool {
        if !self.enabled {
            return false;
        }
        if self.is_playing() {
            return true;
        }

        self.shared.direction.set(1);
        let shared = Rc::clone(&self.shared);
        let navigator = Rc::clone(navigator);
        log::debug!("Playback started at {} ms/frame", self.speed().millis());

        let handle = tokio::task::spawn_local(async move {
            loop {
                tokio::time::sleep(shared.speed.get().interval()).await;
                advance(&shared, &navigator);
            }
        });
        self.timer = Some(TimerGuard(handle));
        true
    }

    pub fn stop(&mut self) {
        if self.timer.take().is_some() {
            log::debug!("Playback stopped after {} frames", self.frames());
        }
    }
}

fn advance(shared: &Shared, navigator: &RefCell<Navigator>) {
    let mut nav = navigator.borrow_mut();
    let plane = nav.active_plane();
    let (next, direction) = bounce_step(
        nav.slice_index(plane),
        nav.max_slice_index(plane),
        shared.direction.get(),
    );
    shared.direction.set(direction);
    nav.set_slice_index(plane, next as i64);
    shared.frames.set(shared.frames.get() + 1);
    log::trace!("Playback frame: {} slice {}", plane, next);
}
