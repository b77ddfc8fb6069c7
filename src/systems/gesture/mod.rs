//! Debounced gesture polling.
//!
//! The source samples a [`GestureDetector`] once per poll period while running.
//! A trigger fires only after `required_consecutive_hits` samples in a row reach
//! the finger threshold; the run counter then starts over, so a held gesture
//! fires again every `required_consecutive_hits` polls.
use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use bevy::prelude::*;
use smallvec::SmallVec;

use crate::data::config::WidgetConfig;

pub mod detector;

pub use detector::GestureDetector;

pub const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GestureSample {
    pub finger_count: u32,
}

impl GestureSample {
    pub fn new(finger_count: u32, max_finger_count: u32) -> Self {
        Self {
            finger_count: finger_count.min(max_finger_count),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GestureRunState {
    pub consecutive_high_count: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PollState {
    #[default]
    Stopped,
    Running,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GestureThresholds {
    pub finger_threshold: u32,
    pub required_consecutive_hits: u32,
    pub max_finger_count: u32,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            finger_threshold: 5,
            required_consecutive_hits: 3,
            max_finger_count: 5,
        }
    }
}

impl From<&WidgetConfig> for GestureThresholds {
    fn from(config: &WidgetConfig) -> Self {
        Self {
            finger_threshold: config.finger_threshold.max(1),
            required_consecutive_hits: config.required_consecutive_hits.max(1),
            max_finger_count: config.max_finger_count,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GestureTick {
    pub sample: GestureSample,
    pub triggered: bool,
}

pub type TriggerCallback = Box<dyn FnMut() + Send + Sync>;

#[derive(Resource)]
pub struct GestureSignalSource {
    thresholds: GestureThresholds,
    poll: Timer,
    state: PollState,
    run: GestureRunState,
    last_finger_count: u32,
    on_trigger: Option<TriggerCallback>,
}

impl Default for GestureSignalSource {
    fn default() -> Self {
        Self::new(GestureThresholds::default(), Duration::from_millis(500))
    }
}

impl GestureSignalSource {
    /// `period` is raised to [`MIN_POLL_PERIOD`]; a zero-length repeating timer
    /// would report unbounded completions per tick.
    pub fn new(thresholds: GestureThresholds, period: Duration) -> Self {
        Self {
            thresholds,
            poll: Timer::new(period.max(MIN_POLL_PERIOD), TimerMode::Repeating),
            state: PollState::Stopped,
            run: GestureRunState::default(),
            last_finger_count: 0,
            on_trigger: None,
        }
    }

    pub fn from_config(config: &WidgetConfig) -> Self {
        Self::new(GestureThresholds::from(config), config.poll_interval())
    }

    /// Stopped -> Running. Returns false, keeping the current callback, when already running.
    pub fn start(&mut self, on_trigger: impl FnMut() + Send + Sync + 'static) -> bool {
        if self.state == PollState::Running {
            return false;
        }
        self.poll.reset();
        self.on_trigger = Some(Box::new(on_trigger));
        self.state = PollState::Running;
        debug!("Gesture polling started");
        true
    }

    pub fn stop(&mut self) {
        if self.state == PollState::Running {
            debug!("Gesture polling stopped");
        }
        self.state = PollState::Stopped;
        self.poll.reset();
        self.run = GestureRunState::default();
        self.last_finger_count = 0;
        self.on_trigger = None;
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PollState::Running
    }

    pub fn thresholds(&self) -> GestureThresholds {
        self.thresholds
    }

    pub fn run_state(&self) -> GestureRunState {
        self.run
    }

    pub fn last_finger_count(&self) -> u32 {
        self.last_finger_count
    }

    /// `finger_count / threshold` as observed, which exceeds 1.0 when the
    /// detector reports more fingers than the threshold.
    pub fn raw_progress_ratio(&self) -> f32 {
        self.last_finger_count as f32 / self.thresholds.finger_threshold as f32
    }

    pub fn progress_ratio(&self) -> f32 {
        self.raw_progress_ratio().clamp(0.0, 1.0)
    }

    /// Advances the poll clock, running one poll for every period that elapsed.
    pub fn tick(
        &mut self,
        delta: Duration,
        detector: &mut dyn GestureDetector,
    ) -> SmallVec<[GestureTick; 2]> {
        let mut ticks = SmallVec::new();
        if self.state != PollState::Running {
            return ticks;
        }
        self.poll.tick(delta);
        for _ in 0..self.poll.times_finished_this_tick() {
            ticks.push(self.poll_once(detector));
        }
        ticks
    }

    /// One poll tick: sample the detector and feed the debounce.
    pub fn poll_once(&mut self, detector: &mut dyn GestureDetector) -> GestureTick {
        let sample = GestureSample::new(detector.sample(), self.thresholds.max_finger_count);
        let triggered = self.observe(sample);
        GestureTick { sample, triggered }
    }

    /// Feeds one sample into the run counter. Returns true when the trigger fired.
    pub fn observe(&mut self, sample: GestureSample) -> bool {
        self.last_finger_count = sample.finger_count;
        if sample.finger_count < self.thresholds.finger_threshold {
            self.run.consecutive_high_count = 0;
            return false;
        }

        self.run.consecutive_high_count += 1;
        if self.run.consecutive_high_count < self.thresholds.required_consecutive_hits {
            return false;
        }

        self.run.consecutive_high_count = 0;
        if let Some(on_trigger) = self.on_trigger.as_mut() {
            on_trigger();
        }
        true
    }
}

/// Counter the trigger callback bumps; drained into `GestureTriggered` messages.
#[derive(Resource, Clone, Debug, Default)]
pub struct TriggerInbox(Arc<AtomicU32>);

impl TriggerInbox {
    pub fn callback(&self) -> impl FnMut() + Send + Sync + 'static {
        let pending = self.0.clone();
        move || {
            pending.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn drain(&self) -> u32 {
        self.0.swap(0, Ordering::SeqCst)
    }
}
