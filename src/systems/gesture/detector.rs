//! Finger-count sources for the gesture poller.
use std::collections::VecDeque;

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_core::RngCore;
use rand_pcg::Pcg64Mcg;

/// Anything that can report how many fingers are raised right now.
///
/// Called once per poll tick on the main thread; it must answer immediately.
pub trait GestureDetector: Send + Sync {
    fn sample(&mut self) -> u32;
}

#[derive(Resource)]
pub struct ActiveDetector(pub Box<dyn GestureDetector>);

impl ActiveDetector {
    pub fn new(detector: impl GestureDetector + 'static) -> Self {
        Self(Box::new(detector))
    }
}

/// Uniformly random counts in `[0, max]`, standing in for a real recognizer.
pub struct SimulatedDetector<R: RngCore + Send + Sync = Pcg64Mcg> {
    rng: R,
    max: u32,
}

impl SimulatedDetector<Pcg64Mcg> {
    pub fn seeded(seed: u64, max: u32) -> Self {
        Self {
            rng: Pcg64Mcg::seed_from_u64(seed),
            max,
        }
    }

    pub fn from_entropy(max: u32) -> Self {
        Self {
            rng: Pcg64Mcg::from_rng(&mut rand::rng()),
            max,
        }
    }
}

impl<R: RngCore + Send + Sync> SimulatedDetector<R> {
    pub fn with_rng(rng: R, max: u32) -> Self {
        Self { rng, max }
    }
}

impl<R: RngCore + Send + Sync> GestureDetector for SimulatedDetector<R> {
    fn sample(&mut self) -> u32 {
        self.rng.random_range(0..=self.max)
    }
}

/// Replays a fixed script, then reports `fallback` forever.
#[derive(Clone, Debug, Default)]
pub struct ScriptedDetector {
    samples: VecDeque<u32>,
    fallback: u32,
}

impl ScriptedDetector {
    pub fn new(samples: impl IntoIterator<Item = u32>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            fallback: 0,
        }
    }

    pub fn with_fallback(mut self, fallback: u32) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl GestureDetector for ScriptedDetector {
    fn sample(&mut self) -> u32 {
        self.samples.pop_front().unwrap_or(self.fallback)
    }
}

/// Hand landmark indices, MediaPipe hand model convention.
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;

    pub const COUNT: usize = 21;
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    /// Normalized to image width.
    pub x: f32,
    /// Normalized to image height.
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    fn planar(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

pub type HandLandmarks = [Landmark; landmarks::COUNT];

/// Supplies the most recent hand pose from an external tracker, if any.
pub trait LandmarkSource: Send + Sync {
    fn latest_hand(&mut self) -> Option<HandLandmarks>;
}

/// Counts raised fingers from landmark geometry. A finger is raised when its tip
/// lies farther from the wrist than its middle joint; the thumb is compared
/// against the pinky knuckle instead, since it folds sideways.
pub struct LandmarkDetector<S: LandmarkSource> {
    source: S,
}

impl<S: LandmarkSource> LandmarkDetector<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

pub fn count_raised_fingers(hand: &HandLandmarks) -> u32 {
    use landmarks::*;

    let wrist = hand[WRIST].planar();
    let finger_joints = [
        (INDEX_FINGER_TIP, INDEX_FINGER_PIP),
        (MIDDLE_FINGER_TIP, MIDDLE_FINGER_PIP),
        (RING_FINGER_TIP, RING_FINGER_PIP),
        (PINKY_TIP, PINKY_PIP),
    ];
    let fingers = finger_joints
        .iter()
        .filter(|(tip, pip)| {
            hand[*tip].planar().distance(wrist) > hand[*pip].planar().distance(wrist)
        })
        .count() as u32;

    let pinky_base = hand[PINKY_MCP].planar();
    let thumb_raised =
        hand[THUMB_TIP].planar().distance(pinky_base) > hand[THUMB_IP].planar().distance(pinky_base);

    fingers + u32::from(thumb_raised)
}

impl<S: LandmarkSource> GestureDetector for LandmarkDetector<S> {
    fn sample(&mut self) -> u32 {
        self.source
            .latest_hand()
            .map(|hand| count_raised_fingers(&hand))
            .unwrap_or(0)
    }
}
