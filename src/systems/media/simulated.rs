use std::time::Duration;

use noise::{NoiseFn, Perlin};

use super::{
    AcquisitionError, AcquisitionFuture, MediaAcquisition, VideoFrame, VideoStream,
};
use crate::data::config::VideoConstraints;

const FRAME_INTERVAL: Duration = Duration::from_millis(66);
// Preview frames are generated at a fraction of the requested resolution.
const DOWNSCALE: u32 = 4;
const NOISE_SCALE: f64 = 0.08;
const NOISE_DRIFT_PER_SECOND: f64 = 0.6;

/// Stand-in camera that serves an animated noise pattern.
pub struct SimulatedCamera {
    seed: u32,
    outcome: Result<(), AcquisitionError>,
}

impl SimulatedCamera {
    pub fn new(seed: u32) -> Self {
        Self { seed, outcome: Ok(()) }
    }

    pub fn failing(error: AcquisitionError) -> Self {
        Self {
            seed: 0,
            outcome: Err(error),
        }
    }
}

impl SimulatedCamera {
    /// Camera failing with the error an environment reports as `reason`.
    /// Unknown reasons yield `None`.
    pub fn failing_with_reason(reason: &str) -> Option<Self> {
        AcquisitionError::from_reason(reason).map(Self::failing)
    }
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new(12345)
    }
}

impl MediaAcquisition for SimulatedCamera {
    fn acquire_video_stream(&self, constraints: VideoConstraints) -> AcquisitionFuture {
        let outcome = self.outcome;
        let seed = self.seed;
        Box::pin(async move {
            outcome.map(|()| {
                Box::new(TestPatternStream::new(seed, constraints)) as Box<dyn VideoStream>
            })
        })
    }
}

pub struct TestPatternStream {
    perlin: Perlin,
    width: u32,
    height: u32,
    clock: Duration,
    since_last_frame: Duration,
    stopped: bool,
}

impl TestPatternStream {
    pub fn new(seed: u32, constraints: VideoConstraints) -> Self {
        Self {
            perlin: Perlin::new(seed),
            width: (constraints.ideal_width / DOWNSCALE).max(1),
            height: (constraints.ideal_height / DOWNSCALE).max(1),
            clock: Duration::ZERO,
            // The first poll always yields a frame.
            since_last_frame: FRAME_INTERVAL,
            stopped: false,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn render(&self) -> VideoFrame {
        let t = self.clock.as_secs_f64() * NOISE_DRIFT_PER_SECOND;
        let mut rgba = Vec::with_capacity((self.width * self.height * 4) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let value = self
                    .perlin
                    .get([x as f64 * NOISE_SCALE, y as f64 * NOISE_SCALE, t]);
                let level = ((value * 0.5 + 0.5).clamp(0.0, 1.0) * 255.0) as u8;
                rgba.extend_from_slice(&[level / 3, level / 2, level, 255]);
            }
        }
        VideoFrame {
            width: self.width,
            height: self.height,
            rgba,
        }
    }
}

impl VideoStream for TestPatternStream {
    fn label(&self) -> &str {
        "simulated test pattern"
    }

    fn poll_frame(&mut self, elapsed: Duration) -> Option<VideoFrame> {
        if self.stopped {
            return None;
        }
        self.clock += elapsed;
        self.since_last_frame += elapsed;
        if self.since_last_frame < FRAME_INTERVAL {
            return None;
        }
        self.since_last_frame = Duration::ZERO;
        Some(self.render())
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use bevy::tasks::block_on;

    use super::*;

    #[test]
    fn first_poll_yields_downscaled_frame() {
        let mut stream = TestPatternStream::new(1, VideoConstraints::default());
        let frame = stream.poll_frame(Duration::ZERO).expect("first frame");
        assert_eq!((frame.width, frame.height), (160, 120));
        assert_eq!(frame.rgba.len(), 160 * 120 * 4);
    }

    #[test]
    fn frames_are_paced_by_interval() {
        let mut stream = TestPatternStream::new(1, VideoConstraints::default());
        assert!(stream.poll_frame(Duration::ZERO).is_some());
        assert!(stream.poll_frame(Duration::from_millis(10)).is_none());
        assert!(stream.poll_frame(FRAME_INTERVAL).is_some());
    }

    #[test]
    fn stopped_stream_yields_nothing() {
        let mut stream = TestPatternStream::new(1, VideoConstraints::default());
        stream.stop();
        assert!(stream.is_stopped());
        assert!(stream.poll_frame(FRAME_INTERVAL).is_none());
    }

    #[test]
    fn failing_camera_resolves_with_reason() {
        let camera = SimulatedCamera::failing(AcquisitionError::DeviceBusy);
        let result = block_on(camera.acquire_video_stream(VideoConstraints::default()));
        assert!(matches!(result, Err(AcquisitionError::DeviceBusy)));
    }

    #[test]
    fn reason_names_select_failure() {
        let camera = SimulatedCamera::failing_with_reason("NotReadableError").expect("known reason");
        let result = block_on(camera.acquire_video_stream(VideoConstraints::default()));
        assert!(matches!(result, Err(AcquisitionError::DeviceBusy)));
        assert!(SimulatedCamera::failing_with_reason("lens-cap").is_none());
    }

    #[test]
    fn granting_camera_resolves_with_stream() {
        let camera = SimulatedCamera::default();
        let mut stream = block_on(camera.acquire_video_stream(VideoConstraints::default()))
            .expect("stream");
        assert_eq!(stream.label(), "simulated test pattern");
        assert!(stream.poll_frame(Duration::ZERO).is_some());
    }
}
