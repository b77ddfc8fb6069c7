//! Camera media collaborators.
//!
//! The widget never talks to a device directly: it asks a [`MediaAcquisition`]
//! for a [`VideoStream`] and wraps whatever comes back in a [`StreamHandle`]
//! owned by the widget controller. Dropping the handle stops the stream.
use std::{fmt, future::Future, pin::Pin, time::Duration};

use bevy::prelude::*;
use phf::phf_map;

use crate::data::config::VideoConstraints;

pub mod simulated;
pub mod surface;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquisitionError {
    PermissionDenied,
    DeviceUnavailable,
    DeviceBusy,
}

// Environment reason names, both the short forms and the browser exception names.
static FAILURE_REASONS: phf::Map<&'static str, AcquisitionError> = phf_map! {
    "permission-denied" => AcquisitionError::PermissionDenied,
    "NotAllowedError" => AcquisitionError::PermissionDenied,
    "SecurityError" => AcquisitionError::PermissionDenied,
    "no-device" => AcquisitionError::DeviceUnavailable,
    "NotFoundError" => AcquisitionError::DeviceUnavailable,
    "OverconstrainedError" => AcquisitionError::DeviceUnavailable,
    "device-unavailable" => AcquisitionError::DeviceBusy,
    "NotReadableError" => AcquisitionError::DeviceBusy,
    "AbortError" => AcquisitionError::DeviceBusy,
};

impl AcquisitionError {
    pub fn from_reason(reason: &str) -> Option<Self> {
        FAILURE_REASONS.get(reason.trim()).copied()
    }

    pub fn reason(self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission-denied",
            Self::DeviceUnavailable => "no-device",
            Self::DeviceBusy => "device-unavailable",
        }
    }
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "camera permission denied"),
            Self::DeviceUnavailable => write!(f, "no camera device available"),
            Self::DeviceBusy => write!(f, "camera device is busy or unreadable"),
        }
    }
}

impl std::error::Error for AcquisitionError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl VideoFrame {
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width as usize) * (height as usize);
        Self {
            width,
            height,
            rgba: rgba.repeat(pixels),
        }
    }
}

/// A live camera feed.
pub trait VideoStream: Send + Sync {
    fn label(&self) -> &str;

    /// Returns a frame when one is due after `elapsed` more time has passed.
    fn poll_frame(&mut self, elapsed: Duration) -> Option<VideoFrame>;

    /// Stops every track. Called exactly once, when the owning handle is released.
    fn stop(&mut self);
}

pub type AcquisitionResult = Result<Box<dyn VideoStream>, AcquisitionError>;
pub type AcquisitionFuture = Pin<Box<dyn Future<Output = AcquisitionResult> + Send>>;

pub trait MediaAcquisition: Send + Sync {
    fn acquire_video_stream(&self, constraints: VideoConstraints) -> AcquisitionFuture;
}

#[derive(Resource)]
pub struct MediaSource(pub Box<dyn MediaAcquisition>);

impl MediaSource {
    pub fn new(acquisition: impl MediaAcquisition + 'static) -> Self {
        Self(Box::new(acquisition))
    }
}

/// Exclusive owner of an acquired stream.
pub struct StreamHandle {
    id: u64,
    stream: Box<dyn VideoStream>,
}

impl StreamHandle {
    pub fn new(id: u64, stream: Box<dyn VideoStream>) -> Self {
        Self { id, stream }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        self.stream.label()
    }

    pub fn poll_frame(&mut self, elapsed: Duration) -> Option<VideoFrame> {
        self.stream.poll_frame(elapsed)
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        debug!("Releasing camera stream {} ({})", self.id, self.stream.label());
        self.stream.stop();
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.id)
            .field("label", &self.stream.label())
            .finish()
    }
}
