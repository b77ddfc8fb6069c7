//! Lifecycle state machine for the camera widget.
//!
//! Every operation is a small reducer: it mutates the controller and returns
//! [`WidgetEffects`] describing what the host must do next (spawn an
//! acquisition, attach the surface, start or stop the gesture source). The
//! controller is the only owner of the [`StreamHandle`]; it is held exactly
//! while the state is `Active` or `ActiveMinimized`.
use bevy::prelude::*;
use enum_map::Enum;

use crate::{
    data::config::VideoConstraints,
    systems::media::{AcquisitionError, AcquisitionResult, StreamHandle},
};

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WidgetState {
    #[default]
    Closed,
    AwaitingPermission,
    Loading,
    Active,
    ActiveMinimized,
    Error,
}

impl WidgetState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active | Self::ActiveMinimized)
    }

    pub fn is_open(self) -> bool {
        self != Self::Closed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcquisitionRequest {
    pub ticket: u64,
    pub constraints: VideoConstraints,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WidgetEffects {
    pub begin_acquisition: Option<AcquisitionRequest>,
    pub attach_stream: Option<u64>,
    pub released_stream: Option<u64>,
    pub cancel_acquisition: bool,
    pub start_gestures: bool,
    pub stop_gestures: bool,
}

impl WidgetEffects {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Resource, Debug, Default)]
pub struct WidgetController {
    state: WidgetState,
    stream: Option<StreamHandle>,
    constraints: VideoConstraints,
    granted: bool,
    gestures_started: bool,
    next_ticket: u64,
    pending_ticket: Option<u64>,
    next_stream_id: u64,
    last_failure: Option<AcquisitionError>,
}

impl WidgetController {
    pub fn new(constraints: VideoConstraints) -> Self {
        Self {
            constraints,
            ..default()
        }
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    pub fn stream(&self) -> Option<&StreamHandle> {
        self.stream.as_ref()
    }

    pub fn stream_mut(&mut self) -> Option<&mut StreamHandle> {
        self.stream.as_mut()
    }

    pub fn last_failure(&self) -> Option<AcquisitionError> {
        self.last_failure
    }

    pub fn pending_ticket(&self) -> Option<u64> {
        self.pending_ticket
    }

    pub fn open(&mut self) -> WidgetEffects {
        if self.state != WidgetState::Closed {
            return WidgetEffects::default();
        }
        if self.granted {
            // A stream was granted before and stopped on close; reacquire directly.
            return self.begin_acquisition();
        }
        self.transition(WidgetState::AwaitingPermission);
        WidgetEffects::default()
    }

    pub fn close(&mut self) -> WidgetEffects {
        if self.state == WidgetState::Closed {
            return WidgetEffects::default();
        }
        let released_stream = self.stream.take().map(|stream| {
            let id = stream.id();
            stream.release();
            id
        });
        let cancel_acquisition = self.pending_ticket.take().is_some();
        self.gestures_started = false;
        self.transition(WidgetState::Closed);
        WidgetEffects {
            released_stream,
            cancel_acquisition,
            stop_gestures: true,
            ..default()
        }
    }

    pub fn toggle(&mut self) -> WidgetEffects {
        if self.state == WidgetState::Closed {
            self.open()
        } else {
            self.close()
        }
    }

    pub fn toggle_minimize(&mut self) -> WidgetEffects {
        match self.state {
            WidgetState::Active => self.transition(WidgetState::ActiveMinimized),
            WidgetState::ActiveMinimized => self.transition(WidgetState::Active),
            _ => {}
        }
        WidgetEffects::default()
    }

    pub fn request_access(&mut self) -> WidgetEffects {
        match self.state {
            WidgetState::AwaitingPermission | WidgetState::Error => self.begin_acquisition(),
            _ => WidgetEffects::default(),
        }
    }

    /// Completion half of `request_access`. Results for superseded tickets are
    /// discarded and any stream they carry is stopped.
    pub fn complete_acquisition(&mut self, ticket: u64, result: AcquisitionResult) -> WidgetEffects {
        if self.pending_ticket != Some(ticket) || self.state != WidgetState::Loading {
            if let Ok(stream) = result {
                debug!("Discarding stream from superseded acquisition {}", ticket);
                StreamHandle::new(self.allocate_stream_id(), stream).release();
            }
            return WidgetEffects::default();
        }
        self.pending_ticket = None;

        match result {
            Ok(stream) => {
                let handle = StreamHandle::new(self.allocate_stream_id(), stream);
                let id = handle.id();
                info!("Camera stream {} acquired ({})", id, handle.label());
                self.stream = Some(handle);
                self.granted = true;
                self.last_failure = None;
                self.transition(WidgetState::Active);
                WidgetEffects {
                    attach_stream: Some(id),
                    ..default()
                }
            }
            Err(error) => {
                warn!("Camera acquisition failed: {} ({})", error, error.reason());
                self.last_failure = Some(error);
                self.transition(WidgetState::Error);
                WidgetEffects::default()
            }
        }
    }

    pub fn first_frame_ready(&mut self, stream_id: u64) -> WidgetEffects {
        let current = self.stream.as_ref().map(StreamHandle::id);
        if !self.state.is_active() || current != Some(stream_id) || self.gestures_started {
            return WidgetEffects::default();
        }
        self.gestures_started = true;
        WidgetEffects {
            start_gestures: true,
            ..default()
        }
    }

    fn begin_acquisition(&mut self) -> WidgetEffects {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.pending_ticket = Some(ticket);
        self.transition(WidgetState::Loading);
        WidgetEffects {
            begin_acquisition: Some(AcquisitionRequest {
                ticket,
                constraints: self.constraints,
            }),
            ..default()
        }
    }

    fn allocate_stream_id(&mut self) -> u64 {
        self.next_stream_id += 1;
        self.next_stream_id
    }

    fn transition(&mut self, next: WidgetState) {
        if self.state != next {
            debug!("Camera widget {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::systems::media::testing::counting_stream;

    fn ticket_of(effects: &WidgetEffects) -> u64 {
        effects.begin_acquisition.expect("acquisition requested").ticket
    }

    fn activate(controller: &mut WidgetController) -> std::sync::Arc<std::sync::atomic::AtomicUsize> {
        controller.open();
        let ticket = ticket_of(&controller.request_access());
        let (stream, stops) = counting_stream();
        controller.complete_acquisition(ticket, Ok(stream));
        stops
    }

    #[test]
    fn first_open_waits_for_permission() {
        let mut controller = WidgetController::default();
        let effects = controller.open();
        assert!(effects.is_empty());
        assert_eq!(controller.state(), WidgetState::AwaitingPermission);
        assert!(controller.stream().is_none());
    }

    #[test]
    fn open_is_idempotent_while_open() {
        let mut controller = WidgetController::default();
        controller.open();
        assert!(controller.open().is_empty());
        assert_eq!(controller.state(), WidgetState::AwaitingPermission);
    }

    #[test]
    fn request_access_success_activates_and_attaches() {
        let mut controller = WidgetController::new(VideoConstraints::default());
        controller.open();
        let effects = controller.request_access();
        let request = effects.begin_acquisition.expect("request");
        assert_eq!(request.constraints, VideoConstraints::default());
        assert_eq!(controller.state(), WidgetState::Loading);
        assert!(controller.stream().is_none());

        let (stream, _) = counting_stream();
        let effects = controller.complete_acquisition(request.ticket, Ok(stream));
        assert_eq!(controller.state(), WidgetState::Active);
        let stream_id = controller.stream().map(StreamHandle::id);
        assert_eq!(effects.attach_stream, stream_id);
        assert!(!effects.start_gestures);
    }

    #[test]
    fn permission_denied_surfaces_as_error_without_stream() {
        let mut controller = WidgetController::default();
        controller.open();
        assert_eq!(controller.state(), WidgetState::AwaitingPermission);
        assert!(controller.stream().is_none());

        let ticket = ticket_of(&controller.request_access());
        controller.complete_acquisition(ticket, Err(AcquisitionError::PermissionDenied));
        assert_eq!(controller.state(), WidgetState::Error);
        assert!(controller.stream().is_none());
        assert_eq!(
            controller.last_failure(),
            Some(AcquisitionError::PermissionDenied)
        );
    }

    #[test]
    fn retry_from_error_requests_again() {
        let mut controller = WidgetController::default();
        controller.open();
        let ticket = ticket_of(&controller.request_access());
        controller.complete_acquisition(ticket, Err(AcquisitionError::DeviceBusy));

        let retry = ticket_of(&controller.request_access());
        assert!(retry > ticket);
        let (stream, _) = counting_stream();
        controller.complete_acquisition(retry, Ok(stream));
        assert_eq!(controller.state(), WidgetState::Active);
        assert_eq!(controller.last_failure(), None);
    }

    #[test]
    fn request_access_ignored_outside_permission_or_error() {
        let mut controller = WidgetController::default();
        assert!(controller.request_access().is_empty());
        activate(&mut controller);
        assert!(controller.request_access().is_empty());
        assert_eq!(controller.state(), WidgetState::Active);
    }

    #[test]
    fn first_frame_starts_gestures_once() {
        let mut controller = WidgetController::default();
        activate(&mut controller);
        let id = controller.stream().map(StreamHandle::id).expect("stream");

        assert!(controller.first_frame_ready(id + 1).is_empty());
        assert!(controller.first_frame_ready(id).start_gestures);
        assert!(controller.first_frame_ready(id).is_empty());
    }

    #[test]
    fn minimize_flips_only_while_active() {
        let mut controller = WidgetController::default();
        controller.toggle_minimize();
        assert_eq!(controller.state(), WidgetState::Closed);

        activate(&mut controller);
        controller.toggle_minimize();
        assert_eq!(controller.state(), WidgetState::ActiveMinimized);
        assert!(controller.stream().is_some());
        controller.toggle_minimize();
        assert_eq!(controller.state(), WidgetState::Active);
    }

    #[test]
    fn close_twice_releases_stream_once() {
        let mut controller = WidgetController::default();
        let stops = activate(&mut controller);

        let first = controller.close();
        assert!(first.released_stream.is_some());
        assert!(first.stop_gestures);
        assert_eq!(controller.state(), WidgetState::Closed);

        let second = controller.close();
        assert!(second.is_empty());
        assert_eq!(controller.state(), WidgetState::Closed);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reopen_after_grant_reacquires_directly() {
        let mut controller = WidgetController::default();
        activate(&mut controller);
        controller.close();

        let effects = controller.open();
        assert!(effects.begin_acquisition.is_some());
        assert_eq!(controller.state(), WidgetState::Loading);
    }

    #[test]
    fn stale_completion_after_close_is_released() {
        let mut controller = WidgetController::default();
        controller.open();
        let ticket = ticket_of(&controller.request_access());
        assert!(controller.close().cancel_acquisition);

        let (stream, stops) = counting_stream();
        let effects = controller.complete_acquisition(ticket, Ok(stream));
        assert!(effects.is_empty());
        assert_eq!(controller.state(), WidgetState::Closed);
        assert!(controller.stream().is_none());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn toggle_alternates_open_and_close() {
        let mut controller = WidgetController::default();
        controller.toggle();
        assert!(controller.state().is_open());
        controller.toggle();
        assert_eq!(controller.state(), WidgetState::Closed);
    }

    #[test]
    fn stream_held_iff_active_across_random_sequences() {
        let mut rng = Pcg64Mcg::seed_from_u64(12345);
        for _ in 0..200 {
            let mut controller = WidgetController::default();
            for _ in 0..40 {
                match rng.random_range(0..6) {
                    0 => {
                        controller.open();
                    }
                    1 => {
                        controller.close();
                    }
                    2 => {
                        controller.toggle_minimize();
                    }
                    3 => {
                        controller.request_access();
                    }
                    4 => {
                        if let Some(ticket) = controller.pending_ticket() {
                            let (stream, _) = counting_stream();
                            let result = if rng.random_bool(0.7) {
                                Ok(stream)
                            } else {
                                Err(AcquisitionError::DeviceUnavailable)
                            };
                            controller.complete_acquisition(ticket, result);
                        }
                    }
                    _ => {
                        if let Some(id) = controller.stream().map(StreamHandle::id) {
                            controller.first_frame_ready(id);
                        }
                    }
                }
                assert_eq!(
                    controller.stream().is_some(),
                    controller.state().is_active(),
                    "state {:?}",
                    controller.state()
                );
            }
        }
    }
}
