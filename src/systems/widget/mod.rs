//! Camera preview widget: lifecycle, media pumping and gesture trigger wiring.
use bevy::{
    ecs::system::SystemParam,
    prelude::*,
    tasks::{block_on, futures_lite::future, IoTaskPool, Task},
};

use crate::{
    data::config::{display_host, WidgetConfig},
    systems::{
        external::{ExternalActions, SystemBrowser},
        gesture::{
            detector::{ActiveDetector, SimulatedDetector},
            GestureSignalSource, TriggerInbox,
        },
        interaction::{drag::DragSession, drag_panel, route_widget_buttons},
        media::{
            simulated::SimulatedCamera,
            surface::{FirstFrameReady, RenderSurface},
            AcquisitionResult, MediaSource,
        },
    },
};

pub mod controller;
pub mod panel;

use controller::{WidgetController, WidgetEffects};
use panel::{spawn_widget, StatusFlash, WidgetHandles};

/// Requests from the host page or the widget's own buttons.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetIntent {
    Create,
    Destroy,
    Toggle,
    Open,
    Close,
    ToggleMinimize,
    RequestAccess,
}

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureTriggered;

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetSystems {
    Input,
    Lifecycle,
    Media,
    Gesture,
    Visual,
}

pub struct PendingTask {
    ticket: u64,
    task: Task<AcquisitionResult>,
}

/// The acquisition in flight, if any. Replacing or clearing it drops the task.
#[derive(Resource, Default)]
pub struct PendingAcquisition(Option<PendingTask>);

impl PendingAcquisition {
    pub fn is_pending(&self) -> bool {
        self.0.is_some()
    }
}

#[derive(Default)]
pub struct CameraWidgetPlugin {
    pub config: WidgetConfig,
}

impl Plugin for CameraWidgetPlugin {
    fn build(&self, app: &mut App) {
        let config = self.config.clone().validated_or_default();

        if !app.world().contains_resource::<MediaSource>() {
            let camera = config
                .simulated_failure
                .as_deref()
                .and_then(SimulatedCamera::failing_with_reason)
                .unwrap_or_default();
            app.insert_resource(MediaSource::new(camera));
        }
        if !app.world().contains_resource::<ActiveDetector>() {
            let detector = match config.detector_seed {
                Some(seed) => SimulatedDetector::seeded(seed, config.max_finger_count),
                None => SimulatedDetector::from_entropy(config.max_finger_count),
            };
            app.insert_resource(ActiveDetector::new(detector));
        }
        if !app.world().contains_resource::<ExternalActions>() {
            app.insert_resource(ExternalActions::new(SystemBrowser));
        }

        app.insert_resource(WidgetController::new(config.video))
            .insert_resource(GestureSignalSource::from_config(&config))
            .insert_resource(config)
            .init_resource::<StatusFlash>()
            .init_resource::<TriggerInbox>()
            .init_resource::<PendingAcquisition>()
            .init_resource::<RenderSurface>()
            .init_resource::<DragSession>()
            .add_message::<WidgetIntent>()
            .add_message::<FirstFrameReady>()
            .add_message::<GestureTriggered>()
            .configure_sets(
                Update,
                (
                    WidgetSystems::Input,
                    WidgetSystems::Lifecycle,
                    WidgetSystems::Media,
                    WidgetSystems::Gesture,
                    WidgetSystems::Visual,
                )
                    .chain(),
            )
            .add_systems(Startup, setup_widget)
            .add_systems(
                Update,
                (route_widget_buttons, drag_panel).in_set(WidgetSystems::Input),
            )
            .add_systems(
                Update,
                apply_widget_intents.in_set(WidgetSystems::Lifecycle),
            )
            .add_systems(
                Update,
                (poll_pending_acquisition, pump_video_frames, handle_first_frame)
                    .chain()
                    .in_set(WidgetSystems::Media),
            )
            .add_systems(
                Update,
                (
                    tick_gesture_source,
                    drain_trigger_inbox,
                    handle_gesture_triggers,
                    tick_status_flash,
                )
                    .chain()
                    .in_set(WidgetSystems::Gesture),
            )
            .add_systems(
                Update,
                (
                    panel::sync_panel_view,
                    panel::sync_gesture_readout,
                    panel::sync_feed_image,
                )
                    .in_set(WidgetSystems::Visual),
            );
    }
}

/// Resources touched when carrying out [`WidgetEffects`].
#[derive(SystemParam)]
pub struct WidgetEffectParams<'w> {
    media: Res<'w, MediaSource>,
    pending: ResMut<'w, PendingAcquisition>,
    surface: ResMut<'w, RenderSurface>,
    images: ResMut<'w, Assets<Image>>,
    gestures: ResMut<'w, GestureSignalSource>,
    inbox: Res<'w, TriggerInbox>,
}

impl WidgetEffectParams<'_> {
    fn apply(&mut self, effects: WidgetEffects) {
        if effects.stop_gestures {
            self.gestures.stop();
        }
        if effects.cancel_acquisition {
            self.pending.0 = None;
        }
        if effects.released_stream.is_some() {
            self.surface.detach(&mut self.images);
        }
        if let Some(request) = effects.begin_acquisition {
            let acquisition = self.media.0.acquire_video_stream(request.constraints);
            let task = IoTaskPool::get().spawn(acquisition);
            self.pending.0 = Some(PendingTask {
                ticket: request.ticket,
                task,
            });
        }
        if let Some(stream_id) = effects.attach_stream {
            self.surface.attach(stream_id);
        }
        if effects.start_gestures {
            let callback = self.inbox.callback();
            self.gestures.start(callback);
        }
    }
}

fn setup_widget(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    mut surface: ResMut<RenderSurface>,
    config: Res<WidgetConfig>,
) {
    *surface = RenderSurface::new(&mut images);
    let handles = spawn_widget(&mut commands, &surface, &config);
    commands.insert_resource(handles);
    info!("Camera widget created");
}

fn apply_widget_intents(
    mut commands: Commands,
    mut intents: MessageReader<WidgetIntent>,
    mut controller: ResMut<WidgetController>,
    mut effects: WidgetEffectParams,
    handles: Option<Res<WidgetHandles>>,
    config: Res<WidgetConfig>,
) {
    let mut root = handles.map(|handles| handles.root);
    for intent in intents.read() {
        let outcome = match intent {
            WidgetIntent::Toggle => controller.toggle(),
            WidgetIntent::Open => controller.open(),
            WidgetIntent::Close => controller.close(),
            WidgetIntent::ToggleMinimize => controller.toggle_minimize(),
            WidgetIntent::RequestAccess => controller.request_access(),
            WidgetIntent::Create => {
                if root.is_none() {
                    let handles = spawn_widget(&mut commands, &effects.surface, &config);
                    root = Some(handles.root);
                    commands.insert_resource(handles);
                    info!("Camera widget created");
                }
                WidgetEffects::default()
            }
            WidgetIntent::Destroy => {
                let outcome = controller.close();
                if let Some(entity) = root.take() {
                    commands.entity(entity).despawn();
                    commands.remove_resource::<WidgetHandles>();
                    info!("Camera widget destroyed");
                }
                outcome
            }
        };
        effects.apply(outcome);
    }
}

fn poll_pending_acquisition(
    mut controller: ResMut<WidgetController>,
    mut effects: WidgetEffectParams,
) {
    let Some(pending) = effects.pending.0.as_mut() else {
        return;
    };
    let Some(result) = block_on(future::poll_once(&mut pending.task)) else {
        return;
    };
    let ticket = pending.ticket;
    effects.pending.0 = None;

    let outcome = controller.complete_acquisition(ticket, result);
    effects.apply(outcome);
}

fn pump_video_frames(
    time: Res<Time>,
    mut controller: ResMut<WidgetController>,
    mut surface: ResMut<RenderSurface>,
    mut images: ResMut<Assets<Image>>,
    mut ready: MessageWriter<FirstFrameReady>,
) {
    let Some(stream) = controller.stream_mut() else {
        return;
    };
    let stream_id = stream.id();
    let Some(frame) = stream.poll_frame(time.delta()) else {
        return;
    };
    if surface.present(stream_id, &frame, &mut images) {
        ready.write(FirstFrameReady { stream_id });
    }
}

fn handle_first_frame(
    mut ready: MessageReader<FirstFrameReady>,
    mut controller: ResMut<WidgetController>,
    mut effects: WidgetEffectParams,
) {
    for message in ready.read() {
        let outcome = controller.first_frame_ready(message.stream_id);
        effects.apply(outcome);
    }
}

fn tick_gesture_source(
    time: Res<Time>,
    mut source: ResMut<GestureSignalSource>,
    mut detector: ResMut<ActiveDetector>,
) {
    if !source.is_running() {
        return;
    }
    for tick in source.tick(time.delta(), detector.0.as_mut()) {
        debug!(
            "Gesture poll: {} fingers, run {}{}",
            tick.sample.finger_count,
            source.run_state().consecutive_high_count,
            if tick.triggered { " (triggered)" } else { "" }
        );
    }
}

fn drain_trigger_inbox(inbox: Res<TriggerInbox>, mut triggered: MessageWriter<GestureTriggered>) {
    for _ in 0..inbox.drain() {
        triggered.write(GestureTriggered);
    }
}

fn handle_gesture_triggers(
    mut triggered: MessageReader<GestureTriggered>,
    config: Res<WidgetConfig>,
    actions: Res<ExternalActions>,
    mut status: ResMut<StatusFlash>,
) {
    for _ in triggered.read() {
        info!("Gesture trigger fired");
        actions.0.open_external_resource(&config.trigger_url);
        status.flash(
            format!("Opening {}...", display_host(&config.trigger_url)),
            config.status_flash(),
        );
    }
}

fn tick_status_flash(time: Res<Time>, mut status: ResMut<StatusFlash>) {
    status.tick(time.delta());
}
