//! Floating preview panel: spawning, per-state view and gesture readout.
use std::time::Duration;

use bevy::{prelude::*, window::PrimaryWindow};
use enum_map::{enum_map, EnumMap};

use super::{controller::WidgetState, WidgetIntent};
use crate::{
    data::config::WidgetConfig,
    systems::{gesture::GestureSignalSource, interaction::drag::DragSession, media::surface::RenderSurface},
};

pub const WIDGET_MARGIN: f32 = 30.0;
pub const TOGGLE_SIZE: f32 = 70.0;
pub const PANEL_LIFT: f32 = 90.0;
pub const MINIMIZED_HEIGHT: f32 = 50.0;

const ACCENT: Color = Color::srgb(0.212, 0.820, 0.863);
const TOGGLE_IDLE: Color = Color::srgb(1.0, 0.255, 0.424);
const TOGGLE_ACTIVE: Color = Color::srgb(0.357, 0.525, 0.898);
const ERROR_TINT: Color = Color::srgb(1.0, 0.294, 0.169);
const PANEL_BACKGROUND: Color = Color::srgba(0.0, 0.0, 0.0, 0.9);
const BAR_BACKGROUND: Color = Color::srgba(0.0, 0.0, 0.0, 0.7);
const FEED_BACKGROUND: Color = Color::srgb(0.067, 0.067, 0.067);
const READOUT_BACKGROUND: Color = Color::srgba(0.0, 0.0, 0.0, 0.8);
const TRACK_BACKGROUND: Color = Color::srgba(1.0, 1.0, 1.0, 0.2);
const MUTED_TEXT: Color = Color::srgba(1.0, 1.0, 1.0, 0.5);

/// Which user affordance a button stands for.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidgetControl {
    Toggle,
    Minimize,
    Close,
    RequestAccess,
}

impl WidgetControl {
    pub fn intent(self) -> WidgetIntent {
        match self {
            Self::Toggle => WidgetIntent::Toggle,
            Self::Minimize => WidgetIntent::ToggleMinimize,
            Self::Close => WidgetIntent::Close,
            Self::RequestAccess => WidgetIntent::RequestAccess,
        }
    }
}

#[derive(Component)]
pub struct WidgetRoot;

#[derive(Component)]
pub struct PanelBody;

/// Drag handle of the panel.
#[derive(Component)]
pub struct PanelHeader;

/// Named entities of one spawned widget.
#[derive(Resource, Clone, Copy, Debug, PartialEq, Eq)]
pub struct WidgetHandles {
    pub root: Entity,
    pub toggle_button: Entity,
    pub toggle_label: Entity,
    pub panel: Entity,
    pub minimize_label: Entity,
    pub feed: Entity,
    pub video: Entity,
    pub permission_prompt: Entity,
    pub permission_message: Entity,
    pub permission_button_label: Entity,
    pub loading: Entity,
    pub placeholder: Entity,
    pub gesture_indicator: Entity,
    pub finger_count: Entity,
    pub progress_fill: Entity,
    pub status_text: Entity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PromptView {
    pub message: &'static str,
    pub button: &'static str,
    pub is_error: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelView {
    pub panel_visible: bool,
    pub video: bool,
    pub prompt: Option<PromptView>,
    pub loading: bool,
    pub placeholder: bool,
    pub minimized: bool,
}

const HIDDEN: PanelView = PanelView {
    panel_visible: false,
    video: false,
    prompt: None,
    loading: false,
    placeholder: true,
    minimized: false,
};

pub fn panel_views() -> EnumMap<WidgetState, PanelView> {
    enum_map! {
        WidgetState::Closed => HIDDEN,
        WidgetState::AwaitingPermission => PanelView {
            panel_visible: true,
            placeholder: false,
            prompt: Some(PromptView {
                message: "Camera access is required for live feed",
                button: "Allow Camera Access",
                is_error: false,
            }),
            ..HIDDEN
        },
        WidgetState::Loading => PanelView {
            panel_visible: true,
            placeholder: false,
            loading: true,
            ..HIDDEN
        },
        WidgetState::Active => PanelView {
            panel_visible: true,
            placeholder: false,
            video: true,
            ..HIDDEN
        },
        WidgetState::ActiveMinimized => PanelView {
            panel_visible: true,
            placeholder: false,
            video: true,
            minimized: true,
            ..HIDDEN
        },
        WidgetState::Error => PanelView {
            panel_visible: true,
            placeholder: false,
            prompt: Some(PromptView {
                message: "Camera access denied or not available",
                button: "Try Again",
                is_error: true,
            }),
            ..HIDDEN
        },
    }
}

/// Panel size for a viewport width, following the compact breakpoints.
pub fn panel_size_for_viewport(width: f32) -> Vec2 {
    if width <= 480.0 {
        Vec2::new(250.0, 190.0)
    } else if width <= 768.0 {
        Vec2::new(280.0, 210.0)
    } else {
        Vec2::new(320.0, 240.0)
    }
}

/// Panel top-left corner at zero drag offset, in window coordinates.
pub fn panel_rest_position(viewport: Vec2, panel: Vec2) -> Vec2 {
    Vec2::new(
        viewport.x - WIDGET_MARGIN - panel.x,
        viewport.y - WIDGET_MARGIN - PANEL_LIFT - panel.y,
    )
}

/// Transient status line; reverts to the gesture hint once the timer runs out.
#[derive(Resource, Debug, Default)]
pub struct StatusFlash {
    message: Option<String>,
    timer: Timer,
}

impl StatusFlash {
    pub fn flash(&mut self, message: impl Into<String>, duration: Duration) {
        self.message = Some(message.into());
        self.timer = Timer::new(duration, TimerMode::Once);
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns true on the tick the message expires.
    pub fn tick(&mut self, delta: Duration) -> bool {
        if self.message.is_none() {
            return false;
        }
        self.timer.tick(delta);
        if self.timer.just_finished() {
            self.message = None;
            return true;
        }
        false
    }
}

fn label(text: &str, size: f32, color: Color) -> (Text, TextFont, TextColor) {
    (
        Text::new(text),
        TextFont {
            font_size: size,
            ..default()
        },
        TextColor(color),
    )
}

fn control_button(commands: &mut Commands, parent: Entity, control: WidgetControl, glyph: &str) -> (Entity, Entity) {
    let button = commands
        .spawn((
            Button,
            control,
            Node {
                width: Val::Px(30.0),
                height: Val::Px(30.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            ChildOf(parent),
        ))
        .id();
    let glyph = commands
        .spawn((label(glyph, 14.0, Color::WHITE), ChildOf(button)))
        .id();
    (button, glyph)
}

pub fn spawn_widget(
    commands: &mut Commands,
    surface: &RenderSurface,
    config: &WidgetConfig,
) -> WidgetHandles {
    let root = commands
        .spawn((
            WidgetRoot,
            Node {
                position_type: PositionType::Absolute,
                right: Val::Px(WIDGET_MARGIN),
                bottom: Val::Px(WIDGET_MARGIN),
                width: Val::Px(TOGGLE_SIZE),
                height: Val::Px(TOGGLE_SIZE),
                ..default()
            },
            GlobalZIndex(100),
        ))
        .id();

    let toggle_button = commands
        .spawn((
            Button,
            WidgetControl::Toggle,
            Node {
                width: Val::Px(TOGGLE_SIZE),
                height: Val::Px(TOGGLE_SIZE),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(TOGGLE_IDLE),
            ChildOf(root),
        ))
        .id();
    let toggle_label = commands
        .spawn((label("CAM", 18.0, Color::WHITE), ChildOf(toggle_button)))
        .id();

    let panel = commands
        .spawn((
            PanelBody,
            Node {
                display: Display::None,
                position_type: PositionType::Absolute,
                right: Val::Px(0.0),
                bottom: Val::Px(PANEL_LIFT),
                width: Val::Px(320.0),
                height: Val::Px(240.0),
                flex_direction: FlexDirection::Column,
                overflow: Overflow::clip(),
                ..default()
            },
            BackgroundColor(PANEL_BACKGROUND),
            ChildOf(root),
        ))
        .id();

    let header = commands
        .spawn((
            PanelHeader,
            Interaction::default(),
            Node {
                flex_direction: FlexDirection::Row,
                justify_content: JustifyContent::SpaceBetween,
                align_items: AlignItems::Center,
                padding: UiRect::axes(Val::Px(15.0), Val::Px(10.0)),
                ..default()
            },
            BackgroundColor(BAR_BACKGROUND),
            ChildOf(panel),
        ))
        .id();
    commands.spawn((label("Live Camera", 14.0, Color::WHITE), ChildOf(header)));
    let controls = commands
        .spawn((
            Node {
                flex_direction: FlexDirection::Row,
                column_gap: Val::Px(10.0),
                ..default()
            },
            ChildOf(header),
        ))
        .id();
    let (_, minimize_label) = control_button(commands, controls, WidgetControl::Minimize, "_");
    control_button(commands, controls, WidgetControl::Close, "X");

    let feed = commands
        .spawn((
            Node {
                flex_grow: 1.0,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                overflow: Overflow::clip(),
                ..default()
            },
            BackgroundColor(FEED_BACKGROUND),
            ChildOf(panel),
        ))
        .id();

    let video = commands
        .spawn((
            ImageNode {
                flip_x: true,
                ..ImageNode::new(surface.image().clone())
            },
            Node {
                display: Display::None,
                position_type: PositionType::Absolute,
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                ..default()
            },
            ChildOf(feed),
        ))
        .id();

    let permission_prompt = commands
        .spawn((
            Node {
                display: Display::None,
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Center,
                row_gap: Val::Px(15.0),
                padding: UiRect::all(Val::Px(20.0)),
                ..default()
            },
            ChildOf(feed),
        ))
        .id();
    let permission_message = commands
        .spawn((label("", 13.0, Color::WHITE), ChildOf(permission_prompt)))
        .id();
    let permission_button = commands
        .spawn((
            Button,
            WidgetControl::RequestAccess,
            Node {
                padding: UiRect::axes(Val::Px(20.0), Val::Px(10.0)),
                ..default()
            },
            BackgroundColor(ACCENT),
            ChildOf(permission_prompt),
        ))
        .id();
    let permission_button_label = commands
        .spawn((label("", 13.0, Color::WHITE), ChildOf(permission_button)))
        .id();

    let loading = commands
        .spawn((
            Node {
                display: Display::None,
                padding: UiRect::all(Val::Px(20.0)),
                ..default()
            },
            ChildOf(feed),
        ))
        .id();
    commands.spawn((label("Starting camera...", 13.0, Color::WHITE), ChildOf(loading)));

    let placeholder = commands
        .spawn((
            Node {
                padding: UiRect::all(Val::Px(20.0)),
                ..default()
            },
            ChildOf(feed),
        ))
        .id();
    commands.spawn((label("Camera is off", 13.0, MUTED_TEXT), ChildOf(placeholder)));

    let gesture_indicator = commands
        .spawn((
            Node {
                display: Display::None,
                position_type: PositionType::Absolute,
                left: Val::Px(10.0),
                right: Val::Px(10.0),
                bottom: Val::Px(10.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(5.0),
                padding: UiRect::all(Val::Px(10.0)),
                ..default()
            },
            BackgroundColor(READOUT_BACKGROUND),
            ChildOf(feed),
        ))
        .id();
    let finger_count = commands
        .spawn((label("Fingers: 0", 12.0, Color::WHITE), ChildOf(gesture_indicator)))
        .id();
    let track = commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Px(6.0),
                ..default()
            },
            BackgroundColor(TRACK_BACKGROUND),
            ChildOf(gesture_indicator),
        ))
        .id();
    let progress_fill = commands
        .spawn((
            Node {
                width: Val::Percent(0.0),
                height: Val::Percent(100.0),
                ..default()
            },
            BackgroundColor(ACCENT),
            ChildOf(track),
        ))
        .id();
    let status_text = commands
        .spawn((
            label(&config.gesture_hint(), 10.0, Color::WHITE),
            ChildOf(gesture_indicator),
        ))
        .id();

    let footer = commands
        .spawn((
            Node {
                flex_direction: FlexDirection::Row,
                justify_content: JustifyContent::SpaceBetween,
                padding: UiRect::axes(Val::Px(15.0), Val::Px(10.0)),
                ..default()
            },
            BackgroundColor(BAR_BACKGROUND),
            ChildOf(panel),
        ))
        .id();
    commands.spawn((label("Gesture controls enabled", 12.0, ACCENT), ChildOf(footer)));
    commands.spawn((label("Drag to move", 12.0, Color::WHITE), ChildOf(footer)));

    WidgetHandles {
        root,
        toggle_button,
        toggle_label,
        panel,
        minimize_label,
        feed,
        video,
        permission_prompt,
        permission_message,
        permission_button_label,
        loading,
        placeholder,
        gesture_indicator,
        finger_count,
        progress_fill,
        status_text,
    }
}

fn set_display(nodes: &mut Query<&mut Node>, entity: Entity, visible: bool) {
    let display = if visible { Display::Flex } else { Display::None };
    if let Ok(mut node) = nodes.get_mut(entity) {
        if node.display != display {
            node.display = display;
        }
    }
}

fn set_text(texts: &mut Query<&mut Text>, entity: Entity, value: &str) {
    if let Ok(mut text) = texts.get_mut(entity) {
        if text.0 != value {
            text.0 = value.to_string();
        }
    }
}

fn set_px(slot: &mut Val, value: f32) {
    let value = Val::Px(value);
    if *slot != value {
        *slot = value;
    }
}

pub fn sync_panel_view(
    controller: Res<super::controller::WidgetController>,
    drag: Res<DragSession>,
    handles: Option<Res<WidgetHandles>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut nodes: Query<&mut Node>,
    mut texts: Query<&mut Text>,
    mut text_colors: Query<&mut TextColor>,
    mut backgrounds: Query<&mut BackgroundColor>,
) {
    let Some(handles) = handles else {
        return;
    };
    let state = controller.state();
    let view = panel_views()[state];

    set_display(&mut nodes, handles.panel, view.panel_visible);
    set_display(&mut nodes, handles.video, view.video);
    set_display(&mut nodes, handles.loading, view.loading);
    set_display(&mut nodes, handles.placeholder, view.placeholder);
    set_display(&mut nodes, handles.permission_prompt, view.prompt.is_some());
    set_display(&mut nodes, handles.feed, !view.minimized);

    if let Some(prompt) = view.prompt {
        set_text(&mut texts, handles.permission_message, prompt.message);
        set_text(&mut texts, handles.permission_button_label, prompt.button);
        if let Ok(mut color) = text_colors.get_mut(handles.permission_message) {
            let tint = if prompt.is_error { ERROR_TINT } else { Color::WHITE };
            if color.0 != tint {
                color.0 = tint;
            }
        }
    }

    set_text(
        &mut texts,
        handles.toggle_label,
        if state.is_open() { "X" } else { "CAM" },
    );
    set_text(
        &mut texts,
        handles.minimize_label,
        if view.minimized { "[]" } else { "_" },
    );
    if let Ok(mut background) = backgrounds.get_mut(handles.toggle_button) {
        let tint = if state.is_open() { TOGGLE_ACTIVE } else { TOGGLE_IDLE };
        if background.0 != tint {
            background.0 = tint;
        }
    }

    let viewport_width = windows
        .single()
        .map(|window| window.width())
        .unwrap_or(f32::MAX);
    let size = panel_size_for_viewport(viewport_width);
    let offset = drag.offset();
    if let Ok(mut node) = nodes.get_mut(handles.panel) {
        set_px(&mut node.width, size.x);
        set_px(
            &mut node.height,
            if view.minimized { MINIMIZED_HEIGHT } else { size.y },
        );
        set_px(&mut node.right, -offset.x);
        set_px(&mut node.bottom, PANEL_LIFT - offset.y);
    }
}

pub fn sync_gesture_readout(
    config: Res<WidgetConfig>,
    source: Res<GestureSignalSource>,
    status: Res<StatusFlash>,
    controller: Res<super::controller::WidgetController>,
    handles: Option<Res<WidgetHandles>>,
    mut nodes: Query<&mut Node>,
    mut texts: Query<&mut Text>,
    mut text_colors: Query<&mut TextColor>,
) {
    let Some(handles) = handles else {
        return;
    };
    let minimized = controller.state() == WidgetState::ActiveMinimized;
    set_display(
        &mut nodes,
        handles.gesture_indicator,
        source.is_running() && !minimized,
    );

    set_text(
        &mut texts,
        handles.finger_count,
        &format!("Fingers: {}", source.last_finger_count()),
    );
    if let Ok(mut node) = nodes.get_mut(handles.progress_fill) {
        let width = Val::Percent(source.progress_ratio() * 100.0);
        if node.width != width {
            node.width = width;
        }
    }

    let (message, tint) = match status.message() {
        Some(message) => (message.to_string(), ACCENT),
        None => (config.gesture_hint(), Color::WHITE),
    };
    set_text(&mut texts, handles.status_text, &message);
    if let Ok(mut color) = text_colors.get_mut(handles.status_text) {
        if color.0 != tint {
            color.0 = tint;
        }
    }
}

/// Keeps the preview bound to the surface image, which is replaced if it ever goes missing.
pub fn sync_feed_image(
    surface: Res<RenderSurface>,
    handles: Option<Res<WidgetHandles>>,
    mut images: Query<&mut ImageNode>,
) {
    let Some(handles) = handles else {
        return;
    };
    if let Ok(mut image) = images.get_mut(handles.video) {
        if image.image != *surface.image() {
            image.image = surface.image().clone();
        }
    }
}
