//! Pointer input for the widget: button routing and panel dragging.
use bevy::{input::touch::Touches, prelude::*, window::PrimaryWindow};

use crate::{
    data::config::WidgetConfig,
    systems::widget::{
        controller::{WidgetController, WidgetState},
        panel::{
            panel_rest_position, panel_size_for_viewport, PanelHeader, WidgetControl,
            MINIMIZED_HEIGHT,
        },
        WidgetIntent,
    },
};

pub mod drag;

use drag::{DragBounds, DragSession};

pub fn route_widget_buttons(
    buttons: Query<(&Interaction, &WidgetControl), (Changed<Interaction>, With<Button>)>,
    mut intents: MessageWriter<WidgetIntent>,
) {
    for (interaction, control) in &buttons {
        if *interaction == Interaction::Pressed {
            intents.write(control.intent());
        }
    }
}

/// Moves the panel while the header is held. Touch takes precedence over the mouse.
pub fn drag_panel(
    config: Res<WidgetConfig>,
    controller: Res<WidgetController>,
    mouse_input: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    windows: Query<&Window, With<PrimaryWindow>>,
    headers: Query<&Interaction, With<PanelHeader>>,
    controls: Query<&Interaction, With<WidgetControl>>,
    mut session: ResMut<DragSession>,
) {
    let touch = touches.iter().next().map(|touch| touch.position());
    let held = touch.is_some() || mouse_input.pressed(MouseButton::Left);
    if !held {
        if session.is_active() {
            session.end_drag();
        }
        return;
    }

    let Ok(window) = windows.single() else {
        return;
    };
    let Some(pointer) = touch.or_else(|| window.cursor_position()) else {
        return;
    };

    let just_pressed = touches.any_just_pressed() || mouse_input.just_pressed(MouseButton::Left);
    if just_pressed && !session.is_active() {
        let pressed = |interaction: &Interaction| *interaction == Interaction::Pressed;
        // Header buttons sit on the handle; pressing one must not also start a drag.
        let on_handle = headers.iter().any(pressed) && !controls.iter().any(pressed);
        session.begin_drag(pointer, on_handle);
        return;
    }
    if !session.is_active() {
        return;
    }

    if config.clamp_drag_to_viewport {
        let viewport = Vec2::new(window.width(), window.height());
        let mut panel = panel_size_for_viewport(viewport.x);
        if controller.state() == WidgetState::ActiveMinimized {
            panel.y = MINIMIZED_HEIGHT;
        }
        let rest = panel_rest_position(viewport, panel);
        session.update_drag_within(pointer, DragBounds::for_viewport(viewport, panel, rest));
    } else {
        session.update_drag(pointer);
    }
}

#[cfg(test)]
mod tests {
    use bevy::input::touch::{TouchInput, TouchPhase};

    use super::*;

    fn drag_app(clamp: bool) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(WidgetConfig {
                clamp_drag_to_viewport: clamp,
                ..default()
            })
            .init_resource::<WidgetController>()
            .init_resource::<ButtonInput<MouseButton>>()
            .init_resource::<Touches>()
            .init_resource::<DragSession>()
            .add_systems(Update, drag_panel);
        app.world_mut().spawn((Window::default(), PrimaryWindow));
        app
    }

    fn move_cursor(app: &mut App, position: Vec2) {
        let mut windows = app
            .world_mut()
            .query_filtered::<&mut Window, With<PrimaryWindow>>();
        let mut window = windows.single_mut(app.world_mut()).expect("window");
        window.set_cursor_position(Some(position));
    }

    fn mouse(app: &mut App) -> Mut<'_, ButtonInput<MouseButton>> {
        app.world_mut().resource_mut::<ButtonInput<MouseButton>>()
    }

    #[test]
    fn header_press_drags_panel_until_release() {
        let mut app = drag_app(false);
        app.world_mut().spawn((PanelHeader, Interaction::Pressed));

        move_cursor(&mut app, Vec2::new(100.0, 100.0));
        mouse(&mut app).press(MouseButton::Left);
        app.update();
        assert!(app.world().resource::<DragSession>().is_active());

        mouse(&mut app).clear();
        move_cursor(&mut app, Vec2::new(130.0, 90.0));
        app.update();
        assert_eq!(
            app.world().resource::<DragSession>().offset(),
            Vec2::new(30.0, -10.0)
        );

        mouse(&mut app).release(MouseButton::Left);
        app.update();
        mouse(&mut app).clear();
        move_cursor(&mut app, Vec2::new(300.0, 300.0));
        app.update();
        let session = app.world().resource::<DragSession>();
        assert!(!session.is_active());
        assert_eq!(session.offset(), Vec2::new(30.0, -10.0));
    }

    #[test]
    fn press_away_from_header_does_not_drag() {
        let mut app = drag_app(false);
        app.world_mut().spawn((PanelHeader, Interaction::None));

        move_cursor(&mut app, Vec2::new(100.0, 100.0));
        mouse(&mut app).press(MouseButton::Left);
        app.update();
        mouse(&mut app).clear();
        move_cursor(&mut app, Vec2::new(150.0, 150.0));
        app.update();

        let session = app.world().resource::<DragSession>();
        assert!(!session.is_active());
        assert_eq!(session.offset(), Vec2::ZERO);
    }

    fn touch(app: &mut App, phase: TouchPhase, position: Vec2) {
        let window = app
            .world_mut()
            .query_filtered::<Entity, With<PrimaryWindow>>()
            .single(app.world())
            .expect("window");
        app.world_mut()
            .resource_mut::<Touches>()
            .process_touch_event(&TouchInput {
                phase,
                position,
                window,
                force: None,
                id: 0,
            });
    }

    #[test]
    fn touch_drags_panel_and_wins_over_cursor() {
        let mut app = drag_app(false);
        app.world_mut().spawn((PanelHeader, Interaction::Pressed));
        move_cursor(&mut app, Vec2::new(600.0, 600.0));

        touch(&mut app, TouchPhase::Started, Vec2::new(100.0, 100.0));
        app.update();
        let session = *app.world().resource::<DragSession>();
        assert!(session.is_active());
        assert_eq!(session.anchor(), Vec2::new(100.0, 100.0));

        app.world_mut().resource_mut::<Touches>().clear();
        touch(&mut app, TouchPhase::Moved, Vec2::new(140.0, 80.0));
        app.update();
        assert_eq!(
            app.world().resource::<DragSession>().offset(),
            Vec2::new(40.0, -20.0)
        );

        touch(&mut app, TouchPhase::Ended, Vec2::new(140.0, 80.0));
        app.update();
        let session = app.world().resource::<DragSession>();
        assert!(!session.is_active());
        assert_eq!(session.offset(), Vec2::new(40.0, -20.0));
    }

    #[test]
    fn pressing_header_button_does_not_drag() {
        let mut app = drag_app(false);
        let header = app
            .world_mut()
            .spawn((PanelHeader, Interaction::Pressed))
            .id();
        app.world_mut().spawn((
            Button,
            WidgetControl::Minimize,
            Interaction::Pressed,
            ChildOf(header),
        ));

        move_cursor(&mut app, Vec2::new(100.0, 100.0));
        mouse(&mut app).press(MouseButton::Left);
        app.update();
        mouse(&mut app).clear();
        move_cursor(&mut app, Vec2::new(160.0, 100.0));
        app.update();

        let session = app.world().resource::<DragSession>();
        assert!(!session.is_active());
        assert_eq!(session.offset(), Vec2::ZERO);
    }

    #[test]
    fn clamped_drag_stops_at_viewport_edge() {
        let mut app = drag_app(true);
        app.world_mut().spawn((PanelHeader, Interaction::Pressed));

        move_cursor(&mut app, Vec2::new(900.0, 300.0));
        mouse(&mut app).press(MouseButton::Left);
        app.update();
        mouse(&mut app).clear();
        move_cursor(&mut app, Vec2::new(1270.0, 300.0));
        app.update();

        // Default window is 1280 wide; the panel already sits 30 px from the right edge.
        let offset = app.world().resource::<DragSession>().offset();
        assert_eq!(offset.x, 30.0);
    }
}
