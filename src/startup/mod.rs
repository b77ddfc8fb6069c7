use bevy::prelude::*;

use crate::systems::widget::WidgetSystems;

pub mod shortcuts;

/// Host scene for the widget: a UI camera plus keyboard shortcuts.
pub struct StartupPlugin;

impl Plugin for StartupPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_camera).add_systems(
            Update,
            (shortcuts::close_on_esc, shortcuts::widget_hotkeys).before(WidgetSystems::Lifecycle),
        );
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}
