use bevy::{log::LogPlugin, prelude::*};

use gesture_camera_widget::{startup::StartupPlugin, CameraWidgetPlugin, WidgetConfig};

fn main() {
    let config = WidgetConfig::from_env();

    let mut app = App::new();
    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Camera Widget".into(),
                    ..default()
                }),
                ..default()
            })
            .set(LogPlugin {
                filter: "wgpu=error,naga=warn,gesture_camera_widget=debug".into(),
                ..default()
            }),
    );

    let config = match config {
        Ok(config) => config,
        Err(error) => {
            warn!("Ignoring invalid widget config: {}", error);
            WidgetConfig::default()
        }
    };

    app.add_plugins((CameraWidgetPlugin { config }, StartupPlugin))
        .run();
}
