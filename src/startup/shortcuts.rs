use bevy::app::AppExit;
use bevy::prelude::*;

use crate::systems::widget::WidgetIntent;

pub fn close_on_esc(
    keyboard_input: Res<ButtonInput<KeyCode>>,
    mut app_exit: MessageWriter<AppExit>,
) {
    if keyboard_input.just_pressed(KeyCode::Escape) {
        app_exit.write(AppExit::Success);
    }
}

/// `C` toggles the widget, `M` minimizes it.
pub fn widget_hotkeys(
    keyboard_input: Res<ButtonInput<KeyCode>>,
    mut intents: MessageWriter<WidgetIntent>,
) {
    if keyboard_input.just_pressed(KeyCode::KeyC) {
        intents.write(WidgetIntent::Toggle);
    }
    if keyboard_input.just_pressed(KeyCode::KeyM) {
        intents.write(WidgetIntent::ToggleMinimize);
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::message::Messages;

    use super::*;

    #[test]
    fn c_key_toggles_widget() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<ButtonInput<KeyCode>>()
            .add_message::<WidgetIntent>()
            .add_systems(Update, widget_hotkeys);

        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::KeyC);
        app.update();

        let messages = app.world().resource::<Messages<WidgetIntent>>();
        let mut cursor = messages.get_cursor();
        let sent: Vec<WidgetIntent> = cursor.read(messages).copied().collect();
        assert_eq!(sent, vec![WidgetIntent::Toggle]);
    }
}
