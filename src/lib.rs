pub mod data;
pub mod startup;
pub mod systems;

pub use data::config::WidgetConfig;
pub use systems::widget::{CameraWidgetPlugin, WidgetIntent, WidgetSystems};
