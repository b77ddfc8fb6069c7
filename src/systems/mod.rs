pub mod external;
pub mod gesture;
pub mod interaction;
pub mod media;
pub mod widget;
