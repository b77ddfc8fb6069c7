use bevy::prelude::*;

/// Relative drag state for the preview panel. The offset survives between
/// drags; only the anchor is recomputed when a new drag begins.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq)]
pub struct DragSession {
    anchor: Vec2,
    offset: Vec2,
    active: bool,
}

impl DragSession {
    /// Starts a drag when the press landed on the handle. Returns whether a drag began.
    pub fn begin_drag(&mut self, pointer: Vec2, on_handle: bool) -> bool {
        if !on_handle {
            return false;
        }
        self.anchor = pointer - self.offset;
        self.active = true;
        true
    }

    pub fn update_drag(&mut self, pointer: Vec2) -> Option<Vec2> {
        if !self.active {
            return None;
        }
        self.offset = pointer - self.anchor;
        Some(self.offset)
    }

    pub fn update_drag_within(&mut self, pointer: Vec2, bounds: DragBounds) -> Option<Vec2> {
        self.update_drag(pointer)?;
        self.offset = bounds.clamp(self.offset);
        Some(self.offset)
    }

    pub fn end_drag(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }
}

/// Allowed offset range keeping the panel inside the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl DragBounds {
    /// `rest` is the panel's top-left corner at zero offset, in window coordinates.
    pub fn for_viewport(viewport: Vec2, panel: Vec2, rest: Vec2) -> Self {
        Self {
            min: -rest,
            max: viewport - panel - rest,
        }
    }

    pub fn clamp(self, offset: Vec2) -> Vec2 {
        let x = if self.min.x <= self.max.x {
            offset.x.clamp(self.min.x, self.max.x)
        } else {
            (self.min.x + self.max.x) * 0.5
        };
        let y = if self.min.y <= self.max.y {
            offset.y.clamp(self.min.y, self.max.y)
        } else {
            (self.min.y + self.max.y) * 0.5
        };
        Vec2::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_outside_handle_does_not_drag() {
        let mut session = DragSession::default();
        assert!(!session.begin_drag(Vec2::new(5.0, 5.0), false));
        assert_eq!(session.update_drag(Vec2::new(50.0, 50.0)), None);
        assert_eq!(session.offset(), Vec2::ZERO);
    }

    #[test]
    fn offset_follows_pointer_relative_to_anchor() {
        let mut session = DragSession::default();
        session.begin_drag(Vec2::new(100.0, 40.0), true);
        assert_eq!(
            session.update_drag(Vec2::new(130.0, 20.0)),
            Some(Vec2::new(30.0, -20.0))
        );
        // Identical input yields the identical offset.
        assert_eq!(
            session.update_drag(Vec2::new(130.0, 20.0)),
            Some(Vec2::new(30.0, -20.0))
        );
    }

    #[test]
    fn offset_accumulates_across_drags() {
        let mut session = DragSession::default();
        session.begin_drag(Vec2::new(0.0, 0.0), true);
        session.update_drag(Vec2::new(10.0, 10.0));
        session.end_drag();
        assert!(!session.is_active());
        assert_eq!(session.offset(), Vec2::new(10.0, 10.0));

        session.begin_drag(Vec2::new(200.0, 200.0), true);
        assert_eq!(session.anchor(), Vec2::new(190.0, 190.0));
        assert_eq!(
            session.update_drag(Vec2::new(205.0, 195.0)),
            Some(Vec2::new(15.0, 5.0))
        );
    }

    #[test]
    fn end_then_begin_at_same_point_reproduces_anchor() {
        let mut session = DragSession::default();
        session.begin_drag(Vec2::new(12.0, 34.0), true);
        let anchor = session.anchor();
        session.update_drag(Vec2::new(12.0, 34.0));
        session.end_drag();
        session.begin_drag(Vec2::new(12.0, 34.0), true);
        assert_eq!(session.anchor(), anchor);
    }

    #[test]
    fn moves_after_release_are_ignored() {
        let mut session = DragSession::default();
        session.begin_drag(Vec2::ZERO, true);
        session.update_drag(Vec2::new(3.0, 4.0));
        session.end_drag();
        assert_eq!(session.update_drag(Vec2::new(90.0, 90.0)), None);
        assert_eq!(session.offset(), Vec2::new(3.0, 4.0));
    }

    #[test]
    fn bounds_keep_panel_on_screen() {
        let bounds = DragBounds::for_viewport(
            Vec2::new(800.0, 600.0),
            Vec2::new(320.0, 240.0),
            Vec2::new(450.0, 240.0),
        );
        assert_eq!(bounds.min, Vec2::new(-450.0, -240.0));
        assert_eq!(bounds.max, Vec2::new(30.0, 120.0));

        let mut session = DragSession::default();
        session.begin_drag(Vec2::ZERO, true);
        assert_eq!(
            session.update_drag_within(Vec2::new(-1000.0, 500.0), bounds),
            Some(Vec2::new(-450.0, 120.0))
        );
    }

    #[test]
    fn inverted_bounds_center_the_offset() {
        let bounds = DragBounds {
            min: Vec2::new(10.0, 0.0),
            max: Vec2::new(-10.0, 4.0),
        };
        assert_eq!(bounds.clamp(Vec2::new(99.0, 99.0)), Vec2::new(0.0, 4.0));
    }
}
