use glam::Vec2;

/// Scroll offset applied to everything drawn in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera {
    offset: Vec2,
}

impl Camera {
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Offset in whole pixels, rounded toward negative infinity.
    pub fn pixel_offset(&self) -> (i32, i32) {
        (self.offset.x.floor() as i32, self.offset.y.floor() as i32)
    }

    /// Centres the view on `target` while keeping it inside `world`.
    pub fn follow(&mut self, target: Vec2, viewport: Vec2, world: Vec2) {
        self.offset = Vec2::new(
            scroll_axis(target.x, viewport.x, world.x),
            scroll_axis(target.y, viewport.y, world.y),
        );
    }
}

/// `target - viewport / 2`, clamped to `[0, world - viewport]`. A world smaller
/// than the viewport never scrolls.
pub fn scroll_axis(target: f32, viewport: f32, world: f32) -> f32 {
    let max = (world - viewport).max(0.0);
    (target - viewport / 2.0).clamp(0.0, max)
}
