//! Animated sprites driven by a dynamic physics body.

use std::collections::HashMap;
use std::path::Path;

use glam::Vec2;
use image::{imageops, RgbaImage};

use crate::error::{EngineError, Result};
use crate::physics::{DynamicBody, PhysicsWorld, RigidBodyHandle};
use crate::render::{Frame, ScreenRect, TextFont, DEBUG_RED, DEBUG_TEXT};

/// Draws each animation frame is held for unless told otherwise.
pub const DEFAULT_ANIMATION_SPEED: u32 = 6;

#[derive(Debug, Clone)]
struct Animation {
    frames: Vec<RgbaImage>,
    /// Draws per frame.
    speed: u32,
}

impl Animation {
    /// Draws in one full cycle. Saturates instead of overflowing for huge
    /// hold counts.
    fn ticks(&self) -> u64 {
        u64::try_from(self.frames.len())
            .unwrap_or(u64::MAX)
            .saturating_mul(u64::from(self.speed))
    }

    /// Frame shown at `tick`, which must be below [`Animation::ticks`].
    fn frame_at(&self, tick: u64) -> usize {
        // Below `frames.len()` because `tick < frames.len() * speed`.
        (tick / u64::from(self.speed)) as usize
    }
}

#[derive(Debug, Clone)]
pub struct Sprite {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    /// Degrees, counter-clockwise.
    angle: f32,
    origin: Vec2,
    flipped: bool,
    mirrored: bool,
    animations: HashMap<String, Animation>,
    current_animation: Option<String>,
    /// Counts draws, wraps at `frames * speed`.
    tick: u64,
    render: Option<RgbaImage>,
    rect: ScreenRect,
    body_props: DynamicBody,
    body: Option<RigidBodyHandle>,
    velocity: Vec2,
}

impl Sprite {
    /// `(x, y)` is where the body's centre starts. The origin defaults to half
    /// the size so the image is drawn centred on the body.
    pub fn new(x: i32, y: i32, width: u32, height: u32, angle: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            angle,
            origin: Vec2::new(width as f32 / 2.0, height as f32 / 2.0),
            flipped: false,
            mirrored: false,
            animations: HashMap::new(),
            current_animation: None,
            tick: 0,
            render: None,
            rect: ScreenRect::new(x, y, width, height),
            body_props: DynamicBody::default(),
            body: None,
            velocity: Vec2::ZERO,
        }
    }

    pub fn with_body(mut self, props: DynamicBody) -> Self {
        self.body_props = props;
        self
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn rect(&self) -> ScreenRect {
        self.rect
    }

    pub fn body(&self) -> Option<RigidBodyHandle> {
        self.body
    }

    pub fn render(&self) -> Option<&RgbaImage> {
        self.render.as_ref()
    }

    pub fn set_angle(&mut self, degrees: f32) {
        self.angle = degrees;
    }

    pub fn set_flipped(&mut self, flipped: bool) {
        self.flipped = flipped;
    }

    pub fn set_mirrored(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }

    pub fn set_origin(&mut self, origin: Vec2) {
        self.origin = origin;
    }

    /// Flips, scales to the sprite size, rotates and keeps the result as the
    /// image drawn next.
    pub fn load(&mut self, image: &RgbaImage) {
        let mut img = if self.flipped {
            imageops::flip_horizontal(image)
        } else {
            image.clone()
        };
        if self.mirrored {
            imageops::flip_vertical_in_place(&mut img);
        }
        if img.dimensions() != (self.width, self.height) {
            img = imageops::resize(&img, self.width, self.height, imageops::FilterType::Nearest);
        }
        self.render = Some(rotate(&img, self.angle));
    }

    /// Adds `frames` under `name`, each shown for `speed` draws, and starts
    /// playing it from the first frame.
    pub fn add_animation(&mut self, name: impl Into<String>, frames: Vec<RgbaImage>, speed: u32) {
        let name = name.into();
        let animation = Animation {
            frames,
            speed: speed.max(1),
        };
        if let Some(first) = animation.frames.first() {
            self.load(first);
        }
        self.animations.insert(name.clone(), animation);
        self.current_animation = Some(name);
        self.tick = 0;
    }

    pub fn add_animation_from_files<P: AsRef<Path>>(
        &mut self,
        name: impl Into<String>,
        paths: &[P],
        speed: u32,
    ) -> Result<()> {
        let frames = paths
            .iter()
            .map(|p| {
                let p = p.as_ref();
                image::open(p)
                    .map(|img| img.into_rgba8())
                    .map_err(|e| EngineError::image(p, e))
            })
            .collect::<Result<Vec<_>>>()?;
        self.add_animation(name, frames, speed);
        Ok(())
    }

    /// Switches to another animation, restarting it unless it is already playing.
    pub fn play(&mut self, name: &str) -> Result<()> {
        if !self.animations.contains_key(name) {
            return Err(EngineError::UnknownAnimation(name.to_owned()));
        }
        if self.current_animation.as_deref() != Some(name) {
            self.current_animation = Some(name.to_owned());
            self.tick = 0;
        }
        Ok(())
    }

    /// Freezes on the last drawn image.
    pub fn stop(&mut self) {
        self.current_animation = None;
    }

    pub fn current_animation(&self) -> Option<&str> {
        self.current_animation.as_deref()
    }

    /// Index of the animation frame the next draw shows.
    pub fn current_frame(&self) -> Option<usize> {
        let animation = self.animations.get(self.current_animation.as_ref()?)?;
        if animation.frames.is_empty() {
            return None;
        }
        let tick = if self.tick >= animation.ticks() { 0 } else { self.tick };
        Some(animation.frame_at(tick))
    }

    pub(crate) fn attach(&mut self, physics: &mut PhysicsWorld) -> RigidBodyHandle {
        if let Some(handle) = self.body.filter(|&h| physics.contains(h)) {
            return handle;
        }
        let handle = physics.add_dynamic_box(self.position(), self.size(), self.body_props);
        self.body = Some(handle);
        handle
    }

    /// Pulls the body position, truncated to whole pixels.
    pub fn sync_body(&mut self, physics: &PhysicsWorld) {
        let Some(handle) = self.body else {
            return;
        };
        if let Some(pos) = physics.position(handle) {
            self.x = pos.x as i32;
            self.y = pos.y as i32;
        }
        self.velocity = physics.velocity(handle).unwrap_or_default();
    }

    fn advance_animation(&mut self) {
        let Some(name) = &self.current_animation else {
            return;
        };
        let Some(animation) = self.animations.get(name) else {
            return;
        };
        if animation.frames.is_empty() {
            return;
        }
        if self.tick >= animation.ticks() {
            self.tick = 0;
        }
        let frame = animation.frames[animation.frame_at(self.tick)].clone();
        self.tick += 1;
        self.load(&frame);
    }

    pub fn draw(&mut self, frame: &mut Frame, offset: (i32, i32)) {
        self.advance_animation();
        self.rect.set_top_left(
            self.x - offset.0 - self.origin.x as i32,
            self.y - offset.1 - self.origin.y as i32,
        );
        if let Some(render) = &self.render {
            // Rotation grows the canvas around the centre of the unrotated box.
            let grow_x = (i64::from(render.width()) - i64::from(self.width)) / 2;
            let grow_y = (i64::from(render.height()) - i64::from(self.height)) / 2;
            frame.blit(
                render,
                self.rect.x.saturating_sub(grow_x as i32),
                self.rect.y.saturating_sub(grow_y as i32),
            );
        }
    }

    /// Outlines the sprite box and writes [`Sprite::debug_text`] 50px above it.
    pub fn debug(&self, frame: &mut Frame, font: &TextFont) {
        frame.outline(self.rect, DEBUG_RED);
        frame.text(
            font,
            &self.debug_text(),
            self.rect.x,
            self.rect.y.saturating_sub(50),
            DEBUG_TEXT,
        );
    }

    pub fn debug_text(&self) -> String {
        format!(
            "X: {} Y: {} Angle: {} Velocity: {:?} {:?}",
            self.x,
            self.y,
            self.angle,
            self.velocity.x,
            (self.velocity.y * 1e5).round() / 1e5
        )
    }
}

/// Rotates counter-clockwise by `degrees`, growing the canvas to fit.
fn rotate(img: &RgbaImage, degrees: f32) -> RgbaImage {
    let turns = degrees.rem_euclid(360.0);
    match turns {
        t if t == 0.0 => img.clone(),
        t if t == 90.0 => imageops::rotate270(img),
        t if t == 180.0 => imageops::rotate180(img),
        t if t == 270.0 => imageops::rotate90(img),
        t => rotate_nearest(img, t.to_radians()),
    }
}

fn rotate_nearest(img: &RgbaImage, radians: f32) -> RgbaImage {
    let (w, h) = (img.width() as f32, img.height() as f32);
    let (sin, cos) = radians.sin_cos();
    let out_w = (w * cos.abs() + h * sin.abs()).ceil() as u32;
    let out_h = (w * sin.abs() + h * cos.abs()).ceil() as u32;
    let src_center = Vec2::new(w, h) / 2.0;
    let dst_center = Vec2::new(out_w as f32, out_h as f32) / 2.0;

    // Screen y points down, so a counter-clockwise turn on screen maps a
    // destination pixel back to the source with the plain rotation matrix.
    RgbaImage::from_fn(out_w, out_h, |x, y| {
        let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - dst_center;
        let s = Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos) + src_center;
        if s.x >= 0.0 && s.y >= 0.0 && s.x < w && s.y < h {
            *img.get_pixel(s.x as u32, s.y as u32)
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use image::Rgba;

    fn solid(color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba(color))
    }

    #[test]
    fn frame_index_wraps_after_every_frame_was_held() {
        let mut sprite = Sprite::new(0, 0, 4, 4, 0.0);
        sprite.add_animation("walk", vec![solid([1, 0, 0, 255]), solid([2, 0, 0, 255])], 3);
        let mut frame = Frame::new(8, 8);

        let mut seen = Vec::new();
        for _ in 0..8 {
            seen.push(sprite.current_frame().unwrap());
            sprite.draw(&mut frame, (0, 0));
        }
        assert_eq!(seen, vec![0, 0, 0, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn draw_shows_the_current_frame() {
        let mut sprite = Sprite::new(4, 4, 4, 4, 0.0);
        sprite.add_animation("blink", vec![solid([1, 0, 0, 255]), solid([2, 0, 0, 255])], 1);
        let mut frame = Frame::new(8, 8);

        sprite.draw(&mut frame, (0, 0));
        assert_eq!(frame.pixel(3, 3), Rgba([1, 0, 0, 255]));
        sprite.draw(&mut frame, (0, 0));
        assert_eq!(frame.pixel(3, 3), Rgba([2, 0, 0, 255]));
    }

    #[test]
    fn rect_accounts_for_offset_and_origin() {
        let mut sprite = Sprite::new(100, 50, 20, 10, 0.0);
        let mut frame = Frame::new(8, 8);
        sprite.draw(&mut frame, (30, 5));
        assert_eq!(sprite.rect(), ScreenRect::new(60, 40, 20, 10));

        sprite.set_origin(Vec2::ZERO);
        sprite.draw(&mut frame, (30, 5));
        assert_eq!(sprite.rect(), ScreenRect::new(70, 45, 20, 10));
    }

    #[test]
    fn load_scales_to_sprite_size() {
        let mut sprite = Sprite::new(0, 0, 16, 8, 0.0);
        sprite.load(&solid([9, 9, 9, 255]));
        assert_eq!(sprite.render().unwrap().dimensions(), (16, 8));
    }

    #[test]
    fn load_flips_horizontally() {
        let mut src = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        src.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        let mut sprite = Sprite::new(0, 0, 2, 1, 0.0);
        sprite.set_flipped(true);
        sprite.load(&src);
        assert_eq!(sprite.render().unwrap().get_pixel(1, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let mut sprite = Sprite::new(0, 0, 4, 2, 90.0);
        sprite.load(&RgbaImage::from_pixel(4, 2, Rgba([5, 5, 5, 255])));
        assert_eq!(sprite.render().unwrap().dimensions(), (2, 4));
    }

    #[test]
    fn counter_clockwise_quarter_turn_moves_top_right_to_top_left() {
        let mut src = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        src.put_pixel(1, 0, Rgba([255, 0, 0, 255]));
        let out = rotate(&src, 90.0);
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn arbitrary_angle_expands_bounds() {
        let out = rotate(&RgbaImage::from_pixel(10, 10, Rgba([1, 1, 1, 255])), 45.0);
        assert_eq!(out.dimensions(), (15, 15));
        assert_eq!(out.get_pixel(7, 7), &Rgba([1, 1, 1, 255]));
        assert_eq!(out.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn play_rejects_unknown_animation() {
        let mut sprite = Sprite::new(0, 0, 4, 4, 0.0);
        sprite.add_animation("idle", vec![solid([1, 1, 1, 255])], 6);
        assert!(matches!(
            sprite.play("jump"),
            Err(EngineError::UnknownAnimation(name)) if name == "jump"
        ));
        assert_eq!(sprite.current_animation(), Some("idle"));
    }

    #[test]
    fn play_restarts_a_different_animation() {
        let mut sprite = Sprite::new(0, 0, 4, 4, 0.0);
        sprite.add_animation("idle", vec![solid([1, 1, 1, 255]); 2], 1);
        sprite.add_animation("run", vec![solid([2, 2, 2, 255]); 3], 1);
        let mut frame = Frame::new(4, 4);
        sprite.draw(&mut frame, (0, 0));
        assert_eq!(sprite.current_frame(), Some(1));

        sprite.play("idle").unwrap();
        assert_eq!(sprite.current_frame(), Some(0));
    }

    #[test]
    fn stop_freezes_the_render() {
        let mut sprite = Sprite::new(2, 2, 4, 4, 0.0);
        sprite.add_animation("blink", vec![solid([1, 0, 0, 255]), solid([2, 0, 0, 255])], 1);
        let mut frame = Frame::new(4, 4);
        sprite.draw(&mut frame, (0, 0));
        sprite.stop();
        sprite.draw(&mut frame, (0, 0));
        assert_eq!(frame.pixel(0, 0), Rgba([1, 0, 0, 255]));
        assert_eq!(sprite.current_frame(), None);
    }

    #[test]
    fn sync_body_truncates_position() {
        let mut physics = PhysicsWorld::new(&PhysicsConfig::default());
        let mut sprite = Sprite::new(10, 20, 8, 8, 0.0);
        let handle = sprite.attach(&mut physics);
        physics.set_position(handle, Vec2::new(12.9, 30.4));

        sprite.sync_body(&physics);

        assert_eq!(sprite.position(), Vec2::new(12.0, 30.0));
        assert_eq!(sprite.attach(&mut physics), handle);
        assert_eq!(physics.body_count(), 1);
    }

    #[test]
    fn debug_text_reports_state() {
        let sprite = Sprite::new(3, 4, 8, 8, 15.0);
        assert_eq!(sprite.debug_text(), "X: 3 Y: 4 Angle: 15 Velocity: 0.0 0.0");
    }

    #[test]
    fn debug_text_shows_synced_velocity_as_floats() {
        let mut physics = PhysicsWorld::new(&PhysicsConfig::default());
        let mut sprite = Sprite::new(0, 0, 8, 8, 0.0);
        let handle = sprite.attach(&mut physics);
        physics.set_velocity(handle, Vec2::new(120.0, -2.123456789));

        sprite.sync_body(&physics);

        assert_eq!(sprite.debug_text(), "X: 0 Y: 0 Angle: 0 Velocity: 120.0 -2.12346");
    }

    #[test]
    fn huge_hold_count_does_not_overflow() {
        let mut sprite = Sprite::new(0, 0, 4, 4, 0.0);
        sprite.add_animation("slow", vec![solid([1, 0, 0, 255]), solid([2, 0, 0, 255])], u32::MAX);
        let mut frame = Frame::new(4, 4);

        for _ in 0..3 {
            sprite.draw(&mut frame, (0, 0));
        }

        assert_eq!(sprite.current_frame(), Some(0));
        assert_eq!(frame.pixel(0, 0), Rgba([1, 0, 0, 255]));
    }

    #[test]
    fn load_flips_vertically() {
        let mut src = RgbaImage::from_pixel(1, 2, Rgba([0, 0, 0, 255]));
        src.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        let mut sprite = Sprite::new(0, 0, 1, 2, 0.0);
        sprite.set_mirrored(true);
        sprite.load(&src);
        let render = sprite.render().unwrap();
        assert_eq!(render.get_pixel(0, 1), &Rgba([255, 255, 255, 255]));
        assert_eq!(render.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn animation_frames_load_from_files() {
        let dir = std::env::temp_dir().join(format!("tilescene-sprite-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let paths = [dir.join("walk_0.png"), dir.join("walk_1.png")];
        solid([10, 0, 0, 255]).save(&paths[0]).unwrap();
        solid([20, 0, 0, 255]).save(&paths[1]).unwrap();

        let mut sprite = Sprite::new(2, 2, 4, 4, 0.0);
        sprite.add_animation_from_files("walk", &paths, 1).unwrap();
        let mut frame = Frame::new(4, 4);
        sprite.draw(&mut frame, (0, 0));
        assert_eq!(frame.pixel(0, 0), Rgba([10, 0, 0, 255]));
        sprite.draw(&mut frame, (0, 0));
        assert_eq!(frame.pixel(0, 0), Rgba([20, 0, 0, 255]));

        let missing = [dir.join("walk_0.png"), dir.join("walk_9.png")];
        let err = sprite.add_animation_from_files("broken", &missing, 1).unwrap_err();
        assert!(matches!(err, EngineError::Image { ref path, .. } if path.ends_with("walk_9.png")));
        assert!(sprite.play("broken").is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rotated_render_stays_centred_on_the_body() {
        let mut sprite = Sprite::new(20, 20, 10, 10, 45.0);
        sprite.add_animation("spin", vec![RgbaImage::from_pixel(10, 10, Rgba([7, 7, 7, 255]))], 1);
        let mut frame = Frame::new(40, 40);

        sprite.draw(&mut frame, (0, 0));

        let opaque: Vec<u32> = (0..40).filter(|&x| frame.pixel(x, 20)[3] > 0).collect();
        let (left, right) = (opaque[0], opaque[opaque.len() - 1]);
        assert!(
            ((left + right) as i32 / 2 - 20).abs() <= 1,
            "row 20 covered from {left} to {right}"
        );
        assert_eq!(frame.pixel(20, 20), Rgba([7, 7, 7, 255]));
        assert_eq!(sprite.rect(), ScreenRect::new(15, 15, 10, 10));
    }

    #[test]
    fn debug_draws_outline_and_text_above_the_sprite() {
        let font = TextFont::builtin(20.0).unwrap();
        let mut sprite = Sprite::new(40, 80, 16, 16, 0.0);
        let mut frame = Frame::new(320, 120);
        sprite.draw(&mut frame, (0, 0));

        sprite.debug(&mut frame, &font);

        assert_eq!(frame.pixel(32, 72), DEBUG_RED);
        let lit = (22..47)
            .flat_map(|y| (32..320).map(move |x| (x, y)))
            .any(|(x, y)| frame.pixel(x, y)[3] > 200);
        assert!(lit, "no text drawn above the sprite");
    }
}
