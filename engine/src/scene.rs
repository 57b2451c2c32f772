//! Composites a tile map, its collision boxes and the sprites moving over it.

use glam::Vec2;
use image::{Rgba, RgbaImage};
use winit::keyboard::KeyCode;

use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::input::InputState;
use crate::map::SceneMap;
use crate::physics::{PhysicsWorld, RigidBodyHandle};
use crate::render::{Color, Frame, ScreenRect, TextFont, DEBUG_RED, DEBUG_TEXT};
use crate::sprite::Sprite;

/// Toggles the collision/debug overlay.
pub const DEBUG_KEY: KeyCode = KeyCode::KeyP;

/// Pixel height of overlay text.
const DEBUG_TEXT_SIZE: f32 = 20.0;

struct Entity {
    id: String,
    sprite: Sprite,
}

pub struct Scene {
    map: SceneMap,
    tile_bodies: Vec<RigidBodyHandle>,
    physics: PhysicsWorld,
    camera: Camera,
    viewport: Vec2,
    background: Option<RgbaImage>,
    background_color: Color,
    entities: Vec<Entity>,
    debug: bool,
    font: TextFont,
}

impl Scene {
    pub fn new(map: SceneMap, config: &EngineConfig) -> Result<Self> {
        let background = match &config.scene.background_image {
            Some(path) => Some(
                image::open(path)
                    .map(|img| img.into_rgba8())
                    .map_err(|e| EngineError::image(path, e))?,
            ),
            None => None,
        };
        let [r, g, b] = config.scene.background_color;

        let mut physics = PhysicsWorld::new(&config.physics);
        let tile_bodies = map
            .colliders()
            .map(|c| physics.add_static_box(c.center, c.size))
            .collect();

        Ok(Self {
            map,
            tile_bodies,
            physics,
            camera: Camera::default(),
            viewport: Vec2::new(config.window.width as f32, config.window.height as f32),
            background,
            background_color: Rgba([r, g, b, 255]),
            entities: Vec::new(),
            debug: false,
            font: TextFont::builtin(DEBUG_TEXT_SIZE)?,
        })
    }

    pub fn map(&self) -> &SceneMap {
        &self.map
    }

    pub fn tile_bodies(&self) -> &[RigidBodyHandle] {
        &self.tile_bodies
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn offset(&self) -> Vec2 {
        self.camera.offset()
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width as f32, height as f32);
    }

    /// Gives the sprite its physics body and appends it to the draw list.
    pub fn add_entity(&mut self, id: impl Into<String>, mut sprite: Sprite) -> Result<RigidBodyHandle> {
        let id = id.into();
        if self.entities.iter().any(|e| e.id == id) {
            return Err(EngineError::DuplicateEntity(id));
        }
        let handle = sprite.attach(&mut self.physics);
        log::debug!("added entity `{id}`");
        self.entities.push(Entity { id, sprite });
        Ok(handle)
    }

    pub fn remove_entity(&mut self, id: &str) -> Option<Sprite> {
        let index = self.entities.iter().position(|e| e.id == id)?;
        let entity = self.entities.remove(index);
        if let Some(handle) = entity.sprite.body() {
            self.physics.remove(handle);
        }
        Some(entity.sprite)
    }

    pub fn entity(&self, id: &str) -> Option<&Sprite> {
        self.entities.iter().find(|e| e.id == id).map(|e| &e.sprite)
    }

    pub fn entity_mut(&mut self, id: &str) -> Option<&mut Sprite> {
        self.entities
            .iter_mut()
            .find(|e| e.id == id)
            .map(|e| &mut e.sprite)
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.id.as_str())
    }

    /// Moves the camera so `target` (world pixels) sits mid-viewport where the
    /// map allows.
    pub fn scroll(&mut self, target: Vec2) {
        self.camera.follow(target, self.viewport, self.map.size());
    }

    /// Scrolls to the entity's last synced position. Returns false for an
    /// unknown id.
    pub fn follow(&mut self, id: &str) -> bool {
        match self.entity(id).map(Sprite::position) {
            Some(target) => {
                self.scroll(target);
                true
            }
            None => false,
        }
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Advances physics and handles the debug toggle.
    pub fn update(&mut self, input: &InputState, dt: f32) {
        if input.just_pressed(DEBUG_KEY) {
            self.debug = !self.debug;
            log::info!("debug overlay {}", if self.debug { "on" } else { "off" });
        }
        self.physics.advance(dt);
        for entity in &mut self.entities {
            entity.sprite.sync_body(&self.physics);
        }
    }

    /// Composites one frame. With the overlay on, `fps` is printed in the
    /// top-left corner.
    pub fn draw(&mut self, frame: &mut Frame, fps: f32) {
        let (ox, oy) = self.camera.pixel_offset();
        frame.fill(self.background_color);
        if let Some(background) = &self.background {
            frame.blit(background, -ox, -oy);
        }

        let view = frame.bounds();
        let (placed_tiles, tiles) = self.map.placed_with_tiles();
        for placed in placed_tiles {
            placed
                .screen_rect
                .set_top_left(placed.position.x as i32 - ox, placed.position.y as i32 - oy);
            if placed.screen_rect.overlaps(&view) {
                frame.blit(&tiles[placed.tile], placed.screen_rect.x, placed.screen_rect.y);
            }
        }

        for entity in &mut self.entities {
            entity.sprite.sync_body(&self.physics);
            entity.sprite.draw(frame, (ox, oy));
            if self.debug {
                entity.sprite.debug(frame, &self.font);
            }
        }

        if self.debug {
            frame.text(&self.font, &fps_text(fps), 0, 0, DEBUG_TEXT);
            // Outlines where the static bodies actually are.
            for (placed, &handle) in self.map.placed().iter().zip(&self.tile_bodies) {
                let Some(center) = self.physics.position(handle) else {
                    continue;
                };
                let half = placed.collider.size / 2.0;
                let rect = ScreenRect::new(
                    (center.x - half.x) as i32 - ox,
                    (center.y - half.y) as i32 - oy,
                    placed.collider.size.x as u32,
                    placed.collider.size.y as u32,
                );
                if rect.overlaps(&view) {
                    frame.outline(rect, DEBUG_RED);
                }
            }
        }
    }
}

fn fps_text(fps: f32) -> String {
    format!("FPS: {}", fps.round())
}
