//! Tile-map scenes with physics-driven sprites.
//!
//! A [`SceneMap`] is loaded from a Tiled JSON export and a directory of tile
//! images. A [`Scene`] turns every tile into a static rapier body, holds the
//! [`Sprite`]s moving over it, scrolls with a [`Camera`], and draws into a
//! CPU [`Frame`] that [`EngineContext`] presents through wgpu.

pub mod camera;
pub mod config;
mod context;
pub mod error;
pub mod input;
pub mod map;
pub mod physics;
pub mod render;
pub mod scene;
pub mod sprite;
pub mod time;

pub use camera::Camera;
pub use config::EngineConfig;
pub use context::{init_logging, EngineContext, Game};
pub use error::{EngineError, Result};
pub use input::InputState;
pub use map::{SceneMap, TileMapFile};
pub use physics::{DynamicBody, PhysicsWorld, RigidBodyHandle};
pub use render::{Frame, ScreenRect, TextFont};
pub use scene::Scene;
pub use sprite::{Sprite, DEFAULT_ANIMATION_SPEED};

pub use glam::Vec2;
pub use winit::keyboard::KeyCode;
