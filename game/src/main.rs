use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tilescene::{
    init_logging, DynamicBody, EngineConfig, EngineContext, Game, InputState, KeyCode, Scene, SceneMap,
    Sprite, Vec2,
};

const PLAYER: &str = "player";
const DEFAULT_CONFIG: &str = "game/game.toml";

#[derive(Debug, Deserialize)]
struct GameConfig {
    #[serde(default)]
    engine: EngineConfig,
    level: LevelConfig,
    player: PlayerConfig,
}

#[derive(Debug, Deserialize)]
struct LevelConfig {
    map: PathBuf,
    tiles: PathBuf,
}

#[derive(Debug, Deserialize)]
struct PlayerConfig {
    spawn: [i32; 2],
    size: [u32; 2],
    #[serde(default = "default_animation_speed")]
    animation_speed: u32,
    idle: Vec<PathBuf>,
    #[serde(default)]
    run: Vec<PathBuf>,
    run_speed: f32,
    jump_speed: f32,
}

fn default_animation_speed() -> u32 {
    tilescene::DEFAULT_ANIMATION_SPEED
}

impl GameConfig {
    fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let mut config: GameConfig =
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        config.resolve_paths(path.parent().unwrap_or(Path::new(".")));
        Ok(config)
    }

    /// Asset paths in the file are relative to the file itself.
    fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| *p = base.join(&*p);
        join(&mut self.level.map);
        join(&mut self.level.tiles);
        self.player.idle.iter_mut().for_each(join);
        self.player.run.iter_mut().for_each(join);
        if let Some(bg) = self.engine.scene.background_image.as_mut() {
            join(bg);
        }
    }
}

struct Platformer {
    run_speed: f32,
    jump_speed: f32,
    has_run_animation: bool,
}

impl Game for Platformer {
    fn update(&mut self, scene: &mut Scene, input: &InputState, _dt: f32) {
        let Some(body) = scene.entity(PLAYER).and_then(Sprite::body) else {
            return;
        };
        let Some(velocity) = scene.physics().velocity(body) else {
            return;
        };

        let mut dir = 0.0;
        if input.is_down(KeyCode::ArrowLeft) || input.is_down(KeyCode::KeyA) {
            dir -= 1.0;
        }
        if input.is_down(KeyCode::ArrowRight) || input.is_down(KeyCode::KeyD) {
            dir += 1.0;
        }
        let mut next = Vec2::new(dir * self.run_speed, velocity.y);
        let jump = input.just_pressed(KeyCode::Space)
            || input.just_pressed(KeyCode::ArrowUp)
            || input.just_pressed(KeyCode::KeyW);
        if jump && scene.physics().is_grounded(body) {
            next.y = -self.jump_speed;
        }
        scene.physics_mut().set_velocity(body, next);

        if let Some(sprite) = scene.entity_mut(PLAYER) {
            if dir != 0.0 {
                sprite.set_flipped(dir < 0.0);
            }
            let animation = if dir != 0.0 && self.has_run_animation { "run" } else { "idle" };
            if let Err(err) = sprite.play(animation) {
                log::warn!("{err}");
            }
        }
        scene.follow(PLAYER);
    }
}

fn build_scene(config: &GameConfig) -> Result<Scene> {
    let map = SceneMap::load(&config.level.map, &config.level.tiles).context("loading level")?;
    let mut scene = Scene::new(map, &config.engine).context("building scene")?;

    let p = &config.player;
    let mut player = Sprite::new(p.spawn[0], p.spawn[1], p.size[0], p.size[1], 0.0).with_body(DynamicBody {
        fixed_rotation: true,
        ..DynamicBody::default()
    });
    if !p.run.is_empty() {
        player
            .add_animation_from_files("run", &p.run, p.animation_speed)
            .context("loading run animation")?;
    }
    player
        .add_animation_from_files("idle", &p.idle, p.animation_speed)
        .context("loading idle animation")?;
    scene.add_entity(PLAYER, player)?;
    scene.follow(PLAYER);
    Ok(scene)
}

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = GameConfig::load(&path)?;
    init_logging(&config.engine.log.filter);

    let scene = build_scene(&config)?;
    let game = Platformer {
        run_speed: config.player.run_speed,
        jump_speed: config.player.jump_speed,
        has_run_animation: !config.player.run.is_empty(),
    };

    // ---- Create engine context (game owns this) ----
    let ctx = EngineContext::new(config.engine, scene, game)?;
    ctx.run()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_config_parses_and_resolves_paths() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("game.toml");
        let config = GameConfig::load(&path).unwrap();
        assert!(config.level.map.ends_with("assets/level1.json"));
        assert!(config.level.map.exists());
        assert!(config.player.idle.iter().all(|p| p.exists()));
    }

    #[test]
    fn bundled_level_builds_a_scene() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("game.toml");
        let config = GameConfig::load(&path).unwrap();
        let scene = build_scene(&config).unwrap();
        assert!(scene.entity(PLAYER).is_some());
        assert!(!scene.tile_bodies().is_empty());
    }
}
