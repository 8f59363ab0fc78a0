//! Enemy spawning, pursuit, kinetic damage and retirement

use std::collections::HashMap;
use std::path::PathBuf;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use thiserror::Error;

use super::entity::EntityTable;
use super::state::{BodyRef, Enemy, EnemyId, EnemyLife, SimCommand, Sword, SwordId};
use super::timers::Timers;
use crate::config::{CombatConfig, EnemyConfig};
use crate::consts::*;
use crate::{horizontal, look_rotation};

/// Errors raised while resolving an enemy template
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unknown enemy asset `{0}`")]
    NotFound(String),
    #[error("failed to read enemy asset `{name}`: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid enemy asset `{name}`: {source}")]
    Invalid {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of enemy templates
pub trait EnemyAssets {
    fn load_enemy(&mut self, name: &str) -> Result<EnemyConfig, AssetError>;
}

/// Built-in presets (`default`, `small`, `large`, `boss`)
#[derive(Debug, Clone, Copy, Default)]
pub struct PresetAssets;

impl EnemyAssets for PresetAssets {
    fn load_enemy(&mut self, name: &str) -> Result<EnemyConfig, AssetError> {
        EnemyConfig::preset(name).ok_or_else(|| AssetError::NotFound(name.to_string()))
    }
}

/// Templates read from `<root>/<name>.json`
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    pub root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl EnemyAssets for DirectoryAssets {
    fn load_enemy(&mut self, name: &str) -> Result<EnemyConfig, AssetError> {
        let path = self.root.join(format!("{name}.json"));
        let json = std::fs::read_to_string(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(name.to_string()),
            _ => AssetError::Io {
                name: name.to_string(),
                source,
            },
        })?;
        serde_json::from_str(&json).map_err(|source| AssetError::Invalid {
            name: name.to_string(),
            source,
        })
    }
}

impl EnemyAssets for HashMap<String, EnemyConfig> {
    fn load_enemy(&mut self, name: &str) -> Result<EnemyConfig, AssetError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(name.to_string()))
    }
}

/// Kinetic-energy damage: `0.5 · m · v² · scale`
#[inline]
pub fn kinetic_damage(mass: f32, speed: f32, scale: f32) -> f32 {
    0.5 * mass * speed * speed * scale
}

/// Decides when and where enemies appear
#[derive(Debug, Clone)]
pub struct SpawnScheduler {
    pub last_spawn_at: Option<f64>,
    pub interval: f64,
    pub area_half_size: f32,
    pub player_exclusion_radius: f32,
    pub max_attempts: u32,
    pub spawn_height: f32,
}

impl SpawnScheduler {
    pub fn new(config: &CombatConfig) -> Self {
        Self {
            last_spawn_at: None,
            interval: config.spawn_interval,
            area_half_size: config.spawn_area_half_size,
            player_exclusion_radius: config.player_exclusion_radius,
            max_attempts: config.max_spawn_attempts,
            spawn_height: config.ground_contact_height(),
        }
    }

    /// A spawn attempt is due (the first one is due immediately)
    pub fn due(&self, now: f64) -> bool {
        self.last_spawn_at
            .is_none_or(|last| now - last >= self.interval)
    }

    /// Record an attempt, successful or not
    pub fn mark(&mut self, now: f64) {
        self.last_spawn_at = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_spawn_at = None;
    }

    /// First random floor position far enough from the player, if any
    pub fn find_position<R: Rng>(&self, player: Vec3, rng: &mut R) -> Option<Vec3> {
        let half = self.area_half_size;
        (0..self.max_attempts).find_map(|_| {
            let x = rng.random_range(-half..=half);
            let z = rng.random_range(-half..=half);
            let candidate = Vec3::new(x, self.spawn_height, z);
            (candidate.distance(player) >= self.player_exclusion_radius).then_some(candidate)
        })
    }
}

/// Last sword position at which each (sword, enemy) pair dealt damage
#[derive(Debug, Clone, Default)]
pub struct InteractionTable {
    last_hit: HashMap<(SwordId, EnemyId), Vec3>,
}

impl InteractionTable {
    /// True when the pair has never hit or the sword has moved far enough since
    pub fn is_armed(&self, sword: SwordId, enemy: EnemyId, sword_position: Vec3) -> bool {
        self.last_hit
            .get(&(sword, enemy))
            .is_none_or(|last| last.distance(sword_position) >= DAMAGE_REARM_DISTANCE)
    }

    pub fn record(&mut self, sword: SwordId, enemy: EnemyId, sword_position: Vec3) {
        self.last_hit.insert((sword, enemy), sword_position);
    }

    pub fn purge_enemy(&mut self, enemy: EnemyId) {
        self.last_hit.retain(|(_, e), _| *e != enemy);
    }

    pub fn len(&self) -> usize {
        self.last_hit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_hit.is_empty()
    }

    pub fn clear(&mut self) {
        self.last_hit.clear();
    }
}

/// Delayed combat actions owned by an enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatTimer {
    /// Fade-out finished, remove the enemy
    Retire,
    ExpireDamageNumber(u64),
}

/// Per-frame inputs for the combat update
#[derive(Debug, Clone, Copy)]
pub struct CombatFrame {
    pub now: f64,
    pub dt: f64,
    /// Right index tip; enemies chase it and spawn away from it
    pub player: Option<Vec3>,
}

/// Owns every enemy and the session's combat bookkeeping
pub struct CombatDirector {
    config: CombatConfig,
    scheduler: SpawnScheduler,
    enemies: EntityTable<Enemy>,
    interactions: InteractionTable,
    timers: Timers<EnemyId, CombatTimer>,
    assets: Box<dyn EnemyAssets>,
    template: Option<EnemyConfig>,
    rng: Pcg32,
    seed: u64,
    next_damage_number: u64,
}

impl CombatDirector {
    pub fn new(config: CombatConfig, seed: u64, assets: Box<dyn EnemyAssets>) -> Self {
        Self {
            scheduler: SpawnScheduler::new(&config),
            config,
            enemies: EntityTable::new(),
            interactions: InteractionTable::default(),
            timers: Timers::new(),
            assets,
            template: None,
            rng: Pcg32::seed_from_u64(seed),
            seed,
            next_damage_number: 1,
        }
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn enemies(&self) -> &EntityTable<Enemy> {
        &self.enemies
    }

    pub fn enemy(&self, id: EnemyId) -> Option<&Enemy> {
        self.enemies.get(id)
    }

    pub fn scheduler(&self) -> &SpawnScheduler {
        &self.scheduler
    }

    pub fn interactions(&self) -> &InteractionTable {
        &self.interactions
    }

    pub fn timers(&self) -> &Timers<EnemyId, CombatTimer> {
        &self.timers
    }

    /// Resolve (and cache) the enemy template
    fn template(&mut self) -> Option<EnemyConfig> {
        if self.template.is_none() {
            match self.assets.load_enemy(&self.config.enemy_asset) {
                Ok(template) => {
                    log::info!("Loaded enemy template `{}`", self.config.enemy_asset);
                    self.template = Some(template);
                }
                Err(err) => {
                    log::warn!("Skipping enemy spawn: {}", err);
                    return None;
                }
            }
        }
        self.template.clone()
    }

    /// Place an enemy at `position` (Y is pinned to the floor)
    pub fn spawn_at(&mut self, position: Vec3, commands: &mut Vec<SimCommand>) -> Option<EnemyId> {
        let template = self.template()?;
        let position = Vec3::new(position.x, self.scheduler.spawn_height, position.z);
        let id = self.enemies.insert(Enemy::new(&template, position));
        commands.push(SimCommand::SpawnEnemy {
            enemy: id,
            position,
            scale: template.scale,
        });
        log::info!(
            "Spawned enemy {:?} at ({:.2}, {:.2}, {:.2})",
            id,
            position.x,
            position.y,
            position.z
        );
        Some(id)
    }

    fn try_spawn(&mut self, now: f64, player: Option<Vec3>, commands: &mut Vec<SimCommand>) {
        if !self.scheduler.due(now) {
            return;
        }
        self.scheduler.mark(now);

        let Some(player) = player else {
            log::debug!("No player anchor, skipping spawn");
            return;
        };
        let Some(position) = self.scheduler.find_position(player, &mut self.rng) else {
            log::debug!("No spawn position clear of the player");
            return;
        };
        self.spawn_at(position, commands);
    }

    /// Apply a sword hit to an enemy, honouring the re-arm distance.
    ///
    /// Returns the damage dealt, or None when the hit was ignored.
    pub fn apply_hit(
        &mut self,
        sword_id: SwordId,
        sword: &Sword,
        enemy_id: EnemyId,
        contact: Vec3,
        commands: &mut Vec<SimCommand>,
    ) -> Option<f32> {
        let enemy = self.enemies.get_mut(enemy_id)?;
        if enemy.life != EnemyLife::Active || !sword.is_flying() {
            return None;
        }
        if !self.interactions.is_armed(sword_id, enemy_id, sword.position) {
            return None;
        }
        self.interactions.record(sword_id, enemy_id, sword.position);

        let velocity = sword.velocity();
        let amount = kinetic_damage(
            sword.config.sword_weight,
            velocity.length(),
            self.config.damage_scale,
        );
        let died = enemy.take_damage(amount);
        log::info!(
            "Sword {:?} hit enemy {:?} at {:.2} m/s for {:.1} ({:.1} left)",
            sword_id,
            enemy_id,
            velocity.length(),
            amount,
            enemy.health
        );

        commands.push(SimCommand::Damage {
            enemy: enemy_id,
            amount,
            position: contact,
            source_direction: velocity.normalize_or_zero(),
        });
        let number = self.next_damage_number;
        self.next_damage_number += 1;
        commands.push(SimCommand::ShowDamageNumber {
            id: number,
            enemy: enemy_id,
            amount,
        });
        self.timers.schedule(
            enemy_id,
            DAMAGE_NUMBER_DURATION,
            CombatTimer::ExpireDamageNumber(number),
        );

        if died {
            enemy.life = EnemyLife::Dying;
            enemy.velocity = Vec3::ZERO;
            self.timers
                .schedule(enemy_id, DEATH_FADE_DELAY, CombatTimer::Retire);
            log::info!("Enemy {:?} defeated", enemy_id);
        }
        Some(amount)
    }

    /// Remove an enemy now and drop everything it owns
    pub fn retire(&mut self, enemy_id: EnemyId, commands: &mut Vec<SimCommand>) -> bool {
        if self.enemies.remove(enemy_id).is_none() {
            return false;
        }
        self.interactions.purge_enemy(enemy_id);
        let cancelled = self.timers.cancel_owner(enemy_id);
        commands.push(SimCommand::DespawnEnemy { enemy: enemy_id });
        log::debug!(
            "Retired enemy {:?} ({} pending timers cancelled)",
            enemy_id,
            cancelled
        );
        true
    }

    /// Spawn, contact damage, pursuit, then timers
    pub fn update(
        &mut self,
        frame: CombatFrame,
        swords: &EntityTable<Sword>,
        commands: &mut Vec<SimCommand>,
    ) {
        self.try_spawn(frame.now, frame.player, commands);

        let radius = self.config.contact_radius;
        for enemy_id in self.enemies.handles() {
            let Some(enemy) = self.enemies.get(enemy_id) else {
                continue;
            };
            if enemy.life != EnemyLife::Active {
                continue;
            }
            let enemy_position = enemy.position;
            let interactions = &self.interactions;
            let striker = swords.iter().find(|(sword_id, sword)| {
                sword.collisions_armed()
                    && sword.position.distance(enemy_position) < radius
                    && interactions.is_armed(*sword_id, enemy_id, sword.position)
            });
            if let Some((sword_id, sword)) = striker {
                self.apply_hit(sword_id, sword, enemy_id, sword.position, commands);
            }

            self.pursue(enemy_id, frame, commands);
        }

        for (enemy_id, action) in self.timers.advance(frame.dt) {
            match action {
                CombatTimer::Retire => {
                    self.retire(enemy_id, commands);
                }
                CombatTimer::ExpireDamageNumber(id) => {
                    commands.push(SimCommand::ExpireDamageNumber { id });
                }
            }
        }
    }

    /// Straight-line horizontal chase of the player anchor
    fn pursue(&mut self, enemy_id: EnemyId, frame: CombatFrame, commands: &mut Vec<SimCommand>) {
        let height = self.scheduler.spawn_height;
        let Some(enemy) = self.enemies.get_mut(enemy_id) else {
            return;
        };
        if enemy.life != EnemyLife::Active {
            return;
        }
        if let Some(player) = frame.player {
            enemy.target = Some(player);
        }
        let Some(direction) = enemy.direction_to_target() else {
            return;
        };
        let heading = horizontal(direction);
        if heading.length() <= ENEMY_MIN_HEADING {
            return;
        }
        let heading = heading.normalize();
        enemy.velocity = heading * enemy.move_speed;
        let mut position = enemy.position + enemy.velocity * frame.dt as f32;
        position.y = height;
        enemy.position = position;
        enemy.orientation = look_rotation(heading);

        commands.push(SimCommand::SetTransform {
            body: BodyRef::Enemy(enemy_id),
            position: enemy.position,
            orientation: enemy.orientation,
        });
    }

    /// Despawn everything and restart the schedule (template cache kept)
    pub fn reset(&mut self, commands: &mut Vec<SimCommand>) {
        for enemy_id in self.enemies.handles() {
            commands.push(SimCommand::DespawnEnemy { enemy: enemy_id });
        }
        self.enemies.clear();
        self.interactions.clear();
        self.timers.clear();
        self.scheduler.reset();
        self.rng = Pcg32::seed_from_u64(self.seed);
    }
}
