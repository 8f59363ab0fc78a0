//! Sword profiles, enemy presets and combat tuning
//!
//! Every value here is immutable once handed to the simulation. A sword swaps
//! its tuning only by replacing the whole `SwordFlightConfig`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration from disk or JSON
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown sword profile `{0}`")]
    UnknownProfile(String),
}

/// Named sword tuning presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SwordProfile {
    #[default]
    Standard,
    Light,
    Heavy,
    Balanced,
}

impl SwordProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwordProfile::Standard => "standard",
            SwordProfile::Light => "light",
            SwordProfile::Heavy => "heavy",
            SwordProfile::Balanced => "balanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" | "std" => Some(SwordProfile::Standard),
            "light" => Some(SwordProfile::Light),
            "heavy" => Some(SwordProfile::Heavy),
            "balanced" => Some(SwordProfile::Balanced),
            _ => None,
        }
    }

    /// Flight tuning for this profile
    pub fn config(&self) -> SwordFlightConfig {
        match self {
            SwordProfile::Standard => SwordFlightConfig::standard(),
            SwordProfile::Light => SwordFlightConfig::light(),
            SwordProfile::Heavy => SwordFlightConfig::heavy(),
            SwordProfile::Balanced => SwordFlightConfig::balanced(),
        }
    }
}

fn default_weight_dampening() -> f32 {
    0.5
}

/// Flight, launch, steering and recall tuning for one sword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwordFlightConfig {
    // === Body ===
    /// Sword mass (kg)
    pub sword_weight: f32,
    /// Blade length (m); the tip sits half of this ahead of the center
    pub sword_length: f32,

    // === Launch ===
    /// Swing speed (m/s) that must be exceeded to launch
    pub velocity_threshold: f32,
    /// Multiplier applied to the measured swing velocity
    pub velocity_multiplier: f32,
    /// Heavier swords are slowed by `1 / (1 + weight * dampening)`
    #[serde(default = "default_weight_dampening")]
    pub launch_weight_dampening: f32,
    /// Minimum time between launches (s)
    pub launch_cooldown: f64,
    /// Samples required before a launch is evaluated
    pub min_samples_for_launch: usize,
    /// Trailing window used for the release velocity (s)
    pub velocity_window: f64,
    /// Shortest span that yields a usable velocity (s)
    pub min_effective_window: f64,

    // === Following / sampling ===
    /// Distance ahead of the fingertip where the held sword sits (m)
    pub follow_offset: f32,
    /// Pre-launch sample capacity
    pub max_history_count: usize,
    /// Minimum spacing between pre-launch samples (s)
    pub min_sample_interval: f64,

    // === Flight physics ===
    /// Linear drag per second (0 = none)
    pub drag_coefficient: f32,
    /// Gravity acceleration (m/s², negative is down)
    pub gravity: f32,
    /// Share of gravity applied to the sword
    pub gravity_factor: f32,
    /// Below this speed the sword keeps its last orientation
    pub min_flying_speed: f32,
    /// Flight ends after this long (s)
    pub max_flying_time: f64,

    // === Remote control ===
    pub remote_control_strength: f32,
    pub finger_influence_ratio: f32,
    /// Steering fades to zero at this finger-to-sword distance (m)
    pub max_remote_control_distance: f32,
    /// Largest steering delta per frame (m/s)
    pub max_velocity_change: f32,
    pub max_finger_history_count: usize,
    pub min_finger_sample_interval: f64,

    // === Collision ===
    /// Collisions are ignored for this long after launch (s)
    pub collision_detection_delay: f64,

    // === Homing / recall ===
    /// Homing engages inside this distance of the hand (m)
    pub auto_return_distance: f32,
    /// Homing is not considered before this much flight time (s)
    pub auto_return_delay: f64,
    /// Left index-thumb distance that counts as a pinch (m)
    pub pinch_gesture_threshold: f32,
    /// Initial recall speed and homing floor speed (m/s)
    pub recall_speed: f32,
    pub max_recall_speed: f32,
    /// Pinch duration at which recall reaches full speed (s)
    pub max_recall_speed_time: f64,
    /// Turn rates (rad/s)
    pub recall_turn_speed: f32,
    pub launch_turn_speed: f32,
    /// Post-launch settle window (s)
    pub launch_turn_duration: f64,
    pub auto_return_turn_speed: f32,
}

impl Default for SwordFlightConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl SwordFlightConfig {
    /// Baseline tuning: no drag, no gravity, strong remote control
    pub fn standard() -> Self {
        Self {
            sword_weight: 1.0,
            sword_length: 0.8,
            velocity_threshold: 0.3,
            velocity_multiplier: 5.0,
            launch_weight_dampening: default_weight_dampening(),
            launch_cooldown: 0.8,
            min_samples_for_launch: 5,
            velocity_window: 0.25,
            min_effective_window: 0.15,
            follow_offset: 0.12,
            max_history_count: 30,
            min_sample_interval: 1.0 / 60.0,
            drag_coefficient: 0.0,
            gravity: 0.0,
            gravity_factor: 0.3,
            min_flying_speed: 1.0,
            max_flying_time: 10000.0,
            remote_control_strength: 1.2,
            finger_influence_ratio: 2.5,
            max_remote_control_distance: 100.0,
            max_velocity_change: 5.0,
            max_finger_history_count: 10,
            min_finger_sample_interval: 1.0 / 30.0,
            collision_detection_delay: 1.0,
            auto_return_distance: 0.05,
            auto_return_delay: 1.0,
            pinch_gesture_threshold: 0.02,
            recall_speed: 1.0,
            max_recall_speed: 5.0,
            max_recall_speed_time: 5.0,
            recall_turn_speed: 3.0,
            launch_turn_speed: 5.0,
            launch_turn_duration: 0.3,
            auto_return_turn_speed: 3.0,
        }
    }

    /// Quick and agile, light drag and gravity
    pub fn light() -> Self {
        Self {
            sword_weight: 0.3,
            sword_length: 0.7,
            velocity_threshold: 0.15,
            velocity_multiplier: 2.5,
            launch_cooldown: 0.6,
            follow_offset: 0.10,
            drag_coefficient: 0.1,
            gravity: -9.8,
            gravity_factor: 0.2,
            min_flying_speed: 0.08,
            remote_control_strength: 1.5,
            finger_influence_ratio: 3.0,
            max_remote_control_distance: 120.0,
            auto_return_delay: 0.8,
            max_recall_speed: 3.0,
            max_recall_speed_time: 6.0,
            recall_turn_speed: 4.0,
            launch_turn_speed: 6.0,
            launch_turn_duration: 0.25,
            auto_return_turn_speed: 7.0,
            ..Self::standard()
        }
    }

    /// Long and steady, more gravity and weaker steering
    pub fn heavy() -> Self {
        Self {
            sword_weight: 0.8,
            sword_length: 1.0,
            velocity_threshold: 0.3,
            velocity_multiplier: 1.5,
            launch_cooldown: 1.0,
            follow_offset: 0.15,
            drag_coefficient: 0.0,
            gravity: -9.8,
            gravity_factor: 0.5,
            min_flying_speed: 0.15,
            remote_control_strength: 0.8,
            finger_influence_ratio: 1.5,
            max_remote_control_distance: 80.0,
            auto_return_delay: 1.2,
            max_recall_speed: 3.0,
            max_recall_speed_time: 6.0,
            recall_turn_speed: 2.0,
            launch_turn_speed: 4.0,
            launch_turn_duration: 0.4,
            auto_return_turn_speed: 7.0,
            ..Self::standard()
        }
    }

    /// Middle ground between light and heavy
    pub fn balanced() -> Self {
        Self {
            sword_weight: 0.5,
            sword_length: 0.8,
            velocity_threshold: 0.2,
            velocity_multiplier: 2.0,
            drag_coefficient: 0.15,
            gravity: -9.8,
            gravity_factor: 0.3,
            min_flying_speed: 0.1,
            remote_control_strength: 1.0,
            finger_influence_ratio: 2.0,
            max_recall_speed: 3.0,
            max_recall_speed_time: 6.0,
            auto_return_turn_speed: 7.0,
            ..Self::standard()
        }
    }

    /// Distance from the sword center to the blade tip
    #[inline]
    pub fn tip_offset(&self) -> f32 {
        self.sword_length / 2.0
    }

    /// Launch speed scale from the sword weight
    #[inline]
    pub fn weight_factor(&self) -> f32 {
        1.0 / (1.0 + self.sword_weight * self.launch_weight_dampening)
    }

    /// Parse a config from JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Per-enemy stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyConfig {
    /// Render scale relative to the source model
    pub scale: f32,
    pub max_health: f32,
    /// Pursuit speed (m/s)
    pub move_speed: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        // Default enemy model is authored at one fifth of its in-world size
        Self {
            scale: 5.0,
            max_health: 100.0,
            move_speed: 0.1,
        }
    }
}

impl EnemyConfig {
    pub fn small() -> Self {
        Self {
            scale: 3.0,
            max_health: 50.0,
            move_speed: 0.15,
        }
    }

    pub fn large() -> Self {
        Self {
            scale: 8.0,
            max_health: 200.0,
            move_speed: 0.05,
        }
    }

    pub fn boss() -> Self {
        Self {
            scale: 15.0,
            max_health: 1000.0,
            move_speed: 0.03,
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" => Some(Self::default()),
            "small" => Some(Self::small()),
            "large" => Some(Self::large()),
            "boss" => Some(Self::boss()),
            _ => None,
        }
    }
}

/// Spawn scheduling, pursuit and damage tuning for a combat session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatConfig {
    /// Seconds between spawn attempts
    pub spawn_interval: f64,
    /// Half the side of the square spawn region around the origin (m)
    pub spawn_area_half_size: f32,
    /// Spawns must be at least this far from the player (m)
    pub player_exclusion_radius: f32,
    /// Random candidates tried per spawn attempt
    pub max_spawn_attempts: u32,
    /// Top of the floor (m)
    pub floor_height: f32,
    /// Enemy body height; the enemy center sits half of it above the floor
    pub enemy_height: f32,
    /// Combined enemy + sword contact radius for damage (m)
    pub contact_radius: f32,
    /// Damage per joule of sword kinetic energy
    pub damage_scale: f32,
    /// Asset name spawned enemies are built from
    pub enemy_asset: String,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            spawn_interval: 10.0,
            spawn_area_half_size: 15.0,
            player_exclusion_radius: 10.0,
            max_spawn_attempts: 10,
            floor_height: -0.05,
            enemy_height: 1.25,
            // Enemy half-width 0.75 + half blade 0.4
            contact_radius: 1.15,
            damage_scale: 10.0,
            enemy_asset: "default".to_string(),
        }
    }
}

impl CombatConfig {
    /// Height of an enemy center standing on the floor
    #[inline]
    pub fn ground_contact_height(&self) -> f32 {
        self.floor_height + self.enemy_height / 2.0
    }
}

/// Top-level session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seed for spawn placement
    pub seed: u64,
    /// Profile used when `sword` is not given
    #[serde(default)]
    pub profile: SwordProfile,
    /// Explicit sword tuning (overrides `profile`)
    #[serde(default)]
    pub sword: Option<SwordFlightConfig>,
    #[serde(default)]
    pub combat: CombatConfig,
    /// The host physics engine moves flying swords; positions come back as input
    #[serde(default)]
    pub engine_driven_motion: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            profile: SwordProfile::Standard,
            sword: None,
            combat: CombatConfig::default(),
            engine_driven_motion: false,
        }
    }
}

impl SimConfig {
    /// Sword tuning this session starts with
    pub fn sword_config(&self) -> SwordFlightConfig {
        self.sword.clone().unwrap_or_else(|| self.profile.config())
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!(
            "Loaded config from {} (profile {})",
            path.as_ref().display(),
            config.profile.as_str()
        );
        Ok(config)
    }

    /// Load from a JSON file, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Using default config: {}", err);
                Self::default()
            }
        }
    }

    /// Defaults with the named sword profile
    pub fn with_profile(name: &str) -> Result<Self, ConfigError> {
        let profile =
            SwordProfile::from_str(name).ok_or_else(|| ConfigError::UnknownProfile(name.into()))?;
        Ok(Self {
            profile,
            ..Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_round_trip_names() {
        for profile in [
            SwordProfile::Standard,
            SwordProfile::Light,
            SwordProfile::Heavy,
            SwordProfile::Balanced,
        ] {
            assert_eq!(SwordProfile::from_str(profile.as_str()), Some(profile));
        }
        assert_eq!(SwordProfile::from_str("HEAVY"), Some(SwordProfile::Heavy));
        assert_eq!(SwordProfile::from_str("katana"), None);
    }

    #[test]
    fn test_weight_factor() {
        let config = SwordFlightConfig::standard();
        assert!((config.weight_factor() - 1.0 / 1.5).abs() < 1e-6);
        let light = SwordFlightConfig::light();
        assert!(light.weight_factor() > config.weight_factor());
    }

    #[test]
    fn test_presets_differ_where_expected() {
        let heavy = SwordFlightConfig::heavy();
        assert_eq!(heavy.sword_length, 1.0);
        assert!((heavy.tip_offset() - 0.5).abs() < 1e-6);
        // Shared fields inherit from standard
        assert_eq!(heavy.pinch_gesture_threshold, 0.02);
        assert_eq!(SwordFlightConfig::balanced().drag_coefficient, 0.15);
    }

    #[test]
    fn test_sword_config_json_defaults_dampening() {
        let mut value = serde_json::to_value(SwordFlightConfig::light()).unwrap();
        value
            .as_object_mut()
            .unwrap()
            .remove("launch_weight_dampening");
        let parsed = SwordFlightConfig::from_json(&value.to_string()).unwrap();
        assert_eq!(parsed.launch_weight_dampening, 0.5);
        assert_eq!(parsed.sword_weight, 0.3);
    }

    #[test]
    fn test_sim_config_minimal_json() {
        let config = SimConfig::from_json(r#"{ "seed": 7, "profile": "heavy" }"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.sword_config(), SwordFlightConfig::heavy());
        assert_eq!(config.combat, CombatConfig::default());
        assert!(!config.engine_driven_motion);
    }

    #[test]
    fn test_sim_config_errors() {
        assert!(matches!(
            SimConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            SimConfig::with_profile("katana"),
            Err(ConfigError::UnknownProfile(_))
        ));
        assert!(matches!(
            SimConfig::load("/nonexistent/flying-sword.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_ground_contact_height() {
        let combat = CombatConfig::default();
        assert!((combat.ground_contact_height() - 0.575).abs() < 1e-6);
    }

    #[test]
    fn test_enemy_presets() {
        assert_eq!(EnemyConfig::preset("boss").unwrap().max_health, 1000.0);
        assert!(EnemyConfig::preset("dragon").is_none());
        assert_eq!(EnemyConfig::preset("default").unwrap().scale, 5.0);
    }
}
