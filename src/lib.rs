//! Flying Sword - gesture-controlled projectile and enemy combat simulation
//!
//! Core modules:
//! - `sim`: Frame-driven simulation (launch, flight, collision, recall, combat)
//! - `tracking`: Hand joint feed to anchors, follow poses and gesture samples
//! - `config`: Sword profiles, enemy presets and combat tuning

pub mod config;
pub mod sim;
pub mod tracking;

pub use config::{CombatConfig, EnemyConfig, SimConfig, SwordFlightConfig, SwordProfile};

use glam::{Mat3, Quat, Vec3};

/// Simulation constants that are not part of any tunable profile
pub mod consts {
    /// Largest frame step accepted; longer hitches are clamped
    pub const MAX_FRAME_DT: f64 = 0.1;

    /// Angular gap (radians) below which a turn snaps to its target
    pub const MIN_TURN_ANGLE: f32 = 0.01;
    /// Speed below which a velocity has no usable direction
    pub const MIN_STEER_SPEED: f32 = 0.01;

    /// Homing flight ends when the sword is this close to the hand (1.5 cm)
    pub const HOMING_STOP_DISTANCE: f32 = 0.015;
    /// Per-frame speed retention while homing back toward the hand
    pub const HOMING_SPEED_DECAY: f32 = 0.95;

    /// Remote steering yields to the recall gesture for this long after a pinch starts
    pub const PINCH_REMOTE_LOCKOUT: f64 = 0.5;
    /// Finger speeds below this do not steer the sword (m/s)
    pub const MIN_FINGER_SPEED: f32 = 0.1;

    /// Recall keeps its initial speed for this long before ramping up
    pub const RECALL_FLAT_DURATION: f64 = 3.0;
    /// Recall stops steering when the sword is already this close to the hand
    pub const RECALL_MIN_DISTANCE: f32 = 0.01;

    /// Extra ray length past the predicted tip position (10 cm)
    pub const SWEEP_SAFETY_BUFFER: f32 = 0.1;
    /// Tip displacements below this skip the sweep (1 mm)
    pub const MIN_SWEEP_DISPLACEMENT: f32 = 0.001;
    /// Velocities slower than this never sweep
    pub const MIN_SWEEP_SPEED: f32 = 0.0001;

    /// Launch collider cross-section (m)
    pub const SWORD_COLLIDER_WIDTH: f32 = 0.05;
    pub const SWORD_STATIC_FRICTION: f32 = 0.2;
    pub const SWORD_DYNAMIC_FRICTION: f32 = 0.1;
    pub const SWORD_RESTITUTION: f32 = 0.7;

    /// Sword travel required before the same enemy can be hit again (1 cm)
    pub const DAMAGE_REARM_DISTANCE: f32 = 0.01;
    /// Enemies stop pursuing inside this distance of their target
    pub const ENEMY_ARRIVE_DISTANCE: f32 = 0.1;
    /// Horizontal direction shorter than this means no movement this frame
    pub const ENEMY_MIN_HEADING: f32 = 0.01;

    /// Delay between death and removal (fade-out)
    pub const DEATH_FADE_DELAY: f64 = 0.5;
    /// Lifetime of a floating damage number
    pub const DAMAGE_NUMBER_DURATION: f64 = 1.5;
}

/// Angle in radians between two directions (inputs need not be normalized)
#[inline]
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    let a = a.normalize_or_zero();
    let b = b.normalize_or_zero();
    a.dot(b).clamp(-1.0, 1.0).acos()
}

/// Rotate `current` toward `target` by at most `max_angle` radians.
///
/// Both inputs are treated as directions. Returns the new unit direction and
/// whether the target was reached this step. Antiparallel inputs turn about an
/// arbitrary perpendicular axis.
pub fn turn_toward(current: Vec3, target: Vec3, max_angle: f32) -> (Vec3, bool) {
    let target = target.normalize_or_zero();
    let current = current.normalize_or_zero();
    if target == Vec3::ZERO {
        return (current, true);
    }
    if current == Vec3::ZERO {
        return (target, true);
    }

    let angle = current.dot(target).clamp(-1.0, 1.0).acos();
    if angle <= max_angle || angle < consts::MIN_TURN_ANGLE {
        return (target, true);
    }

    let axis = current.cross(target);
    let axis = if axis.length_squared() > 1e-12 {
        axis.normalize()
    } else {
        current.any_orthonormal_vector()
    };
    let turned = Quat::from_axis_angle(axis, max_angle.max(0.0)) * current;
    (turned.normalize(), false)
}

/// Right-handed look rotation: +Z faces `forward`, +Y stays as close to world up
/// as possible. Degenerate forwards return identity.
pub fn look_rotation(forward: Vec3) -> Quat {
    let forward = forward.normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let right = Vec3::Y.cross(forward);
    // Straight up or down: any horizontal right axis works
    let right = if right.length_squared() > 1e-8 {
        right.normalize()
    } else {
        Vec3::X
    };
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward))
}

/// Horizontal (XZ) part of a vector
#[inline]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}
