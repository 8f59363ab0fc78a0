//! Per-frame flight update
//!
//! Steering sub-phase first, then drag, gravity and remote steering, then
//! position and facing. Homing and timeout are checked after the move.

use glam::{Quat, Vec3};

use super::history::SampleHistory;
use super::state::{
    Flight, PinchState, SimCommand, Steering, StopReason, Sword, SwordId, SwordPhase,
};
use crate::config::SwordFlightConfig;
use crate::consts::*;
use crate::{look_rotation, turn_toward};

/// Per-frame inputs shared by every flying sword
#[derive(Debug, Clone, Copy)]
pub struct FlightFrame {
    /// Right index tip, if tracked
    pub hand: Option<Vec3>,
    pub now: f64,
    pub dt: f64,
    /// Velocity is handed to the physics engine instead of integrated here
    pub engine_driven: bool,
}

/// Velocity change requested by the right index finger this frame.
///
/// Zero while a pinch is younger than the recall lockout, when the finger is
/// barely moving, or when there are not enough samples.
pub fn remote_delta(
    sword_position: Vec3,
    finger_history: &SampleHistory,
    config: &SwordFlightConfig,
    pinch: PinchState,
    now: f64,
) -> Vec3 {
    if let Some(held_for) = pinch.held_for(now)
        && held_for < PINCH_REMOTE_LOCKOUT
    {
        return Vec3::ZERO;
    }

    let finger_velocity = finger_history.endpoint_velocity();
    if finger_velocity.length() < MIN_FINGER_SPEED {
        return Vec3::ZERO;
    }
    let Some(last) = finger_history.last() else {
        return Vec3::ZERO;
    };

    let distance = sword_position.distance(last.position);
    let falloff = if config.max_remote_control_distance > 0.0 {
        (1.0 - distance / config.max_remote_control_distance).max(0.0)
    } else {
        0.0
    };
    let delta = finger_velocity
        * config.finger_influence_ratio
        * config.remote_control_strength
        * falloff;
    delta.clamp_length_max(config.max_velocity_change)
}

/// Run the active steering sub-phase. Returns a stop reason on homing arrival.
pub fn steer(
    flight: &mut Flight,
    position: Vec3,
    hand: Option<Vec3>,
    config: &SwordFlightConfig,
    dt: f32,
) -> Option<StopReason> {
    match flight.steering {
        Steering::LaunchSettling { heading } => {
            if flight.elapsed > config.launch_turn_duration {
                flight.steering = Steering::Cruising;
                return None;
            }
            let speed = flight.velocity.length();
            if speed > MIN_STEER_SPEED {
                let (direction, reached) =
                    turn_toward(heading, flight.velocity, config.launch_turn_speed * dt);
                flight.velocity = direction * speed;
                flight.steering = if reached {
                    Steering::Cruising
                } else {
                    Steering::LaunchSettling { heading: direction }
                };
            }
            None
        }
        Steering::Cruising => None,
        Steering::HomingReturn => {
            let Some(hand) = hand else {
                log::debug!("Lost hand anchor, homing cancelled");
                flight.steering = Steering::Cruising;
                return None;
            };
            let to_hand = hand - position;
            if to_hand.length() < HOMING_STOP_DISTANCE {
                return Some(StopReason::HomingArrival);
            }
            let target = to_hand.normalize();
            let speed = flight.velocity.length();
            if speed > MIN_STEER_SPEED {
                let (direction, _) =
                    turn_toward(flight.velocity, target, config.auto_return_turn_speed * dt);
                let speed = (speed * HOMING_SPEED_DECAY).max(config.recall_speed);
                flight.velocity = direction * speed;
            } else {
                flight.velocity = target * config.recall_speed;
            }
            None
        }
    }
}

/// Drag, gravity and remote steering, then move and face along the velocity
pub fn integrate(
    flight: &mut Flight,
    position: &mut Vec3,
    orientation: &mut Quat,
    remote: Vec3,
    config: &SwordFlightConfig,
    dt: f32,
    engine_driven: bool,
) {
    let drag = (1.0 - config.drag_coefficient * dt).max(0.0);
    flight.velocity *= drag;
    flight.velocity.y += config.gravity * config.gravity_factor * dt;
    flight.velocity += remote * dt;
    debug_assert!(flight.velocity.is_finite(), "non-finite sword velocity");

    if !engine_driven {
        *position += flight.velocity * dt;
    }
    if flight.velocity.length() > config.min_flying_speed {
        *orientation = look_rotation(flight.velocity);
    }
}

/// Advance one flying sword after the sweep check.
///
/// Returns the reason flight should end, if any. The caller applies the stop.
pub fn advance(
    id: SwordId,
    sword: &mut Sword,
    frame: FlightFrame,
    commands: &mut Vec<SimCommand>,
) -> Option<StopReason> {
    let dt = frame.dt as f32;
    let engine_driven = frame.engine_driven && sword.physics_attached;
    let Sword {
        config,
        phase,
        position,
        orientation,
        pinch,
        ..
    } = sword;
    let SwordPhase::Flying(flight) = phase else {
        return None;
    };

    if let Some(reason) = steer(flight, *position, frame.hand, config, dt) {
        return Some(reason);
    }

    let remote = remote_delta(*position, &flight.finger_history, config, *pinch, frame.now);
    integrate(
        flight,
        position,
        orientation,
        remote,
        config,
        dt,
        engine_driven,
    );
    if engine_driven {
        commands.push(SimCommand::SetLinearVelocity {
            sword: id,
            velocity: flight.velocity,
        });
    }

    if flight.elapsed > config.auto_return_delay
        && flight.steering != Steering::HomingReturn
        && let Some(hand) = frame.hand
    {
        let distance = position.distance(hand);
        if distance < config.auto_return_distance {
            log::info!(
                "Sword {:?} within {:.1} cm of the hand, homing",
                id,
                distance * 100.0
            );
            flight.steering = Steering::HomingReturn;
        }
    }

    if flight.elapsed > config.max_flying_time {
        return Some(StopReason::Timeout);
    }
    None
}
