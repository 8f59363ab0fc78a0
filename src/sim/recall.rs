//! Pinch-to-recall steering
//!
//! A left-hand pinch pulls a flying sword back toward the right index tip. The
//! recall speed stays low for a few seconds so the sword can turn tightly, then
//! ramps up the longer the pinch is held.

use glam::Vec3;

use super::state::{PinchState, Sword};
use crate::config::SwordFlightConfig;
use crate::consts::*;
use crate::turn_toward;

/// Hand positions the recall gesture needs this frame
#[derive(Debug, Clone, Copy, Default)]
pub struct RecallInput {
    /// Distance between left index tip and left thumb tip
    pub pinch_distance: Option<f32>,
    /// Right index tip (recall target)
    pub hand: Option<Vec3>,
}

/// Result of one recall update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecallOutcome {
    /// Nothing to do (held sword, missing anchors, not pinching)
    Idle,
    PinchStarted,
    /// Velocity was redirected at this speed
    Steering { speed: f32 },
    PinchReleased,
}

/// Recall speed after holding the pinch for `held_for` seconds
pub fn recall_speed(held_for: f64, config: &SwordFlightConfig) -> f32 {
    if held_for <= RECALL_FLAT_DURATION {
        return config.recall_speed;
    }
    if held_for >= config.max_recall_speed_time {
        return config.max_recall_speed;
    }
    let progress =
        ((held_for - RECALL_FLAT_DURATION) / (config.max_recall_speed_time - RECALL_FLAT_DURATION))
            as f32;
    config.recall_speed + (config.max_recall_speed - config.recall_speed) * progress
}

/// Update pinch state and redirect a flying sword toward the hand
pub fn update(sword: &mut Sword, input: RecallInput, now: f64, dt: f64) -> RecallOutcome {
    if !sword.is_flying() {
        sword.pinch = PinchState::Released;
        return RecallOutcome::Idle;
    }
    let (Some(pinch_distance), Some(hand)) = (input.pinch_distance, input.hand) else {
        return RecallOutcome::Idle;
    };

    if pinch_distance >= sword.config.pinch_gesture_threshold {
        if sword.pinch != PinchState::Released {
            sword.pinch = PinchState::Released;
            log::debug!("Pinch released");
            return RecallOutcome::PinchReleased;
        }
        return RecallOutcome::Idle;
    }

    let started = if sword.pinch == PinchState::Released {
        sword.pinch = PinchState::Pressed { since: now };
        log::debug!("Pinch started, recalling sword");
        true
    } else {
        false
    };

    let to_hand = hand - sword.position;
    if to_hand.length() <= RECALL_MIN_DISTANCE {
        return if started {
            RecallOutcome::PinchStarted
        } else {
            RecallOutcome::Idle
        };
    }

    let held_for = sword.pinch.held_for(now).unwrap_or(0.0);
    let speed = recall_speed(held_for, &sword.config);
    let max_turn = sword.config.recall_turn_speed * dt as f32;
    let Some(flight) = sword.flight_mut() else {
        return RecallOutcome::Idle;
    };

    let target_dir = to_hand.normalize();
    let current_dir = if flight.velocity.length() > MIN_STEER_SPEED {
        flight.velocity.normalize()
    } else {
        target_dir
    };
    let (direction, _) = turn_toward(current_dir, target_dir, max_turn);
    flight.velocity = direction * speed;

    RecallOutcome::Steering { speed }
}
