//! Swing detection and release velocity

use glam::Vec3;

use super::history::SampleHistory;
use crate::config::SwordFlightConfig;

/// Why a swing did not launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchRejection {
    Cooldown,
    TooFewSamples,
    WindowTooShort,
    BelowThreshold,
}

/// Evaluate the pre-launch history for a swing.
///
/// Returns the raw (unscaled) swing velocity when every gate passes.
pub fn evaluate(
    history: &SampleHistory,
    config: &SwordFlightConfig,
    last_launch_at: Option<f64>,
    now: f64,
) -> Result<Vec3, LaunchRejection> {
    if let Some(last) = last_launch_at
        && now - last < config.launch_cooldown
    {
        return Err(LaunchRejection::Cooldown);
    }
    if history.len() < config.min_samples_for_launch.max(2) {
        return Err(LaunchRejection::TooFewSamples);
    }
    if history.span() < config.min_effective_window {
        return Err(LaunchRejection::WindowTooShort);
    }

    let velocity = history.windowed_velocity(config.velocity_window, config.min_effective_window);
    if velocity.length() <= config.velocity_threshold {
        return Err(LaunchRejection::BelowThreshold);
    }
    Ok(velocity)
}

/// Scale a swing velocity into the sword's release velocity
#[inline]
pub fn release_velocity(swing: Vec3, config: &SwordFlightConfig) -> Vec3 {
    swing * config.velocity_multiplier * config.weight_factor()
}

/// Release velocity if the current history constitutes a launch
pub fn try_launch(
    history: &SampleHistory,
    config: &SwordFlightConfig,
    last_launch_at: Option<f64>,
    now: f64,
) -> Option<Vec3> {
    match evaluate(history, config, last_launch_at, now) {
        Ok(swing) => Some(release_velocity(swing, config)),
        Err(reason) => {
            log::trace!("No launch: {:?}", reason);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Straight-line swing along +Z at `speed`, sampled at 60 Hz
    fn swing(speed: f32, frames: usize) -> SampleHistory {
        let config = SwordFlightConfig::standard();
        let mut history = SampleHistory::new(
            config.max_history_count,
            config.min_sample_interval * 0.5,
            Some(config.velocity_window),
        );
        for i in 0..frames {
            let t = i as f64 / 60.0;
            history.push(Vec3::new(0.0, 0.0, speed * t as f32), t);
        }
        history
    }

    #[test]
    fn test_release_velocity_standard() {
        let config = SwordFlightConfig::standard();
        let history = swing(0.4, 16);
        let now = 15.0 / 60.0;
        let v = try_launch(&history, &config, None, now).unwrap();
        // 0.4 * 5.0 / 1.5
        assert!((v.length() - 4.0 / 3.0).abs() < 1e-3);
        assert!(v.normalize().dot(Vec3::Z) > 0.999);
    }

    #[test]
    fn test_slow_swing_does_not_launch() {
        let config = SwordFlightConfig::standard();
        let history = swing(0.2, 16);
        assert_eq!(
            evaluate(&history, &config, None, 0.25),
            Err(LaunchRejection::BelowThreshold)
        );
    }

    #[test]
    fn test_cooldown_blocks_launch() {
        let config = SwordFlightConfig::standard();
        let history = swing(1.0, 16);
        let now = 15.0 / 60.0;
        assert_eq!(
            evaluate(&history, &config, Some(now - 0.5), now),
            Err(LaunchRejection::Cooldown)
        );
        assert!(try_launch(&history, &config, Some(now - 0.9), now).is_some());
    }

    #[test]
    fn test_needs_samples_and_span() {
        let config = SwordFlightConfig::standard();
        assert_eq!(
            evaluate(&swing(1.0, 3), &config, None, 0.05),
            Err(LaunchRejection::TooFewSamples)
        );
        // Six samples at 60 Hz only span 0.083 s
        assert_eq!(
            evaluate(&swing(1.0, 6), &config, None, 0.1),
            Err(LaunchRejection::WindowTooShort)
        );
    }

    #[test]
    fn test_heavier_sword_releases_slower() {
        let light = SwordFlightConfig {
            sword_weight: 0.2,
            ..SwordFlightConfig::standard()
        };
        let heavy = SwordFlightConfig {
            sword_weight: 2.0,
            ..SwordFlightConfig::standard()
        };
        let raw = Vec3::new(0.0, 0.0, 1.0);
        assert!(release_velocity(raw, &light).length() > release_velocity(raw, &heavy).length());
    }
}
