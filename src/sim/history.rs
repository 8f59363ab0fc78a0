//! Time-stamped position samples for swing and steering velocity
//!
//! Samples closer together than `min_interval` are dropped, the buffer never
//! exceeds `max_count`, and an optional trailing window prunes anything older
//! than `window` seconds behind the newest sample.

use std::collections::VecDeque;

use glam::Vec3;

/// Slack on the de-duplication interval for accumulated frame clocks
const INTERVAL_EPSILON: f64 = 1e-6;

/// One tracked position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: Vec3,
    pub timestamp: f64,
}

/// Bounded, de-duplicated sample buffer (oldest first)
#[derive(Debug, Clone)]
pub struct SampleHistory {
    samples: VecDeque<Sample>,
    max_count: usize,
    min_interval: f64,
    window: Option<f64>,
}

impl SampleHistory {
    pub fn new(max_count: usize, min_interval: f64, window: Option<f64>) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_count.max(1)),
            max_count: max_count.max(1),
            min_interval,
            window,
        }
    }

    /// Record a sample. Returns false when it was dropped for arriving too soon
    /// (or out of order).
    pub fn push(&mut self, position: Vec3, timestamp: f64) -> bool {
        if let Some(last) = self.samples.back()
            && timestamp - last.timestamp + INTERVAL_EPSILON < self.min_interval
        {
            return false;
        }
        debug_assert!(position.is_finite(), "non-finite sample position");

        self.samples.push_back(Sample {
            position,
            timestamp,
        });
        while self.samples.len() > self.max_count {
            self.samples.pop_front();
        }
        if let Some(window) = self.window {
            while let Some(first) = self.samples.front() {
                if timestamp - first.timestamp > window {
                    self.samples.pop_front();
                } else {
                    break;
                }
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Time between the oldest and newest sample (0 when fewer than two)
    pub fn span(&self) -> f64 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }

    /// Average velocity over the samples within `window` of the newest one.
    ///
    /// Zero when fewer than two samples fall inside the window or when they
    /// span less than `min_span` seconds.
    pub fn windowed_velocity(&self, window: f64, min_span: f64) -> Vec3 {
        let Some(last) = self.samples.back() else {
            return Vec3::ZERO;
        };
        let cutoff = last.timestamp - window;
        let mut inside = self.samples.iter().filter(|s| s.timestamp >= cutoff);
        let Some(first) = inside.next() else {
            return Vec3::ZERO;
        };
        if inside.next().is_none() {
            return Vec3::ZERO;
        }

        let dt = last.timestamp - first.timestamp;
        if dt < min_span || dt <= 0.0 {
            return Vec3::ZERO;
        }
        (last.position - first.position) / dt as f32
    }

    /// Velocity between the oldest and newest sample (zero for a zero span)
    pub fn endpoint_velocity(&self) -> Vec3 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) if self.samples.len() >= 2 => {
                let dt = last.timestamp - first.timestamp;
                if dt > 0.0 {
                    (last.position - first.position) / dt as f32
                } else {
                    Vec3::ZERO
                }
            }
            _ => Vec3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(step: f64, count: usize, speed: f32) -> SampleHistory {
        let mut history = SampleHistory::new(30, 1.0 / 60.0, Some(0.25));
        for i in 0..count {
            let t = i as f64 * step;
            history.push(Vec3::new(0.0, 0.0, speed * t as f32), t);
        }
        history
    }

    #[test]
    fn test_min_interval_dedup() {
        let mut history = SampleHistory::new(10, 0.1, None);
        assert!(history.push(Vec3::ZERO, 0.0));
        assert!(!history.push(Vec3::X, 0.05));
        assert!(history.push(Vec3::X, 0.1));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_accumulated_60hz_clock_keeps_every_frame() {
        let dt = 1.0 / 60.0;
        let mut history = SampleHistory::new(100, dt, None);
        let mut clock = 0.0;
        for i in 0..60 {
            clock += dt;
            assert!(history.push(Vec3::splat(i as f32), clock), "frame {} dropped", i);
        }
        assert_eq!(history.len(), 60);
    }

    #[test]
    fn test_capacity_cap() {
        let mut history = SampleHistory::new(3, 0.0, None);
        for i in 0..5 {
            history.push(Vec3::splat(i as f32), i as f64);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.first().unwrap().timestamp, 2.0);
    }

    #[test]
    fn test_window_prunes_old_samples() {
        let history = filled(0.05, 10, 1.0);
        // Newest at 0.45, window 0.25 keeps 0.20..=0.45
        let first = history.first().unwrap().timestamp;
        assert!(first > 0.15 && first < 0.26);
        assert!(history.span() <= 0.25 + 1e-9);
        assert!(history.len() < 10);
    }

    #[test]
    fn test_windowed_velocity() {
        let history = filled(0.04, 6, 0.5);
        let v = history.windowed_velocity(0.25, 0.15);
        assert!((v.z - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_windowed_velocity_short_span_is_zero() {
        let history = filled(0.04, 3, 0.5);
        assert_eq!(history.windowed_velocity(0.25, 0.15), Vec3::ZERO);
        let single = filled(0.04, 1, 0.5);
        assert_eq!(single.windowed_velocity(0.25, 0.0), Vec3::ZERO);
    }

    #[test]
    fn test_endpoint_velocity() {
        let mut history = SampleHistory::new(10, 0.0, None);
        history.push(Vec3::ZERO, 1.0);
        assert_eq!(history.endpoint_velocity(), Vec3::ZERO);
        history.push(Vec3::new(1.0, 0.0, 0.0), 1.5);
        assert!((history.endpoint_velocity().x - 2.0).abs() < 1e-6);
    }
}
