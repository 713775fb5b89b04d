// Seawatch Sim - Motion model
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Waypoint-following motion for the drone.
//!
//! Each tick the drone moves a fixed step toward its current target
//! waypoint. Once within the arrival radius it switches to the next
//! waypoint, wrapping around at the end of the list. The position never
//! leaves a square box centred on `home`.

use rand::prelude::*;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

/// Metres per degree of latitude (approximate).
pub const METRES_PER_DEGREE: f64 = 111_000.0;

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Planar distance in degrees.
    pub fn distance_deg(&self, other: &GeoPoint) -> f64 {
        (other.lat - self.lat).hypot(other.lon - self.lon)
    }
}

/// Motion configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Centre of the patrol area and start position.
    pub home: GeoPoint,
    /// Patrol loop.
    pub waypoints: Vec<GeoPoint>,
    /// Distance covered per tick, degrees.
    pub step_degrees: f64,
    /// Distance at which a waypoint counts as reached, degrees.
    pub arrival_epsilon: f64,
    /// Half-width of the allowed box around `home`, degrees.
    pub bounding_box_degrees: f64,
    /// Standard deviation of GPS jitter on the reported fix, degrees.
    #[serde(default)]
    pub gps_jitter_degrees: f64,
}

impl MotionConfig {
    /// Patrol loop off Kribi.
    pub fn kribi_patrol() -> Self {
        Self {
            home: GeoPoint::new(4.2105, 6.4375),
            waypoints: vec![
                GeoPoint::new(4.2105, 6.4375),
                GeoPoint::new(4.2110, 6.4380),
                GeoPoint::new(4.2115, 6.4385),
                GeoPoint::new(4.2120, 6.4380),
                GeoPoint::new(4.2115, 6.4375),
                GeoPoint::new(4.2110, 6.4370),
            ],
            step_degrees: 0.0001,
            arrival_epsilon: 0.00005,
            bounding_box_degrees: 0.002,
            gps_jitter_degrees: 0.0,
        }
    }

    /// Set the waypoints.
    pub fn with_waypoints(mut self, waypoints: Vec<GeoPoint>) -> Self {
        self.waypoints = waypoints;
        self
    }

    /// Set the per-tick step.
    pub fn with_step(mut self, step_degrees: f64) -> Self {
        self.step_degrees = step_degrees;
        self
    }

    /// Check parameters; returns a reason on failure.
    pub fn check(&self) -> Result<(), String> {
        if self.waypoints.is_empty() {
            return Err("at least one waypoint is required".to_string());
        }
        if !(self.step_degrees > 0.0 && self.arrival_epsilon > 0.0) {
            return Err("step_degrees and arrival_epsilon must be > 0".to_string());
        }
        if !(self.bounding_box_degrees > 0.0) {
            return Err("bounding_box_degrees must be > 0".to_string());
        }
        if !(self.gps_jitter_degrees >= 0.0) {
            return Err("gps_jitter_degrees must be >= 0".to_string());
        }
        let outside = self.waypoints.iter().any(|w| {
            (w.lat - self.home.lat).abs() > self.bounding_box_degrees
                || (w.lon - self.home.lon).abs() > self.bounding_box_degrees
        });
        if outside {
            return Err("waypoint outside the bounding box".to_string());
        }
        Ok(())
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self::kribi_patrol()
    }
}

/// Kinematic state after a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    /// Reported position (with jitter).
    pub position: GeoPoint,
    /// Ground speed, m/s.
    pub speed: f64,
    /// Heading, degrees clockwise from north.
    pub heading: f64,
    /// True if the drone moved this tick.
    pub moving: bool,
}

/// Waypoint follower.
#[derive(Debug, Clone)]
pub struct MotionModel {
    config: MotionConfig,
    position: GeoPoint,
    target: usize,
    speed: f64,
    heading: f64,
}

impl MotionModel {
    /// Start at `home`, heading for the first waypoint.
    pub fn new(config: MotionConfig) -> Self {
        Self {
            position: config.home,
            config,
            target: 0,
            speed: 0.0,
            heading: 0.0,
        }
    }

    /// True position.
    pub fn position(&self) -> GeoPoint {
        self.position
    }

    /// Index of the waypoint being approached.
    pub fn target_index(&self) -> usize {
        self.target
    }

    /// Last speed, m/s.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Last heading, degrees.
    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// Advance by one tick of `dt_secs` seconds.
    pub fn step(&mut self, dt_secs: f64, rng: &mut (impl Rng + ?Sized)) -> MotionSample {
        let moving = match self.config.waypoints.get(self.target).copied() {
            Some(target) => {
                let dlat = target.lat - self.position.lat;
                let dlon = target.lon - self.position.lon;
                let distance = dlat.hypot(dlon);

                if distance > self.config.arrival_epsilon {
                    let step = self.config.step_degrees.min(distance);
                    self.position.lat += dlat / distance * step;
                    self.position.lon += dlon / distance * step;
                    self.heading = dlon.atan2(dlat).to_degrees().rem_euclid(360.0);
                    self.speed = if dt_secs > 0.0 {
                        step * METRES_PER_DEGREE / dt_secs
                    } else {
                        0.0
                    };
                    true
                } else {
                    self.target = (self.target + 1) % self.config.waypoints.len();
                    self.speed = 0.0;
                    false
                }
            }
            None => {
                self.speed = 0.0;
                false
            }
        };

        self.clamp_to_box();

        MotionSample {
            position: self.reported_position(rng),
            speed: self.speed,
            heading: self.heading,
            moving,
        }
    }

    fn clamp_to_box(&mut self) {
        let half = self.config.bounding_box_degrees;
        let home = self.config.home;
        self.position.lat = self.position.lat.clamp(home.lat - half, home.lat + half);
        self.position.lon = self.position.lon.clamp(home.lon - half, home.lon + half);
    }

    fn reported_position(&self, rng: &mut (impl Rng + ?Sized)) -> GeoPoint {
        let sigma = self.config.gps_jitter_degrees;
        match Normal::new(0.0, sigma) {
            Ok(jitter) if sigma > 0.0 => GeoPoint::new(
                self.position.lat + jitter.sample(rng),
                self.position.lon + jitter.sample(rng),
            ),
            _ => self.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn square() -> MotionConfig {
        MotionConfig {
            home: GeoPoint::new(0.0, 0.0),
            waypoints: vec![GeoPoint::new(0.001, 0.0), GeoPoint::new(0.0, 0.0)],
            step_degrees: 0.0004,
            arrival_epsilon: 0.00005,
            bounding_box_degrees: 0.002,
            gps_jitter_degrees: 0.0,
        }
    }

    #[test]
    fn test_moves_toward_target() {
        let mut rng = test_rng();
        let mut m = MotionModel::new(square());
        let s = m.step(2.0, &mut rng);
        assert!(s.moving);
        assert_relative_eq!(s.position.lat, 0.0004, epsilon = 1e-12);
        assert_relative_eq!(s.heading, 0.0, epsilon = 1e-9);
        assert_relative_eq!(s.speed, 0.0004 * METRES_PER_DEGREE / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_arrival_advances_and_wraps() {
        let mut rng = test_rng();
        let mut m = MotionModel::new(square());
        // 0.0004, 0.0008, 0.001 (capped step), then arrival
        for _ in 0..3 {
            assert!(m.step(2.0, &mut rng).moving);
        }
        let s = m.step(2.0, &mut rng);
        assert!(!s.moving);
        assert_eq!(s.speed, 0.0);
        assert_eq!(m.target_index(), 1);

        let s = m.step(2.0, &mut rng);
        assert!(s.moving);
        assert_relative_eq!(s.heading, 180.0, epsilon = 1e-9);

        // 0.0002, 0.0 (capped step), then arrival wraps to the first waypoint
        for _ in 0..3 {
            m.step(2.0, &mut rng);
        }
        assert_eq!(m.target_index(), 0);
    }

    #[test]
    fn test_position_stays_in_box() {
        let mut rng = test_rng();
        let config = MotionConfig::kribi_patrol();
        let home = config.home;
        let mut m = MotionModel::new(config);
        for _ in 0..5000 {
            let s = m.step(2.0, &mut rng);
            assert!((s.position.lat - home.lat).abs() <= 0.002 + 1e-12);
            assert!((s.position.lon - home.lon).abs() <= 0.002 + 1e-12);
        }
    }

    #[test]
    fn test_heading_east() {
        let mut rng = test_rng();
        let mut config = square();
        config.waypoints = vec![GeoPoint::new(0.0, 0.001)];
        let mut m = MotionModel::new(config);
        let s = m.step(1.0, &mut rng);
        assert_relative_eq!(s.heading, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_jitter_keeps_true_position() {
        let mut rng = test_rng();
        let mut config = square();
        config.gps_jitter_degrees = 0.00001;
        let mut m = MotionModel::new(config);
        let s = m.step(2.0, &mut rng);
        assert_relative_eq!(m.position().lat, 0.0004, epsilon = 1e-12);
        assert!((s.position.lat - 0.0004).abs() < 0.0001);
    }

    #[test]
    fn test_check() {
        assert!(MotionConfig::kribi_patrol().check().is_ok());
        assert!(square().with_waypoints(vec![]).check().is_err());
        assert!(square()
            .with_waypoints(vec![GeoPoint::new(0.01, 0.0)])
            .check()
            .is_err());
        assert!(square().with_step(0.0).check().is_err());
    }
}
