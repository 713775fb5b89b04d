// Seawatch Sim - Integration Tests
//
// 1. Anomaly lifecycle through a full unit simulation
// 2. Signal bounds (property tests)
// 3. Configuration serialization

use approx::assert_relative_eq;
use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use proptest::prelude::*;
use seawatch::{Channel, Unit};
use seawatch_sim::{
    AnomalyConfig, AnomalyProfile, SignalModel, SimulationConfig, UnitSimulation,
};
use std::f64::consts::PI;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

fn quiet_turbidity() -> SignalModel {
    SignalModel::new(35.0, 5.0, 0.0)
        .with_phase(0.0)
        .with_limits(0.0, 60.0)
}

fn expected_turbidity(t: DateTime<Utc>) -> f64 {
    let hour = t.hour() as f64 + t.minute() as f64 / 60.0 + t.second() as f64 / 3600.0;
    35.0 + 5.0 * (2.0 * PI * hour / 24.0).sin()
}

// ============================================================================
// Anomaly lifecycle
// ============================================================================

#[test]
fn test_ballast_peaks_mid_event_and_ends_on_time() {
    let config = SimulationConfig::drone()
        .with_seed(42)
        .with_anomaly(AnomalyConfig::disabled())
        .with_model(Channel::Turbidity, quiet_turbidity());
    let mut sim = UnitSimulation::new(config).unwrap();

    sim.force_anomaly(AnomalyProfile::ballast(), 60.0, t0());
    assert!(sim.anomalies().is_active());

    let mid = t0() + Duration::seconds(30);
    let values = sim.tick(mid);
    let offset = values.get(Channel::Turbidity).unwrap() - expected_turbidity(mid);
    assert_relative_eq!(offset, 20.0, epsilon = 1e-9);

    let after = t0() + Duration::seconds(61);
    let values = sim.tick(after);
    assert!(!sim.anomalies().is_active());
    assert_relative_eq!(
        values.get(Channel::Turbidity).unwrap(),
        expected_turbidity(after),
        epsilon = 1e-9
    );
}

#[test]
fn test_ballast_is_quiet_at_event_edges() {
    let config = SimulationConfig::drone()
        .with_seed(1)
        .with_anomaly(AnomalyConfig::disabled())
        .with_model(Channel::Turbidity, quiet_turbidity());
    let mut sim = UnitSimulation::new(config).unwrap();

    sim.force_anomaly(AnomalyProfile::ballast(), 60.0, t0());
    let values = sim.tick(t0());
    assert_relative_eq!(
        values.get(Channel::Turbidity).unwrap(),
        expected_turbidity(t0()),
        epsilon = 1e-9
    );
}

#[test]
fn test_anomaly_drains_battery_faster() {
    let quiet = SimulationConfig::drone()
        .with_seed(9)
        .with_anomaly(AnomalyConfig::disabled());
    let mut calm = UnitSimulation::new(quiet.clone()).unwrap();
    let mut busy = UnitSimulation::new(quiet).unwrap();
    busy.force_anomaly(AnomalyProfile::ballast(), 600.0, t0());

    // The patrol starts on its first waypoint, so the first tick is an arrival
    calm.tick(t0());
    busy.tick(t0());

    let now = t0() + Duration::seconds(2);
    let calm_bat = calm.tick(now).get(Channel::Battery).unwrap();
    let busy_bat = busy.tick(now).get(Channel::Battery).unwrap();
    assert_relative_eq!(calm_bat, 85.0 - 0.003, epsilon = 1e-9);
    assert_relative_eq!(busy_bat, 85.0 - 0.005, epsilon = 1e-9);
}

#[test]
fn test_battery_holds_on_arrival_tick() {
    let config = SimulationConfig::drone()
        .with_seed(4)
        .with_anomaly(AnomalyConfig::disabled());
    let mut sim = UnitSimulation::new(config).unwrap();
    sim.force_anomaly(AnomalyProfile::ballast(), 600.0, t0());

    let values = sim.tick(t0());
    assert_eq!(sim.motion().unwrap().speed(), 0.0);
    assert_eq!(sim.motion().unwrap().target_index(), 1);
    assert_eq!(values.get(Channel::Battery), Some(85.0));

    let values = sim.tick(t0() + Duration::seconds(2));
    assert!(sim.motion().unwrap().speed() > 0.0);
    assert_relative_eq!(
        values.get(Channel::Battery).unwrap(),
        85.0 - 0.005,
        epsilon = 1e-9
    );
}

#[test]
fn test_drone_never_reports_buoy_channels() {
    let mut sim = UnitSimulation::new(SimulationConfig::drone().with_seed(3)).unwrap();
    for i in 0..100 {
        let values = sim.tick(t0() + Duration::seconds(2 * i));
        for (channel, _) in values.iter() {
            assert!(Unit::Drone.reports(channel), "unexpected {}", channel);
        }
    }
}

// ============================================================================
// Signal bounds
// ============================================================================

proptest! {
    #[test]
    fn prop_buoy_values_stay_in_band(seed in any::<u64>(), secs in 0i64..(7 * 86_400)) {
        let config = SimulationConfig::buoy()
            .with_seed(seed)
            .with_anomaly(AnomalyConfig::disabled());
        let models = config.channels.clone();
        let mut sim = UnitSimulation::new(config).unwrap();
        let values = sim.tick(t0() + Duration::seconds(secs));

        for m in &models {
            let (low, high) = m.model.band();
            let v = values.get(m.channel).unwrap();
            prop_assert!(v >= low - 1e-9 && v <= high + 1e-9, "{} = {}", m.channel, v);
        }
    }

    #[test]
    fn prop_drone_values_respect_limits(seed in any::<u64>(), ticks in 1usize..200) {
        let config = SimulationConfig::drone().with_seed(seed);
        let models = config.channels.clone();
        let mut sim = UnitSimulation::new(config).unwrap();

        for i in 0..ticks {
            let values = sim.tick(t0() + Duration::seconds(2 * i as i64));
            for m in &models {
                let (min, max) = m.model.limits.unwrap();
                let v = values.get(m.channel).unwrap();
                prop_assert!(v >= min && v <= max, "{} = {}", m.channel, v);
            }
            let bat = values.get(Channel::Battery).unwrap();
            prop_assert!((10.0..=100.0).contains(&bat));
        }
    }

    #[test]
    fn prop_storm_overrides_within_profile(seed in any::<u64>()) {
        let config = SimulationConfig::buoy()
            .with_seed(seed)
            .with_anomaly(AnomalyConfig::disabled());
        let mut sim = UnitSimulation::new(config).unwrap();
        sim.force_anomaly(AnomalyProfile::storm(), 120.0, t0());
        let values = sim.tick(t0() + Duration::seconds(30));

        let wind = values.get(Channel::WindSpeed).unwrap();
        let current = values.get(Channel::CurrentSpeed).unwrap();
        let press = values.get(Channel::Pressure).unwrap();
        prop_assert!((8.0..=15.0).contains(&wind));
        prop_assert!((1.0..=2.0).contains(&current));
        prop_assert!((0.8..=1.2).contains(&press));
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_json_roundtrip() {
    let config = SimulationConfig::buoy().with_seed(5);
    let json = serde_json::to_string(&config).unwrap();
    let back: SimulationConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_invalid_anomaly_rejected() {
    let config = SimulationConfig::drone().with_anomaly(AnomalyConfig::ballast().with_probability(1.5));
    assert!(UnitSimulation::new(config).is_err());
}
