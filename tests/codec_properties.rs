//! Property tests for the wire codec and threshold evaluation

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use seawatch::{codec, evaluate, Channel, ChannelValues, Provenance, Reading, ThresholdSet, Unit};

fn unit_strategy() -> impl Strategy<Value = Unit> {
    prop_oneof![Just(Unit::Drone), Just(Unit::Buoy)]
}

/// A value set inside each channel's physical range
fn values_strategy(unit: Unit) -> impl Strategy<Value = ChannelValues> {
    let ranges: Vec<_> = unit
        .channels()
        .iter()
        .map(|&c| {
            let (min, max) = c.physical_range();
            (Just(c), proptest::option::of(min..=max))
        })
        .collect();
    ranges.prop_map(|pairs| {
        let mut values = ChannelValues::new();
        for (channel, value) in pairs {
            if let Some(v) = value {
                values.set(channel, v);
            }
        }
        values
    })
}

fn reading(unit: Unit, values: &ChannelValues) -> Reading {
    let timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    Reading::from_values(unit, timestamp, Provenance::Real, values)
}

proptest! {
    #[test]
    fn prop_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let values = codec::decode_bytes(&bytes);
        for (_, v) in values.iter() {
            prop_assert!(v.is_finite());
        }
    }

    #[test]
    fn prop_decode_arbitrary_text(line in "\\PC{0,200}") {
        let decoded = codec::decode_line(&line);
        prop_assert!(decoded.values.len() <= decoded.accepted);
    }

    #[test]
    fn prop_roundtrip_within_precision(
        (unit, values) in unit_strategy().prop_flat_map(|u| (Just(u), values_strategy(u)))
    ) {
        let original = reading(unit, &values);
        let decoded = codec::decode(&codec::encode(&original));

        for &channel in unit.channels() {
            match original.get(channel) {
                Some(v) => {
                    let tolerance = 0.5 * 10f64.powi(-(channel.decimals() as i32)) + 1e-9;
                    let back = decoded.get(channel);
                    prop_assert!(back.is_some(), "{} lost", channel);
                    prop_assert!((back.unwrap() - v).abs() <= tolerance, "{}: {} vs {:?}", channel, v, back);
                }
                None => prop_assert!(decoded.get(channel).is_none()),
            }
        }
    }

    #[test]
    fn prop_adding_a_violation_never_lowers_count(
        values in values_strategy(Unit::Drone),
        turbidity in 41.5f64..1000.0,
    ) {
        let thresholds = ThresholdSet::drone();
        let before = evaluate(&reading(Unit::Drone, &values), &thresholds);
        let worse = values.clone().with(Channel::Turbidity, turbidity);
        let after = evaluate(&reading(Unit::Drone, &worse), &thresholds);
        prop_assert!(after.violations >= before.violations);
    }

    #[test]
    fn prop_foreign_keys_ignored_by_merge(value in 0.0f64..20.0) {
        let line = format!("WAVE:{:.1}|TEMP:25.0", value);
        let r = reading(Unit::Drone, &codec::decode(&line));
        prop_assert!(r.get(Channel::WaveHeight).is_none());
        prop_assert_eq!(r.get(Channel::Temperature), Some(25.0));
    }
}
