// Seawatch - Telemetry acquisition core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Latest-value store shared between acquisition loops and readers
//!
//! Each unit has one slot holding an `Arc` to an immutable snapshot.
//! Publishing swaps the `Arc`; readers clone it. The lock is held only for
//! the swap or the clone, so a reader never sees a half-written reading.

use crate::link::LinkStatus;
use crate::protocol::{Reading, Unit};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// Latest reading and link status of one unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Latest reading
    pub reading: Reading,
    /// Link status at the time of the reading
    pub link: LinkStatus,
}

/// Per-unit latest-snapshot slots
#[derive(Debug, Default)]
pub struct SnapshotStore {
    slots: [RwLock<Option<Arc<Snapshot>>>; 2],
}

impl SnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot of the reading's unit
    pub fn publish(&self, reading: Reading, link: LinkStatus) -> Arc<Snapshot> {
        let unit = reading.unit;
        let snapshot = Arc::new(Snapshot { reading, link });
        *self.slots[unit.index()].write() = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Latest snapshot of a unit, `None` until the first publish
    pub fn latest(&self, unit: Unit) -> Option<Arc<Snapshot>> {
        self.slots[unit.index()].read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Provenance;
    use chrono::Utc;
    use std::thread;

    #[test]
    fn test_empty_until_published() {
        let store = SnapshotStore::new();
        assert!(store.latest(Unit::Drone).is_none());
        assert!(store.latest(Unit::Buoy).is_none());

        let reading = Reading::new(Unit::Buoy, Utc::now(), Provenance::Simulated);
        store.publish(reading.clone(), LinkStatus::default());

        assert!(store.latest(Unit::Drone).is_none());
        let snap = store.latest(Unit::Buoy).unwrap();
        assert_eq!(snap.reading, reading);
    }

    #[test]
    fn test_old_snapshot_survives_swap() {
        let store = SnapshotStore::new();
        let first = store.publish(
            Reading::new(Unit::Drone, Utc::now(), Provenance::Simulated),
            LinkStatus::default(),
        );
        let held = store.latest(Unit::Drone).unwrap();
        store.publish(
            Reading::new(Unit::Drone, Utc::now(), Provenance::Real),
            LinkStatus::default(),
        );
        assert!(Arc::ptr_eq(&first, &held));
        assert_eq!(held.reading.provenance, Provenance::Simulated);
        assert_eq!(
            store.latest(Unit::Drone).unwrap().reading.provenance,
            Provenance::Real
        );
    }

    #[test]
    fn test_concurrent_publish_and_read() {
        let store = Arc::new(SnapshotStore::new());
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..1000 {
                    store.publish(
                        Reading::new(Unit::Drone, Utc::now(), Provenance::Simulated),
                        LinkStatus::default(),
                    );
                }
            })
        };
        let mut seen = 0;
        while !writer.is_finished() || seen == 0 {
            if store.latest(Unit::Drone).is_some() {
                seen += 1;
            }
        }
        writer.join().unwrap();
        assert!(seen > 0);
    }
}
