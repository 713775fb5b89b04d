// Seawatch Sim - Unit presets
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Built-in simulation presets for the two field units.

pub mod buoy;
pub mod drone;
