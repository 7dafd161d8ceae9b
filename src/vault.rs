// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The note inventory: how many banknotes of each denomination the
//! machine currently holds.
//!
//! Every operation is individually atomic. Composite sequences that must
//! succeed or fail as a unit (a multi-denomination dispense) are the
//! caller's responsibility via the verify-then-commit protocol in
//! [`crate::withdrawal`].

use crate::base::{Currency, Denomination};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// A plain `Denomination -> count` map, used for snapshots, plans, and
/// dispensed-note records. A missing key reads as count zero.
pub type NoteCounts = HashMap<Denomination, u32>;

/// Thread-safe denomination inventory.
///
/// Counts never go negative: [`Vault::dispense`] refuses to decrement
/// below zero, and it is the only decrementing operation.
#[derive(Debug, Default)]
pub struct Vault {
    notes: DashMap<Denomination, u32>,
}

impl Vault {
    /// Creates an empty vault.
    pub fn new() -> Self {
        Self {
            notes: DashMap::new(),
        }
    }

    /// Current available count for a denomination; absent keys read as 0.
    pub fn count(&self, denomination: Denomination) -> u32 {
        self.notes.get(&denomination).map(|c| *c).unwrap_or(0)
    }

    /// Whether `count` notes of `denomination` are currently available.
    ///
    /// Advisory only: another caller may dispense between this check and a
    /// subsequent [`Vault::dispense`], which re-checks atomically.
    pub fn can_dispense(&self, denomination: Denomination, count: u32) -> bool {
        self.count(denomination) >= count
    }

    /// Atomically removes `count` notes iff that many are available.
    ///
    /// Returns whether the decrement happened. Never performs a partial
    /// decrement.
    pub fn dispense(&self, denomination: Denomination, count: u32) -> bool {
        if count == 0 {
            return true;
        }

        // Entry API gives an atomic check-and-decrement per key.
        match self.notes.entry(denomination) {
            Entry::Occupied(mut entry) => {
                let current = *entry.get();
                if current >= count {
                    *entry.get_mut() = current - count;
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Atomically credits `count` notes back.
    ///
    /// Used for rollback, reservation expiry, and initial loading. Has no
    /// failure mode: the notes are logically returned, not hardware-counted.
    pub fn return_notes(&self, denomination: Denomination, count: u32) {
        if count == 0 {
            return;
        }
        *self.notes.entry(denomination).or_insert(0) += count;
    }

    /// Point-in-time copy of the inventory.
    ///
    /// Suitable for enumerating candidate denominations; never assumed
    /// current by the time a plan built from it is executed.
    pub fn snapshot(&self) -> NoteCounts {
        self.notes
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    /// Sum of `count x face_value` over all denominations of `currency`.
    pub fn total_value(&self, currency: Currency) -> Decimal {
        self.notes
            .iter()
            .filter(|entry| entry.key().currency() == currency)
            .map(|entry| entry.key().value() * Decimal::from(*entry.value()))
            .sum()
    }
}
