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

//! Denomination selection: turn a requested amount into an exact multiset
//! of notes.
//!
//! The algorithm is greedy over descending face values. It minimizes the
//! number of notes handed out and preserves small denominations, but it is
//! not an exhaustive search: for non-canonical ladders it can miss a
//! feasible combination (amount 150 with only 100s and 200s in stock).
//! Realistic note ladders are canonical, so the limitation is accepted and
//! deliberately not papered over with a fallback search.
//!
//! Planning is pure: it reads a snapshot and performs no mutation, so it
//! is safe to call speculatively.

use crate::base::{Currency, Denomination};
use crate::vault::NoteCounts;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

/// An exact dispense plan: denominations and counts whose value sum equals
/// the planned amount.
///
/// Entries are kept in descending face-value order. The commit phase
/// applies them in this order, so on partial failure the rollback set is
/// exactly the prefix that succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    entries: Vec<(Denomination, u32)>,
}

impl Plan {
    /// Entries in descending face-value order.
    pub fn entries(&self) -> &[(Denomination, u32)] {
        &self.entries
    }

    /// Total value of the planned notes.
    pub fn total(&self) -> Decimal {
        self.entries
            .iter()
            .map(|(denomination, count)| denomination.value() * Decimal::from(*count))
            .sum()
    }

    /// The plan as a plain `Denomination -> count` map.
    pub fn note_counts(&self) -> NoteCounts {
        self.entries.iter().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Computes the note multiset for `amount` against a snapshot, or `None`
/// when no greedy combination sums exactly.
pub fn plan(currency: Currency, amount: Decimal, snapshot: &NoteCounts) -> Option<Plan> {
    let mut ladder: Vec<(Denomination, u32)> = snapshot
        .iter()
        .filter(|&(denomination, &count)| denomination.currency() == currency && count > 0)
        .map(|(denomination, &count)| (*denomination, count))
        .collect();
    // Ties cannot occur: the face value is part of the key's identity.
    ladder.sort_by(|a, b| b.0.face_value().cmp(&a.0.face_value()));

    let mut entries = Vec::new();
    let mut remaining = amount;

    for (denomination, available) in ladder {
        let face = denomination.value();
        if remaining < face {
            continue;
        }

        let wanted = (remaining / face).floor().to_u32().unwrap_or(u32::MAX);
        let take = wanted.min(available);
        if take > 0 {
            entries.push((denomination, take));
            remaining -= face * Decimal::from(take);
        }
    }

    if remaining.is_zero() {
        debug!(%currency, %amount, notes = entries.len(), "dispense plan found");
        Some(Plan { entries })
    } else {
        debug!(%currency, %amount, %remaining, "no exact note combination");
        None
    }
}
