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

//! The cash-dispensing engine: the single entry point a request-handling
//! layer consumes.
//!
//! The engine wires the note vault, the withdrawal coordinator, the
//! reservation book, and the correlation-id journal. Callers are expected
//! to validate presence and positivity of currency/amount fields and to
//! generate a correlation id when their client omits one; everything past
//! that boundary is handled here and always answered with a result value.

use crate::base::{ClaimCode, Currency, Denomination};
use crate::journal::Journal;
use crate::reservation::{Reservation, ReservationBook, ReservationResult, default_ttl};
use crate::vault::{NoteCounts, Vault};
use crate::withdrawal::{Dispenser, WithdrawalRequest, WithdrawalResult};
use chrono::Duration;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// Cash-dispensing engine managing one machine's note inventory.
///
/// # Invariants
///
/// - Per-denomination counts never go negative.
/// - A failed withdrawal or reservation leaves the inventory in the same
///   logical state as before the call.
/// - Notes held by an active reservation are excluded from the dispensable
///   pool until redeemed or expired.
pub struct Engine {
    vault: Arc<Vault>,
    dispenser: Dispenser,
    reservations: ReservationBook,
    /// Accepted withdrawal requests, for duplicate rejection and audit.
    journal: Journal,
}

impl Engine {
    /// Creates an engine with an empty vault.
    pub fn new() -> Self {
        let vault = Arc::new(Vault::new());
        Engine {
            dispenser: Dispenser::new(Arc::clone(&vault)),
            reservations: ReservationBook::new(Arc::clone(&vault)),
            vault,
            journal: Journal::new(),
        }
    }

    /// Loads notes into the vault. Used for initial seeding and restock.
    pub fn load(&self, denomination: Denomination, count: u32) {
        self.vault.return_notes(denomination, count);
    }

    /// Processes a withdrawal request.
    ///
    /// A correlation id that was already accepted is refused with a
    /// `TECHNICAL_ERROR` result before any notes move.
    pub fn withdraw(&self, request: WithdrawalRequest) -> WithdrawalResult {
        let request = Arc::new(request);
        if let Err(error) = self.journal.record(Arc::clone(&request)) {
            return WithdrawalResult::rejected(
                request.amount,
                request.correlation_id.clone(),
                &error,
            );
        }
        self.dispenser.withdraw(&request)
    }

    /// Reserves an amount against a generated claim code.
    ///
    /// `ttl` defaults to 15 minutes when `None`.
    pub fn reserve(
        &self,
        owner_id: &str,
        currency: Currency,
        amount: Decimal,
        ttl: Option<Duration>,
        metadata: Option<String>,
    ) -> ReservationResult {
        self.reservations.reserve(
            owner_id,
            currency,
            amount,
            ttl.unwrap_or_else(default_ttl),
            metadata,
        )
    }

    /// Redeems a claim code for its held notes.
    pub fn redeem(&self, claim_code: &ClaimCode) -> WithdrawalResult {
        self.reservations.redeem(claim_code)
    }

    /// Snapshot of active reservations, after sweeping expired ones.
    pub fn list_active_reservations(&self) -> HashMap<ClaimCode, Reservation> {
        self.reservations.list_active()
    }

    /// Total dispensable value for a currency (held notes excluded).
    pub fn total_available(&self, currency: Currency) -> Decimal {
        self.vault.total_value(currency)
    }

    /// Point-in-time copy of the note inventory, for reporting.
    pub fn snapshot(&self) -> NoteCounts {
        self.vault.snapshot()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
