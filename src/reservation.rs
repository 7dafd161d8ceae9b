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

//! Two-phase "reserve now, redeem later" withdrawals.
//!
//! A reservation carves notes out of the general pool at creation time, so
//! a later redemption can never fail for lack of funds. The held notes
//! live only in the reservation record; expiry is the sole path that
//! credits them back without a redemption.
//!
//! Expiry is passive: every entry point sweeps expired reservations before
//! acting, so no timer thread is required. A reservation's lifecycle is
//! `CREATED -> {REDEEMED | EXPIRED}`, arbitrated solely by lock ownership
//! and presence in the table.

use crate::base::{ClaimCode, CorrelationId, Currency};
use crate::error::WithdrawalError;
use crate::vault::{NoteCounts, Vault};
use crate::withdrawal::{Dispenser, WithdrawalResult, WithdrawalStatus};
use chrono::{DateTime, Duration, Utc};
use parking_lot::{RwLock, RwLockWriteGuard};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// How long a reservation stays claimable when the caller gives no TTL.
pub fn default_ttl() -> Duration {
    Duration::minutes(15)
}

/// An active hold on dispensed-but-unclaimed notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    pub claim_code: ClaimCode,
    pub currency: Currency,
    pub amount: Decimal,
    /// Notes already removed from the general pool; this record is the
    /// only place that temporary ownership split exists.
    pub held_notes: NoteCounts,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub metadata: Option<String>,
}

impl Reservation {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Immutable record of a finished reservation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationResult {
    pub status: WithdrawalStatus,
    pub claim_code: Option<ClaimCode>,
    pub requested_amount: Decimal,
    pub reserved_amount: Decimal,
    pub held_notes: NoteCounts,
    pub expires_at: Option<DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
    pub owner_id: String,
    pub error_detail: Option<String>,
}

impl ReservationResult {
    fn created(reservation: &Reservation) -> Self {
        Self {
            status: WithdrawalStatus::Success,
            claim_code: Some(reservation.claim_code.clone()),
            requested_amount: reservation.amount,
            reserved_amount: reservation.amount,
            held_notes: reservation.held_notes.clone(),
            expires_at: Some(reservation.expires_at),
            timestamp: reservation.created_at,
            owner_id: reservation.owner_id.clone(),
            error_detail: None,
        }
    }

    fn rejected(owner_id: &str, requested_amount: Decimal, error: &WithdrawalError) -> Self {
        Self {
            status: error.into(),
            claim_code: None,
            requested_amount,
            reserved_amount: Decimal::ZERO,
            held_notes: NoteCounts::new(),
            expires_at: None,
            timestamp: Utc::now(),
            owner_id: owner_id.to_string(),
            error_detail: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == WithdrawalStatus::Success
    }
}

/// The active-reservations table and its operations.
///
/// A single write lock guards every sweep-then-act sequence, so competing
/// reserve/redeem/expiry decisions can never interleave mid-sequence.
#[derive(Debug)]
pub struct ReservationBook {
    vault: Arc<Vault>,
    dispenser: Dispenser,
    active: RwLock<HashMap<ClaimCode, Reservation>>,
}

impl ReservationBook {
    pub fn new(vault: Arc<Vault>) -> Self {
        let dispenser = Dispenser::new(Arc::clone(&vault));
        Self {
            vault,
            dispenser,
            active: RwLock::new(HashMap::new()),
        }
    }

    /// Reserves an exact amount against a fresh claim code.
    ///
    /// The notes are physically removed from the general pool here, using
    /// the same sufficiency/plan/commit protocol as a direct withdrawal,
    /// so the set of reservable amounts is identical to the set of
    /// withdrawable ones.
    pub fn reserve(
        &self,
        owner_id: &str,
        currency: Currency,
        amount: Decimal,
        ttl: Duration,
        metadata: Option<String>,
    ) -> ReservationResult {
        info!(%currency, %amount, owner_id, "creating reservation");

        let mut active = self.active.write();
        // Capacity freed by expiry must be visible to this request.
        self.sweep(&mut active);

        let plan = match self.dispenser.carve(currency, amount) {
            Ok(plan) => plan,
            Err(error) => {
                warn!(owner_id, %amount, %error, "reservation rejected");
                return ReservationResult::rejected(owner_id, amount, &error);
            }
        };

        let claim_code = ClaimCode::generate();
        if active.contains_key(&claim_code) {
            // Practically unreachable with 48 random bits, but the notes
            // are already carved out and must go back.
            for &(denomination, count) in plan.entries() {
                self.vault.return_notes(denomination, count);
            }
            let error = WithdrawalError::technical("claim code collision");
            warn!(owner_id, %claim_code, "reservation rejected");
            return ReservationResult::rejected(owner_id, amount, &error);
        }

        let now = Utc::now();
        let reservation = Reservation {
            claim_code: claim_code.clone(),
            currency,
            amount,
            held_notes: plan.note_counts(),
            owner_id: owner_id.to_string(),
            created_at: now,
            expires_at: now + ttl,
            metadata,
        };
        let result = ReservationResult::created(&reservation);
        active.insert(claim_code.clone(), reservation);

        info!(
            %currency,
            %amount,
            owner_id,
            %claim_code,
            expires_at = %result.expires_at.unwrap_or(now),
            "reservation created"
        );
        result
    }

    /// Redeems a claim code, handing out the held notes.
    ///
    /// No inventory mutation happens here: the notes left the pool when
    /// the reservation was created. An unknown code and a just-expired one
    /// are indistinguishable by design, since the sweep runs first.
    pub fn redeem(&self, claim_code: &ClaimCode) -> WithdrawalResult {
        info!(%claim_code, "redeeming claim");

        let mut active = self.active.write();
        self.sweep(&mut active);

        let correlation_id = CorrelationId(format!("claim-{claim_code}"));
        match active.remove(claim_code) {
            None => {
                warn!(%claim_code, "claim code unknown or expired");
                WithdrawalResult::rejected(
                    Decimal::ZERO,
                    correlation_id,
                    &WithdrawalError::claim_not_found(),
                )
            }
            Some(reservation) => {
                info!(
                    amount = %reservation.amount,
                    currency = %reservation.currency,
                    owner_id = %reservation.owner_id,
                    %claim_code,
                    "reserved notes dispensed"
                );
                WithdrawalResult::success(
                    reservation.amount,
                    reservation.held_notes,
                    correlation_id,
                )
            }
        }
    }

    /// Read-only copy of the active table, after sweeping expired entries.
    pub fn list_active(&self) -> HashMap<ClaimCode, Reservation> {
        let mut active = self.active.write();
        self.sweep(&mut active);
        // Downgrade so concurrent listings can share the table once the
        // sweep is done.
        let active = RwLockWriteGuard::downgrade(active);
        active.clone()
    }

    /// Drops every expired reservation, crediting its held notes back.
    fn sweep(&self, active: &mut HashMap<ClaimCode, Reservation>) {
        active.retain(|claim_code, reservation| {
            if reservation.is_expired() {
                info!(
                    %claim_code,
                    owner_id = %reservation.owner_id,
                    amount = %reservation.amount,
                    "reservation expired, returning notes"
                );
                for (&denomination, &count) in &reservation.held_notes {
                    self.vault.return_notes(denomination, count);
                }
                false
            } else {
                true
            }
        });
    }
}
