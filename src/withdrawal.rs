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

//! Withdrawal coordination: sufficiency check, planning, and the
//! two-phase apply with rollback.
//!
//! The [`Dispenser`] owns no lock of its own. It relies on the vault's
//! per-denomination atomicity and defends against concurrent mutation
//! between planning and execution by re-verifying every plan entry
//! immediately before committing, and by rolling back the exact committed
//! prefix when a commit fails mid-sequence.

use crate::base::{CorrelationId, Currency};
use crate::error::WithdrawalError;
use crate::planner::{Plan, plan};
use crate::vault::{NoteCounts, Vault};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Terminal outcome classes for withdrawals and reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    Success,
    InsufficientFunds,
    InvalidAmount,
    TechnicalError,
}

impl From<&WithdrawalError> for WithdrawalStatus {
    fn from(error: &WithdrawalError) -> Self {
        match error {
            WithdrawalError::InsufficientFunds => WithdrawalStatus::InsufficientFunds,
            WithdrawalError::InvalidAmount => WithdrawalStatus::InvalidAmount,
            WithdrawalError::DuplicateCorrelation | WithdrawalError::Technical(_) => {
                WithdrawalStatus::TechnicalError
            }
        }
    }
}

/// A request to dispense an exact amount of one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub currency: Currency,
    pub amount: Decimal,
    pub correlation_id: CorrelationId,
}

impl WithdrawalRequest {
    pub fn new(currency: Currency, amount: Decimal, correlation_id: CorrelationId) -> Self {
        Self {
            currency,
            amount,
            correlation_id,
        }
    }
}

/// Immutable record of a finished withdrawal attempt.
///
/// Every business outcome is reported through this record; the engine
/// never raises a fault for an expected condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawalResult {
    pub status: WithdrawalStatus,
    pub requested_amount: Decimal,
    pub dispensed_amount: Decimal,
    pub dispensed_notes: NoteCounts,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: CorrelationId,
    pub error_detail: Option<String>,
}

impl WithdrawalResult {
    /// Successful result; the dispensed amount is derived from the notes.
    pub fn success(
        requested_amount: Decimal,
        dispensed_notes: NoteCounts,
        correlation_id: CorrelationId,
    ) -> Self {
        let dispensed_amount = dispensed_notes
            .iter()
            .map(|(denomination, count)| denomination.value() * Decimal::from(*count))
            .sum();
        Self {
            status: WithdrawalStatus::Success,
            requested_amount,
            dispensed_amount,
            dispensed_notes,
            timestamp: Utc::now(),
            correlation_id,
            error_detail: None,
        }
    }

    /// Failed result carrying the error's status class and display message.
    pub fn rejected(
        requested_amount: Decimal,
        correlation_id: CorrelationId,
        error: &WithdrawalError,
    ) -> Self {
        Self {
            status: error.into(),
            requested_amount,
            dispensed_amount: Decimal::ZERO,
            dispensed_notes: NoteCounts::new(),
            timestamp: Utc::now(),
            correlation_id,
            error_detail: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == WithdrawalStatus::Success
    }
}

/// Orchestrates a withdrawal against the vault.
#[derive(Debug, Clone)]
pub struct Dispenser {
    vault: Arc<Vault>,
}

impl Dispenser {
    pub fn new(vault: Arc<Vault>) -> Self {
        Self { vault }
    }

    /// Processes a withdrawal request end to end.
    ///
    /// # Panics
    ///
    /// Panics if a committed plan's value differs from the requested
    /// amount. That can only happen through a planner defect and must
    /// surface loudly rather than as a business error.
    pub fn withdraw(&self, request: &WithdrawalRequest) -> WithdrawalResult {
        info!(
            currency = %request.currency,
            amount = %request.amount,
            correlation_id = %request.correlation_id,
            "processing withdrawal"
        );

        match self.carve(request.currency, request.amount) {
            Ok(plan) => {
                let dispensed = plan.total();
                assert_eq!(
                    dispensed, request.amount,
                    "committed plan value diverged from requested amount"
                );
                info!(
                    amount = %dispensed,
                    currency = %request.currency,
                    correlation_id = %request.correlation_id,
                    "withdrawal dispensed"
                );
                WithdrawalResult::success(
                    request.amount,
                    plan.note_counts(),
                    request.correlation_id.clone(),
                )
            }
            Err(error) => {
                WithdrawalResult::rejected(request.amount, request.correlation_id.clone(), &error)
            }
        }
    }

    /// Removes an exact amount of notes from the vault: sufficiency check,
    /// greedy plan, then verify-and-commit with rollback.
    ///
    /// Shared by plain withdrawals and by reservations, which carve notes
    /// out of the same pool under the same rules.
    pub(crate) fn carve(
        &self,
        currency: Currency,
        amount: Decimal,
    ) -> Result<Plan, WithdrawalError> {
        if amount <= Decimal::ZERO {
            // Callers validate positivity at the boundary; anything that
            // slips through is reported as a technical fault, not a
            // business outcome.
            return Err(WithdrawalError::technical("non-positive amount"));
        }

        let total_available = self.vault.total_value(currency);
        if total_available < amount {
            warn!(
                %currency,
                requested = %amount,
                available = %total_available,
                "insufficient funds in machine"
            );
            return Err(WithdrawalError::InsufficientFunds);
        }

        // The snapshot may be stale by commit time; apply() re-verifies.
        let snapshot = self.vault.snapshot();
        let plan = plan(currency, amount, &snapshot).ok_or_else(|| {
            warn!(%currency, requested = %amount, "no note combination for amount");
            WithdrawalError::InvalidAmount
        })?;

        self.apply(&plan)?;
        Ok(plan)
    }

    /// Two-phase apply: verify every entry, then commit in plan order,
    /// rolling back the committed prefix on mid-sequence failure.
    fn apply(&self, plan: &Plan) -> Result<(), WithdrawalError> {
        // Verify phase: nothing has been mutated yet, so a stale plan
        // aborts cleanly.
        for &(denomination, count) in plan.entries() {
            if !self.vault.can_dispense(denomination, count) {
                warn!(%denomination, count, "lost race for notes between planning and commit");
                return Err(WithdrawalError::technical(
                    "note mix changed before commit",
                ));
            }
        }

        // Commit phase, in descending face-value order.
        for (index, &(denomination, count)) in plan.entries().iter().enumerate() {
            if !self.vault.dispense(denomination, count) {
                error!(%denomination, count, "dispense failed mid-commit, rolling back");
                // Credit back exactly the prefix that succeeded.
                for &(returned, returned_count) in &plan.entries()[..index] {
                    self.vault.return_notes(returned, returned_count);
                }
                return Err(WithdrawalError::technical("dispense failed mid-commit"));
            }
        }

        Ok(())
    }
}
