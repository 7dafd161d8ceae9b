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

//! Error types for dispensing and reservation operations.
//!
//! Business outcomes never propagate as faults: the engine folds every
//! [`WithdrawalError`] into a result record with the matching status and
//! the error's display message as detail.

use thiserror::Error;

/// Failure modes of withdrawal and reservation processing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalError {
    /// Total value of the currency in the machine falls short of the request.
    #[error("insufficient funds in requested currency")]
    InsufficientFunds,

    /// Value is sufficient in aggregate, but no note combination sums exactly.
    #[error("requested amount cannot be composed from available notes")]
    InvalidAmount,

    /// A request re-used a correlation id that was already accepted.
    #[error("duplicate correlation id")]
    DuplicateCorrelation,

    /// An internal invariant failed at execution time: a race lost between
    /// planning and committing, a claim-code collision, an unexpected fault.
    #[error("technical error: {0}")]
    Technical(String),
}

impl WithdrawalError {
    /// Technical error with a detail message.
    pub fn technical(detail: impl Into<String>) -> Self {
        Self::Technical(detail.into())
    }

    /// Uniform not-found-class error for unknown or expired claim codes.
    pub fn claim_not_found() -> Self {
        Self::Technical("invalid or expired claim".to_string())
    }
}
