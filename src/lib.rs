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

//! # Cashpoint
//!
//! This library provides the cash-dispensing core of an automated teller
//! machine: a thread-safe banknote inventory, a greedy denomination
//! selection algorithm, atomic withdrawals with rollback, and claim-code
//! reservations with automatic expiry.
//!
//! ## Core Components
//!
//! - [`Engine`]: Facade exposing withdraw, reserve, redeem, and queries
//! - [`Vault`]: Thread-safe denomination inventory
//! - [`Dispenser`]: Withdrawal coordinator (verify-then-commit with rollback)
//! - [`ReservationBook`]: Claim-code reservations with passive expiry
//! - [`WithdrawalError`]: Failure taxonomy shared by all operations
//!
//! ## Example
//!
//! ```
//! use cashpoint_rs::{CorrelationId, Currency, Denomination, Engine, WithdrawalRequest};
//! use rust_decimal_macros::dec;
//!
//! let engine = Engine::new();
//! engine.load(Denomination::new(Currency::Rub, 1000), 50);
//! engine.load(Denomination::new(Currency::Rub, 500), 100);
//!
//! // Dispense 1500: one 1000 note and one 500 note.
//! let result = engine.withdraw(WithdrawalRequest::new(
//!     Currency::Rub,
//!     dec!(1500),
//!     CorrelationId::from("session-1"),
//! ));
//! assert!(result.is_success());
//! assert_eq!(result.dispensed_amount, dec!(1500));
//! assert_eq!(engine.total_available(Currency::Rub), dec!(98500));
//! ```
//!
//! ## Thread Safety
//!
//! All engine operations are safe to call from multiple threads. The vault
//! performs per-denomination atomic updates; multi-note withdrawals guard
//! against races by re-verifying each plan entry immediately before commit
//! and rolling back the committed prefix on failure. The reservation table
//! serializes its sweep-then-act sequences behind a single write lock.

pub mod base;
pub mod engine;
pub mod error;
mod journal;
pub mod planner;
pub mod reservation;
pub mod vault;
pub mod withdrawal;

pub use base::{ClaimCode, CorrelationId, Currency, Denomination};
pub use engine::Engine;
pub use error::WithdrawalError;
pub use journal::Journal;
pub use planner::{Plan, plan};
pub use reservation::{Reservation, ReservationBook, ReservationResult, default_ttl};
pub use vault::{NoteCounts, Vault};
pub use withdrawal::{Dispenser, WithdrawalRequest, WithdrawalResult, WithdrawalStatus};
