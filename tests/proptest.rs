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

//! Property-based tests for the dispensing core.
//!
//! These tests verify invariants that should hold for any note ladder and
//! any requested amount.

use cashpoint_rs::{
    CorrelationId, Currency, Denomination, Engine, NoteCounts, Vault, WithdrawalRequest,
    WithdrawalStatus, plan,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

const FACES: [u32; 6] = [5000, 1000, 500, 100, 50, 10];

fn rub(face: u32) -> Denomination {
    Denomination::new(Currency::Rub, face)
}

/// Generate a note ladder over the canonical ruble faces (counts 0..=30).
fn arb_ladder() -> impl Strategy<Value = Vec<(u32, u32)>> {
    proptest::collection::vec(0u32..=30, FACES.len())
        .prop_map(|counts| FACES.iter().copied().zip(counts).collect())
}

/// Generate a positive amount that is a multiple of the smallest face.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1u32..=3_000).prop_map(|tens| Decimal::from(tens * 10))
}

fn snapshot_of(ladder: &[(u32, u32)]) -> NoteCounts {
    ladder
        .iter()
        .map(|&(face, count)| (rub(face), count))
        .collect()
}

fn engine_of(ladder: &[(u32, u32)]) -> Engine {
    let engine = Engine::new();
    for &(face, count) in ladder {
        engine.load(rub(face), count);
    }
    engine
}

// =============================================================================
// Planner Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// A feasible plan sums exactly to the amount and never takes more of a
    /// denomination than the snapshot holds.
    #[test]
    fn plan_is_exact_and_within_stock(
        ladder in arb_ladder(),
        amount in arb_amount(),
    ) {
        let snapshot = snapshot_of(&ladder);
        if let Some(plan) = plan(Currency::Rub, amount, &snapshot) {
            prop_assert_eq!(plan.total(), amount);
            for (denomination, count) in plan.entries() {
                prop_assert!(*count > 0);
                prop_assert!(*count <= snapshot[denomination]);
            }
        }
    }

    /// Planning is deterministic: same snapshot, same amount, same plan.
    #[test]
    fn plan_is_deterministic(
        ladder in arb_ladder(),
        amount in arb_amount(),
    ) {
        let snapshot = snapshot_of(&ladder);
        prop_assert_eq!(
            plan(Currency::Rub, amount, &snapshot),
            plan(Currency::Rub, amount, &snapshot)
        );
    }

    /// Plan entries stay in strictly descending face-value order.
    #[test]
    fn plan_order_is_descending(
        ladder in arb_ladder(),
        amount in arb_amount(),
    ) {
        let snapshot = snapshot_of(&ladder);
        if let Some(plan) = plan(Currency::Rub, amount, &snapshot) {
            let faces: Vec<u32> = plan.entries().iter().map(|(d, _)| d.face_value()).collect();
            for pair in faces.windows(2) {
                prop_assert!(pair[0] > pair[1]);
            }
        }
    }
}

// =============================================================================
// Withdrawal Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Conservation: value before equals value after plus whatever was
    /// dispensed, and failures change nothing.
    #[test]
    fn withdraw_conserves_total_value(
        ladder in arb_ladder(),
        amount in arb_amount(),
    ) {
        let engine = engine_of(&ladder);
        let before = engine.total_available(Currency::Rub);

        let result = engine.withdraw(WithdrawalRequest::new(
            Currency::Rub,
            amount,
            CorrelationId::from("p-1"),
        ));

        let after = engine.total_available(Currency::Rub);
        prop_assert_eq!(before, after + result.dispensed_amount);
        if !result.is_success() {
            prop_assert_eq!(before, after);
            prop_assert_eq!(result.dispensed_amount, Decimal::ZERO);
        }
    }

    /// A single-threaded withdrawal succeeds exactly when the planner finds
    /// a combination, and then dispenses the exact amount.
    #[test]
    fn withdraw_succeeds_iff_plannable(
        ladder in arb_ladder(),
        amount in arb_amount(),
    ) {
        let vault = Vault::new();
        for &(face, count) in &ladder {
            vault.return_notes(rub(face), count);
        }
        let plannable = plan(Currency::Rub, amount, &vault.snapshot()).is_some();
        let sufficient = vault.total_value(Currency::Rub) >= amount;

        let engine = engine_of(&ladder);
        let result = engine.withdraw(WithdrawalRequest::new(
            Currency::Rub,
            amount,
            CorrelationId::from("p-2"),
        ));

        if plannable && sufficient {
            prop_assert_eq!(result.status, WithdrawalStatus::Success);
            prop_assert_eq!(result.dispensed_amount, amount);
        } else {
            prop_assert!(!result.is_success());
        }
    }

    /// Reserving and redeeming moves exactly the same value out of the
    /// machine as a direct withdrawal of the same amount.
    #[test]
    fn reserve_redeem_matches_withdraw(
        ladder in arb_ladder(),
        amount in arb_amount(),
    ) {
        let direct = engine_of(&ladder);
        let withdrawn = direct.withdraw(WithdrawalRequest::new(
            Currency::Rub,
            amount,
            CorrelationId::from("p-3"),
        ));

        let reserved_engine = engine_of(&ladder);
        let reserved = reserved_engine.reserve("owner", Currency::Rub, amount, None, None);
        prop_assert_eq!(reserved.status, withdrawn.status);

        if let Some(code) = reserved.claim_code {
            let redeemed = reserved_engine.redeem(&code);
            prop_assert!(redeemed.is_success());
            prop_assert_eq!(redeemed.dispensed_amount, withdrawn.dispensed_amount);
            prop_assert_eq!(&redeemed.dispensed_notes, &withdrawn.dispensed_notes);
        }

        prop_assert_eq!(
            reserved_engine.total_available(Currency::Rub),
            direct.total_available(Currency::Rub)
        );
    }

    /// Dispensed note counts never exceed what was loaded.
    #[test]
    fn dispensed_notes_come_from_stock(
        ladder in arb_ladder(),
        amount in arb_amount(),
    ) {
        let engine = engine_of(&ladder);
        let stock = engine.snapshot();

        let result = engine.withdraw(WithdrawalRequest::new(
            Currency::Rub,
            amount,
            CorrelationId::from("p-4"),
        ));

        for (denomination, count) in &result.dispensed_notes {
            prop_assert!(count <= &stock[denomination]);
        }
    }
}
