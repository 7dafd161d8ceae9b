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

//! Deadlock detection tests using parking_lot's built-in deadlock detector.
//!
//! These tests verify that the locking patterns in the dispensing core —
//! per-denomination vault entries plus the reservation table's write lock —
//! do not lead to deadlocks under mixed concurrent workloads.

use cashpoint_rs::{CorrelationId, Currency, Denomination, Engine, WithdrawalRequest};
use chrono::Duration as ChronoDuration;
use parking_lot::deadlock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

fn rub(face: u32) -> Denomination {
    Denomination::new(Currency::Rub, face)
}

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150)); // Let detector thread exit
}

// === Tests ===

/// High contention on a single denomination with many threads.
#[test]
fn no_deadlock_high_contention_single_denomination() {
    let detector = start_deadlock_detector();
    let engine = Arc::new(Engine::new());
    engine.load(rub(500), 1_000);
    let counter = Arc::new(AtomicU32::new(0));

    const NUM_THREADS: usize = 32;
    const OPS_PER_THREAD: usize = 50;

    let mut handles = Vec::with_capacity(NUM_THREADS);
    for _ in 0..NUM_THREADS {
        let engine = engine.clone();
        let counter = counter.clone();

        handles.push(thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                let id = counter.fetch_add(1, Ordering::SeqCst);

                if i % 3 == 0 {
                    let _ = engine.withdraw(WithdrawalRequest::new(
                        Currency::Rub,
                        dec!(500),
                        CorrelationId(format!("d-{id}")),
                    ));
                } else if i % 3 == 1 {
                    engine.load(rub(500), 1);
                } else {
                    // Read operations
                    let _ = engine.total_available(Currency::Rub);
                    let _ = engine.snapshot();
                }
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    assert!(engine.total_available(Currency::Rub) >= Decimal::ZERO);
}

/// Mixed withdraw/reserve/redeem/list workload over one shared pool.
#[test]
fn no_deadlock_reservation_lifecycle_under_contention() {
    let detector = start_deadlock_detector();
    let engine = Arc::new(Engine::new());
    engine.load(rub(1000), 500);
    engine.load(rub(500), 500);
    let counter = Arc::new(AtomicU32::new(0));

    const NUM_THREADS: usize = 16;
    const OPS_PER_THREAD: usize = 30;

    let mut handles = Vec::with_capacity(NUM_THREADS);
    for thread_id in 0..NUM_THREADS {
        let engine = engine.clone();
        let counter = counter.clone();

        handles.push(thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                let id = counter.fetch_add(1, Ordering::SeqCst);

                match i % 4 {
                    0 => {
                        // Reserve with a short TTL so later sweeps have work.
                        let _ = engine.reserve(
                            &format!("owner-{thread_id}"),
                            Currency::Rub,
                            dec!(1500),
                            Some(ChronoDuration::milliseconds(5)),
                            None,
                        );
                    }
                    1 => {
                        // Reserve-then-redeem immediately.
                        let result = engine.reserve(
                            &format!("owner-{thread_id}"),
                            Currency::Rub,
                            dec!(1000),
                            None,
                            None,
                        );
                        if let Some(code) = result.claim_code {
                            let _ = engine.redeem(&code);
                        }
                    }
                    2 => {
                        let _ = engine.withdraw(WithdrawalRequest::new(
                            Currency::Rub,
                            dec!(500),
                            CorrelationId(format!("m-{id}")),
                        ));
                    }
                    _ => {
                        let _ = engine.list_active_reservations();
                        let _ = engine.total_available(Currency::Rub);
                    }
                }
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    // Every reservation left active still holds real notes; redeem them
    // all and verify nothing is stuck.
    for (code, _) in engine.list_active_reservations() {
        let _ = engine.redeem(&code);
    }
    assert!(engine.list_active_reservations().is_empty());
}

/// Sweeps triggered from several entry points at once.
#[test]
fn no_deadlock_concurrent_expiry_sweeps() {
    let detector = start_deadlock_detector();
    let engine = Arc::new(Engine::new());
    engine.load(rub(100), 2_000);

    // A batch of already-expired reservations for the sweeps to fight over.
    for i in 0..50 {
        let result = engine.reserve(
            &format!("stale-{i}"),
            Currency::Rub,
            dec!(100),
            Some(ChronoDuration::milliseconds(-1)),
            None,
        );
        assert!(result.is_success());
    }

    const NUM_THREADS: usize = 12;
    let mut handles = Vec::with_capacity(NUM_THREADS);
    for thread_id in 0..NUM_THREADS {
        let engine = engine.clone();
        handles.push(thread::spawn(move || {
            for i in 0..20 {
                match (thread_id + i) % 3 {
                    0 => {
                        let _ = engine.list_active_reservations();
                    }
                    1 => {
                        let _ = engine.redeem(&cashpoint_rs::ClaimCode::from("QR-UNKNOWN00000"));
                    }
                    _ => {
                        let _ = engine.reserve(
                            &format!("live-{thread_id}-{i}"),
                            Currency::Rub,
                            dec!(100),
                            None,
                            None,
                        );
                    }
                }
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    // Expired holds were credited back exactly once.
    let active: Decimal = engine
        .list_active_reservations()
        .values()
        .map(|reservation| reservation.amount)
        .sum();
    assert_eq!(
        engine.total_available(Currency::Rub) + active,
        dec!(200000)
    );
}
