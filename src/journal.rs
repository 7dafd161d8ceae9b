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

//! Correlation-id journal with duplicate rejection.
//!
//! Every accepted withdrawal request is recorded before any notes move, so
//! a replayed correlation id is refused up front instead of dispensing
//! twice. The journal doubles as a FIFO audit trail of accepted requests.

use crate::base::CorrelationId;
use crate::error::WithdrawalError;
use crate::withdrawal::WithdrawalRequest;
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// Thread-safe request journal keyed by correlation id.
///
/// Combines a [`DashMap`] for O(1) duplicate checking with a [`SegQueue`]
/// preserving acceptance order. All operations are safe for concurrent
/// access.
#[derive(Debug, Default)]
pub struct Journal {
    /// Requests by correlation id, for duplicate detection and lookup.
    requests: DashMap<CorrelationId, Arc<WithdrawalRequest>>,

    /// Correlation ids in acceptance (FIFO) order.
    order: SegQueue<CorrelationId>,
}

impl Journal {
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
            order: SegQueue::new(),
        }
    }

    /// Records a request.
    ///
    /// # Errors
    ///
    /// Returns [`WithdrawalError::DuplicateCorrelation`] if a request with
    /// the same correlation id was already accepted.
    pub fn record(&self, request: Arc<WithdrawalRequest>) -> Result<(), WithdrawalError> {
        let correlation_id = request.correlation_id.clone();

        // Entry API gives an atomic check-and-insert under contention.
        match self.requests.entry(correlation_id.clone()) {
            Entry::Occupied(_) => Err(WithdrawalError::DuplicateCorrelation),
            Entry::Vacant(entry) => {
                entry.insert(request);
                self.order.push(correlation_id);
                Ok(())
            }
        }
    }

    /// Looks up an accepted request by correlation id.
    pub fn get(&self, correlation_id: &CorrelationId) -> Option<Arc<WithdrawalRequest>> {
        self.requests
            .get(correlation_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Number of accepted requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
