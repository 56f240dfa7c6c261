// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::model::LockToken;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::{Duration, Instant};

#[derive(Debug, PartialEq)]
struct Lease {
    accepted: Instant,
    renew: bool,
}

#[derive(Debug, Default, PartialEq)]
struct LeaseState {
    under_lease: HashMap<LockToken, Lease>,
    stopping: bool,
    closed: bool,
}

/// The lock tokens of in-flight messages.
///
/// Every disposition goes through this registry. Only the first `settle()`
/// for a lock token succeeds, so a delivery is finalized at most once no matter
/// how many clones of its `Disposition` exist. Once the pump starts stopping
/// no settlement succeeds, and the remaining lock tokens are returned by
/// `close()`.
#[derive(Debug, Default)]
pub(super) struct Leases {
    state: Mutex<LeaseState>,
}

impl Leases {
    pub(super) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LeaseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept a new lock token under lease management.
    ///
    /// Returns false once the registry is closed.
    pub(super) fn add(&self, lock_token: LockToken) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.under_lease.insert(
            lock_token,
            Lease {
                accepted: Instant::now(),
                renew: true,
            },
        );
        true
    }

    /// Remove a lock token from lease management.
    ///
    /// Returns true if the caller should finalize the delivery. Returns false
    /// if the token was already settled or was never under lease, and also
    /// once the registry is stopping.
    pub(super) fn settle(&self, lock_token: LockToken) -> bool {
        let mut state = self.lock();
        if state.stopping || state.closed {
            return false;
        }
        state.under_lease.remove(&lock_token).is_some()
    }

    /// The lock tokens that need a renewal.
    ///
    /// Leases held for longer than `max_extension` are no longer renewed.
    pub(super) fn to_renew(&self, max_extension: Duration) -> Vec<LockToken> {
        let now = Instant::now();
        let mut state = self.lock();
        let mut renew = Vec::new();
        for (lock_token, lease) in state.under_lease.iter_mut().filter(|(_, l)| l.renew) {
            if now.duration_since(lease.accepted) >= max_extension {
                tracing::debug!("lock {lock_token} reached the maximum renewal time");
                lease.renew = false;
                continue;
            }
            renew.push(*lock_token);
        }
        renew
    }

    /// Reject any further settlement.
    ///
    /// Lock tokens stay under lease, and renewed, until `close()`.
    pub(super) fn stop(&self) {
        self.lock().stopping = true;
    }

    /// Close the registry, returning the lock tokens that were never settled.
    ///
    /// Any later `add()` or `settle()` is a no-op.
    pub(super) fn close(&self) -> Vec<LockToken> {
        let mut state = self.lock();
        state.closed = true;
        state.under_lease.drain().map(|(k, _)| k).collect()
    }

    #[cfg(test)]
    pub(super) fn contains(&self, lock_token: LockToken) -> bool {
        self.lock().under_lease.contains_key(&lock_token)
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.lock().under_lease.len()
    }
}
