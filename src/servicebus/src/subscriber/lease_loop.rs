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

use super::lease_state::Leases;
use super::leaser::Leaser;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, PartialEq)]
pub(super) struct LeaseOptions {
    /// How often the locks of in-flight messages are renewed.
    pub(super) renew_period: Duration,
    /// Locks are not renewed past this time.
    pub(super) max_lease_extension: Duration,
}

/// A background task renewing the locks of in-flight messages.
#[derive(Debug)]
pub(super) struct LeaseLoop {
    handle: JoinHandle<()>,
    shutdown: CancellationToken,
}

impl LeaseLoop {
    pub(super) fn new(leases: Arc<Leases>, leaser: Arc<dyn Leaser>, options: LeaseOptions) -> Self {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let mut renew = interval_at(Instant::now() + options.renew_period, options.renew_period);
        renew.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = renew.tick() => {
                        let lock_tokens = leases.to_renew(options.max_lease_extension);
                        if lock_tokens.is_empty() {
                            continue;
                        }
                        for lock_token in leaser.renew(lock_tokens).await {
                            // The handler may still be running. Its
                            // disposition will fail, and the message will be
                            // redelivered.
                            if leases.settle(lock_token) {
                                tracing::warn!("lost the lock {lock_token} of an in-flight message");
                            }
                        }
                    },
                }
            }
        });
        Self { handle, shutdown }
    }

    /// Stops renewing locks, waiting for any renewal in progress.
    pub(super) async fn shutdown(&mut self) {
        self.shutdown.cancel();
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!("the lease loop task failed: {e}");
        }
    }
}

impl Drop for LeaseLoop {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
