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

use super::fault::{FaultAction, FaultSink};
use super::handler::{Disposition, MessageHandler};
use super::lease_state::Leases;
use super::leaser::Leaser;
use crate::model::Message;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::CancellationToken;

/// What the pump does once a handler returns.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(super) struct Policy {
    pub(super) auto_complete_on_success: bool,
    pub(super) abandon_on_failure: bool,
}

/// Runs the handler for each delivery and finalizes its disposition.
pub(super) struct Dispatcher {
    handler: Arc<dyn MessageHandler>,
    leases: Arc<Leases>,
    leaser: Arc<dyn Leaser>,
    faults: FaultSink,
    policy: Policy,
    // Fires when the pump starts stopping. Handlers see it.
    cancel: CancellationToken,
    // Fires when the pump stops waiting for handlers.
    abort: CancellationToken,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("leases", &self.leases)
            .field("leaser", &self.leaser)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub(super) fn new(
        handler: Arc<dyn MessageHandler>,
        leases: Arc<Leases>,
        leaser: Arc<dyn Leaser>,
        faults: FaultSink,
        policy: Policy,
        cancel: CancellationToken,
        abort: CancellationToken,
    ) -> Self {
        Self {
            handler,
            leases,
            leaser,
            faults,
            policy,
            cancel,
            abort,
        }
    }

    /// Accepts a delivery under lease management.
    ///
    /// Returns false if the pump no longer accepts deliveries.
    pub(super) fn accept(&self, message: &Message) -> bool {
        self.leases.add(message.lock_token)
    }

    /// Handles a single delivery.
    ///
    /// The permit is held until the delivery is finalized, which bounds the
    /// number of concurrent handlers.
    pub(super) async fn dispatch(self: Arc<Self>, message: Message, permit: OwnedSemaphorePermit) {
        let lock_token = message.lock_token;
        let sequence_number = message.sequence_number;
        let disposition = Disposition::new(lock_token, self.leases.clone(), self.leaser.clone());
        let handling = AssertUnwindSafe(self.handler.handle(
            message,
            disposition.clone(),
            self.cancel.child_token(),
        ))
        .catch_unwind();

        let outcome = tokio::select! {
            biased;
            _ = self.abort.cancelled() => {
                // The lock token stays under lease management, the pump
                // abandons it while stopping.
                tracing::warn!("gave up waiting for the handler of message {sequence_number}");
                drop(permit);
                return;
            },
            outcome = handling => outcome,
        };

        match outcome {
            Ok(Ok(())) if self.policy.auto_complete_on_success => disposition.ack().await,
            Ok(Ok(())) => {
                // Any disposition the handler did not make is left to the
                // lock expiry.
                self.leases.settle(lock_token);
            }
            Ok(Err(e)) => {
                tracing::warn!("the handler for message {sequence_number} failed: {e}");
                self.faults.report(FaultAction::Other, e);
                self.on_failure(&disposition).await;
            }
            Err(_) => {
                tracing::warn!("the handler for message {sequence_number} panicked");
                self.faults.report(
                    FaultAction::Other,
                    format!("the handler for message {sequence_number} panicked"),
                );
                self.on_failure(&disposition).await;
            }
        }
        drop(permit);
    }

    async fn on_failure(&self, disposition: &Disposition) {
        if self.policy.abandon_on_failure {
            disposition.abandon().await;
        } else {
            // Leave the message locked. It is redelivered once the lock
            // expires.
            self.leases.settle(disposition.lock_token());
        }
    }
}
