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
use crate::model::LockToken;
use crate::stub::Receiver;
use std::sync::Arc;

/// A trait representing leaser actions
///
/// We stub out the interface, in order to test the lease management.
#[async_trait::async_trait]
pub(crate) trait Leaser: std::fmt::Debug + Send + Sync {
    /// Acknowledge a message.
    async fn ack(&self, lock_token: LockToken);
    /// Abandon a message.
    async fn abandon(&self, lock_token: LockToken);
    /// Renew the locks for a batch of messages.
    ///
    /// Returns the lock tokens whose locks are lost.
    async fn renew(&self, lock_tokens: Vec<LockToken>) -> Vec<LockToken>;
}

/// The leaser used by the pump, backed by the transport.
///
/// Transport errors are sent to the fault reporter. They never reach the
/// message handler.
#[derive(Debug)]
pub(super) struct DefaultLeaser<R>
where
    R: Receiver,
{
    inner: Arc<R>,
    faults: FaultSink,
}

impl<R> DefaultLeaser<R>
where
    R: Receiver,
{
    pub(super) fn new(inner: Arc<R>, faults: FaultSink) -> Self {
        Self { inner, faults }
    }
}

#[async_trait::async_trait]
impl<R> Leaser for DefaultLeaser<R>
where
    R: Receiver,
{
    async fn ack(&self, lock_token: LockToken) {
        if let Err(e) = self.inner.acknowledge(lock_token).await {
            self.faults.report(FaultAction::Completing, e);
        }
    }

    async fn abandon(&self, lock_token: LockToken) {
        if let Err(e) = self.inner.abandon(lock_token).await {
            self.faults.report(FaultAction::Abandoning, e);
        }
    }

    async fn renew(&self, lock_tokens: Vec<LockToken>) -> Vec<LockToken> {
        let results = futures::future::join_all(
            lock_tokens
                .iter()
                .map(|lock_token| self.inner.renew_lock(*lock_token)),
        )
        .await;
        let mut lost = Vec::new();
        for (lock_token, result) in lock_tokens.into_iter().zip(results) {
            match result {
                Ok(()) => {}
                Err(e) if e.is_lock_lost() => lost.push(lock_token),
                Err(e) => self.faults.report(FaultAction::RenewingLock, e),
            }
        }
        lost
    }
}
