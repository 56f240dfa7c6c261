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

//! Handlers for the messages received by a [MessagePump][crate::client::MessagePump].
//!
//! The pump calls the application's [MessageHandler] once per delivery. The
//! handler settles the delivery through its [Disposition]: acknowledging it
//! removes the message from the subscription, abandoning it makes the message
//! available for redelivery.

use super::lease_state::Leases;
use super::leaser::Leaser;
use crate::error::HandlerError;
use crate::model::{LockToken, Message};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Application code processing received messages.
///
/// The pump may call `handle()` concurrently, up to the configured maximum
/// number of concurrent deliveries.
///
/// Closures with the right signature implement this trait:
///
/// ```
/// # use service_bus_pump::HandlerError;
/// # use service_bus_pump::model::Message;
/// # use service_bus_pump::subscriber::handler::{Disposition, MessageHandler};
/// # use tokio_util::sync::CancellationToken;
/// fn check<H: MessageHandler>(_: H) {}
/// check(|m: Message, d: Disposition, _: CancellationToken| async move {
///     println!("received {}", m.sequence_number);
///     d.ack().await;
///     Ok::<(), HandlerError>(())
/// });
/// ```
#[async_trait::async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Processes a single delivery.
    ///
    /// `cancel` fires as soon as the pump starts stopping. Handlers should
    /// return promptly once it fires. From then on the disposition is a no-op
    /// and the pump abandons the message when it finishes stopping.
    ///
    /// Returning an error never acknowledges the message.
    async fn handle(
        &self,
        message: Message,
        disposition: Disposition,
        cancel: CancellationToken,
    ) -> Result<(), HandlerError>;
}

#[async_trait::async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(Message, Disposition, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(
        &self,
        message: Message,
        disposition: Disposition,
        cancel: CancellationToken,
    ) -> Result<(), HandlerError> {
        (self)(message, disposition, cancel).await
    }
}

/// Settles a single delivery.
///
/// Only the first `ack()` or `abandon()` takes effect. Any later call, from
/// any clone of this handle, is a no-op. The handle must be used before the
/// handler returns: once the handler returns the pump finalizes the delivery,
/// and later calls are also no-ops. Calls made after the pump starts stopping
/// are no-ops too.
#[derive(Clone, Debug)]
pub struct Disposition {
    lock_token: LockToken,
    leases: Arc<Leases>,
    leaser: Arc<dyn Leaser>,
}

impl Disposition {
    pub(super) fn new(lock_token: LockToken, leases: Arc<Leases>, leaser: Arc<dyn Leaser>) -> Self {
        Self {
            lock_token,
            leases,
            leaser,
        }
    }

    /// The lock token of the delivery.
    pub fn lock_token(&self) -> LockToken {
        self.lock_token
    }

    /// Acknowledges the message, removing it from the subscription.
    ///
    /// Failures are sent to the fault reporter.
    pub async fn ack(&self) {
        if self.leases.settle(self.lock_token) {
            self.leaser.ack(self.lock_token).await;
        } else {
            tracing::debug!("ignoring ack() for message {}, settled or stopping", self.lock_token);
        }
    }

    /// Abandons the message, making it available for redelivery.
    ///
    /// Failures are sent to the fault reporter.
    pub async fn abandon(&self) {
        if self.leases.settle(self.lock_token) {
            self.leaser.abandon(self.lock_token).await;
        } else {
            tracing::debug!("ignoring abandon() for message {}, settled or stopping", self.lock_token);
        }
    }
}
