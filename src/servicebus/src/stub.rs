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

//! Traits to plug a transport into the pump.
//!
//! The pump and the provisioner only depend on the message bus through these
//! traits. Applications should not need them, unless they are implementing a
//! transport or mocking one in their tests.

use crate::error::TransportError;
use crate::model::{LockToken, Message, SubscriptionDescriptor};
use std::time::Duration;

/// The result of [Management::create_subscription_if_absent].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Provisioned {
    /// The subscription did not exist and was created.
    Created,
    /// The subscription already existed, with this configuration.
    Existing(SubscriptionDescriptor),
}

/// The subscription administration operations used by the
/// [Provisioner][crate::client::Provisioner].
#[async_trait::async_trait]
pub trait Management: std::fmt::Debug + Send + Sync + 'static {
    /// Creates the subscription, unless it already exists.
    ///
    /// An existing subscription is not modified.
    async fn create_subscription_if_absent(
        &self,
        descriptor: &SubscriptionDescriptor,
    ) -> Result<Provisioned, TransportError>;
}

/// The receive-side operations on a single subscription, used by the
/// [MessagePump][crate::client::MessagePump].
#[async_trait::async_trait]
pub trait Receiver: std::fmt::Debug + Send + Sync + 'static {
    /// The namespace endpoint, used when reporting faults.
    fn endpoint(&self) -> String;

    /// The subscription path, used when reporting faults.
    fn entity_path(&self) -> String;

    /// Receives the next message in peek-lock mode.
    ///
    /// Waits up to `max_wait` for a message to become available. Returns
    /// `None` if no message arrives in that time.
    async fn receive(&self, max_wait: Duration) -> Result<Option<Message>, TransportError>;

    /// Completes the delivery, removing the message from the subscription.
    async fn acknowledge(&self, lock_token: LockToken) -> Result<(), TransportError>;

    /// Releases the lock, making the message available for redelivery.
    async fn abandon(&self, lock_token: LockToken) -> Result<(), TransportError>;

    /// Extends the lock of a delivery by the subscription lock duration.
    async fn renew_lock(&self, lock_token: LockToken) -> Result<(), TransportError>;

    /// Releases the connection to the message bus.
    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
