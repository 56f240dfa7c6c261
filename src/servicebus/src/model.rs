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

//! The messages, lock tokens and subscription descriptors used by the pump.

use crate::error::ProvisionError;
use bytes::Bytes;
use std::time::Duration;

/// The declarative configuration of a subscription.
///
/// # Example
/// ```
/// # use service_bus_pump::model::SubscriptionDescriptor;
/// # use std::time::Duration;
/// let descriptor = SubscriptionDescriptor::new("orders", "billing")
///     .set_message_time_to_live(Duration::from_secs(20))
///     .set_lock_duration(Duration::from_secs(20))
///     .set_auto_delete_on_idle(Duration::from_secs(300))
///     .set_max_delivery_count(10_u32);
/// assert_eq!(descriptor.entity_path(), "orders/Subscriptions/billing");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct SubscriptionDescriptor {
    /// The topic the subscription receives messages from.
    pub topic_name: String,

    /// The name of the subscription, unique within the topic.
    pub subscription_name: String,

    /// How long a message stays available before it expires.
    pub message_time_to_live: Duration,

    /// How long a received message stays locked for the receiver.
    ///
    /// Must not exceed [message_time_to_live][Self::message_time_to_live].
    pub lock_duration: Duration,

    /// The subscription is deleted after being idle this long.
    pub auto_delete_on_idle: Duration,

    /// The number of deliveries before a message is dead-lettered.
    pub max_delivery_count: u32,
}

impl SubscriptionDescriptor {
    /// Creates a descriptor with the service defaults.
    ///
    /// Messages never expire, the subscription is never deleted for being
    /// idle, locks last 60 seconds, and messages are dead-lettered after 10
    /// deliveries.
    pub fn new<T, S>(topic_name: T, subscription_name: S) -> Self
    where
        T: Into<String>,
        S: Into<String>,
    {
        Self {
            topic_name: topic_name.into(),
            subscription_name: subscription_name.into(),
            message_time_to_live: Duration::MAX,
            lock_duration: Duration::from_secs(60),
            auto_delete_on_idle: Duration::MAX,
            max_delivery_count: 10,
        }
    }

    /// Sets the [message_time_to_live][Self::message_time_to_live] field.
    pub fn set_message_time_to_live<V: Into<Duration>>(mut self, v: V) -> Self {
        self.message_time_to_live = v.into();
        self
    }

    /// Sets the [lock_duration][Self::lock_duration] field.
    pub fn set_lock_duration<V: Into<Duration>>(mut self, v: V) -> Self {
        self.lock_duration = v.into();
        self
    }

    /// Sets the [auto_delete_on_idle][Self::auto_delete_on_idle] field.
    pub fn set_auto_delete_on_idle<V: Into<Duration>>(mut self, v: V) -> Self {
        self.auto_delete_on_idle = v.into();
        self
    }

    /// Sets the [max_delivery_count][Self::max_delivery_count] field.
    pub fn set_max_delivery_count<V: Into<u32>>(mut self, v: V) -> Self {
        self.max_delivery_count = v.into();
        self
    }

    /// The path of the subscription within its namespace.
    pub fn entity_path(&self) -> String {
        format!(
            "{}/Subscriptions/{}",
            self.topic_name, self.subscription_name
        )
    }

    /// Checks the descriptor before it is submitted for provisioning.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.topic_name.is_empty() {
            return Err(invalid("the topic name must not be empty"));
        }
        if self.subscription_name.is_empty() {
            return Err(invalid("the subscription name must not be empty"));
        }
        if self.max_delivery_count == 0 {
            return Err(invalid("the max delivery count must be at least 1"));
        }
        if self.lock_duration.is_zero() {
            return Err(invalid("the lock duration must not be zero"));
        }
        if self.lock_duration > self.message_time_to_live {
            return Err(invalid(format!(
                "the lock duration ({:?}) exceeds the message time to live ({:?})",
                self.lock_duration, self.message_time_to_live
            )));
        }
        Ok(())
    }
}

fn invalid<T: Into<String>>(msg: T) -> ProvisionError {
    ProvisionError::InvalidDescriptor(msg.into())
}

/// Identifies a single locked delivery of a message.
///
/// Lock tokens are opaque. A new token is issued every time a message is
/// delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LockToken(uuid::Uuid);

impl LockToken {
    /// Creates a new, unique lock token.
    ///
    /// Only transports need to create lock tokens.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for LockToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LockToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A message received in peek-lock mode.
///
/// The message stays on the subscription until its delivery is acknowledged
/// using the [Disposition][crate::subscriber::handler::Disposition] handed to
/// the message handler.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Message {
    /// The sequence number assigned by the service when the message was
    /// accepted.
    pub sequence_number: u64,

    /// The lock token of this delivery.
    pub lock_token: LockToken,

    /// The message payload.
    pub body: Bytes,

    /// How many times this message was delivered, including this delivery.
    pub delivery_count: u32,
}

impl Message {
    /// Creates a message for its first delivery.
    ///
    /// Only transports need to create messages.
    pub fn new<B: Into<Bytes>>(sequence_number: u64, lock_token: LockToken, body: B) -> Self {
        Self {
            sequence_number,
            lock_token,
            body: body.into(),
            delivery_count: 1,
        }
    }

    /// Sets the [delivery_count][Self::delivery_count] field.
    pub fn set_delivery_count<V: Into<u32>>(mut self, v: V) -> Self {
        self.delivery_count = v.into();
        self
    }
}
