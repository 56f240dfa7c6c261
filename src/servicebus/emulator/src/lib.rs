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

//! An in-memory message bus.
//!
//! The emulator implements the [Management] and [Receiver] traits from the
//! message pump crate. It keeps topics and subscriptions in memory and models
//! the peek-lock semantics a real broker provides: message locks expire, the
//! delivery count grows with each delivery, and messages delivered too many
//! times move to a dead-letter sub-queue.
//!
//! It is intended for tests and samples. Nothing is persisted.
//!
//! All timers use [tokio::time], so tests can pause and advance the clock.

mod entity;
mod receiver;

pub use entity::{DeadLetter, SubscriptionStats};
pub use receiver::EmulatorReceiver;

use bytes::Bytes;
use entity::{Stored, Subscription};
use service_bus_pump::TransportError;
use service_bus_pump::model::SubscriptionDescriptor;
use service_bus_pump::stub::{Management, Provisioned};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::time::Instant;

/// An in-memory message bus namespace.
///
/// Clones share the same namespace.
///
/// # Example
/// ```
/// # use service_bus_emulator::Emulator;
/// # use service_bus_pump::client::Provisioner;
/// # use service_bus_pump::model::SubscriptionDescriptor;
/// # tokio_test::block_on(async {
/// let emulator = Emulator::new("sb://localhost/");
/// emulator.create_topic("orders");
/// let provisioner = Provisioner::new(emulator.clone());
/// provisioner
///     .ensure_subscription(&SubscriptionDescriptor::new("orders", "billing"))
///     .await?;
/// let sequence_number = emulator.publish("orders", "hello")?;
/// assert_eq!(emulator.stats("orders", "billing").map(|s| s.active), Some(1));
/// # assert_eq!(sequence_number, 1);
/// # anyhow::Ok(()) });
/// ```
#[derive(Clone, Debug)]
pub struct Emulator {
    shared: Arc<Shared>,
}

#[derive(Debug)]
pub(crate) struct Shared {
    endpoint: String,
    namespace: Mutex<Namespace>,
    // Wakes up receivers when messages become available.
    pub(crate) notify: Notify,
}

#[derive(Debug, Default)]
pub(crate) struct Namespace {
    topics: HashMap<String, Topic>,
    receive_faults: VecDeque<TransportError>,
}

#[derive(Debug, Default)]
struct Topic {
    next_sequence_number: u64,
    subscriptions: HashMap<String, Subscription>,
}

impl Emulator {
    /// Creates an empty namespace.
    pub fn new<T: Into<String>>(endpoint: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                endpoint: endpoint.into(),
                namespace: Mutex::new(Namespace::default()),
                notify: Notify::new(),
            }),
        }
    }

    /// The namespace endpoint.
    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Creates a topic, unless it already exists.
    pub fn create_topic<T: Into<String>>(&self, topic: T) {
        let topic = topic.into();
        let mut namespace = self.shared.lock();
        if !namespace.topics.contains_key(&topic) {
            tracing::info!("creating topic {topic}");
            namespace.topics.insert(topic, Topic::default());
        }
    }

    /// Publishes a message to every subscription of the topic.
    ///
    /// Returns the sequence number assigned to the message.
    pub fn publish<B: Into<Bytes>>(&self, topic: &str, body: B) -> Result<u64, TransportError> {
        let now = Instant::now();
        let body = body.into();
        let sequence_number = {
            let mut namespace = self.shared.lock();
            let topic = namespace.topic_mut(topic, now)?;
            topic.next_sequence_number += 1;
            let sequence_number = topic.next_sequence_number;
            for subscription in topic.subscriptions.values_mut() {
                subscription.enqueue(Stored {
                    sequence_number,
                    body: body.clone(),
                    delivery_count: 0,
                    enqueued: now,
                });
            }
            sequence_number
        };
        self.shared.notify.notify_waiters();
        Ok(sequence_number)
    }

    /// Creates a receiver for a subscription.
    ///
    /// The subscription does not need to exist yet. Receiving from a missing
    /// subscription fails.
    pub fn receiver<T, S>(&self, topic: T, subscription: S) -> EmulatorReceiver
    where
        T: Into<String>,
        S: Into<String>,
    {
        EmulatorReceiver::new(self.shared.clone(), topic.into(), subscription.into())
    }

    /// The message counts of a subscription, `None` if it does not exist.
    pub fn stats(&self, topic: &str, subscription: &str) -> Option<SubscriptionStats> {
        let now = Instant::now();
        let mut namespace = self.shared.lock();
        namespace
            .subscription_mut(topic, subscription, now)
            .ok()
            .map(|s| s.stats())
    }

    /// The messages in the dead-letter sub-queue of a subscription.
    pub fn dead_letters(&self, topic: &str, subscription: &str) -> Vec<DeadLetter> {
        let now = Instant::now();
        let mut namespace = self.shared.lock();
        namespace
            .subscription_mut(topic, subscription, now)
            .map(|s| s.dead_letters())
            .unwrap_or_default()
    }

    /// Makes the next receive call, on any subscription, fail with `error`.
    pub fn inject_receive_fault(&self, error: TransportError) {
        self.shared.lock().receive_faults.push_back(error);
    }
}

impl Shared {
    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Namespace> {
        self.namespace.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Namespace {
    fn topic_mut(&mut self, name: &str, now: Instant) -> Result<&mut Topic, TransportError> {
        let topic = self
            .topics
            .get_mut(name)
            .ok_or_else(|| TransportError::EntityNotFound(name.to_string()))?;
        topic.subscriptions.retain(|subscription, s| {
            s.sweep(now);
            let idle = s.is_idle(now);
            if idle {
                tracing::info!("deleting idle subscription {subscription}");
            }
            !idle
        });
        Ok(topic)
    }

    /// Finds a subscription, after releasing expired locks and messages.
    pub(crate) fn subscription_mut(
        &mut self,
        topic: &str,
        subscription: &str,
        now: Instant,
    ) -> Result<&mut Subscription, TransportError> {
        self.topic_mut(topic, now)?
            .subscriptions
            .get_mut(subscription)
            .ok_or_else(|| TransportError::EntityNotFound(format!("{topic}/Subscriptions/{subscription}")))
    }

    pub(crate) fn next_receive_fault(&mut self) -> Option<TransportError> {
        self.receive_faults.pop_front()
    }
}

#[async_trait::async_trait]
impl Management for Emulator {
    async fn create_subscription_if_absent(
        &self,
        descriptor: &SubscriptionDescriptor,
    ) -> Result<Provisioned, TransportError> {
        let now = Instant::now();
        let mut namespace = self.shared.lock();
        let topic = namespace.topic_mut(&descriptor.topic_name, now)?;
        if let Some(existing) = topic.subscriptions.get(&descriptor.subscription_name) {
            return Ok(Provisioned::Existing(existing.descriptor().clone()));
        }
        tracing::info!("creating subscription {}", descriptor.entity_path());
        topic.subscriptions.insert(
            descriptor.subscription_name.clone(),
            Subscription::new(descriptor.clone(), now),
        );
        Ok(Provisioned::Created)
    }
}
