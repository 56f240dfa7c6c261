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

use bytes::Bytes;
use service_bus_pump::model::{LockToken, Message, SubscriptionDescriptor};
use std::collections::{HashMap, VecDeque};
use tokio::time::{Duration, Instant};

/// A message as stored in a subscription.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Stored {
    pub(crate) sequence_number: u64,
    pub(crate) body: Bytes,
    pub(crate) delivery_count: u32,
    pub(crate) enqueued: Instant,
}

#[derive(Debug)]
struct Locked {
    message: Stored,
    locked_until: Instant,
}

/// A message moved to the dead-letter sub-queue.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct DeadLetter {
    pub sequence_number: u64,
    pub body: Bytes,
    pub delivery_count: u32,
}

/// A snapshot of the message counts in a subscription.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct SubscriptionStats {
    /// Messages available for delivery.
    pub active: usize,
    /// Messages delivered and locked.
    pub locked: usize,
    /// Messages in the dead-letter sub-queue.
    pub dead_lettered: usize,
    /// Messages acknowledged.
    pub completed: u64,
}

pub(crate) fn deadline(now: Instant, duration: Duration) -> Option<Instant> {
    now.checked_add(duration)
}

/// The state of a single subscription.
#[derive(Debug)]
pub(crate) struct Subscription {
    descriptor: SubscriptionDescriptor,
    available: VecDeque<Stored>,
    locked: HashMap<LockToken, Locked>,
    dead_letters: Vec<DeadLetter>,
    completed: u64,
    last_activity: Instant,
}

impl Subscription {
    pub(crate) fn new(descriptor: SubscriptionDescriptor, now: Instant) -> Self {
        Self {
            descriptor,
            available: VecDeque::new(),
            locked: HashMap::new(),
            dead_letters: Vec::new(),
            completed: 0,
            last_activity: now,
        }
    }

    pub(crate) fn descriptor(&self) -> &SubscriptionDescriptor {
        &self.descriptor
    }

    /// Returns true if the subscription was idle for longer than its
    /// auto-delete period.
    pub(crate) fn is_idle(&self, now: Instant) -> bool {
        deadline(self.last_activity, self.descriptor.auto_delete_on_idle)
            .is_some_and(|d| d <= now)
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub(crate) fn enqueue(&mut self, message: Stored) {
        self.available.push_back(message);
    }

    /// Releases expired locks and drops expired messages.
    pub(crate) fn sweep(&mut self, now: Instant) {
        let expired: Vec<LockToken> = self
            .locked
            .iter()
            .filter(|(_, l)| l.locked_until <= now)
            .map(|(t, _)| *t)
            .collect();
        for lock_token in expired {
            if let Some(locked) = self.locked.remove(&lock_token) {
                tracing::debug!(
                    "lock expired for message {}",
                    locked.message.sequence_number
                );
                self.release(locked.message);
            }
        }
        let ttl = self.descriptor.message_time_to_live;
        self.available
            .retain(|m| deadline(m.enqueued, ttl).is_none_or(|d| d > now));
    }

    /// Locks the next available message, in sequence number order.
    pub(crate) fn lock_next(&mut self, now: Instant) -> Option<Message> {
        let mut message = self.available.pop_front()?;
        message.delivery_count += 1;
        let lock_token = LockToken::new();
        let locked_until =
            deadline(now, self.descriptor.lock_duration).unwrap_or(now + Duration::from_secs(86400));
        let delivered = Message::new(message.sequence_number, lock_token, message.body.clone())
            .set_delivery_count(message.delivery_count);
        self.locked.insert(
            lock_token,
            Locked {
                message,
                locked_until,
            },
        );
        Some(delivered)
    }

    /// The time the next lock expires, if any message is locked.
    pub(crate) fn next_expiry(&self) -> Option<Instant> {
        self.locked.values().map(|l| l.locked_until).min()
    }

    /// Completes the delivery. Returns false if the lock is not held.
    pub(crate) fn complete(&mut self, lock_token: LockToken) -> bool {
        if self.locked.remove(&lock_token).is_none() {
            return false;
        }
        self.completed += 1;
        true
    }

    /// Releases the lock. Returns false if the lock is not held.
    pub(crate) fn abandon(&mut self, lock_token: LockToken) -> bool {
        match self.locked.remove(&lock_token) {
            None => false,
            Some(locked) => {
                self.release(locked.message);
                true
            }
        }
    }

    /// Extends the lock. Returns false if the lock is not held.
    pub(crate) fn renew(&mut self, lock_token: LockToken, now: Instant) -> bool {
        let lock_duration = self.descriptor.lock_duration;
        match self.locked.get_mut(&lock_token) {
            None => false,
            Some(locked) => {
                if let Some(until) = deadline(now, lock_duration) {
                    locked.locked_until = until;
                }
                true
            }
        }
    }

    pub(crate) fn stats(&self) -> SubscriptionStats {
        SubscriptionStats {
            active: self.available.len(),
            locked: self.locked.len(),
            dead_lettered: self.dead_letters.len(),
            completed: self.completed,
        }
    }

    pub(crate) fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.clone()
    }

    fn release(&mut self, message: Stored) {
        if message.delivery_count >= self.descriptor.max_delivery_count {
            tracing::info!(
                "moving message {} to the dead-letter queue after {} deliveries",
                message.sequence_number,
                message.delivery_count
            );
            self.dead_letters.push(DeadLetter {
                sequence_number: message.sequence_number,
                body: message.body,
                delivery_count: message.delivery_count,
            });
            return;
        }
        let position = self
            .available
            .partition_point(|m| m.sequence_number < message.sequence_number);
        self.available.insert(position, message);
    }
}
