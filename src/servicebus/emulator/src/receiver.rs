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

use super::Shared;
use service_bus_pump::TransportError;
use service_bus_pump::model::{LockToken, Message};
use service_bus_pump::stub::Receiver;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::{Duration, Instant, sleep_until};

/// Receives messages from a single emulated subscription.
#[derive(Debug)]
pub struct EmulatorReceiver {
    shared: Arc<Shared>,
    topic: String,
    subscription: String,
    closed: AtomicBool,
}

impl EmulatorReceiver {
    pub(crate) fn new(shared: Arc<Shared>, topic: String, subscription: String) -> Self {
        Self {
            shared,
            topic,
            subscription,
            closed: AtomicBool::new(false),
        }
    }

    fn check_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Connection {
                endpoint: self.shared.endpoint().to_string(),
                message: "the receiver is closed".to_string(),
            });
        }
        Ok(())
    }

    /// Runs `f` on the subscription, after expired locks are released.
    fn with_subscription<F, T>(&self, f: F) -> Result<T, TransportError>
    where
        F: FnOnce(&mut super::Subscription, Instant) -> T,
    {
        self.check_open()?;
        let now = Instant::now();
        let mut namespace = self.shared.lock();
        let subscription = namespace.subscription_mut(&self.topic, &self.subscription, now)?;
        subscription.touch(now);
        Ok(f(subscription, now))
    }
}

#[async_trait::async_trait]
impl Receiver for EmulatorReceiver {
    fn endpoint(&self) -> String {
        self.shared.endpoint().to_string()
    }

    fn entity_path(&self) -> String {
        format!("{}/Subscriptions/{}", self.topic, self.subscription)
    }

    async fn receive(&self, max_wait: Duration) -> Result<Option<Message>, TransportError> {
        if let Some(e) = self.shared.lock().next_receive_fault() {
            return Err(e);
        }
        let start = Instant::now();
        let deadline = start.checked_add(max_wait);
        loop {
            // Register for wake-ups before looking at the subscription, so
            // messages published in between are not missed.
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let (message, next_expiry) = self.with_subscription(|s, now| {
                let message = s.lock_next(now);
                (message, s.next_expiry())
            })?;
            if message.is_some() {
                return Ok(message);
            }
            let now = Instant::now();
            if deadline.is_some_and(|d| d <= now) {
                return Ok(None);
            }
            // Wake up when a lock expires, the message may be available again.
            let wake = match (deadline, next_expiry) {
                (Some(d), Some(e)) => Some(d.min(e)),
                (d, e) => d.or(e),
            };
            match wake {
                Some(wake) => {
                    tokio::select! {
                        _ = notified => {},
                        _ = sleep_until(wake) => {},
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn acknowledge(&self, lock_token: LockToken) -> Result<(), TransportError> {
        if self.with_subscription(|s, _| s.complete(lock_token))? {
            return Ok(());
        }
        Err(TransportError::LockLost)
    }

    async fn abandon(&self, lock_token: LockToken) -> Result<(), TransportError> {
        if self.with_subscription(|s, _| s.abandon(lock_token))? {
            self.shared.notify.notify_waiters();
            return Ok(());
        }
        Err(TransportError::LockLost)
    }

    async fn renew_lock(&self, lock_token: LockToken) -> Result<(), TransportError> {
        if self.with_subscription(|s, now| s.renew(lock_token, now))? {
            return Ok(());
        }
        Err(TransportError::LockLost)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        tracing::debug!("closed the receiver for {}", self.entity_path());
        Ok(())
    }
}
