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

use std::time::Duration;

/// Configuration for a [MessagePump][crate::client::MessagePump].
///
/// # Example
/// ```
/// # use service_bus_pump::options::PumpConfiguration;
/// # use std::time::Duration;
/// let config = PumpConfiguration::new()
///     .set_max_concurrent_deliveries(8_usize)
///     .set_auto_complete_on_success(true)
///     .set_drain_timeout(Duration::from_secs(10));
/// assert_eq!(config.max_concurrent_deliveries(), 8);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct PumpConfiguration {
    pub(crate) max_concurrent_deliveries: usize,
    pub(crate) auto_complete_on_success: bool,
    pub(crate) abandon_on_failure: bool,
    pub(crate) drain_timeout: Duration,
    pub(crate) receive_wait: Duration,
    pub(crate) lock_renewal_period: Duration,
    pub(crate) max_auto_lock_renewal: Duration,
    pub(crate) receive_retry_delay: Duration,
}

impl PumpConfiguration {
    /// Creates a new configuration with the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of messages handled at the same time.
    ///
    /// Must be at least 1. The default is 1, which handles messages one at a
    /// time, in the order they are received.
    pub fn set_max_concurrent_deliveries<V: Into<usize>>(mut self, v: V) -> Self {
        self.max_concurrent_deliveries = v.into();
        self
    }

    /// If true, the pump acknowledges a message when its handler succeeds.
    ///
    /// The default is false: handlers settle their own messages.
    pub fn set_auto_complete_on_success<V: Into<bool>>(mut self, v: V) -> Self {
        self.auto_complete_on_success = v.into();
        self
    }

    /// If true, the pump abandons a message when its handler fails.
    ///
    /// The default is false: the message is redelivered once its lock
    /// expires.
    pub fn set_abandon_on_failure<V: Into<bool>>(mut self, v: V) -> Self {
        self.abandon_on_failure = v.into();
        self
    }

    /// Sets how long `stop()` waits for in-flight handlers.
    pub fn set_drain_timeout<V: Into<Duration>>(mut self, v: V) -> Self {
        self.drain_timeout = v.into();
        self
    }

    /// Sets how long a single receive call waits for a message.
    pub fn set_receive_wait<V: Into<Duration>>(mut self, v: V) -> Self {
        self.receive_wait = v.into();
        self
    }

    /// Sets how often the locks of in-flight messages are renewed.
    ///
    /// Must be greater than zero.
    pub fn set_lock_renewal_period<V: Into<Duration>>(mut self, v: V) -> Self {
        self.lock_renewal_period = v.into();
        self
    }

    /// Sets the maximum time the pump renews the lock of a message.
    ///
    /// Use [Duration::ZERO] to disable lock renewal.
    pub fn set_max_auto_lock_renewal<V: Into<Duration>>(mut self, v: V) -> Self {
        self.max_auto_lock_renewal = v.into();
        self
    }

    /// Sets the pause after a failed receive call.
    pub fn set_receive_retry_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.receive_retry_delay = v.into();
        self
    }

    pub fn max_concurrent_deliveries(&self) -> usize {
        self.max_concurrent_deliveries
    }

    pub fn auto_complete_on_success(&self) -> bool {
        self.auto_complete_on_success
    }

    pub fn abandon_on_failure(&self) -> bool {
        self.abandon_on_failure
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    pub fn receive_wait(&self) -> Duration {
        self.receive_wait
    }

    pub fn lock_renewal_period(&self) -> Duration {
        self.lock_renewal_period
    }

    pub fn max_auto_lock_renewal(&self) -> Duration {
        self.max_auto_lock_renewal
    }

    pub fn receive_retry_delay(&self) -> Duration {
        self.receive_retry_delay
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_deliveries == 0 {
            return Err("max concurrent deliveries must be at least 1".into());
        }
        if self.lock_renewal_period.is_zero() {
            return Err("the lock renewal period must be greater than zero".into());
        }
        if self.receive_wait.is_zero() {
            return Err("the receive wait must be greater than zero".into());
        }
        Ok(())
    }
}

impl Default for PumpConfiguration {
    fn default() -> Self {
        Self {
            max_concurrent_deliveries: 1,
            auto_complete_on_success: false,
            abandon_on_failure: false,
            drain_timeout: Duration::from_secs(30),
            receive_wait: Duration::from_secs(60),
            lock_renewal_period: Duration::from_secs(10),
            max_auto_lock_renewal: Duration::from_secs(300),
            receive_retry_delay: Duration::from_secs(1),
        }
    }
}
