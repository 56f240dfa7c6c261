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

use crate::error::BoxError;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

/// The operation the pump was executing when a fault occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum FaultAction {
    /// Receiving messages from the subscription.
    Receiving,
    /// Acknowledging a message.
    Completing,
    /// Abandoning a message.
    Abandoning,
    /// Renewing the lock of an in-flight message.
    RenewingLock,
    /// Any other operation, including failures in the message handler.
    Other,
}

impl std::fmt::Display for FaultAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Receiving => "receiving",
            Self::Completing => "completing",
            Self::Abandoning => "abandoning",
            Self::RenewingLock => "renewing lock",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Where and during which operation a fault occurred.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct FaultContext {
    /// The namespace endpoint.
    pub endpoint: String,
    /// The path of the subscription.
    pub entity_path: String,
    /// The operation in progress.
    pub action: FaultAction,
}

/// Receives the faults detected by a [MessagePump][crate::client::MessagePump].
///
/// The pump calls `report()` from a background task, never from the receive
/// loop. Implementations may take their time, but they cannot fail: a
/// panicking reporter is logged and otherwise ignored.
///
/// # Example
/// ```
/// # use service_bus_pump::subscriber::fault::{FaultContext, FaultReporter};
/// struct Console;
/// impl FaultReporter for Console {
///     fn report(&self, context: &FaultContext, error: &(dyn std::error::Error + Send + Sync + 'static)) {
///         eprintln!("fault while {} on {}: {error}", context.action, context.entity_path);
///     }
/// }
/// ```
pub trait FaultReporter: Send + Sync + 'static {
    /// Reports a single fault.
    fn report(&self, context: &FaultContext, error: &(dyn std::error::Error + Send + Sync + 'static));
}

/// A [FaultReporter] that logs each fault using [tracing].
#[derive(Clone, Debug, Default)]
pub struct LogFaultReporter;

impl FaultReporter for LogFaultReporter {
    fn report(&self, context: &FaultContext, error: &(dyn std::error::Error + Send + Sync + 'static)) {
        tracing::error!(
            "message pump fault: {error}; endpoint={}, entity_path={}, action={}",
            context.endpoint,
            context.entity_path,
            context.action
        );
    }
}

/// Forwards faults to a [FaultReporter] running on its own task.
///
/// The reporting task stops once all the clones of the sink are dropped.
#[derive(Clone, Debug)]
pub(crate) struct FaultSink {
    tx: UnboundedSender<(FaultContext, BoxError)>,
    endpoint: String,
    entity_path: String,
}

impl FaultSink {
    pub(crate) fn new<F>(reporter: F, endpoint: String, entity_path: String) -> Self
    where
        F: FaultReporter,
    {
        let (tx, mut rx) = unbounded_channel::<(FaultContext, BoxError)>();
        tokio::spawn(async move {
            while let Some((context, error)) = rx.recv().await {
                let reported =
                    std::panic::catch_unwind(AssertUnwindSafe(|| reporter.report(&context, &*error)));
                if reported.is_err() {
                    tracing::warn!("the fault reporter panicked while reporting {context:?}: {error}");
                }
            }
        });
        Self {
            tx,
            endpoint,
            entity_path,
        }
    }

    /// Queues a fault for the reporter. Never blocks.
    pub(crate) fn report<E>(&self, action: FaultAction, error: E)
    where
        E: Into<BoxError>,
    {
        let error = error.into();
        tracing::debug!("fault while {action} on {}: {error}", self.entity_path);
        let context = FaultContext {
            endpoint: self.endpoint.clone(),
            entity_path: self.entity_path.clone(),
            action,
        };
        // The reporting task only stops when every sender is gone.
        let _ = self.tx.send((context, error));
    }
}
