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

//! Custom errors for the message pump.
//!
//! Provisioning errors are fatal to startup. Transport errors are surfaced to
//! the [FaultReporter][crate::subscriber::fault::FaultReporter] and never stop
//! the pump. Handler errors only affect the disposition of a single message.

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error returned by a transport, see [stub][crate::stub].
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum TransportError {
    /// The transport could not reach the message bus.
    #[error("cannot reach the message bus at {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    /// The topic or subscription does not exist.
    ///
    /// Subscriptions configured with an idle auto-delete period disappear
    /// when they are not used.
    #[error("the messaging entity `{0}` was not found")]
    EntityNotFound(String),

    /// The lock for the message expired, or the message was already settled.
    ///
    /// The message will be redelivered once its lock expires, possibly to
    /// another client.
    #[error("the lock for the message was lost")]
    LockLost,

    /// The service rejected the request.
    #[error("the message bus rejected the request: {0}")]
    Service(String),
}

impl TransportError {
    /// Returns true if the error indicates a lost message lock.
    pub fn is_lock_lost(&self) -> bool {
        matches!(self, Self::LockLost)
    }
}

/// Represents an error provisioning a subscription.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ProvisionError {
    /// The subscription descriptor is not valid.
    #[error("invalid subscription descriptor: {0}")]
    InvalidDescriptor(String),

    /// A subscription with the same name exists, with a different
    /// configuration.
    #[error("the subscription `{entity_path}` already exists with a different configuration")]
    AlreadyExistsWithConflictingConfig {
        entity_path: String,
        existing: Box<crate::model::SubscriptionDescriptor>,
    },

    /// The request to create the subscription failed.
    #[error("cannot provision the subscription: {0}")]
    TransportFailure(#[source] TransportError),
}

/// Represents an invalid operation on a
/// [MessagePump][crate::client::MessagePump].
#[derive(thiserror::Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum PumpError {
    /// `start()` was called on a running pump.
    #[error("the message pump is already running")]
    AlreadyRunning,

    /// `stop()` was called on a pump that is not running.
    #[error("the message pump is not running")]
    NotRunning,

    /// The pump configuration cannot be used.
    #[error("invalid pump configuration: {0}")]
    InvalidConfiguration(String),
}

/// An error returned by a [MessageHandler][crate::subscriber::handler::MessageHandler].
///
/// The pump treats any handler error as a processing failure. The message is
/// not acknowledged.
#[derive(thiserror::Error, Debug)]
#[error("the message handler failed: {0}")]
pub struct HandlerError(#[source] BoxError);

impl HandlerError {
    /// Creates a handler error from any error type.
    ///
    /// # Example
    /// ```
    /// # use service_bus_pump::HandlerError;
    /// let err = HandlerError::new("cannot parse the order");
    /// assert!(err.to_string().contains("cannot parse the order"));
    /// ```
    pub fn new<T: Into<BoxError>>(source: T) -> Self {
        Self(source.into())
    }
}
