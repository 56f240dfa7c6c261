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

//! A peek-lock message pump for message-bus subscriptions.
//!
//! This crate contains the types and functions to consume a topic
//! subscription with explicit lock discipline:
//!
//! - [Provisioner][client::Provisioner] makes sure a subscription matching a
//!   [SubscriptionDescriptor][model::SubscriptionDescriptor] exists.
//! - [MessagePump][client::MessagePump] receives messages in peek-lock mode,
//!   invokes a [MessageHandler][subscriber::handler::MessageHandler] with
//!   bounded concurrency, and renews, acknowledges or abandons the message
//!   locks based on the outcome.
//! - [FaultReporter][subscriber::fault::FaultReporter] receives transport
//!   faults out-of-band, without interrupting the message flow.
//!
//! The crate does not implement a wire protocol. Transports plug in through
//! the traits in [stub].
//!
//! # Example
//! ```
//! # use service_bus_pump::client::MessagePump;
//! # use service_bus_pump::options::PumpConfiguration;
//! # use service_bus_pump::subscriber::fault::LogFaultReporter;
//! # use service_bus_pump::subscriber::handler::Disposition;
//! # use service_bus_pump::model::Message;
//! # use service_bus_pump::stub::Receiver;
//! # use service_bus_pump::error::HandlerError;
//! # use tokio_util::sync::CancellationToken;
//! # async fn sample<R: Receiver>(receiver: R) -> anyhow::Result<()> {
//! let mut pump = MessagePump::new(receiver);
//! pump.start(
//!     PumpConfiguration::new().set_max_concurrent_deliveries(4_usize),
//!     |message: Message, disposition: Disposition, _cancel: CancellationToken| async move {
//!         println!("received message {}", message.sequence_number);
//!         disposition.ack().await;
//!         Ok::<(), HandlerError>(())
//!     },
//!     LogFaultReporter,
//! )?;
//! // ... later, on shutdown
//! pump.stop().await?;
//! # Ok(()) }
//! ```

pub mod connection;
pub mod error;
pub mod model;
pub mod stub;
pub mod subscriber;

pub(crate) mod provisioner;

pub use error::{HandlerError, ProvisionError, PumpError, TransportError};

pub mod client {
    pub use crate::provisioner::Provisioner;
    pub use crate::subscriber::pump::{MessagePump, PumpState};
}

pub mod options {
    pub use crate::subscriber::options::PumpConfiguration;
}
