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

//! Samples for the message pump.
//!
//! The `subscribe` binary provisions a subscription, starts a pump that
//! prints and acknowledges each message, and stops the pump on ENTER, Ctrl-C,
//! or SIGTERM. The namespace is an in-process [Emulator], seeded with a few
//! sample messages.

pub mod config;

use config::Config;
use service_bus_emulator::Emulator;
use service_bus_pump::HandlerError;
use service_bus_pump::client::{MessagePump, Provisioner};
use service_bus_pump::model::{Message, SubscriptionDescriptor};
use service_bus_pump::options::PumpConfiguration;
use service_bus_pump::subscriber::fault::{FaultContext, FaultReporter};
use service_bus_pump::subscriber::handler::{Disposition, MessageHandler};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The subscription used by the samples.
///
/// Messages expire after 20 seconds, locks last 20 seconds, and the
/// subscription is deleted after 5 minutes without activity. A message is
/// dead-lettered after 10 deliveries.
pub fn subscription_descriptor(topic_name: &str, subscription_name: &str) -> SubscriptionDescriptor {
    SubscriptionDescriptor::new(topic_name, subscription_name)
        .set_message_time_to_live(Duration::from_secs(20))
        .set_lock_duration(Duration::from_secs(20))
        .set_auto_delete_on_idle(Duration::from_secs(5 * 60))
        .set_max_delivery_count(10_u32)
}

/// Prints each message and acknowledges it.
#[derive(Clone, Debug, Default)]
pub struct PrintAndAck;

#[async_trait::async_trait]
impl MessageHandler for PrintAndAck {
    async fn handle(
        &self,
        message: Message,
        disposition: Disposition,
        _cancel: CancellationToken,
    ) -> Result<(), HandlerError> {
        println!(
            "Received message: SequenceNumber:{} Body:{}",
            message.sequence_number,
            String::from_utf8_lossy(&message.body)
        );
        // Complete the message so it is not received again.
        disposition.ack().await;
        Ok(())
    }
}

/// Prints the faults reported by the pump.
#[derive(Clone, Debug, Default)]
pub struct ConsoleFaultReporter;

impl FaultReporter for ConsoleFaultReporter {
    fn report(&self, context: &FaultContext, error: &(dyn std::error::Error + Send + Sync + 'static)) {
        println!("Message handler encountered an exception {error}.");
        println!("Exception context for troubleshooting:");
        println!("- Endpoint: {}", context.endpoint);
        println!("- Entity Path: {}", context.entity_path);
        println!("- Executing Action: {}", context.action);
    }
}

/// Runs the subscriber sample against a new emulated namespace.
pub async fn run<S>(config: &Config, stop: S) -> anyhow::Result<()>
where
    S: Future<Output = ()>,
{
    let emulator = Emulator::new(config.connection_string.endpoint());
    run_with(emulator, config, stop).await
}

/// Runs the subscriber sample until `stop` completes.
pub async fn run_with<S>(emulator: Emulator, config: &Config, stop: S) -> anyhow::Result<()>
where
    S: Future<Output = ()>,
{
    emulator.create_topic(&config.topic_name);
    let descriptor = subscription_descriptor(&config.topic_name, &config.subscription_name);
    Provisioner::new(emulator.clone())
        .ensure_subscription(&descriptor)
        .await?;

    let receiver = emulator.receiver(&config.topic_name, &config.subscription_name);
    let mut pump = MessagePump::new(receiver);
    println!("======================================================");
    println!("Press ENTER key to exit after receiving all the messages.");
    println!("======================================================");

    // Handle one message at a time. The handler completes each message.
    let options = PumpConfiguration::new()
        .set_max_concurrent_deliveries(1_usize)
        .set_auto_complete_on_success(false);
    pump.start(options, PrintAndAck, ConsoleFaultReporter)?;

    for n in 1..=config.sample_message_count {
        emulator.publish(&config.topic_name, format!("Message {n}"))?;
    }

    stop.await;
    pump.stop().await?;
    Ok(())
}

/// Waits for ENTER on stdin, Ctrl-C, or SIGTERM.
pub async fn wait_for_stop() {
    use tokio::io::AsyncBufReadExt;

    let enter = async {
        let mut line = String::new();
        let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            // Without a terminal, wait for a signal instead.
            Ok(0) | Err(_) => std::future::pending::<()>().await,
            Ok(_) => {}
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = enter => {},
        _ = tokio::signal::ctrl_c() => {},
        _ = terminate => {},
    }
}
