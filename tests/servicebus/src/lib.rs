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

//! End-to-end scenarios for the message pump, running against the emulator.

use anyhow::{Result, bail};
use service_bus_emulator::{Emulator, SubscriptionStats};
use service_bus_pump::client::{MessagePump, Provisioner};
use service_bus_pump::model::{Message, SubscriptionDescriptor};
use service_bus_pump::options::PumpConfiguration;
use service_bus_pump::subscriber::fault::{FaultAction, FaultContext, FaultReporter};
use service_bus_pump::subscriber::handler::Disposition;
use service_bus_pump::{HandlerError, ProvisionError, TransportError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const ENDPOINT: &str = "sb://localhost/";
const TOPIC: &str = "orders";
const SUBSCRIPTION: &str = "billing";
const ENTITY_PATH: &str = "orders/Subscriptions/billing";

/// Collects the faults reported by a pump.
#[derive(Clone, Debug, Default)]
pub struct CollectFaults(Arc<Mutex<Vec<(FaultContext, String)>>>);

impl CollectFaults {
    pub fn take(&self) -> Vec<(FaultContext, String)> {
        std::mem::take(&mut *self.0.lock().expect("never poisoned"))
    }
}

impl FaultReporter for CollectFaults {
    fn report(&self, context: &FaultContext, error: &(dyn std::error::Error + Send + Sync + 'static)) {
        tracing::info!("fault reported: {context:?} {error}");
        self.0
            .lock()
            .expect("never poisoned")
            .push((context.clone(), error.to_string()));
    }
}

/// The subscription used in most scenarios.
pub fn orders_billing() -> SubscriptionDescriptor {
    SubscriptionDescriptor::new(TOPIC, SUBSCRIPTION)
        .set_lock_duration(Duration::from_secs(20))
        .set_max_delivery_count(10_u32)
}

async fn setup(count: u64) -> Result<Emulator> {
    let emulator = Emulator::new(ENDPOINT);
    emulator.create_topic(TOPIC);
    Provisioner::new(emulator.clone())
        .ensure_subscription(&orders_billing())
        .await?;
    for n in 1..=count {
        emulator.publish(TOPIC, format!("order {n}"))?;
    }
    Ok(emulator)
}

fn stats(emulator: &Emulator) -> SubscriptionStats {
    emulator.stats(TOPIC, SUBSCRIPTION).unwrap_or_default()
}

/// Polls `condition` until it holds, fails after `timeout`.
async fn wait_until<F>(timeout: Duration, condition: F) -> Result<()>
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;
    while !condition() {
        if Instant::now() >= deadline {
            bail!("condition not met after {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

pub async fn provisioning() -> Result<()> {
    let emulator = Emulator::new(ENDPOINT);
    let provisioner = Provisioner::new(emulator.clone());
    let descriptor = orders_billing();

    match provisioner.ensure_subscription(&descriptor).await {
        Err(ProvisionError::TransportFailure(TransportError::EntityNotFound(_))) => {}
        r => bail!("expected a missing topic error, got {r:?}"),
    }

    emulator.create_topic(TOPIC);
    provisioner.ensure_subscription(&descriptor).await?;
    provisioner.ensure_subscription(&descriptor).await?;

    let conflicting = orders_billing().set_max_delivery_count(3_u32);
    match provisioner.ensure_subscription(&conflicting).await {
        Err(ProvisionError::AlreadyExistsWithConflictingConfig { .. }) => {}
        r => bail!("expected a conflict, got {r:?}"),
    }

    let invalid = SubscriptionDescriptor::new(TOPIC, "");
    match provisioner.ensure_subscription(&invalid).await {
        Err(ProvisionError::InvalidDescriptor(_)) => {}
        r => bail!("expected an invalid descriptor error, got {r:?}"),
    }
    Ok(())
}

/// Three messages, all acknowledged by the handler, none redelivered.
pub async fn all_acknowledged() -> Result<()> {
    let emulator = setup(3).await?;
    let deliveries = Arc::new(Mutex::new(Vec::new()));
    let handler = {
        let deliveries = deliveries.clone();
        move |m: Message, d: Disposition, _c: CancellationToken| {
            let deliveries = deliveries.clone();
            async move {
                deliveries
                    .lock()
                    .expect("never poisoned")
                    .push((m.sequence_number, m.delivery_count));
                d.ack().await;
                Ok::<(), HandlerError>(())
            }
        }
    };
    let faults = CollectFaults::default();
    let mut pump = MessagePump::new(emulator.receiver(TOPIC, SUBSCRIPTION));
    pump.start(PumpConfiguration::new(), handler, faults.clone())?;
    wait_until(Duration::from_secs(60), || stats(&emulator).completed == 3).await?;
    pump.stop().await?;

    let stats = stats(&emulator);
    assert_eq!(stats.active, 0, "{stats:?}");
    assert_eq!(stats.locked, 0, "{stats:?}");
    assert_eq!(stats.dead_lettered, 0, "{stats:?}");
    let deliveries = deliveries.lock().expect("never poisoned").clone();
    assert_eq!(deliveries, vec![(1, 1), (2, 1), (3, 1)]);
    let faults = faults.take();
    assert!(faults.is_empty(), "{faults:?}");
    Ok(())
}

/// The handler always fails for message 7, which is dead-lettered after 10
/// deliveries and never received again.
pub async fn poison_message() -> Result<()> {
    let emulator = setup(7).await?;
    let poison_deliveries = Arc::new(AtomicUsize::new(0));
    let handler = {
        let poison_deliveries = poison_deliveries.clone();
        move |m: Message, d: Disposition, _c: CancellationToken| {
            let poison_deliveries = poison_deliveries.clone();
            async move {
                if m.sequence_number == 7 {
                    poison_deliveries.fetch_add(1, Ordering::SeqCst);
                    return Err(HandlerError::new("cannot process order 7"));
                }
                d.ack().await;
                Ok(())
            }
        }
    };
    let faults = CollectFaults::default();
    let mut pump = MessagePump::new(emulator.receiver(TOPIC, SUBSCRIPTION));
    pump.start(PumpConfiguration::new(), handler, faults.clone())?;
    wait_until(Duration::from_secs(600), || {
        !emulator.dead_letters(TOPIC, SUBSCRIPTION).is_empty()
    })
    .await?;
    // Give the pump a chance to receive the message again.
    tokio::time::sleep(Duration::from_secs(120)).await;
    pump.stop().await?;

    assert_eq!(poison_deliveries.load(Ordering::SeqCst), 10);
    let dead = emulator.dead_letters(TOPIC, SUBSCRIPTION);
    assert_eq!(dead.len(), 1, "{dead:?}");
    assert_eq!(dead[0].sequence_number, 7);
    assert_eq!(dead[0].delivery_count, 10);
    let stats = stats(&emulator);
    assert_eq!(stats.completed, 6, "{stats:?}");
    assert_eq!(stats.active, 0, "{stats:?}");

    let faults = faults.take();
    assert_eq!(faults.len(), 10, "{faults:?}");
    for (context, error) in faults {
        assert_eq!(context.action, FaultAction::Other);
        assert_eq!(context.endpoint, ENDPOINT);
        assert_eq!(context.entity_path, ENTITY_PATH);
        assert!(error.contains("cannot process order 7"), "{error}");
    }
    Ok(())
}

/// With a single delivery at a time, each handler call starts after the
/// previous call settled its message.
pub async fn single_delivery_order() -> Result<()> {
    let emulator = setup(5).await?;
    let events = Arc::new(Mutex::new(Vec::new()));
    let handler = {
        let events = events.clone();
        move |m: Message, d: Disposition, _c: CancellationToken| {
            let events = events.clone();
            async move {
                events
                    .lock()
                    .expect("never poisoned")
                    .push(format!("start {}", m.sequence_number));
                tokio::time::sleep(Duration::from_millis(100)).await;
                d.ack().await;
                events
                    .lock()
                    .expect("never poisoned")
                    .push(format!("acked {}", m.sequence_number));
                Ok::<(), HandlerError>(())
            }
        }
    };
    let config = PumpConfiguration::new().set_max_concurrent_deliveries(1_usize);
    let mut pump = MessagePump::new(emulator.receiver(TOPIC, SUBSCRIPTION));
    pump.start(config, handler, CollectFaults::default())?;
    wait_until(Duration::from_secs(60), || stats(&emulator).completed == 5).await?;
    pump.stop().await?;

    let got = events.lock().expect("never poisoned").clone();
    let want: Vec<String> = (1..=5)
        .flat_map(|n| [format!("start {n}"), format!("acked {n}")])
        .collect();
    assert_eq!(got, want);
    Ok(())
}

/// The number of concurrent handler calls never exceeds the limit.
pub async fn bounded_concurrency(limit: usize) -> Result<()> {
    let emulator = setup(20).await?;
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let handler = {
        let (active, peak) = (active.clone(), peak.clone());
        move |_m: Message, _d: Disposition, _c: CancellationToken| {
            let (active, peak) = (active.clone(), peak.clone());
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), HandlerError>(())
            }
        }
    };
    let config = PumpConfiguration::new()
        .set_max_concurrent_deliveries(limit)
        .set_auto_complete_on_success(true);
    let mut pump = MessagePump::new(emulator.receiver(TOPIC, SUBSCRIPTION));
    pump.start(config, handler, CollectFaults::default())?;
    wait_until(Duration::from_secs(60), || stats(&emulator).completed == 20).await?;
    pump.stop().await?;

    assert_eq!(peak.load(Ordering::SeqCst), limit);
    Ok(())
}

/// Settling a message twice never reaches the transport.
pub async fn double_ack() -> Result<()> {
    let emulator = setup(3).await?;
    let handler = |_m: Message, d: Disposition, _c: CancellationToken| async move {
        d.ack().await;
        d.ack().await;
        d.abandon().await;
        Ok::<(), HandlerError>(())
    };
    let faults = CollectFaults::default();
    let config = PumpConfiguration::new()
        .set_max_concurrent_deliveries(3_usize)
        .set_auto_complete_on_success(true);
    let mut pump = MessagePump::new(emulator.receiver(TOPIC, SUBSCRIPTION));
    pump.start(config, handler, faults.clone())?;
    wait_until(Duration::from_secs(60), || stats(&emulator).completed == 3).await?;
    pump.stop().await?;

    let stats = stats(&emulator);
    assert_eq!(stats.active, 0, "{stats:?}");
    assert_eq!(stats.locked, 0, "{stats:?}");
    // A second ack on the transport would fail with a lost lock.
    let faults = faults.take();
    assert!(faults.is_empty(), "{faults:?}");
    Ok(())
}

/// `stop()` with two calls in flight waits for them to finish. Their
/// acknowledgements come after the pump started stopping, so the messages are
/// abandoned instead.
pub async fn stop_waits_for_in_flight() -> Result<()> {
    const WORK: Duration = Duration::from_secs(5);
    let emulator = setup(2).await?;
    let started = Arc::new(AtomicUsize::new(0));
    let handler = {
        let started = started.clone();
        move |_m: Message, d: Disposition, _c: CancellationToken| {
            let started = started.clone();
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(WORK).await;
                d.ack().await;
                Ok::<(), HandlerError>(())
            }
        }
    };
    let config = PumpConfiguration::new()
        .set_max_concurrent_deliveries(3_usize)
        .set_drain_timeout(Duration::from_secs(30));
    let mut pump = MessagePump::new(emulator.receiver(TOPIC, SUBSCRIPTION));
    pump.start(config, handler, CollectFaults::default())?;
    wait_until(Duration::from_secs(1), || started.load(Ordering::SeqCst) == 2).await?;

    let start = Instant::now();
    pump.stop().await?;
    let elapsed = start.elapsed();
    assert!(elapsed >= WORK, "{elapsed:?}");
    assert!(elapsed <= WORK + Duration::from_millis(100), "{elapsed:?}");

    let stats = stats(&emulator);
    assert_eq!(stats.completed, 0, "{stats:?}");
    assert_eq!(stats.locked, 0, "{stats:?}");
    assert_eq!(stats.active, 2, "{stats:?}");
    Ok(())
}

/// `stop()` gives up on handlers still running after the drain timeout, and
/// abandons their messages.
pub async fn stop_after_drain_timeout() -> Result<()> {
    const DRAIN: Duration = Duration::from_secs(10);
    let emulator = setup(2).await?;
    let started = Arc::new(AtomicUsize::new(0));
    let handler = {
        let started = started.clone();
        move |_m: Message, d: Disposition, _c: CancellationToken| {
            let started = started.clone();
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(3600)).await;
                d.ack().await;
                Ok::<(), HandlerError>(())
            }
        }
    };
    let config = PumpConfiguration::new()
        .set_max_concurrent_deliveries(3_usize)
        .set_drain_timeout(DRAIN);
    let mut pump = MessagePump::new(emulator.receiver(TOPIC, SUBSCRIPTION));
    pump.start(config, handler, CollectFaults::default())?;
    wait_until(Duration::from_secs(1), || started.load(Ordering::SeqCst) == 2).await?;

    let start = Instant::now();
    pump.stop().await?;
    let elapsed = start.elapsed();
    assert!(elapsed >= DRAIN, "{elapsed:?}");
    assert!(elapsed <= DRAIN + Duration::from_millis(100), "{elapsed:?}");

    let stats = stats(&emulator);
    assert_eq!(stats.completed, 0, "{stats:?}");
    assert_eq!(stats.locked, 0, "{stats:?}");
    assert_eq!(stats.active, 2, "{stats:?}");
    Ok(())
}

/// Receive faults go to the fault reporter, and the pump keeps receiving.
pub async fn receive_faults() -> Result<()> {
    let emulator = setup(1).await?;
    emulator.inject_receive_fault(TransportError::Service("server busy".into()));
    let handler = |_m: Message, d: Disposition, _c: CancellationToken| async move {
        d.ack().await;
        Ok::<(), HandlerError>(())
    };
    let faults = CollectFaults::default();
    let mut pump = MessagePump::new(emulator.receiver(TOPIC, SUBSCRIPTION));
    pump.start(PumpConfiguration::new(), handler, faults.clone())?;
    wait_until(Duration::from_secs(60), || stats(&emulator).completed == 1).await?;
    pump.stop().await?;

    let faults = faults.take();
    assert_eq!(faults.len(), 1, "{faults:?}");
    let (context, error) = &faults[0];
    assert_eq!(context.action, FaultAction::Receiving);
    assert_eq!(context.endpoint, ENDPOINT);
    assert_eq!(context.entity_path, ENTITY_PATH);
    assert!(error.contains("server busy"), "{error}");
    Ok(())
}
