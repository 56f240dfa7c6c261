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

use super::dispatch::{Dispatcher, Policy};
use super::fault::{FaultAction, FaultReporter, FaultSink};
use super::handler::MessageHandler;
use super::lease_loop::{LeaseLoop, LeaseOptions};
use super::lease_state::Leases;
use super::leaser::{DefaultLeaser, Leaser};
use super::options::PumpConfiguration;
use crate::error::PumpError;
use crate::stub::Receiver;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// The lifecycle states of a [MessagePump].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum PumpState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl std::fmt::Display for PumpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Receives messages from a subscription and dispatches them to a handler.
///
/// The pump receives messages in peek-lock mode, and calls the handler for
/// each one, with at most `max_concurrent_deliveries` calls in flight. While
/// a handler runs, the pump renews the message lock in the background.
///
/// # Example
/// ```no_run
/// # use service_bus_pump::client::MessagePump;
/// # use service_bus_pump::options::PumpConfiguration;
/// # use service_bus_pump::stub::Receiver;
/// # use service_bus_pump::subscriber::fault::LogFaultReporter;
/// # use service_bus_pump::subscriber::handler::MessageHandler;
/// async fn sample<R: Receiver, H: MessageHandler>(receiver: R, handler: H) -> anyhow::Result<()> {
///     let mut pump = MessagePump::new(receiver);
///     pump.start(PumpConfiguration::new(), handler, LogFaultReporter)?;
///     tokio::signal::ctrl_c().await?;
///     pump.stop().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MessagePump<R>
where
    R: Receiver,
{
    inner: Arc<R>,
    state: PumpState,
    running: Option<Running>,
}

impl<R> MessagePump<R>
where
    R: Receiver,
{
    /// Creates a stopped pump for the subscription behind `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner: Arc::new(inner),
            state: PumpState::Stopped,
            running: None,
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> PumpState {
        self.state
    }

    /// Starts receiving messages and dispatching them to `handler`.
    ///
    /// Faults in the background work are sent to `reporter`, they never stop
    /// the pump.
    ///
    /// Must be called from within a Tokio runtime. Returns
    /// [PumpError::AlreadyRunning] unless the pump is stopped.
    pub fn start<H, F>(
        &mut self,
        config: PumpConfiguration,
        handler: H,
        reporter: F,
    ) -> Result<(), PumpError>
    where
        H: MessageHandler,
        F: FaultReporter,
    {
        if self.state != PumpState::Stopped {
            return Err(PumpError::AlreadyRunning);
        }
        config.validate().map_err(PumpError::InvalidConfiguration)?;
        self.state = PumpState::Starting;
        let entity_path = self.inner.entity_path();
        tracing::info!(
            "starting the message pump for {entity_path} with up to {} concurrent deliveries",
            config.max_concurrent_deliveries
        );

        let faults = FaultSink::new(reporter, self.inner.endpoint(), entity_path);
        let leases = Arc::new(Leases::new());
        let leaser: Arc<dyn Leaser> = Arc::new(DefaultLeaser::new(self.inner.clone(), faults.clone()));
        let lease_loop = (!config.max_auto_lock_renewal.is_zero()).then(|| {
            LeaseLoop::new(
                leases.clone(),
                leaser.clone(),
                LeaseOptions {
                    renew_period: config.lock_renewal_period,
                    max_lease_extension: config.max_auto_lock_renewal,
                },
            )
        });
        let shutdown = CancellationToken::new();
        let abort = CancellationToken::new();
        let dispatcher = Dispatcher::new(
            Arc::new(handler),
            leases.clone(),
            leaser.clone(),
            faults.clone(),
            Policy {
                auto_complete_on_success: config.auto_complete_on_success,
                abandon_on_failure: config.abandon_on_failure,
            },
            shutdown.clone(),
            abort.clone(),
        );
        let tracker = TaskTracker::new();
        let receive_loop = ReceiveLoop {
            inner: self.inner.clone(),
            dispatcher: Arc::new(dispatcher),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_deliveries)),
            tracker: tracker.clone(),
            faults,
            shutdown: shutdown.clone(),
            receive_wait: config.receive_wait,
            retry_delay: config.receive_retry_delay,
        };
        let receive_loop = tokio::spawn(receive_loop.run());

        self.running = Some(Running {
            shutdown,
            abort,
            receive_loop,
            tracker,
            leases,
            leaser,
            lease_loop,
            drain_timeout: config.drain_timeout,
        });
        self.state = PumpState::Running;
        Ok(())
    }

    /// Stops the pump.
    ///
    /// The pump stops receiving new messages, signals cancellation to the
    /// handlers in flight, and waits for them to return. Dispositions made
    /// after this point are no-ops. Handlers still running after the drain
    /// timeout are dropped. The messages of all the handlers that did not
    /// settle before `stop()` began are abandoned. Finally the pump closes
    /// the receiver.
    ///
    /// Returns [PumpError::NotRunning] if the pump is not running.
    pub async fn stop(&mut self) -> Result<(), PumpError> {
        let Some(mut running) = self.running.take() else {
            return Err(PumpError::NotRunning);
        };
        self.state = PumpState::Stopping;
        let entity_path = self.inner.entity_path();
        tracing::info!("stopping the message pump for {entity_path}");
        running.drain().await;
        if let Err(e) = self.inner.close().await {
            tracing::warn!("error closing the receiver for {entity_path}: {e}");
        }
        self.state = PumpState::Stopped;
        tracing::info!("stopped the message pump for {entity_path}");
        Ok(())
    }
}

/// The background work of a running pump.
#[derive(Debug)]
struct Running {
    shutdown: CancellationToken,
    abort: CancellationToken,
    receive_loop: JoinHandle<()>,
    tracker: TaskTracker,
    leases: Arc<Leases>,
    leaser: Arc<dyn Leaser>,
    lease_loop: Option<LeaseLoop>,
    drain_timeout: Duration,
}

impl Running {
    async fn drain(&mut self) {
        self.leases.stop();
        self.shutdown.cancel();
        if let Err(e) = (&mut self.receive_loop).await {
            tracing::warn!("the receive loop task failed: {e}");
        }

        self.tracker.close();
        if tokio::time::timeout(self.drain_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                "{} message handlers still running after {:?}, abandoning their messages",
                self.tracker.len(),
                self.drain_timeout
            );
            self.abort.cancel();
            self.tracker.wait().await;
        }

        if let Some(lease_loop) = self.lease_loop.as_mut() {
            lease_loop.shutdown().await;
        }
        let pending = self.leases.close();
        futures::future::join_all(pending.into_iter().map(|t| self.leaser.abandon(t))).await;
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.abort.cancel();
    }
}

struct ReceiveLoop<R> {
    inner: Arc<R>,
    dispatcher: Arc<Dispatcher>,
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    faults: FaultSink,
    shutdown: CancellationToken,
    receive_wait: Duration,
    retry_delay: Duration,
}

impl<R> ReceiveLoop<R>
where
    R: Receiver,
{
    async fn run(self) {
        loop {
            // Wait for a free slot before receiving, the message lock starts
            // ticking once the message is received.
            let permit = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                permit = self.semaphore.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };
            let received = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                received = self.inner.receive(self.receive_wait) => received,
            };
            match received {
                Ok(Some(message)) => {
                    if !self.dispatcher.accept(&message) {
                        break;
                    }
                    tracing::debug!(
                        "received message {} (delivery {})",
                        message.sequence_number,
                        message.delivery_count
                    );
                    self.tracker
                        .spawn(self.dispatcher.clone().dispatch(message, permit));
                }
                Ok(None) => {}
                Err(e) => {
                    self.faults.report(FaultAction::Receiving, e);
                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.retry_delay) => {},
                    }
                }
            }
        }
        tracing::debug!("the receive loop stopped");
    }
}
