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

use crate::error::ProvisionError;
use crate::model::SubscriptionDescriptor;
use crate::stub::{Management, Provisioned};
use std::sync::Arc;

/// Ensures subscriptions exist before consumption begins.
///
/// # Example
/// ```
/// # use service_bus_pump::client::Provisioner;
/// # use service_bus_pump::model::SubscriptionDescriptor;
/// # use service_bus_pump::stub::Management;
/// # async fn sample<M: Management>(management: M) -> anyhow::Result<()> {
/// let provisioner = Provisioner::new(management);
/// let descriptor = SubscriptionDescriptor::new("orders", "billing");
/// provisioner.ensure_subscription(&descriptor).await?;
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct Provisioner<M>
where
    M: Management,
{
    inner: Arc<M>,
}

impl<M> Provisioner<M>
where
    M: Management,
{
    /// Creates a provisioner using the given management transport.
    pub fn new(inner: M) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Creates the subscription described by `descriptor`, unless it exists.
    ///
    /// Calling this function repeatedly with the same descriptor succeeds.
    /// Restarting an application with an unchanged configuration is a normal
    /// operation.
    ///
    /// Returns an error if the descriptor is invalid, if the subscription
    /// exists with a different configuration, or if the transport fails. The
    /// application should not start consuming messages in any of these cases.
    pub async fn ensure_subscription(
        &self,
        descriptor: &SubscriptionDescriptor,
    ) -> Result<(), ProvisionError> {
        descriptor.validate()?;
        let entity_path = descriptor.entity_path();
        let provisioned = self
            .inner
            .create_subscription_if_absent(descriptor)
            .await
            .map_err(ProvisionError::TransportFailure)?;
        match provisioned {
            Provisioned::Created => {
                tracing::info!("created subscription {entity_path}");
                Ok(())
            }
            Provisioned::Existing(existing) if existing == *descriptor => {
                tracing::info!("subscription {entity_path} already exists");
                Ok(())
            }
            Provisioned::Existing(existing) => {
                tracing::error!(
                    "subscription {entity_path} exists with a different configuration: \
                     existing={existing:?}, requested={descriptor:?}"
                );
                Err(ProvisionError::AlreadyExistsWithConflictingConfig {
                    entity_path,
                    existing: Box::new(existing),
                })
            }
        }
    }
}
