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

//! Subscribes to a topic and prints the messages it receives.
//!
//! Reads `SERVICE_BUS_CONNECTION_STRING`, `TOPIC_NAME` and
//! `SUBSCRIPTION_NAME` from the environment. Set `RUST_LOG` to see the pump
//! logs.

use service_bus_samples::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = Config::from_env()?;
    service_bus_samples::run(&config, service_bus_samples::wait_for_stop()).await
}
