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

#[cfg(test)]
mod servicebus {
    use service_bus_test_utils::tracing::enable_tracing;

    #[tokio::test(start_paused = true)]
    async fn provisioning() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        integration_tests_servicebus::provisioning().await
    }

    #[tokio::test(start_paused = true)]
    async fn all_acknowledged() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        integration_tests_servicebus::all_acknowledged().await
    }

    #[tokio::test(start_paused = true)]
    async fn poison_message() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        integration_tests_servicebus::poison_message().await
    }

    #[tokio::test(start_paused = true)]
    async fn single_delivery_order() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        integration_tests_servicebus::single_delivery_order().await
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_concurrency() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        for limit in [1, 4, 8] {
            integration_tests_servicebus::bounded_concurrency(limit).await?;
        }
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn double_ack() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        integration_tests_servicebus::double_ack().await
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_in_flight() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        integration_tests_servicebus::stop_waits_for_in_flight().await
    }

    #[tokio::test(start_paused = true)]
    async fn stop_after_drain_timeout() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        integration_tests_servicebus::stop_after_drain_timeout().await
    }

    #[tokio::test(start_paused = true)]
    async fn receive_faults() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        integration_tests_servicebus::receive_faults().await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn all_acknowledged_multi_thread() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        integration_tests_servicebus::all_acknowledged().await
    }
}
