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

/// The message handler contract and the per-message disposition capability.
pub mod handler;

/// Out-of-band reporting of transport faults.
pub mod fault;

pub(crate) mod options;
pub(crate) mod pump;

mod dispatch;
mod lease_loop;
mod lease_state;
mod leaser;
