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

//! Configuration for the samples, read from the environment.

use service_bus_pump::connection::{ConnectionString, ConnectionStringError};

/// The connection string of the message-bus namespace.
pub const CONNECTION_STRING: &str = "SERVICE_BUS_CONNECTION_STRING";
/// The topic to subscribe to.
pub const TOPIC_NAME: &str = "TOPIC_NAME";
/// The subscription to create and consume.
pub const SUBSCRIPTION_NAME: &str = "SUBSCRIPTION_NAME";
/// How many messages the sample publishes to the emulated topic.
pub const SAMPLE_MESSAGE_COUNT: &str = "SAMPLE_MESSAGE_COUNT";

const DEFAULT_SAMPLE_MESSAGE_COUNT: u64 = 3;

/// An error in the sample configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("the {0} environment variable is not set")]
    Missing(&'static str),
    #[error("invalid connection string: {0}")]
    ConnectionString(#[from] ConnectionStringError),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub connection_string: ConnectionString,
    pub topic_name: String,
    pub subscription_name: String,
    pub sample_message_count: u64,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration using `lookup` to find each variable.
    ///
    /// Empty values are treated as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name| lookup(name).filter(|v| !v.is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let connection_string = required(CONNECTION_STRING)?.parse::<ConnectionString>()?;
        let topic_name = required(TOPIC_NAME)?;
        let subscription_name = required(SUBSCRIPTION_NAME)?;
        let sample_message_count = match get(SAMPLE_MESSAGE_COUNT) {
            None => DEFAULT_SAMPLE_MESSAGE_COUNT,
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: SAMPLE_MESSAGE_COUNT,
                value,
            })?,
        };
        Ok(Self {
            connection_string,
            topic_name,
            subscription_name,
            sample_message_count,
        })
    }
}
