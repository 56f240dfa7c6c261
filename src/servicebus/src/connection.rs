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

//! Parses message-bus connection strings.
//!
//! A connection string is a list of `key=value` pairs separated by `;`:
//!
//! ```text
//! Endpoint=sb://my-namespace.servicebus.windows.net/;SharedAccessKeyName=RootManageSharedAccessKey;SharedAccessKey=secret
//! ```

use std::str::FromStr;

/// An error parsing a connection string.
#[derive(thiserror::Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum ConnectionStringError {
    /// A required key is missing.
    #[error("the connection string has no `{0}` value")]
    Missing(&'static str),

    /// A segment of the connection string is not a `key=value` pair.
    #[error("malformed connection string segment `{0}`")]
    Malformed(String),
}

/// The endpoint and credentials to reach a message-bus namespace.
///
/// # Example
/// ```
/// # use service_bus_pump::connection::ConnectionString;
/// let cs: ConnectionString = "Endpoint=sb://ns.example.com/;SharedAccessKeyName=root;SharedAccessKey=c2VjcmV0="
///     .parse()?;
/// assert_eq!(cs.endpoint(), "sb://ns.example.com/");
/// assert_eq!(cs.shared_access_key_name(), Some("root"));
/// # Ok::<(), service_bus_pump::connection::ConnectionStringError>(())
/// ```
#[derive(Clone, PartialEq)]
pub struct ConnectionString {
    endpoint: String,
    shared_access_key_name: Option<String>,
    shared_access_key: Option<String>,
    entity_path: Option<String>,
}

impl ConnectionString {
    /// The namespace endpoint, for example `sb://my-namespace.example.com/`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The name of the shared access policy, if any.
    pub fn shared_access_key_name(&self) -> Option<&str> {
        self.shared_access_key_name.as_deref()
    }

    /// The shared access key, if any.
    pub fn shared_access_key(&self) -> Option<&str> {
        self.shared_access_key.as_deref()
    }

    /// The entity the connection string is scoped to, if any.
    pub fn entity_path(&self) -> Option<&str> {
        self.entity_path.as_deref()
    }
}

impl FromStr for ConnectionString {
    type Err = ConnectionStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut endpoint = None;
        let mut shared_access_key_name = None;
        let mut shared_access_key = None;
        let mut entity_path = None;
        for segment in s.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            // Keys may contain `=` padding (base64), split on the first one.
            let Some((key, value)) = segment.split_once('=') else {
                return Err(ConnectionStringError::Malformed(segment.to_string()));
            };
            let value = Some(value.trim().to_string());
            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = value,
                "sharedaccesskeyname" => shared_access_key_name = value,
                "sharedaccesskey" => shared_access_key = value,
                "entitypath" => entity_path = value,
                _ => tracing::debug!("ignoring unknown connection string key `{key}`"),
            }
        }
        let endpoint = endpoint
            .filter(|e| !e.is_empty())
            .ok_or(ConnectionStringError::Missing("Endpoint"))?;
        Ok(Self {
            endpoint,
            shared_access_key_name,
            shared_access_key,
            entity_path,
        })
    }
}

impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("endpoint", &self.endpoint)
            .field("shared_access_key_name", &self.shared_access_key_name)
            .field(
                "shared_access_key",
                &self.shared_access_key.as_ref().map(|_| "[censored]"),
            )
            .field("entity_path", &self.entity_path)
            .finish()
    }
}
