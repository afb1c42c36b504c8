// Copyright (c) 2025 Presto Client Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP client plumbing for the Presto protocol.
//!
//! This module provides:
//! - `PrestoHttpClient`: low-level HTTP client with retry logic
//! - the process-wide custom client registry keyed by the DSN
//!   `custom_client` parameter

pub mod http;

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::error::{Error, Result};

pub use http::{PrestoHttpClient, RetryPolicy};

static CUSTOM_CLIENTS: OnceLock<Mutex<HashMap<String, reqwest::Client>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<String, reqwest::Client>> {
    CUSTOM_CLIENTS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Register an HTTP client under a name usable as the DSN `custom_client`
/// parameter. Registering an existing name replaces the previous client.
///
/// The names `true` and `false` are reserved and rejected.
pub fn register_custom_client(name: impl Into<String>, client: reqwest::Client) -> Result<()> {
    let name = name.into();
    if name == "true" || name == "false" {
        return Err(Error::ReservedClientName(name));
    }
    registry()
        .lock()
        .expect("custom client registry poisoned")
        .insert(name, client);
    Ok(())
}

/// Remove a previously registered client. Unknown names are ignored.
pub fn deregister_custom_client(name: &str) {
    registry()
        .lock()
        .expect("custom client registry poisoned")
        .remove(name);
}

/// Look up a registered client by name. `reqwest::Client` clones share the
/// underlying connection pool, so the registry hands out cheap handles.
pub(crate) fn custom_client(name: &str) -> Option<reqwest::Client> {
    registry()
        .lock()
        .expect("custom client registry poisoned")
        .get(name)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_names_rejected() {
        for name in ["true", "false"] {
            let err = register_custom_client(name, reqwest::Client::new());
            assert!(matches!(err, Err(Error::ReservedClientName(_))), "{}", name);
        }
    }

    #[test]
    fn test_register_lookup_deregister() {
        register_custom_client("test-client-cycle", reqwest::Client::new()).unwrap();
        assert!(custom_client("test-client-cycle").is_some());
        // duplicate registration replaces, does not error
        register_custom_client("test-client-cycle", reqwest::Client::new()).unwrap();
        deregister_custom_client("test-client-cycle");
        assert!(custom_client("test-client-cycle").is_none());
    }

    #[test]
    fn test_unknown_client_absent() {
        assert!(custom_client("never-registered").is_none());
    }
}
