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

//! Logging setup for the Presto client.
//!
//! Installs a `tracing-subscriber` writing to stderr or a file. An explicit
//! [`LogConfig`] level wins over `RUST_LOG`; with neither, only warnings
//! and errors are emitted.
//!
//! ```bash
//! RUST_LOG=presto_client=debug ./my_app
//! ```

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Log level: "off", "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path. If unset, logs go to stderr.
    pub file: Option<String>,
}

/// Install the global tracing subscriber.
///
/// The global subscriber can only be installed once per process, so repeated
/// calls (and calls from processes that already set one up) are no-ops.
pub fn init_logging(config: &LogConfig) {
    let explicit = config.level.as_deref();
    if explicit.is_some_and(|level| level.eq_ignore_ascii_case("off")) {
        return;
    }

    let filter = match explicit {
        Some(level) => EnvFilter::new(format!("presto_client={}", level.to_lowercase())),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("presto_client=warn")),
    };

    // a file target disables ANSI colors, stderr keeps them
    let (writer, ansi) = match config.file.as_deref() {
        Some(path) => {
            let opened = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path);
            match opened {
                Ok(file) => (BoxMakeWriter::new(file), false),
                Err(e) => {
                    eprintln!("presto-client: failed to open log file {}: {}", path, e);
                    return;
                }
            }
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .try_init();
}
