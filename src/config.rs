// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright © 2024 RemasteredArch
//
// This file is part of smtp_broker.
//
// smtp_broker is free software: you can redistribute it and/or modify it under the terms of the
// GNU Affero General Public License as published by the Free Software Foundation, either version
// 3 of the License, or (at your option) any later version.
//
// smtp_broker is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License along with
// smtp_broker. If not, see <https://www.gnu.org/licenses/>.

//! Process-wide server settings, shared read-only by every session.

use ascii::AsAsciiStr;

use crate::{error::ConfigError, max_lengths};

/// The version advertised in the `220` greeting by default.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The largest message accepted by default, in bytes: 32 MiB.
pub const DEFAULT_MESSAGE_LIMIT: usize = 32 * 1024 * 1024;

/// Settings that stay the same for the lifetime of the server.
///
/// Build this once at startup and share it between sessions behind an
/// [`Arc`](std::sync::Arc).
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Config {
    fqdn: String,
    version: String,
    message_limit: usize,
}

impl Config {
    /// Create a configuration that identifies this server as `fqdn`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `fqdn` is empty, is not US-ASCII, or contains whitespace.
    pub fn new(fqdn: impl Into<String>) -> Result<Self, ConfigError> {
        let fqdn = fqdn.into();
        validate("fqdn", &fqdn)?;

        Ok(Self {
            fqdn,
            version: VERSION.to_string(),
            message_limit: DEFAULT_MESSAGE_LIMIT,
        })
    }

    /// Replace the version advertised in the greeting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `version` is empty, is not US-ASCII, or contains whitespace.
    pub fn with_version(mut self, version: impl Into<String>) -> Result<Self, ConfigError> {
        let version = version.into();
        validate("version", &version)?;

        self.version = version;
        Ok(self)
    }

    /// The fully-qualified domain name of this server, used in the greeting and `HELO` replies.
    #[must_use]
    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Replace the largest message accepted, in bytes. Larger messages are refused with `552`.
    ///
    /// Values below [`max_lengths::MESSAGE`] are raised to it.
    #[must_use]
    pub fn with_message_limit(mut self, message_limit: usize) -> Self {
        self.message_limit = message_limit.max(max_lengths::MESSAGE);
        self
    }

    #[must_use]
    pub const fn message_limit(&self) -> usize {
        self.message_limit
    }
}

/// Check that `value` can sit between the spaces of a reply line.
fn validate(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Empty { field });
    }

    let ascii = value
        .as_ascii_str()
        .map_err(|source| ConfigError::NotAscii { field, source })?;

    if ascii
        .chars()
        .any(|char| char.as_char().is_ascii_whitespace() || char.as_char().is_ascii_control())
    {
        return Err(ConfigError::Whitespace { field });
    }

    Ok(())
}
