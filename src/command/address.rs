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

//! Extracts the address from the argument of `MAIL` and `RCPT`.

/// Extract the address from an angle-bracketed path, such as `<smith@example.com>`.
///
/// The token must start with `<` and end with `>` exactly. Surrounding whitespace is not
/// trimmed, so `" <smith@example.com>"` is rejected.
///
/// Returns `None` for malformed tokens, and for the null path `<>`.
///
/// ```rust
/// # use smtp_broker::command::extract_address;
/// assert_eq!(extract_address("<smith@example.com>"), Some("smith@example.com"));
/// assert_eq!(extract_address("smith@example.com"), None);
/// assert_eq!(extract_address("<>"), None);
/// ```
#[must_use]
pub fn extract_address(token: &str) -> Option<&str> {
    token
        .strip_prefix('<')?
        .strip_suffix('>')
        .filter(|address| !address.is_empty())
}
