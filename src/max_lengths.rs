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

//! The maximum length, in number of 8-bit bytes, of items a client sends.
//!
//! Note that these are the *minimum* values. SMTP servers must be able to handle at least these
//! limits, and may accept more.
//!
//! Per [RFC 5321 section 4.5.3.1](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.5.3.1).

/// The maximum length of a command line (including the verb and line ending sequence) in
/// bytes.
///
/// [RFC 5321 § 4.5.3.1.4](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.5.3.1.4).
pub const COMMAND_LINE: usize = 512;

/// The maximum length of a message (including both the headers and body) in bytes.
///
/// Given the evolution of email, this value is especially recommended to be raised. See
/// [`crate::config::DEFAULT_MESSAGE_LIMIT`].
///
/// [RFC 5321 § 4.5.3.1.7](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.5.3.1.7).
pub const MESSAGE: usize = 64_000;
