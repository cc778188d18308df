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

//! Errors raised while setting up a server or building replies.
//!
//! Protocol errors made by clients are not represented here: they are answered with a
//! [`Reply`](crate::reply::Reply) and the session carries on.

use ascii::AsAsciiStrError;
use thiserror::Error;

/// Possible error states encountered when building a [`Config`](crate::config::Config).
#[derive(PartialEq, Eq, Debug, Clone, Error)]
pub enum ConfigError {
    /// The field was empty.
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    /// The field contained a character outside of US-ASCII.
    #[error("{field} must be US-ASCII: {source}")]
    NotAscii {
        field: &'static str,
        source: AsAsciiStrError,
    },
    /// The field contained whitespace or a control character, which would break up the greeting.
    #[error("{field} must not contain whitespace or control characters")]
    Whitespace { field: &'static str },
}

/// Possible error states encountered when building a [`RejectLine`](crate::reply::RejectLine).
#[derive(PartialEq, Eq, Debug, Clone, Error)]
pub enum RejectLineError {
    /// The line was empty.
    #[error("reply line is empty")]
    Empty,
    /// The line contained a character outside of US-ASCII.
    #[error("reply line must be US-ASCII: {0}")]
    NotAscii(#[from] AsAsciiStrError),
    /// The line contained a `CR` or `LF`, which would let it spill into more than one reply.
    #[error("reply line contains a line break")]
    LineBreak,
}
