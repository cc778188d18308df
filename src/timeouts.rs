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

//! How long a server waits on a silent client before hanging up.
//!
//! [RFC 5321 4.5.3.2](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.5.3.2) defines
//! minimum timeouts in minutes, so that ordinary transmission and processing delays are not
//! mistaken for a dead session. Only the ones that apply to a receiving server are here.
//!
//! Note that, when testing, all timeouts are overridden to [`EXPECTED`]; because a testing
//! environment can be expected to have better performance than the real world.

/// A very strict timeout for how long participants should wait for anything.
///
/// Not specified by RFC 5321. This is for identifying unusual performance for testing.
pub const EXPECTED: std::time::Duration = std::time::Duration::from_secs(3);

/// Generate `const` items with [`std::time::Duration`] values in minutes, optionally including
/// documentation comments.
///
/// Does not account for leap seconds or similar shenanigans. A "minute" is 60 of whatever
/// [`std::time::Duration`] considers to be a "second."
macro_rules! minute_durations {
        [$(
            $( #[$attr:meta] )*
            $label:ident = $minutes:expr
        ),+ ,] => {
            $(
                $( #[$attr] )*
                #[cfg(not(test))]
                pub const $label: ::std::time::Duration =
                    ::std::time::Duration::from_secs($minutes * 60);

                // For stricter performance checks during testing.
                $( #[$attr] )*
                #[cfg(test)]
                pub const $label: ::std::time::Duration =
                    $crate::timeouts::EXPECTED;
            )+
        };
    }

minute_durations![
    /// How long the server waits for each chunk of message contents after the `354` reply,
    /// mirroring the minimum a client waits on each TCP `send`.
    ///
    /// [RFC 5321 § 4.5.3.2.5](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.5.3.2.5).
    DATA_BLOCK = 3,
    /// The minimum length in minutes a server should wait for the next command from a client.
    ///
    /// [RFC 5321 § 4.5.3.2.7](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.5.3.2.7).
    SERVER_TIMEOUT = 5,
];
