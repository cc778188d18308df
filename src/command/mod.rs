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

//! Parses a command line from an SMTP client.
//!
//! See [`parse`].

pub mod address;

use std::{fmt::Display, str::FromStr};

pub use address::extract_address;

/// One command line, split into its verb and arguments.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct Command {
    /// The uppercase verb. Empty if the line had nothing to dispatch on.
    verb: String,
    /// The arguments following the verb.
    args: Vec<String>,
}

impl Command {
    /// Get the verb of the command as an uppercase string slice.
    #[must_use]
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Get the arguments following the verb.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Get the arguments joined back together with single spaces.
    ///
    /// Returns `None` if there are no arguments or they are all empty, which handlers treat the
    /// same as the argument being missing.
    #[must_use]
    pub fn argument(&self) -> Option<String> {
        let joined = self.args.join(" ");

        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

/// Parse a line as a command.
///
/// - If the line contains a colon, it is split on the first colon only. Everything after it is a
///   single argument, so `MAIL FROM:<a@b.com>` has the argument `<a@b.com>`.
/// - Otherwise, it is split on every space, so `HELO a.com` has the argument `a.com`.
///
/// Either way, the verb is the first word of whatever came before the split, in uppercase.
///
/// Note that the mailbox-local part of an email address (ex. `smith` in `smith@example.com`) is
/// case-sensitive, so arguments are not set to uppercase.
#[must_use]
pub fn parse(line: &str) -> Command {
    if line.is_empty() {
        return Command::default();
    }

    let (head, args) = match line.split_once(':') {
        Some((head, rest)) => (head, vec![rest.to_string()]),
        None => {
            let mut tokens = line.split(' ');
            let head = tokens.next().unwrap_or_default();

            (head, tokens.map(str::to_string).collect())
        }
    };

    // `MAIL FROM` and `RCPT TO` dispatch on their first word.
    let verb = head.split(' ').next().unwrap_or_default();

    Command {
        verb: verb.to_ascii_uppercase(),
        args,
    }
}

/// The commands this server implements: the minimum set from RFC 821, sans `VRFY`.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub enum Verb {
    /// `HELO`, identifies the client.
    Hello,
    /// `MAIL FROM:<reverse-path>`, starts a transaction.
    Mail,
    /// `RCPT TO:<forward-path>`, adds a recipient.
    Recipient,
    /// `DATA`, starts the message contents.
    Data,
    /// `RSET`, aborts the current transaction.
    Reset,
    /// `NOOP`.
    Noop,
    /// `QUIT`, ends the session.
    Quit,
}

impl Verb {
    /// The name of this verb on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hello => "HELO",
            Self::Mail => "MAIL",
            Self::Recipient => "RCPT",
            Self::Data => "DATA",
            Self::Reset => "RSET",
            Self::Noop => "NOOP",
            Self::Quit => "QUIT",
        }
    }
}

impl FromStr for Verb {
    type Err = UnknownVerb;

    /// Look up a verb, ignoring case.
    fn from_str(str: &str) -> Result<Self, Self::Err> {
        Ok(match str.to_ascii_uppercase().as_str() {
            "HELO" => Self::Hello,
            "MAIL" => Self::Mail,
            "RCPT" => Self::Recipient,
            "DATA" => Self::Data,
            "RSET" => Self::Reset,
            "NOOP" => Self::Noop,
            "QUIT" => Self::Quit,
            _ => return Err(UnknownVerb),
        })
    }
}

impl Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a [`Verb`] this server does not implement.
#[derive(PartialEq, Eq, Debug, Copy, Clone, thiserror::Error)]
#[error("command not implemented")]
pub struct UnknownVerb;
