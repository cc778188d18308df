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

//! The replies a server sends to an SMTP client.
//!
//! Texts match those of long-standing RFC 821 receivers exactly, because some clients match on
//! more than the reply code.


use std::fmt::Display;

use ascii::{AsAsciiStr, AsciiChar, AsciiString};

use crate::{error::RejectLineError, Verb};

/// The line ending sequence of every reply.
pub const CRLF: &str = "\r\n";

/// A single-line reply to an SMTP client.
///
/// [`Display`] renders the reply without a line ending; append [`CRLF`] when writing it.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Reply {
    /// `220 <fqdn> <version>`, sent as soon as the connection opens.
    Greeting { fqdn: String, version: String },
    /// `221 Bye`, in response to `QUIT`.
    Bye,
    /// `250 <fqdn>`, in response to `HELO`.
    Hello { fqdn: String },
    /// `250 Ok`.
    Ok,
    /// `354 End data with <CR><LF>.<CR><LF>`, in response to `DATA`.
    StartData,
    /// `451 Internal confusion`, for mail data that arrives outside of a `DATA` transaction.
    InternalConfusion,
    /// `500 Error: bad syntax`, for lines with no verb.
    BadSyntax,
    /// `500 Error: line too long`.
    LineTooLong,
    /// `501 Syntax: ...`, for a command with a missing, extra, or malformed argument.
    Syntax(Verb),
    /// `502 Error: command '<verb>' not implemented`.
    ///
    /// Build this with [`Self::not_implemented`].
    NotImplemented(String),
    /// `503 Duplicate HELO/EHLO`.
    DuplicateHello,
    /// `503 Error: nested MAIL command`.
    NestedMail,
    /// `503 Error: need MAIL command`.
    NeedMail,
    /// `503 Error: need RCPT command`.
    NeedRecipient,
    /// `552 Error: Too much mail data`, for a message over the size limit.
    TooMuchData,
    /// A reply chosen by a [`Sink`](crate::sink::Sink) that declined a message, sent verbatim.
    Rejected(RejectLine),
}

impl Reply {
    /// Reply to an unknown `verb`, echoing it back.
    ///
    /// Anything in `verb` that is not printable US-ASCII is replaced with `?`, so the reply
    /// stays on one line.
    #[must_use]
    pub fn not_implemented(verb: &str) -> Self {
        Self::NotImplemented(
            verb.chars()
                .map(|char| if char.is_ascii_graphic() { char } else { '?' })
                .collect(),
        )
    }

    /// Get the three digit reply code.
    ///
    /// For [`Self::Rejected`], this is parsed out of the line and is `None` if the line does not
    /// start with one.
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        Some(match self {
            Self::Greeting { .. } => 220,
            Self::Bye => 221,
            Self::Hello { .. } | Self::Ok => 250,
            Self::StartData => 354,
            Self::InternalConfusion => 451,
            Self::BadSyntax | Self::LineTooLong => 500,
            Self::Syntax(_) => 501,
            Self::NotImplemented(_) => 502,
            Self::DuplicateHello | Self::NestedMail | Self::NeedMail | Self::NeedRecipient => 503,
            Self::TooMuchData => 552,
            Self::Rejected(line) => return line.code(),
        })
    }

    /// Whether this reply is a positive completion or intermediate reply (`2yz` or `3yz`).
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.code().is_some_and(|code| (200..400).contains(&code))
    }
}

impl Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Greeting { fqdn, version } => write!(f, "220 {fqdn} {version}"),
            Self::Bye => f.write_str("221 Bye"),
            Self::Hello { fqdn } => write!(f, "250 {fqdn}"),
            Self::Ok => f.write_str("250 Ok"),
            Self::StartData => f.write_str("354 End data with <CR><LF>.<CR><LF>"),
            Self::InternalConfusion => f.write_str("451 Internal confusion"),
            Self::BadSyntax => f.write_str("500 Error: bad syntax"),
            Self::LineTooLong => f.write_str("500 Error: line too long"),
            Self::Syntax(verb) => f.write_str(match verb {
                Verb::Hello => "501 Syntax: HELO hostname",
                Verb::Mail => "501 Syntax: MAIL FROM:<address>",
                Verb::Recipient => "501 Syntax: RCPT TO: <address>",
                Verb::Data => "501 Syntax: DATA",
                Verb::Reset => "501 Syntax: RSET",
                Verb::Noop => "501 Syntax: NOOP",
                // Never sent: `QUIT` ignores its argument.
                Verb::Quit => "501 Syntax: QUIT",
            }),
            Self::NotImplemented(verb) => write!(f, "502 Error: command '{verb}' not implemented"),
            Self::DuplicateHello => f.write_str("503 Duplicate HELO/EHLO"),
            Self::NestedMail => f.write_str("503 Error: nested MAIL command"),
            Self::NeedMail => f.write_str("503 Error: need MAIL command"),
            Self::NeedRecipient => f.write_str("503 Error: need RCPT command"),
            Self::TooMuchData => f.write_str("552 Error: Too much mail data"),
            Self::Rejected(line) => line.fmt(f),
        }
    }
}

/// A complete reply line supplied by a [`Sink`](crate::sink::Sink), such as
/// `"550 No such user here"`.
///
/// Guaranteed to be non-empty US-ASCII without line breaks, so that it is written as exactly one
/// reply line.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct RejectLine {
    line: AsciiString,
}

impl RejectLine {
    /// Validate `line` for use as a reply.
    ///
    /// # Errors
    ///
    /// Returns [`RejectLineError`] if `line` is empty, is not US-ASCII, or contains a `CR` or
    /// `LF`.
    pub fn new(line: &str) -> Result<Self, RejectLineError> {
        let line = line.as_ascii_str()?;

        if line.is_empty() {
            return Err(RejectLineError::Empty);
        }

        if line
            .chars()
            .any(|char| matches!(char, AsciiChar::CarriageReturn | AsciiChar::LineFeed))
        {
            return Err(RejectLineError::LineBreak);
        }

        Ok(Self {
            line: line.to_ascii_string(),
        })
    }

    /// Create a [`Self`] from a string without validating it.
    ///
    /// # Safety
    ///
    /// `line` must be non-empty US-ASCII and must not contain a `CR` or `LF`. Otherwise, it may
    /// be written to the client as more than one reply.
    #[must_use]
    pub(crate) unsafe fn new_unchecked(line: &str) -> Self {
        Self {
            line: unsafe { line.as_ascii_str_unchecked() }.to_ascii_string(),
        }
    }

    /// Get the reply code the line starts with, if it starts with one.
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        let digits = self.line.as_str().get(..3)?;

        if digits.bytes().all(|byte| byte.is_ascii_digit()) {
            digits.parse().ok()
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.line.as_str()
    }
}

impl TryFrom<&str> for RejectLine {
    type Error = RejectLineError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        Self::new(line)
    }
}

impl Display for RejectLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.line.fmt(f)
    }
}
