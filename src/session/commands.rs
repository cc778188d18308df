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

//! Handles responding to particular commands from SMTP clients.
//!
//! Each handler checks its argument, then the session state, and only changes the state if it
//! replies with success. `QUIT` is handled by the dispatcher itself.

use super::{Mode, Session};
use crate::{
    command::{extract_address, Verb},
    reply::Reply,
};

impl Session {
    /// Reply to the hello (`HELO`) command from a client.
    ///
    /// [RFC 821 section 4.1.1](https://www.rfc-editor.org/rfc/rfc821.html#page-20).
    pub(super) fn hello(&mut self, argument: Option<&str>) -> Reply {
        let Some(name) = argument else {
            return Reply::Syntax(Verb::Hello);
        };

        if self.greeting.is_some() {
            return Reply::DuplicateHello;
        }

        self.greeting = Some(name.to_string());

        Reply::Hello {
            fqdn: self.config.fqdn().to_string(),
        }
    }

    /// Reply to the mail (`MAIL FROM:<reverse-path>`) command from a client.
    pub(super) fn mail(&mut self, argument: Option<&str>) -> Reply {
        let Some(address) = argument.and_then(extract_address) else {
            return Reply::Syntax(Verb::Mail);
        };

        if self.mail_from.is_some() {
            return Reply::NestedMail;
        }

        self.mail_from = Some(address.to_string());

        Reply::Ok
    }

    /// Reply to the recipient (`RCPT TO:<forward-path>`) command from a client.
    ///
    /// Unlike `MAIL`, the order of checks is reversed: a missing `MAIL` is reported before a
    /// malformed address.
    pub(super) fn recipient(&mut self, argument: Option<&str>) -> Reply {
        if self.mail_from.is_none() {
            return Reply::NeedMail;
        }

        let Some(address) = argument.and_then(extract_address) else {
            return Reply::Syntax(Verb::Recipient);
        };

        self.rcpt_to.push(address.to_string());

        Reply::Ok
    }

    /// Reply to the `DATA` command from a client, switching the session over to reading the
    /// message.
    pub(super) fn data(&mut self, argument: Option<&str>) -> Reply {
        if self.rcpt_to.is_empty() {
            return Reply::NeedRecipient;
        }

        if argument.is_some() {
            return Reply::Syntax(Verb::Data);
        }

        self.mode = Mode::Data;

        Reply::StartData
    }

    /// Reply to the reset (`RSET`) command from a client.
    ///
    /// Clears the sender and recipients, but not the `HELO` greeting.
    pub(super) fn reset(&mut self, argument: Option<&str>) -> Reply {
        if argument.is_some() {
            return Reply::Syntax(Verb::Reset);
        }

        self.clear_transaction();

        Reply::Ok
    }

    pub(super) const fn noop(argument: Option<&str>) -> Reply {
        if argument.is_some() {
            Reply::Syntax(Verb::Noop)
        } else {
            Reply::Ok
        }
    }
}
