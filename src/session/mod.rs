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

//! The state of one SMTP session, independent of how bytes reach it.
//!
//! See [`Session`].

mod commands;

use std::{net::SocketAddr, sync::Arc};

use crate::{
    command::{self, Verb},
    config::Config,
    connection::{CloseReason, ShouldClose},
    frame::{Frame, FrameDecoder},
    reply::Reply,
    sink::{Envelope, Outcome, Sink},
};

/// Decides how client input is framed.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Default)]
pub enum Mode {
    /// Input is a sequence of command lines.
    #[default]
    Command,
    /// Input is message contents, up until a line consisting of a single dot.
    Data,
}

/// A reply to send to the client, and whether to hang up afterwards.
#[derive(PartialEq, Eq, Debug)]
pub struct Response {
    pub reply: Reply,
    pub should_close: ShouldClose,
}

impl From<Reply> for Response {
    fn from(reply: Reply) -> Self {
        Self {
            reply,
            should_close: ShouldClose::Keep,
        }
    }
}

/// The protocol state of one connection.
///
/// Bytes from the client go in through [`Self::feed`]. Each call to [`Self::advance`] then
/// handles at most one command or message and produces the reply for it.
///
/// A session is owned by a single task, and handles its input strictly in order.
#[derive(Debug)]
pub struct Session {
    peer: SocketAddr,
    config: Arc<Config>,
    mode: Mode,
    /// The hostname given with `HELO`. Kept across transactions.
    greeting: Option<String>,
    mail_from: Option<String>,
    rcpt_to: Vec<String>,
    decoder: FrameDecoder,
    /// Set once `QUIT` has been answered.
    closed: bool,
}

impl Session {
    /// Start a session with the client at `peer`.
    ///
    /// Send [`Self::greeting`] to the client before anything else.
    #[must_use]
    pub fn new(peer: SocketAddr, config: Arc<Config>) -> Self {
        let decoder = FrameDecoder::with_message_limit(config.message_limit());

        Self {
            peer,
            config,
            mode: Mode::Command,
            greeting: None,
            mail_from: None,
            rcpt_to: Vec::new(),
            decoder,
            closed: false,
        }
    }

    /// The `220` reply that opens the session.
    #[must_use]
    pub fn greeting(&self) -> Reply {
        Reply::Greeting {
            fqdn: self.config.fqdn().to_string(),
            version: self.config.version().to_string(),
        }
    }

    /// Buffer input from the client.
    ///
    /// Input that arrives after the client has quit is ignored.
    pub fn feed(&mut self, chunk: &[u8]) {
        if !self.closed {
            self.decoder.feed(chunk);
        }
    }

    /// Handle the next complete command or message in the buffer.
    ///
    /// Returns `None` if more input is needed, or if the session has been closed by `QUIT`. Call
    /// this until it returns `None` before reading more input.
    ///
    /// Completing a message awaits `sink`; nothing else is handled in the meantime.
    pub async fn advance<S: Sink>(&mut self, sink: &S) -> Option<Response> {
        if self.closed {
            return None;
        }

        let response = match self.decoder.next_frame(self.mode)? {
            Frame::Line(line) => self.dispatch(&line),
            Frame::Block(block) => self.complete_data(&block, sink).await.into(),
            Frame::LineTooLong => Reply::LineTooLong.into(),
            Frame::BlockTooLarge => self.discard_data().into(),
        };

        if matches!(response.should_close, ShouldClose::Close(_)) {
            self.closed = true;
            self.decoder.clear();
        }

        Some(response)
    }

    /// Parse a command line and pass it to its handler.
    fn dispatch(&mut self, line: &str) -> Response {
        let command = command::parse(line);
        tracing::debug!(verb = command.verb(), "received command");

        if command.verb().is_empty() {
            return Reply::BadSyntax.into();
        }

        let Ok(verb) = command.verb().parse::<Verb>() else {
            return Reply::not_implemented(command.verb()).into();
        };

        let argument = command.argument();
        let argument = argument.as_deref();

        match verb {
            Verb::Hello => self.hello(argument).into(),
            Verb::Mail => self.mail(argument).into(),
            Verb::Recipient => self.recipient(argument).into(),
            Verb::Data => self.data(argument).into(),
            Verb::Reset => self.reset(argument).into(),
            Verb::Noop => Self::noop(argument).into(),
            Verb::Quit => Response {
                reply: Reply::Bye,
                should_close: ShouldClose::Close(CloseReason::Quit),
            },
        }
    }

    /// Finish a `DATA` transaction: reverse the dot-stuffing, hand the message to `sink`, and
    /// start over with an empty envelope.
    async fn complete_data<S: Sink>(&mut self, block: &str, sink: &S) -> Reply {
        if self.mode != Mode::Data {
            tracing::error!("received mail data outside of a DATA transaction");
            return Reply::InternalConfusion;
        }

        let envelope = Envelope {
            peer: self.peer,
            mail_from: self.mail_from.clone().unwrap_or_default(),
            rcpt_to: self.rcpt_to.clone(),
            body: remove_transparency(block),
        };
        let recipients = envelope.rcpt_to.len();

        let outcome = sink.accept(envelope).await;

        // The envelope must be empty before the client can see the reply and send another
        // command.
        self.clear_transaction();

        match outcome {
            Outcome::Ok => {
                tracing::info!(recipients, "message accepted");
                Reply::Ok
            }
            Outcome::Reject(line) => {
                tracing::warn!(recipients, reply = %line, "message rejected");
                Reply::Rejected(line)
            }
        }
    }

    /// End a `DATA` transaction whose message was too large to keep.
    fn discard_data(&mut self) -> Reply {
        tracing::warn!(
            limit = self.config.message_limit(),
            "discarded a message over the size limit"
        );
        self.clear_transaction();

        Reply::TooMuchData
    }

    /// Forget the sender and recipients, and go back to reading commands.
    fn clear_transaction(&mut self) {
        self.mail_from = None;
        self.rcpt_to.clear();
        self.mode = Mode::Command;
    }

    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// The hostname the client introduced itself with, if it has sent `HELO`.
    #[must_use]
    pub fn greeting_name(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    #[must_use]
    pub fn mail_from(&self) -> Option<&str> {
        self.mail_from.as_deref()
    }

    #[must_use]
    pub fn rcpt_to(&self) -> &[String] {
        &self.rcpt_to
    }

    /// Whether the client has quit.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Reverse the dot-stuffing of RFC 821 section 4.5.2: strip exactly one leading `.` from every
/// line.
///
/// Lines are split on `CRLF` and joined with `LF`.
fn remove_transparency(block: &str) -> String {
    block
        .split("\r\n")
        .map(|line| line.strip_prefix('.').unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}
