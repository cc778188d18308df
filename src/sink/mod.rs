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

//! Hands completed messages off to whatever consumes them.
//!
//! See [`Sink`].

mod channel;
mod debug;

use std::{future::Future, net::SocketAddr};

pub use channel::ChannelSink;
pub use debug::DebugSink;

use crate::reply::RejectLine;

/// A completed mail transaction.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Envelope {
    /// The address of the client that sent the message.
    pub peer: SocketAddr,
    /// The address from `MAIL FROM`, without angle brackets.
    pub mail_from: String,
    /// The addresses from each `RCPT TO`, in order, without angle brackets.
    pub rcpt_to: Vec<String>,
    /// The entire text of the message, headers and all.
    ///
    /// Lines are separated by `LF`, and have been "de-transparencied" according to RFC 821
    /// section 4.5.2: a line that started with a `.` has had that leading dot removed.
    pub body: String,
}

/// How a [`Sink`] responded to a message.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Outcome {
    /// The message was taken; the client is told `250 Ok`.
    Ok,
    /// The message was declined; the client is sent this line verbatim.
    Reject(RejectLine),
}

/// Consumes messages accepted by an SMTP session.
///
/// The returned future is awaited before the session reads any more input from that client, but
/// other sessions carry on in the meantime. A sink that finishes immediately can return
/// [`std::future::ready`].
///
/// ```rust
/// # use std::future::{ready, Future};
/// # use smtp_broker::sink::{Envelope, Outcome, Sink};
/// struct Discard;
///
/// impl Sink for Discard {
///     fn accept(&self, _: Envelope) -> impl Future<Output = Outcome> + Send {
///         ready(Outcome::Ok)
///     }
/// }
/// ```
pub trait Sink: Send + Sync {
    /// Take ownership of a completed message.
    fn accept(&self, envelope: Envelope) -> impl Future<Output = Outcome> + Send;
}
