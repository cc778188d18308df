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

use std::future::{ready, Future};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{Envelope, Outcome, Sink};
use crate::reply::RejectLine;

/// Sent when the receiving end of a [`ChannelSink`] has gone away.
const TRANSACTION_FAILED: &str = "554 Transaction failed";

/// A [`Sink`] that forwards every message over a channel, for embedding a server in another
/// program.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<Envelope>,
}

impl ChannelSink {
    /// Create a sink along with the receiver that its messages arrive on.
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<Envelope>) {
        let (sender, receiver) = mpsc::unbounded_channel();

        (Self { sender }, receiver)
    }
}

impl From<UnboundedSender<Envelope>> for ChannelSink {
    fn from(sender: UnboundedSender<Envelope>) -> Self {
        Self { sender }
    }
}

impl Sink for ChannelSink {
    fn accept(&self, envelope: Envelope) -> impl Future<Output = Outcome> + Send {
        ready(match self.sender.send(envelope) {
            Ok(()) => Outcome::Ok,
            Err(_) => {
                tracing::warn!("message receiver closed, rejecting message");

                // Safety: `TRANSACTION_FAILED` is a single line of ASCII.
                Outcome::Reject(unsafe { RejectLine::new_unchecked(TRANSACTION_FAILED) })
            }
        })
    }
}
