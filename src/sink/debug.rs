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

use std::fmt::Write as _;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt, Stdout},
    sync::Mutex,
};

use super::{Envelope, Outcome, Sink};
use crate::reply::RejectLine;

/// Sent when a message could not be written out.
const LOCAL_ERROR: &str = "451 Requested action aborted: local error in processing";

/// A [`Sink`] that accepts every message and dumps it, framed by banners, into a writer.
///
/// An `X-Peer` header holding the client's IP address is added to the end of the message
/// headers, if the message has a blank line separating them from the body.
#[derive(Debug)]
pub struct DebugSink<W> {
    out: Mutex<W>,
}

impl DebugSink<Stdout> {
    /// Create a sink that writes to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> DebugSink<W> {
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consume [`Self`] and get the writer back.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: AsyncWrite + Unpin + Send> Sink for DebugSink<W> {
    async fn accept(&self, envelope: Envelope) -> Outcome {
        let dump = render(&envelope);

        // Hold the lock across the whole write, so that concurrent messages are not interleaved.
        let mut out = self.out.lock().await;
        let written = async {
            out.write_all(dump.as_bytes()).await?;
            out.flush().await
        }
        .await;

        match written {
            Ok(()) => Outcome::Ok,
            Err(err) => {
                tracing::warn!(%err, "failed to write message");

                // Safety: `LOCAL_ERROR` is a single line of ASCII.
                Outcome::Reject(unsafe { RejectLine::new_unchecked(LOCAL_ERROR) })
            }
        }
    }
}

/// Format `envelope` for a human to read.
pub(super) fn render(envelope: &Envelope) -> String {
    let mut dump = String::with_capacity(envelope.body.len() + 256);
    let peer = envelope.peer;

    // Writing into a `String` cannot fail.
    let _ = writeln!(dump, "------------ NEW MESSAGE ------------");
    let _ = writeln!(dump, "Client: {}:{}", peer.ip(), peer.port());
    let _ = writeln!(dump, "From: {}", envelope.mail_from);
    let _ = writeln!(dump, "To: {}", envelope.rcpt_to.join(","));
    let _ = writeln!(dump, "------------ END MESSAGE ------------");
    let _ = writeln!(dump, "---------- MESSAGE FOLLOWS ----------");

    let mut in_headers = true;
    for line in envelope.body.split('\n') {
        if in_headers && line.is_empty() {
            let _ = writeln!(dump, "X-Peer: {}", peer.ip());
            in_headers = false;
        }

        let _ = writeln!(dump, "{line}");
    }

    let _ = writeln!(dump, "------------ END MESSAGE ------------");

    dump
}
