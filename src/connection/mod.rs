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

//! Handles TCP connections as SMTP sessions.
//!
//! See [`handle`].

#[cfg(test)]
mod test;

use std::{net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time::error::Elapsed,
};
use tracing::Instrument;

use crate::{
    config::Config,
    session::{Mode, Session},
    sink::Sink,
    timeouts, write_fmt_line,
};

/// How many bytes to read from the client at once.
const CHUNK_LEN: usize = 4096;

/// Handle a TCP connection as an SMTP session.
///
/// If the address of the client cannot be determined, for example because it hung up right
/// away, the connection is closed without sending anything.
///
/// # Errors
///
/// This function will return [`std::io::Error`] from a variety of sources:
///
/// - I/O errors from [`AsyncWriteExt::write_all`] and [`AsyncReadExt::read`] on [`TcpStream`].
/// - I/O errors encountered in [`TcpStream::local_addr`].
///     - On POSIX, this comes from `getsockname` from the C standard library. If it returns an
///       explicit error or malformed output, this will be bubbled up through
///       [`std::io::Error`].
pub async fn handle<S: Sink>(
    stream: TcpStream,
    config: Arc<Config>,
    sink: Arc<S>,
) -> std::io::Result<CloseReason> {
    // A race condition may occur if the client is closing before we can get its address.
    let peer = match stream.peer_addr() {
        Ok(peer) => peer,
        Err(err) => {
            tracing::warn!(%err, "could not get the address of a client, closing connection");
            return Ok(CloseReason::PeerUnavailable);
        }
    };
    let local = stream.local_addr()?;

    let span = tracing::info_span!("session", %peer);
    async move {
        tracing::info!(%local, "connection opened");

        let close_reason = serve(stream, peer, config, sink.as_ref()).await;
        match &close_reason {
            Ok(reason) => tracing::info!(?reason, "connection closed"),
            Err(err) => tracing::warn!(%err, "connection failed"),
        }

        close_reason
    }
    .instrument(span)
    .await
}

/// Run an SMTP session with the client at `peer` over `stream`.
///
/// Sends the greeting, then alternates between reading input and replying to it until the client
/// quits, hangs up, or times out.
///
/// # Errors
///
/// - Any errors that could come out of the stream's `read`, `write_all`, or `flush` functions.
pub async fn serve<T, S>(
    stream: T,
    peer: SocketAddr,
    config: Arc<Config>,
    sink: &S,
) -> std::io::Result<CloseReason>
where
    T: AsyncRead + AsyncWrite,
    S: Sink,
{
    /// Read a chunk out of `reader` or break with [`CloseReason`].
    ///
    /// Implicitly calls `.await`.
    ///
    /// # Breaks
    ///
    /// If `read` reads zero bytes, `break` with [`CloseReason::ClosedByClient`].
    /// If `read` takes longer than the timeout for the current [`Mode`], break with
    /// [`CloseReason::TimedOut`].
    ///
    /// # Errors
    ///
    /// - Any errors that could come out of the supplied reader's `read` function.
    macro_rules! read_chunk_or_break {
        ($reader:expr, $buffer:expr, $timeout:expr) => {
            match ::tokio::time::timeout($timeout, $reader.read($buffer)).await {
                Ok(Ok(0)) => break CloseReason::ClosedByClient,
                Ok(Ok(len)) => Ok(len),
                Ok(Err(err)) => match err.kind() {
                    ::std::io::ErrorKind::ConnectionAborted
                    | ::std::io::ErrorKind::ConnectionReset => break CloseReason::ClosedByClient,
                    _ => Err(err),
                },
                Err(elapsed) => {
                    ::tracing::warn!("timed out waiting for the client");
                    break CloseReason::TimedOut(elapsed);
                }
            }
        };
    }

    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut session = Session::new(peer, config);
    let mut buffer = [0; CHUNK_LEN];

    write_fmt_line!(writer, "{}", session.greeting())?;
    writer.flush().await?;

    let close_reason = 'session: loop {
        while let Some(response) = session.advance(sink).await {
            tracing::debug!(reply = %response.reply, "sending reply");
            write_fmt_line!(writer, "{}", response.reply)?;

            if let ShouldClose::Close(reason) = response.should_close {
                writer.flush().await?;
                break 'session reason;
            }
        }
        writer.flush().await?;

        let timeout = match session.mode() {
            Mode::Command => timeouts::SERVER_TIMEOUT,
            Mode::Data => timeouts::DATA_BLOCK,
        };
        let len = read_chunk_or_break!(reader, &mut buffer, timeout)?;

        session.feed(&buffer[..len]);
    };

    // Whatever was left of the session, including any message that was still being received, is
    // dropped here without being delivered.
    if session.mode() == Mode::Data {
        tracing::info!("discarding unfinished message");
    }

    let _ = writer.shutdown().await;

    Ok(close_reason)
}

/// Indicates if and why a TCP connection should be closed.
#[derive(PartialEq, Eq, Debug)]
pub enum ShouldClose {
    /// The TCP connection should be kept open.
    Keep,
    /// The TCP connection should be closed because [`CloseReason`].
    Close(CloseReason),
}

/// Indicates why a TCP connection should be closed.
#[derive(PartialEq, Eq, Debug)]
pub enum CloseReason {
    /// The SMTP client requested to quit the session.
    Quit,
    /// More time [`Elapsed`] than [`crate::timeouts`] allows passed without input.
    TimedOut(Elapsed),
    /// The TCP connection was ended by the client.
    ClosedByClient,
    /// The address of the client could not be determined, so no session was started.
    PeerUnavailable,
}
