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

//! A minimal SMTP receiver, implementing the core of RFC 821.
//!
//! Every accepted connection gets its own [`Session`], which is handed raw bytes from the client
//! and produces [`Reply`]s. Completed messages are given to a [`Sink`] that decides what to do
//! with them.

#![warn(clippy::nursery, clippy::pedantic)]
#![cfg_attr(debug_assertions, allow(clippy::missing_errors_doc))]

pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod max_lengths;
pub mod reply;
pub mod session;
pub mod sink;
pub mod timeouts;

#[cfg(test)]
mod test;

use std::sync::Arc;

use futures_core::Stream;
use futures_util::{pin_mut, StreamExt};
use tokio::{net::TcpListener, task::JoinHandle};

pub use command::Verb;
pub use config::Config;
pub use connection::CloseReason;
pub use reply::Reply;
pub use session::Session;
pub use sink::{Envelope, Outcome, Sink};

/// Write a formatted line, terminated with `CRLF`, into an [`tokio::io::AsyncWrite`].
///
/// Implicitly calls `.await`.
///
/// # Errors
///
/// - Any errors that could come out of the supplied writer's `write_all` function.
#[doc(hidden)]
#[macro_export]
macro_rules! write_fmt_line {
    ($write_stream:expr, $($arg:tt)*) => {
        ::tokio::io::AsyncWriteExt::write_all(
            &mut $write_stream,
            format!("{}{}", format_args!($($arg)*), $crate::reply::CRLF).as_bytes(),
        )
        .await
    };
}

/// Accept connections from `listener`, running each as an SMTP session on its own task.
///
/// Yields the [`JoinHandle`] of each spawned session, or the error that occurred while
/// accepting a connection. Nothing happens until the stream is polled.
pub fn listen<S: Sink + 'static>(
    listener: TcpListener,
    config: Arc<Config>,
    sink: Arc<S>,
) -> impl Stream<Item = std::io::Result<JoinHandle<std::io::Result<CloseReason>>>> {
    async_stream::stream! {
        loop {
            let accepted = listener.accept().await;

            yield accepted.map(|(stream, _)| {
                tokio::spawn(connection::handle(stream, Arc::clone(&config), Arc::clone(&sink)))
            });
        }
    }
}

/// Accept and serve connections from `listener` forever.
///
/// Failures of single connections, including panics, are logged and do not stop the server.
///
/// # Errors
///
/// Returns an error if accepting a connection fails.
pub async fn serve<S: Sink + 'static>(
    listener: TcpListener,
    config: Arc<Config>,
    sink: Arc<S>,
) -> std::io::Result<()> {
    let sessions = listen(listener, config, sink);
    pin_mut!(sessions);

    while let Some(session) = sessions.next().await {
        let session = session?;

        tokio::spawn(async move {
            match session.await {
                Ok(Ok(_)) => (),
                Ok(Err(err)) => tracing::warn!(%err, "session ended with an error"),
                Err(err) => tracing::error!(%err, "session task failed"),
            }
        });
    }

    Ok(())
}
