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

//! Tests for [`super`].

use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use tokio_test::io::Builder;

use super::*;
use crate::sink::ChannelSink;

type Result<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

fn peer() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::new(192, 0, 2, 1), 49_152))
}

fn config() -> Result<Arc<Config>> {
    Ok(Arc::new(Config::new("mx.example.com")?.with_version("0.0.1")?))
}

#[tokio::test]
async fn test_quit() -> Result {
    let (sink, _receiver) = ChannelSink::new();
    let stream = Builder::new()
        .write(b"220 mx.example.com 0.0.1\r\n")
        .read(b"HELO client.example\r\n")
        .write(b"250 mx.example.com\r\n")
        // Nothing after `QUIT` is answered.
        .read(b"QUIT\r\nNOOP\r\n")
        .write(b"221 Bye\r\n")
        .build();

    assert_eq!(
        serve(stream, peer(), config()?, &sink).await?,
        CloseReason::Quit
    );

    Ok(())
}

#[tokio::test]
async fn test_transaction() -> Result {
    let (sink, mut receiver) = ChannelSink::new();
    let stream = Builder::new()
        .write(b"220 mx.example.com 0.0.1\r\n")
        // Pipelined commands are each answered, in order.
        .read(b"HELO a.com\r\nMAIL FROM:<a@a.com>\r\nRCPT TO:<b@b.com>\r\nDATA\r\n")
        .write(b"250 mx.example.com\r\n")
        .write(b"250 Ok\r\n")
        .write(b"250 Ok\r\n")
        .write(b"354 End data with <CR><LF>.<CR><LF>\r\n")
        .read(b"Subject: test\r\n\r\n..Hello\r\n")
        .read(b".\r\n")
        .write(b"250 Ok\r\n")
        .read(b"QUIT\r\n")
        .write(b"221 Bye\r\n")
        .build();

    assert_eq!(
        serve(stream, peer(), config()?, &sink).await?,
        CloseReason::Quit
    );

    let envelope = receiver.recv().await.ok_or("no message delivered")?;
    assert_eq!(envelope.peer, peer());
    assert_eq!(envelope.mail_from, "a@a.com");
    assert_eq!(envelope.rcpt_to, ["b@b.com"]);
    assert_eq!(envelope.body, "Subject: test\n\n.Hello");

    Ok(())
}

#[tokio::test]
async fn test_disconnect_during_data() -> Result {
    let (sink, mut receiver) = ChannelSink::new();
    let stream = Builder::new()
        .write(b"220 mx.example.com 0.0.1\r\n")
        .read(b"MAIL FROM:<a@a.com>\r\nRCPT TO:<b@b.com>\r\nDATA\r\n")
        .write(b"250 Ok\r\n")
        .write(b"250 Ok\r\n")
        .write(b"354 End data with <CR><LF>.<CR><LF>\r\n")
        .read(b"Half a message\r\n")
        .build();

    assert_eq!(
        serve(stream, peer(), config()?, &sink).await?,
        CloseReason::ClosedByClient
    );

    // The unfinished message is never delivered.
    drop(sink);
    assert_eq!(receiver.recv().await, None);

    Ok(())
}

#[tokio::test]
async fn test_connection_reset() -> Result {
    let (sink, _receiver) = ChannelSink::new();
    let stream = Builder::new()
        .write(b"220 mx.example.com 0.0.1\r\n")
        .read_error(std::io::ErrorKind::ConnectionReset.into())
        .build();

    assert_eq!(
        serve(stream, peer(), config()?, &sink).await?,
        CloseReason::ClosedByClient
    );

    Ok(())
}

#[tokio::test]
async fn test_read_error() -> Result {
    let (sink, _receiver) = ChannelSink::new();
    let stream = Builder::new()
        .write(b"220 mx.example.com 0.0.1\r\n")
        .read_error(std::io::Error::other("broken"))
        .build();

    let err = serve(stream, peer(), config()?, &sink)
        .await
        .expect_err("read errors should be returned");
    assert_eq!(err.to_string(), "broken");

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_timeout() -> Result {
    let (sink, _receiver) = ChannelSink::new();
    let stream = Builder::new()
        .write(b"220 mx.example.com 0.0.1\r\n")
        .wait(timeouts::SERVER_TIMEOUT + Duration::from_secs(1))
        .build();

    assert!(matches!(
        serve(stream, peer(), config()?, &sink).await?,
        CloseReason::TimedOut(_)
    ));

    Ok(())
}
