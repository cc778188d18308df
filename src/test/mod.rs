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

use std::{error::Error, sync::Arc};

use futures_util::{pin_mut, StreamExt};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::{TcpListener, TcpStream},
};

use crate::{sink::ChannelSink, write_fmt_line, CloseReason, Config};


type Result = std::result::Result<(), Box<dyn Error>>;

/// Read one line, including its line ending, out of a [`BufReader`].
///
/// Implicitly calls `.await`.
macro_rules! read_line {
    ($reader:expr) => {
        async {
            let mut line = String::new();
            $reader.read_line(&mut line).await.map(|_| line)
        }
    };
}

// RFC 821 minimum implementation, sans `VRFY`:
//
// - [x] `HELO`
// - [x] `MAIL`
// - [x] `RCPT`
// - [x] `DATA`
// - [x] `RSET`
// - [x] `NOOP`
// - [x] `QUIT`
#[tokio::test]
async fn test_listen() -> Result {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let config = Arc::new(Config::new("mx.example.com")?);
    let (sink, mut messages) = ChannelSink::new();
    let stream = crate::listen(listener, config, Arc::new(sink));

    // Can be bound to a variable which exposes `.abort()`
    tokio::spawn(async move {
        pin_mut!(stream);

        loop {
            // Get the `Next` and unwrap it
            let session = stream
                .next()
                .await
                .unwrap()
                // Unwrap the [`TcpListener::accept`]
                .unwrap()
                // Await and unwrap the [`JoinHandle`]
                .await
                .unwrap();

            // Unwrap the [`Session`] itself
            assert_eq!(session.unwrap(), CloseReason::Quit);
        }
    });

    let mut stream = TcpStream::connect(addr).await?;
    let client = stream.local_addr()?;
    let (read_stream, mut write_stream) = stream.split();

    let mut reader = BufReader::new(read_stream);

    assert!(is_valid_response::server_greeting(
        &read_line!(reader).await?
    ));

    write_fmt_line!(write_stream, "HELO client.example")?;
    assert!(is_valid_response::helo(&read_line!(reader).await?));

    write_fmt_line!(write_stream, "NOOP")?;
    assert!(is_valid_response::ok(&read_line!(reader).await?));

    write_fmt_line!(write_stream, "MAIL FROM:<a@a.com>")?;
    assert!(is_valid_response::ok(&read_line!(reader).await?));

    write_fmt_line!(write_stream, "RSET")?;
    assert!(is_valid_response::ok(&read_line!(reader).await?));

    write_fmt_line!(write_stream, "MAIL FROM:<sender@client.example>")?;
    assert!(is_valid_response::ok(&read_line!(reader).await?));

    write_fmt_line!(write_stream, "RCPT TO:<someone@mx.example.com>")?;
    assert!(is_valid_response::ok(&read_line!(reader).await?));

    write_fmt_line!(write_stream, "DATA")?;
    assert!(is_valid_response::start_data(&read_line!(reader).await?));

    write_fmt_line!(write_stream, "Subject: hello\r\n\r\n..dotted\r\n.")?;
    assert!(is_valid_response::ok(&read_line!(reader).await?));

    write_fmt_line!(write_stream, "QUIT")?;
    assert!(is_valid_response::quit(&read_line!(reader).await?));

    // The server hangs up after `QUIT`.
    assert_eq!(read_line!(reader).await?, "");

    let envelope = messages.recv().await.ok_or("no message delivered")?;
    assert_eq!(envelope.peer, client);
    assert_eq!(envelope.mail_from, "sender@client.example");
    assert_eq!(envelope.rcpt_to, ["someone@mx.example.com"]);
    assert_eq!(envelope.body, "Subject: hello\n\n.dotted");

    Ok(())
}

#[tokio::test]
async fn test_sessions_are_independent() -> Result {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let config = Arc::new(Config::new("mx.example.com")?);
    let (sink, _messages) = ChannelSink::new();
    tokio::spawn(crate::serve(listener, config, Arc::new(sink)));

    let mut first = BufReader::new(TcpStream::connect(addr).await?);
    let mut second = BufReader::new(TcpStream::connect(addr).await?);

    assert!(is_valid_response::server_greeting(&read_line!(first).await?));
    assert!(is_valid_response::server_greeting(&read_line!(second).await?));

    write_fmt_line!(first.get_mut(), "MAIL FROM:<a@a.com>")?;
    assert!(is_valid_response::ok(&read_line!(first).await?));

    // The sender of the first session is not visible in the second one.
    write_fmt_line!(second.get_mut(), "RCPT TO:<b@b.com>")?;
    assert_eq!(
        read_line!(second).await?,
        "503 Error: need MAIL command\r\n"
    );

    Ok(())
}
