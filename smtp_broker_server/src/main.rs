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

//! Receives mail over SMTP and prints every message to standard output.

#![warn(clippy::nursery, clippy::pedantic)]

use std::{net::IpAddr, sync::Arc};

use anyhow::Context;
use clap::Parser;
use smtp_broker::{config::DEFAULT_MESSAGE_LIMIT, sink::DebugSink, Config};
use tokio::net::TcpListener;

/// Used in greetings when the hostname of this machine cannot be determined.
const FALLBACK_NAME: &str = "localhost";

#[derive(Parser, Debug)]
#[command(name = "smtp_broker_server")]
#[command(about = "Receive mail over SMTP and print it", long_about = None)]
#[command(version)]
struct Cli {
    /// The TCP port to listen on.
    #[arg(default_value_t = 25)]
    port: u16,

    /// The address to listen on.
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// The name to use in SMTP greetings. If absent, the hostname of this machine is used.
    #[arg(short, long)]
    name: Option<String>,

    /// The largest message to accept, in bytes.
    #[arg(long, default_value_t = DEFAULT_MESSAGE_LIMIT)]
    message_limit: usize,
}

impl Cli {
    /// Mail service, use a given name or default to host name.
    fn name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }

        match hostname::get() {
            Err(err) => {
                tracing::warn!(%err, "unable to get hostname, using {FALLBACK_NAME}");
                FALLBACK_NAME.into()
            }
            Ok(name) => name.into_string().unwrap_or_else(|name| {
                tracing::warn!(?name, "unable to use hostname, using {FALLBACK_NAME}");
                FALLBACK_NAME.into()
            }),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::new(cli.name())
        .context("invalid server name")?
        .with_message_limit(cli.message_limit);
    let listener = TcpListener::bind((cli.bind, cli.port))
        .await
        .with_context(|| format!("unable to listen on {}:{}", cli.bind, cli.port))?;

    tracing::info!(
        name = config.fqdn(),
        version = config.version(),
        message_limit = config.message_limit(),
        addr = %listener.local_addr()?,
        "ready"
    );

    smtp_broker::serve(listener, Arc::new(config), Arc::new(DebugSink::stdout())).await?;

    Ok(())
}
