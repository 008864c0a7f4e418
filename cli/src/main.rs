//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use telemetrix_client::{ClientConfig, SessionDriver, SyntheticFeed};
use telemetrix_service::{DEFAULT_PORT, ServerConfig, TelemetryServer};
use telemetrix_store::TelemetryStore;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Telemetry ingest server and client.")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the telemetry ingest server.
    Serve(ServeArgs),
    /// Run synthetic telemetry clients against a server.
    Stream(StreamArgs),
    /// Provision a user in the store (server must be stopped).
    AddUser(AddUserArgs),
    /// Print the number of persisted sessions per user.
    Report(ReportArgs),
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Host to bind the server to
    #[arg(short = 'a', long, default_value = "127.0.0.1")]
    addr: String,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Path to the telemetry store (created with demo user "user:password" if absent)
    #[arg(short, long, default_value = "./telemetry.db")]
    db: PathBuf,
}

#[derive(Parser, Debug)]
struct StreamArgs {
    /// Server host
    #[arg(short = 'a', long, default_value = "127.0.0.1")]
    addr: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Number of concurrent clients, logging in as user0..userN
    #[arg(short = 'n', long, default_value_t = 1)]
    clients: usize,

    /// Number of events each client sends
    #[arg(short, long, default_value_t = 30)]
    events: usize,

    /// Shared password of the streaming users
    #[arg(long, default_value = "password")]
    password: String,

    /// Delay between records in milliseconds
    #[arg(long)]
    pace_ms: Option<u64>,
}

#[derive(Parser, Debug)]
struct AddUserArgs {
    /// User to add, "user:password"
    userpass: String,

    /// Path to the telemetry store
    #[arg(short, long, default_value = "./telemetry.db")]
    db: PathBuf,
}

#[derive(Parser, Debug)]
struct ReportArgs {
    /// Path to the telemetry store
    #[arg(short, long, default_value = "./telemetry.db")]
    db: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Args::parse().command {
        Commands::Serve(args) => serve(args).await,
        Commands::Stream(args) => stream(args).await,
        Commands::AddUser(args) => add_user(args),
        Commands::Report(args) => report(args),
    }
}

fn open_store(path: &PathBuf) -> Result<TelemetryStore> {
    let (store, fresh) = TelemetryStore::open(path)
        .with_context(|| format!("opening store at '{}' (is the server running?)", path.display()))?;
    if fresh {
        println!("Created store at '{}' with test user \"user:password\"", path.display());
    }
    Ok(store)
}

async fn serve(args: ServeArgs) -> Result<()> {
    let store = open_store(&args.db)?;

    let bind_address: SocketAddr = format!("{}:{}", args.addr, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.addr, args.port))?;

    let server = TelemetryServer::bind(ServerConfig::new(bind_address), Arc::new(store))
        .await
        .with_context(|| format!("binding {bind_address}"))?;
    server.start().await?;

    println!("Store at '{}'", args.db.display());
    println!(
        "Telemetry server up on '{}', use <Ctrl-C> to stop",
        server.bind_address()
    );

    tokio::signal::ctrl_c().await?;
    info!("Interrupted, shutting down");
    server.shutdown().await?;

    Ok(())
}

async fn stream(args: StreamArgs) -> Result<()> {
    let pace = args.pace_ms.map(Duration::from_millis);

    let mut sessions = Vec::new();
    for i in 0..args.clients {
        let config = ClientConfig::new(
            args.addr.clone(),
            args.port,
            format!("user{i}"),
            args.password.clone(),
        )
        .with_pace(pace);
        let events = args.events;

        sessions.push(tokio::spawn(async move {
            let username = config.username.clone();
            let report = SessionDriver::new(config).run(SyntheticFeed::new(events)).await;
            (username, report)
        }));
    }

    let mut failed = false;
    for session in sessions {
        let (username, report) = session.await?;
        match report {
            Ok(report) => println!("[{username}] {report}"),
            Err(error) => {
                failed = true;
                println!("[{username}] error: {error}");
            }
        }
    }

    if failed {
        bail!("one or more sessions failed");
    }
    Ok(())
}

fn add_user(args: AddUserArgs) -> Result<()> {
    let Some((username, password)) = args.userpass.split_once(':') else {
        bail!("use the 'user:password' template to add a user");
    };
    if username.is_empty() || password.contains(':') {
        bail!("use the 'user:password' template to add a user");
    }

    let store = open_store(&args.db)?;
    store.credentials().add_user(username, password)?;
    println!("User added");
    Ok(())
}

fn report(args: ReportArgs) -> Result<()> {
    let store = open_store(&args.db)?;

    println!("User\tNum of sessions");
    for row in store.sessions().report()? {
        println!("{}\t{}", row.username, row.sessions);
    }
    Ok(())
}
