use std::path::PathBuf;
use std::process;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::info;
use packsight::auth::AuthError;
use packsight::prelude::*;
use serde::Serialize;
use tokio::sync::watch;

const DEFAULT_TOKEN_DIR: &str = ".packsight";

#[derive(Parser, Debug)]
#[clap(name = "packsight", version)]
#[clap(about = "PackSight packaging analytics client", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the hosted sign-in URL
    LoginUrl {
        /// Link to the sign-up page instead
        #[clap(long)]
        signup: bool,
    },
    /// Finish signing in with the authorization code from the redirect
    Callback { code: String },
    /// Sign out and print the provider logout URL
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Aggregate statistics
    Stats {
        #[clap(long)]
        brand: Option<String>,
    },
    /// Most recent detection events
    Records {
        #[clap(long)]
        limit: Option<usize>,
        #[clap(long)]
        brand: Option<String>,
    },
    /// Detection events of a brand between two RFC 3339 instants (inclusive)
    Range {
        #[clap(long)]
        brand: String,
        #[clap(long)]
        start: DateTime<Utc>,
        #[clap(long)]
        end: DateTime<Utc>,
    },
    /// Poll and print every update until Ctrl-C (both feeds by default)
    Watch {
        #[clap(long)]
        stats: bool,
        #[clap(long)]
        records: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let mut config = Config::from_env()?;
    if config.token_dir.is_none() {
        config.token_dir = Some(PathBuf::from(DEFAULT_TOKEN_DIR));
    }
    let client = PackSight::new(config)?;

    match cli.command {
        Commands::LoginUrl { signup } => {
            let intent = if signup {
                AuthIntent::Signup
            } else {
                AuthIntent::Login
            };
            println!("{}", client.auth().authorization_url(intent));
        }
        Commands::Callback { code } => {
            let session = client.auth().handle_callback(&code).await?;
            print_session(&session);
        }
        Commands::Logout => {
            client.auth().restore_session();
            let logout_url = client.auth().logout();
            println!("Signed out. End the provider session at:\n{}", logout_url);
        }
        Commands::Whoami => {
            let session = signed_in(&client)?;
            print_session(&session);
        }
        Commands::Stats { brand } => {
            signed_in(&client)?;
            let stats = match brand {
                Some(brand) => client.store().aggregate_stats(Some(&brand)).await?,
                None => client.store().own_stats().await?,
            };
            print_json(&stats)?;
        }
        Commands::Records { limit, brand } => {
            signed_in(&client)?;
            let limit = limit.unwrap_or(client.config().records_limit);
            let records = match brand {
                Some(brand) => client.store().recent_records(Some(&brand), limit).await?,
                None => client.store().own_recent_records(limit).await?,
            };
            print_json(&records)?;
        }
        Commands::Range { brand, start, end } => {
            signed_in(&client)?;
            let events = client.store().query_by_time_range(&brand, start, end).await?;
            print_json(&events)?;
        }
        Commands::Watch { stats, records } => {
            signed_in(&client)?;
            let both = !stats && !records;
            watch_feeds(&client, stats || both, records || both).await?;
        }
    }
    Ok(())
}

fn signed_in(client: &PackSight) -> Result<Session, Error> {
    Ok(client
        .auth()
        .restore_session()
        .ok_or(AuthError::MissingToken)?)
}

fn print_session(session: &Session) {
    println!("{} ({})", session.email, session.id);
    match session.role {
        Role::Admin => println!("Platform admin, all brands"),
        Role::Brand => println!("Brand: {}", session.brand),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn watch_feeds(client: &PackSight, stats: bool, records: bool) -> Result<(), Error> {
    let stats_feed = stats.then(|| client.stats_feed());
    let records_feed = records.then(|| client.records_feed());
    let mut stats_rx = stats_feed.as_ref().map(Poller::subscribe);
    let mut records_rx = records_feed.as_ref().map(Poller::subscribe);

    info!("Watching feeds, press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(state) = next_state(&mut stats_rx) => report("stats", &state)?,
            Some(state) = next_state(&mut records_rx) => report("records", &state)?,
        }
    }
    Ok(())
}

async fn next_state<T: Clone>(
    rx: &mut Option<watch::Receiver<PollingState<T>>>,
) -> Option<PollingState<T>> {
    match rx {
        Some(rx) => {
            rx.changed().await.ok()?;
            let state = rx.borrow_and_update().clone();
            Some(state)
        }
        None => std::future::pending().await,
    }
}

fn report<T: Serialize>(label: &str, state: &PollingState<T>) -> Result<(), Error> {
    if state.is_loading {
        return Ok(());
    }
    if let Some(error) = &state.error {
        match state.last_fetched_at {
            Some(at) => eprintln!("[{}] refresh failed: {} (showing data from {})", label, error, at),
            None => eprintln!("[{}] refresh failed: {}", label, error),
        }
        return Ok(());
    }
    if let Some(data) = &state.data {
        println!("[{}] {}", label, serde_json::to_string(data)?);
    }
    Ok(())
}
