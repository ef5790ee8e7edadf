//! SensorPush Query Tool
//!
//! CLI for listing gateways and sensors registered to a SensorPush
//! account and querying calibrated samples.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use sensorpush_client::{Credentials, SensorPushClient};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sensorpush")]
#[command(about = "Query tool for the SensorPush cloud API")]
#[command(version)]
struct Cli {
    /// SensorPush account email
    #[arg(long, env = "SENSORPUSH_USER")]
    username: String,

    /// SensorPush account password
    #[arg(long, env = "SENSORPUSH_PASSWORD", hide_env_values = true)]
    password: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List gateways registered to the account
    Gateways,
    /// List sensors registered to the account
    Sensors,
    /// Query recent samples with calibration applied
    Samples {
        /// Samples per sensor (the API caps this at 20)
        #[arg(long, default_value = "1")]
        limit: u32,

        /// Earliest sample time, RFC 3339 (e.g. 2026-08-05T00:00:00Z)
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Latest sample time, RFC 3339
        #[arg(long)]
        stop: Option<DateTime<Utc>>,
    },
    /// Show the session state for the supplied credentials
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let credentials = Credentials::new(cli.username, cli.password);
    let mut client =
        SensorPushClient::new(credentials).context("Failed to build the HTTP client")?;

    match cli.command {
        Commands::Gateways => print_listing("gateways", client.gateways()),
        Commands::Sensors => print_listing("sensors", client.sensors()),
        Commands::Samples { limit, start, stop } => {
            let samples = client
                .samples(limit, start, stop)
                .context("No samples returned (check credentials and logs)")?;
            print_json(&samples)
        }
        Commands::Status => {
            let connected = client.is_connected();
            println!(
                "Authenticated: {}",
                if connected { "yes" } else { "no" }
            );
            if !connected {
                anyhow::bail!("Login failed (check credentials and logs)");
            }
            Ok(())
        }
    }
}

fn print_listing(kind: &str, listing: Option<&Map<String, Value>>) -> Result<()> {
    let listing =
        listing.with_context(|| format!("No {} returned (check credentials and logs)", kind))?;
    println!("{}", serde_json::to_string_pretty(listing)?);
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
