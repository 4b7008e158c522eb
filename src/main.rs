//! Command line driver station
//!
//! Connects to a robot, prints link changes and telemetry until Ctrl-C.
//!
//! ```bash
//! ds_link --team 254 --alliance blue --position 2
//! ds_link --config station.json --address 172.22.11.2 --json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ds_link::{Alliance, Config, LinkEvent, Mode, Station, TargetAddress};

/// Driver station link to a robot
#[derive(Parser, Debug)]
#[command(name = "ds_link", author, version, about)]
struct Args {
    /// Team number, used to derive the robot address
    #[arg(short, long)]
    team: Option<u32>,

    /// Alliance colour (red or blue)
    #[arg(short, long)]
    alliance: Option<Alliance>,

    /// Driver position within the alliance (1-3)
    #[arg(short, long)]
    position: Option<u8>,

    /// JSON configuration file; command line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Robot host or IP, overriding the team-derived address
    #[arg(long, conflicts_with = "team_subnet")]
    address: Option<String>,

    /// Use the 10.TE.AM.2 address instead of the mDNS hostname
    #[arg(long)]
    team_subnet: bool,

    /// Mode to request once the robot connects
    #[arg(short, long, default_value = "disabled")]
    mode: Mode,

    /// Print telemetry as JSON lines
    #[arg(long)]
    json: bool,
}

impl Args {
    fn into_config(self) -> ds_link::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        if self.team.is_some() {
            config.team_number = self.team;
        }
        if let Some(alliance) = self.alliance {
            config.alliance = alliance;
        }
        if let Some(position) = self.position {
            config.position = position;
        }
        if let Some(host) = self.address {
            config.target = TargetAddress::Literal { host };
        } else if self.team_subnet {
            config.target = TargetAddress::TeamSubnet;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "driver station failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> ds_link::Result<()> {
    let mode = args.mode;
    let json = args.json;
    let config = args.into_config()?;

    let mut station = Station::bind(config).await?;
    let mut telemetry = station
        .telemetry()
        .ok_or_else(|| ds_link::Error::invalid_state("telemetry stream already taken"))?;
    let mut events = station.subscribe();
    let handle = station.spawn();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }

            event = events.recv() => match event {
                Ok(LinkEvent::Connected) => {
                    println!("connected");
                    handle.set_mode(mode).await?;
                }
                Ok(LinkEvent::Disconnected) => {
                    println!("disconnected");
                    handle.set_mode(Mode::Disabled).await?;
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "missed link events"),
                Err(RecvError::Closed) => break,
            },

            record = telemetry.next_record() => match record {
                Some(record) if json => match serde_json::to_string(&record) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!(error = %e, "failed to encode telemetry"),
                },
                Some(record) => println!(
                    "pong={} mode={:#04x} battery={}",
                    record.pong, record.mode, record.battery_voltage
                ),
                None => break,
            },
        }
    }

    handle.stop().await
}
