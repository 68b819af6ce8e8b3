use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use turnkeeper::candidate::ChannelId;
use turnkeeper::config::{ChannelBindings, ServiceConfig};
use turnkeeper::dashboard::{run_dashboard, DashboardState};
use turnkeeper::persistence::{JsonFilePersistence, PersistencePort};
use turnkeeper::scheduler::RotationSettings;
use turnkeeper::service::RotationService;
use turnkeeper::shutdown::install_shutdown_handler;
use turnkeeper::state::RotaState;

#[derive(Parser, Debug)]
#[command(name = "turnkeeper")]
#[command(version)]
#[command(about = "Fair turn rotation for a serially shared session slot")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the rotation service
    Serve(ServeArgs),

    /// Print the persisted queue and active turns
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// TOML config file; flags override its values
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Directory holding the JSON documents
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Port for the HTTP command surface (optional)
    #[arg(long)]
    http_port: Option<u16>,

    /// Keep state in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Start with games running instead of paused
    #[arg(long)]
    start_running: bool,

    /// Start with split Beginner/Pickup queues
    #[arg(long)]
    split: bool,

    #[arg(long)]
    beginner_channel: Option<u64>,

    #[arg(long)]
    pickup_channel: Option<u64>,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Serialize)]
struct QueueRow {
    position: u32,
    candidate: u64,
    name: String,
    queue_type: String,
    notes: String,
}

#[derive(Serialize)]
struct ActiveRow {
    candidate: u64,
    name: String,
    assignment_type: String,
}

#[derive(Serialize)]
struct InspectOutput {
    queue: Vec<QueueRow>,
    active: Vec<ActiveRow>,
    cooldowns: usize,
    exceptions: usize,
}

fn build_config(args: ServeArgs) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ServiceConfig::from_toml_file(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(dir) = args.data_dir {
        config = config.with_data_dir(dir);
    }
    if args.ephemeral {
        config.storage.ephemeral = true;
    }
    if args.start_running {
        config = config.running(true);
    }
    if args.split {
        config = config.merged(false);
    }
    if args.beginner_channel.is_some() || args.pickup_channel.is_some() {
        let beginner = args
            .beginner_channel
            .map(ChannelId)
            .unwrap_or(config.channels.beginner);
        let pickup = args
            .pickup_channel
            .map(ChannelId)
            .unwrap_or(config.channels.pickup);
        config = config.with_channels(ChannelBindings::new(beginner, pickup));
    }
    if let Some(port) = args.http_port {
        config.http_addr = Some(format!("0.0.0.0:{}", port).parse::<SocketAddr>()?);
    }
    Ok(config)
}

async fn run_server(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = build_config(args)?;
    tracing::info!(
        data_dir = %config.storage.data_dir.display(),
        ephemeral = config.storage.ephemeral,
        merged = config.start_merged,
        running = config.start_running,
        "Starting rotation service"
    );

    let shutdown = install_shutdown_handler()?;
    let service = RotationService::open(config).await?;

    if let Some(addr) = service.config().http_addr {
        let state = DashboardState {
            service: service.clone(),
        };
        let token = shutdown.clone();
        tokio::spawn(async move {
            run_dashboard(addr, state, token).await;
        });
    }

    service.run(shutdown).await;

    if !service.config().storage.ephemeral {
        service.save().await?;
        tracing::info!("Final snapshot saved");
    }
    Ok(())
}

async fn run_inspect(args: InspectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = JsonFilePersistence::new(&args.data_dir).load().await?;
    let mut state = RotaState::new(RotationSettings::from_config(&ServiceConfig::default()));
    state.restore(snapshot);

    let output = InspectOutput {
        queue: state
            .queue
            .entries()
            .iter()
            .map(|e| QueueRow {
                position: e.position,
                candidate: e.id().0,
                name: e.candidate.display_name.clone(),
                queue_type: e.queue_type.to_string(),
                notes: e.notes.clone(),
            })
            .collect(),
        active: state
            .active
            .assignments()
            .map(|a| ActiveRow {
                candidate: a.candidate.id.0,
                name: a.candidate.display_name.clone(),
                assignment_type: a.assignment_type.to_string(),
            })
            .collect(),
        cooldowns: state.cooldowns.len(),
        exceptions: state.exceptions.len(),
    };

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            if output.queue.is_empty() {
                println!("Queue is empty.");
            } else {
                println!("{:<5} {:<20} {:<24} {:<9} NOTES", "POS", "ID", "NAME", "TYPE");
                println!("{}", "-".repeat(78));
                for row in &output.queue {
                    println!(
                        "{:<5} {:<20} {:<24} {:<9} {}",
                        row.position, row.candidate, row.name, row.queue_type, row.notes
                    );
                }
            }
            println!();
            if output.active.is_empty() {
                println!("No active turns.");
            } else {
                println!("Active:");
                for row in &output.active {
                    println!("  {} ({}) {}", row.name, row.candidate, row.assignment_type);
                }
            }
            println!();
            println!("Cooldown records: {}", output.cooldowns);
            println!("Tenure exceptions: {}", output.exceptions);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Serve(serve_args) => run_server(serve_args).await,
        Commands::Inspect(inspect_args) => run_inspect(inspect_args).await,
    }
}
