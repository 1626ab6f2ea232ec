//! greenspot CLI
//!
//! Command-line interface for interacting with the greenspot daemon.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// greenspot - carbon- and price-aware spot GPU placement
#[derive(Parser, Debug)]
#[command(name = "greenspot")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Daemon API address
    #[arg(long, default_value = "http://localhost:8787", global = true)]
    api: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Place a new training job
    Simulate {
        /// Estimated GPU hours
        #[arg(long)]
        hours: f64,

        /// Minimum GPU memory in GB
        #[arg(long, default_value_t = 16.0)]
        min_memory: f64,

        /// Deadline in hours from now
        #[arg(long, default_value_t = 48.0)]
        deadline_hours: f64,

        /// Restrict placement to one region
        #[arg(long)]
        region: Option<String>,

        /// Requested checkpoint interval in minutes
        #[arg(long, default_value_t = 30)]
        checkpoint_interval: u32,

        /// Do not allow a delayed start
        #[arg(long)]
        no_shift: bool,
    },

    /// Check whether a running job should move
    Optimize {
        /// Estimated GPU hours remaining
        #[arg(long)]
        hours: f64,

        /// Minimum GPU memory in GB
        #[arg(long, default_value_t = 16.0)]
        min_memory: f64,

        /// Deadline in hours from now
        #[arg(long, default_value_t = 48.0)]
        deadline_hours: f64,

        /// Region the job runs in
        #[arg(long)]
        region: Option<String>,

        /// Availability zone the job runs in
        #[arg(long)]
        az: Option<String>,

        /// Current hourly price in USD
        #[arg(long)]
        price: Option<f64>,
    },

    /// Plan a delayed start within the deadline
    Timeshift {
        /// Estimated GPU hours
        #[arg(long)]
        hours: f64,

        /// Deadline in hours from now
        #[arg(long, default_value_t = 24.0)]
        deadline_hours: f64,

        /// Region to plan for
        #[arg(long)]
        region: Option<String>,
    },

    /// Simulate a spot interruption and checkpoint recovery
    Checkpoint {
        /// Region the job runs in
        #[arg(long)]
        region: String,

        /// Availability zone the job runs in
        #[arg(long)]
        az: String,

        /// Instance type
        #[arg(long)]
        sku: String,

        /// Model size in GB
        #[arg(long)]
        model_size: f64,

        /// Progress through the current epoch, in percent
        #[arg(long, default_value_t = 0.0)]
        progress: f64,

        /// Job identifier (generated if omitted)
        #[arg(long)]
        job_id: Option<String>,
    },

    /// Show running totals
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let client = commands::ApiClient::new(&cli.api);

    match cli.command {
        Commands::Simulate {
            hours,
            min_memory,
            deadline_hours,
            region,
            checkpoint_interval,
            no_shift,
        } => {
            let job = commands::JobArgs {
                hours,
                min_memory,
                deadline_hours,
            };
            commands::simulate(&client, job, region, checkpoint_interval, !no_shift).await?;
        }
        Commands::Optimize {
            hours,
            min_memory,
            deadline_hours,
            region,
            az,
            price,
        } => {
            let job = commands::JobArgs {
                hours,
                min_memory,
                deadline_hours,
            };
            commands::optimize(&client, job, region, az, price).await?;
        }
        Commands::Timeshift {
            hours,
            deadline_hours,
            region,
        } => {
            commands::timeshift(&client, hours, deadline_hours, region).await?;
        }
        Commands::Checkpoint {
            region,
            az,
            sku,
            model_size,
            progress,
            job_id,
        } => {
            commands::checkpoint(&client, region, az, sku, model_size, progress, job_id).await?;
        }
        Commands::Stats => {
            commands::stats(&client).await?;
        }
    }

    Ok(())
}
