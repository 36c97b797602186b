//! vetter CLI entry point.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vetter::harness::HarnessOptions;
use vetter::loadgen::{self, LoadOptions};
use vetter::{catalog, runner};

#[derive(Parser)]
#[command(
    name = "vetter",
    version,
    about = "Black-box verification and load harness for HTTP servers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the integration suite against the server under test
    Run {
        /// Path to the server binary
        #[arg(long, default_value = "bin/server")]
        server: PathBuf,

        /// Primary configuration search root
        #[arg(long, default_value = "../tests/integration_testcases")]
        config_root: PathBuf,

        /// Alternate configuration search root
        #[arg(long, default_value = "../tests/configs")]
        alt_config_root: PathBuf,

        /// Fixed test port the server listens on
        #[arg(long, default_value_t = 80)]
        port: u16,

        /// Sandbox directory for the server's resource store
        #[arg(long, default_value = "crud_sandbox")]
        sandbox: PathBuf,

        /// Only run the group with this configuration name
        #[arg(long)]
        group: Option<String>,
    },

    /// Generate sustained load against a URL-shortening service
    Load {
        /// Base URL of the service
        #[arg(long, default_value = "http://localhost:80")]
        host: String,

        /// Number of concurrently active simulated users
        #[arg(long, default_value_t = 50)]
        users: usize,

        /// Run duration in seconds
        #[arg(long, default_value_t = 60)]
        duration: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Run {
            server,
            config_root,
            alt_config_root,
            port,
            sandbox,
            group,
        } => {
            let opts = HarnessOptions {
                server_bin: server,
                config_root,
                alt_config_root,
                port,
                sandbox_root: sandbox,
            };
            let mut groups = catalog::builtin_groups();
            if let Some(name) = group {
                groups.retain(|g| g.config == name);
                anyhow::ensure!(!groups.is_empty(), "no test group named '{name}'");
            }
            runner::run_suite(&opts, &groups).await?.exit_code()
        }
        Commands::Load {
            host,
            users,
            duration,
        } => {
            let opts = LoadOptions {
                host,
                users,
                duration: Duration::from_secs(duration),
            };
            println!(
                "Generating load: {} users against {} for {}s",
                opts.users,
                opts.host,
                opts.duration.as_secs()
            );
            let summary = loadgen::run_load(&opts).await?;
            summary.print();
            i32::from(summary.total_failures() > 0)
        }
    };
    std::process::exit(code)
}
