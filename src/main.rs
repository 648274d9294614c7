//! redeploy - route a compose stack through Traefik and redeploy it
//!
//! This is the CLI entry point for redeploy.

use clap::{Parser, Subcommand};
use redeploy::compose::parser::DEFAULT_OUTPUT_FILE;
use redeploy::deploy;
use redeploy::docker::probe::{DEFAULT_DOCKER_BIN, STANDALONE_COMPOSE_BIN};
use redeploy::docker::{ComposeFlavor, DockerProbe};
use redeploy::error::Result;
use redeploy::params::{self, EnvSource};
use redeploy::RunConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// redeploy - Traefik routing and clean redeploy for Docker Compose stacks
#[derive(Parser)]
#[command(name = "redeploy")]
#[command(version)]
#[command(
    about = "Rewrite a compose file for Traefik routing and redeploy it",
    long_about = "Reads DEPLOYMENT_NAME, DEPLOYMENT_DOMAIN and the optional DEPLOYMENT_PORT \
                  from the environment, strips published ports from every service, routes the \
                  first service through Traefik on the external `frontend` network, and runs \
                  compose down / pull / up -d against the rewritten file."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Project directory
    #[arg(short = 'C', long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Compose file (defaults to docker-compose.yml, then docker-compose.yaml)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite the compose file and redeploy the stack (default)
    Up {
        /// Routed compose file to write
        #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
        output: PathBuf,
        /// Compose invocation; detected when omitted
        #[arg(long, value_enum)]
        compose: Option<ComposeFlavor>,
        /// Docker CLI binary, used for the availability checks and by the
        /// plugin flavor (`<docker> compose`)
        #[arg(long, default_value = DEFAULT_DOCKER_BIN)]
        docker: String,
        /// Compose binary used by the standalone flavor
        #[arg(long, default_value = STANDALONE_COMPOSE_BIN)]
        docker_compose: String,
        /// Skip pulling images
        #[arg(long)]
        skip_pull: bool,
        /// Write the routed file without touching Docker
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the routed compose file to stdout
    Render,

    /// Check parameters and the Docker installation
    Check {
        /// Docker CLI binary
        #[arg(long, default_value = DEFAULT_DOCKER_BIN)]
        docker: String,
        /// Compose binary used by the standalone flavor
        #[arg(long, default_value = STANDALONE_COMPOSE_BIN)]
        docker_compose: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "redeploy failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let mut config = RunConfig::new(&cli.dir);
    config.compose_file = cli.file;

    let command = cli.command.unwrap_or(Commands::Up {
        output: PathBuf::from(DEFAULT_OUTPUT_FILE),
        compose: None,
        docker: DEFAULT_DOCKER_BIN.to_string(),
        docker_compose: STANDALONE_COMPOSE_BIN.to_string(),
        skip_pull: false,
        dry_run: false,
    });

    match command {
        Commands::Up {
            output,
            compose,
            docker,
            docker_compose,
            skip_pull,
            dry_run,
        } => {
            config.output = output;
            config.flavor = compose;
            config.docker_bin = docker;
            config.standalone_bin = docker_compose;
            config.skip_pull = skip_pull;
            config.dry_run = dry_run;

            let outcome = deploy::run(&config, &EnvSource).await?;

            if outcome.deployed {
                println!(
                    "Deployed {} from {}",
                    outcome.primary_service.as_deref().unwrap_or("stack"),
                    outcome.output.display()
                );
            } else {
                println!("Wrote {}", outcome.output.display());
            }
        }

        Commands::Render => {
            print!("{}", deploy::render(&config, &EnvSource)?);
        }

        Commands::Check {
            docker,
            docker_compose,
        } => {
            let params = params::validate(&EnvSource)?;
            let probe = DockerProbe::new(&docker).with_standalone_bin(&docker_compose);
            probe.check_available().await?;
            let flavor = probe.detect_compose().await?;

            println!("Router:  {}", params.name);
            println!("Domain:  {}", params.domain);
            match params.port {
                Some(port) => println!("Port:    {}", port),
                None => println!("Port:    (container default)"),
            }
            println!("Compose: {}", flavor);
        }
    }

    Ok(())
}
