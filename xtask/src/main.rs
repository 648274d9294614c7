//! redeploy xtask - Development automation
//!
//! ## Usage
//!
//! ```bash
//! # Build the redeploy binary
//! cargo xtask build --release
//!
//! # Run all tests
//! cargo xtask test
//!
//! # Run lints
//! cargo xtask lint
//!
//! # Render a sample project without touching Docker
//! cargo xtask smoke
//!
//! # Run CI checks
//! cargo xtask ci
//! ```

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use xshell::{cmd, Shell};

const SMOKE_COMPOSE: &str = r#"services:
  web:
    image: nginx:alpine
    ports:
      - "8080:80"
  cache:
    image: redis:7
    ports:
      - "6379:6379"
"#;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development automation for redeploy")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the redeploy binary
    Build {
        /// Build in release mode
        #[arg(long)]
        release: bool,
    },
    /// Run all tests
    Test {
        /// Run tests in release mode
        #[arg(long)]
        release: bool,
    },
    /// Run lints (clippy and rustfmt check)
    Lint,
    /// Format code
    Fmt {
        /// Check formatting without making changes
        #[arg(long)]
        check: bool,
    },
    /// Dry-run redeploy against a generated sample project
    Smoke,
    /// Install the binary locally
    Install,
    /// Generate documentation
    Doc {
        /// Open documentation in browser
        #[arg(long)]
        open: bool,
    },
    /// Run CI checks (lint, test, smoke)
    Ci,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    let project_root = project_root()?;
    sh.change_dir(&project_root);

    match cli.command {
        Commands::Build { release } => build(&sh, release)?,
        Commands::Test { release } => test(&sh, release)?,
        Commands::Lint => lint(&sh)?,
        Commands::Fmt { check } => fmt(&sh, check)?,
        Commands::Smoke => smoke(&sh)?,
        Commands::Install => install(&sh)?,
        Commands::Doc { open } => doc(&sh, open)?,
        Commands::Ci => ci(&sh)?,
    }

    Ok(())
}

fn project_root() -> Result<PathBuf> {
    let output = std::process::Command::new("cargo")
        .args(["locate-project", "--workspace", "--message-format=plain"])
        .output()
        .context("Failed to run cargo locate-project")?;

    let path = String::from_utf8(output.stdout)?;
    let manifest = PathBuf::from(path.trim());

    manifest
        .parent()
        .map(|p| p.to_path_buf())
        .context("Failed to find project root")
}

fn build(sh: &Shell, release: bool) -> Result<()> {
    println!("Building redeploy...");

    if release {
        cmd!(sh, "cargo build --release --bin redeploy").run()?;
    } else {
        cmd!(sh, "cargo build --bin redeploy").run()?;
    }

    Ok(())
}

fn test(sh: &Shell, release: bool) -> Result<()> {
    println!("Running tests...");

    if release {
        cmd!(sh, "cargo test --workspace --release").run()?;
    } else {
        cmd!(sh, "cargo test --workspace").run()?;
    }

    Ok(())
}

fn lint(sh: &Shell) -> Result<()> {
    println!("Running lints...");

    cmd!(sh, "cargo fmt --all -- --check").run()?;
    cmd!(sh, "cargo clippy --workspace --all-targets -- -D warnings").run()?;

    Ok(())
}

fn fmt(sh: &Shell, check: bool) -> Result<()> {
    if check {
        cmd!(sh, "cargo fmt --all -- --check").run()?;
    } else {
        cmd!(sh, "cargo fmt --all").run()?;
    }

    Ok(())
}

/// Route a throwaway project with `--dry-run` and check the written file.
fn smoke(sh: &Shell) -> Result<()> {
    println!("Running smoke test...");

    let dir = sh.create_temp_dir()?;
    let project = dir.path();
    sh.write_file(project.join("docker-compose.yml"), SMOKE_COMPOSE)?;

    let _name = sh.push_env("DEPLOYMENT_NAME", "smoke");
    let _domain = sh.push_env("DEPLOYMENT_DOMAIN", "smoke.localhost");
    let _port = sh.push_env("DEPLOYMENT_PORT", "80");
    cmd!(sh, "cargo run --quiet --bin redeploy -- -C {project} up --dry-run").run()?;

    let routed = sh.read_file(project.join("docker-compose.traefik.yml"))?;
    ensure!(!routed.contains("8080:80"), "published ports were not stripped");
    ensure!(
        routed.contains("traefik.http.routers.smoke.rule=Host(`smoke.localhost`)"),
        "router rule label missing:\n{routed}"
    );
    ensure!(
        routed.contains("external: true"),
        "frontend network not declared external:\n{routed}"
    );

    println!("Smoke test passed");
    Ok(())
}

fn install(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo install --path . --bin redeploy").run()?;
    Ok(())
}

fn doc(sh: &Shell, open: bool) -> Result<()> {
    if open {
        cmd!(sh, "cargo doc --no-deps --open").run()?;
    } else {
        cmd!(sh, "cargo doc --no-deps").run()?;
    }

    Ok(())
}

fn ci(sh: &Shell) -> Result<()> {
    lint(sh)?;
    test(sh, false)?;
    smoke(sh)?;

    println!("All CI checks passed");
    Ok(())
}
