//! Redeploy pipeline
//!
//! probe → validate → load → transform → write → redeploy. Each stage must
//! succeed before the next one starts, and the routed file is only written
//! once the transform has succeeded.

use crate::compose::{transform, ComposeOrchestrator, ComposeParser};
use crate::config::RunConfig;
use crate::docker::DockerProbe;
use crate::error::Result;
use crate::params::{self, ParameterSource};
use serde_yaml::Value;
use std::path::PathBuf;

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Compose file that was read
    pub input: PathBuf,
    /// Routed compose file that was written
    pub output: PathBuf,
    /// Service that received the routing labels
    pub primary_service: Option<String>,
    /// Whether the stack was redeployed
    pub deployed: bool,
}

/// Run the whole pipeline
pub async fn run(config: &RunConfig, source: &impl ParameterSource) -> Result<Outcome> {
    let config = &config.resolved()?;

    let probe = DockerProbe::new(&config.docker_bin).with_standalone_bin(&config.standalone_bin);
    if config.dry_run {
        tracing::info!("Dry run: skipping Docker checks");
    } else {
        probe.check_available().await?;
    }

    let output = prepare(config, source)?;

    if config.dry_run {
        tracing::info!(path = %output.output.display(), "Dry run: not deploying");
        return Ok(output);
    }

    let flavor = match config.flavor {
        Some(flavor) => flavor,
        None => probe.detect_compose().await?,
    };

    ComposeOrchestrator::new(flavor, &output.output, &config.working_dir)
        .with_docker_bin(&config.docker_bin)
        .with_standalone_bin(&config.standalone_bin)
        .redeploy(config.skip_pull)
        .await?;

    Ok(Outcome {
        deployed: true,
        ..output
    })
}

/// Validate parameters, then load, transform and write the compose file.
///
/// Nothing touches Docker here.
pub fn prepare(config: &RunConfig, source: &impl ParameterSource) -> Result<Outcome> {
    let (input, routed) = load_routed(config, source)?;
    let primary_service = transform::primary_service(&routed);

    let output = config.output_path();
    ComposeParser::write_file(&output, &routed)?;

    Ok(Outcome {
        input,
        output,
        primary_service,
        deployed: false,
    })
}

/// Render the routed compose document without writing it
pub fn render(config: &RunConfig, source: &impl ParameterSource) -> Result<String> {
    let (_, routed) = load_routed(config, source)?;
    ComposeParser::serialize(&routed)
}

fn load_routed(config: &RunConfig, source: &impl ParameterSource) -> Result<(PathBuf, Value)> {
    let params = params::validate(source)?;

    let input = ComposeParser::locate(&config.working_dir, config.compose_file.as_deref())?;
    tracing::info!(path = %input.display(), "Using compose file");

    let doc = ComposeParser::parse_file(&input)?;
    let routed = transform::transform(doc, &params)?;

    Ok((input, routed))
}
