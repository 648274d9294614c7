//! redeploy - route a Docker Compose stack through Traefik and redeploy it
//!
//! redeploy reads a compose file, strips published ports from every service,
//! attaches the first declared service to the external `frontend` network
//! with Traefik routing labels, writes the result next to the original, and
//! performs a clean `down` / `pull` / `up -d` through the compose CLI.
//!
//! - Parameter validation from a pluggable source
//! - Order-preserving compose transform
//! - Docker and compose availability checks
//! - Sequential redeploy with relayed command output

pub mod compose;
pub mod config;
pub mod deploy;
pub mod docker;
pub mod error;
pub mod params;

pub use config::RunConfig;
pub use error::{DeployError, Result};
pub use params::{DeploymentParameters, ParameterSource};
