//! Deployment parameter validation
//!
//! Parameters are read through a [`ParameterSource`] rather than straight
//! from the process environment, so validation can be exercised with a
//! plain map in tests.

use crate::error::{DeployError, Result};
use std::collections::HashMap;

/// Router/service name used in the Traefik labels
pub const NAME_KEY: &str = "DEPLOYMENT_NAME";
/// Host name matched by the router rule
pub const DOMAIN_KEY: &str = "DEPLOYMENT_DOMAIN";
/// Optional container port for the load balancer
pub const PORT_KEY: &str = "DEPLOYMENT_PORT";

/// Key/value lookup that deployment parameters are read from
pub trait ParameterSource {
    /// Look up a raw value by key
    fn get(&self, key: &str) -> Option<String>;
}

/// Process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ParameterSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ParameterSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Adapter for lookup closures
pub struct FnSource<F>(pub F);

impl<F> ParameterSource for FnSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }
}

/// Validated deployment parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentParameters {
    /// Router and service name
    pub name: String,
    /// Domain routed to the primary service
    pub domain: String,
    /// Container port the proxy forwards to, if pinned
    pub port: Option<u16>,
}

/// Validate deployment parameters.
///
/// All missing required keys are reported together. The port is only
/// examined once both required keys are present.
pub fn validate(source: &impl ParameterSource) -> Result<DeploymentParameters> {
    let name = non_empty(source, NAME_KEY);
    let domain = non_empty(source, DOMAIN_KEY);

    let (name, domain) = match (name, domain) {
        (Some(name), Some(domain)) => (name, domain),
        (name, domain) => {
            let mut missing = Vec::new();
            if name.is_none() {
                missing.push(NAME_KEY.to_string());
            }
            if domain.is_none() {
                missing.push(DOMAIN_KEY.to_string());
            }
            return Err(DeployError::MissingParameter(missing));
        }
    };

    let port = match non_empty(source, PORT_KEY) {
        Some(raw) => Some(parse_port(&raw)?),
        None => None,
    };

    tracing::debug!(%name, %domain, ?port, "Deployment parameters validated");

    Ok(DeploymentParameters { name, domain, port })
}

fn non_empty(source: &impl ParameterSource, key: &str) -> Option<String> {
    source
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Port 0 parses but can never be a forwarding target.
fn parse_port(raw: &str) -> Result<u16> {
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(DeployError::InvalidPort(raw.to_string())),
    }
}
