//! Traefik routing transform
//!
//! Derives a routed compose document from a loaded one: published ports are
//! stripped from every service, the external `frontend` network is declared,
//! and the first declared service is attached to it and labelled for Traefik.
//! Everything else in the document is passed through untouched, in its
//! original order.

use crate::error::{DeployError, Result};
use crate::params::DeploymentParameters;
use serde_yaml::{Mapping, Value};

/// Shared network the proxy reaches services over
pub const FRONTEND_NETWORK: &str = "frontend";

/// Traefik entrypoint routers are bound to
pub const ENTRYPOINT: &str = "web";

/// Build the Traefik label set for the given parameters.
///
/// Values are substituted verbatim; the rule backticks are part of
/// Traefik's rule syntax.
pub fn routing_labels(params: &DeploymentParameters) -> Vec<String> {
    let name = &params.name;
    let mut labels = vec![
        "traefik.enable=true".to_string(),
        format!("traefik.http.routers.{}.entrypoints={}", name, ENTRYPOINT),
        format!("traefik.http.routers.{}.rule=Host(`{}`)", name, params.domain),
    ];

    if let Some(port) = params.port {
        labels.push(format!(
            "traefik.http.services.{}.loadbalancer.server.port={}",
            name, port
        ));
    }

    labels
}

/// Transform a compose document into its routed form.
///
/// Fails with [`DeployError::NoServices`] when `services` is missing, not a
/// mapping, or empty. On failure no document is returned.
pub fn transform(doc: Value, params: &DeploymentParameters) -> Result<Value> {
    let mut root = match doc {
        Value::Mapping(map) => map,
        Value::Null => Mapping::new(),
        _ => {
            return Err(DeployError::ComposeParse(
                "top level of compose file must be a mapping".to_string(),
            ))
        }
    };

    register_frontend_network(&mut root);

    let services = match root.get_mut("services") {
        Some(Value::Mapping(services)) if !services.is_empty() => services,
        _ => return Err(DeployError::NoServices),
    };

    // Declaration order is preserved by the mapping, so the first key is the
    // first service written in the file.
    let primary = services
        .keys()
        .next()
        .cloned()
        .ok_or(DeployError::NoServices)?;

    for (name, service) in services.iter_mut() {
        if let Value::Mapping(entry) = service {
            if entry.shift_remove("ports").is_some() {
                tracing::debug!(service = ?name, "Stripped published ports");
            }
        }
    }

    if let Some(service) = services.get_mut(&primary) {
        let entry = ensure_mapping(service);
        attach_frontend(entry);
        entry.insert(
            Value::from("labels"),
            Value::Sequence(routing_labels(params).into_iter().map(Value::from).collect()),
        );
    }

    tracing::info!(
        service = %service_name(&primary),
        router = %params.name,
        domain = %params.domain,
        "Routed primary service through Traefik"
    );

    Ok(Value::Mapping(root))
}

/// Name of the service that receives routing, if any
pub fn primary_service(doc: &Value) -> Option<String> {
    doc.get("services")?
        .as_mapping()?
        .keys()
        .next()
        .map(service_name)
}

/// Printable form of a service key; non-string keys render as YAML.
fn service_name(key: &Value) -> String {
    match key {
        Value::String(name) => name.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| format!("{:?}", other)),
    }
}

fn register_frontend_network(root: &mut Mapping) {
    let networks = ensure_mapping(
        root.entry(Value::from("networks"))
            .or_insert(Value::Null),
    );

    let mut external = Mapping::new();
    external.insert(Value::from("external"), Value::Bool(true));
    networks.insert(Value::from(FRONTEND_NETWORK), Value::Mapping(external));
}

fn attach_frontend(service: &mut Mapping) {
    let networks = service
        .entry(Value::from("networks"))
        .or_insert(Value::Null);

    // Short syntax `networks: [a, b]` becomes `{a: {}, b: {}}` so the
    // networks already attached survive alongside frontend.
    if let Value::Sequence(names) = networks {
        let converted: Mapping = names
            .drain(..)
            .map(|name| (name, Value::Mapping(Mapping::new())))
            .collect();
        *networks = Value::Mapping(converted);
    }

    ensure_mapping(networks).insert(
        Value::from(FRONTEND_NETWORK),
        Value::Mapping(Mapping::new()),
    );
}

/// Coerce a value into a mapping in place, replacing anything that is not one.
fn ensure_mapping(value: &mut Value) -> &mut Mapping {
    if !value.is_mapping() {
        *value = Value::Mapping(Mapping::new());
    }
    match value {
        Value::Mapping(map) => map,
        _ => unreachable!("value was just replaced with a mapping"),
    }
}
