//! Docker Compose document handling
//!
//! Loading and writing compose files, the Traefik routing transform, and the
//! clean redeploy of the routed stack.

pub mod orchestrator;
pub mod parser;
pub mod transform;

pub use orchestrator::{ComposeOrchestrator, DeployStep};
pub use parser::ComposeParser;
pub use transform::{routing_labels, transform};
