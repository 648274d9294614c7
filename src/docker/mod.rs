//! Docker CLI plumbing
//!
//! Availability checks, compose flavor detection and execution of the
//! external `docker` commands a redeploy is made of.

pub mod command;
pub mod probe;

pub use command::CommandSpec;
pub use probe::{ComposeFlavor, DockerProbe};
