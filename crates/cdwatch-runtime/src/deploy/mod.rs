//! Deployer implementations.
//!
//! Two mutually substitutable strategies: an opaque external deploy script,
//! and the built-in build-and-run strategy that rebuilds the main checkout
//! and replaces the managed process.

mod cargo;
mod script;

pub use cargo::CargoDeployer;
pub use script::{ScriptDeployer, custom_script};
