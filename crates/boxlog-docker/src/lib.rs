//! Docker CLI environment runtime.
//!
//! Provides:
//! - `DockerRuntime` - `EnvironmentRuntime` over the `docker` executable
//! - Argument building and diagnostic classification for docker commands

pub mod command;
pub mod diagnostics;
pub mod follower;
pub mod resolve;
pub mod runtime;

pub use resolve::resolve_executable_path;
pub use runtime::{DockerConfig, DockerRuntime};
