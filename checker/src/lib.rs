// Checker library exposing internal modules for testing
//
// This library file allows tests to access checker internals while keeping
// the binary in main.rs separate.

pub mod render;
pub mod runner;
pub mod spec;

// Re-export key types for test convenience
pub use render::{HelmCli, RenderError, TemplateEngine, TmpFiles};
pub use runner::{run_test, CheckError, Outcome, RunConfig};
pub use spec::{Params, SpecError, TestSpec};

// Version constants used by main.rs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const BUILD_VERSION: Option<&str> = option_env!("BUILD_VERSION");

// Test modules
#[cfg(test)]
pub mod tests;
