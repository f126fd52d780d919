//! Servgraph CLI Library
//!
//! Programmatic access to the `cargo-servgraph` commands, mainly for `build.rs`
//! scripts that regenerate the GraphQL layer during the build.

pub mod codegen;
pub mod commands;
pub mod utils;

// Re-export commonly used types and functions
pub use codegen::{run_generation_sync, GeneratorResult};

// Re-export command types for advanced usage
pub use commands::{
    generate::GenerateCommand, init::InitCommand, validate::ValidateCommand, Command,
};

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber; `RUST_LOG` wins over `debug`
///
/// Does nothing when a subscriber is already installed.
pub fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Build-script entry point
///
/// ```ignore
/// fn main() {
///     servgraph_cli::generate_code(env!("CARGO_MANIFEST_DIR"));
/// }
/// ```
///
/// Exits the build script with status 1 when generation fails.
pub fn generate_code<P: AsRef<Path>>(project_dir: P) {
    let project_dir = project_dir.as_ref();
    for input in utils::config::watched_inputs(project_dir) {
        println!("cargo:rerun-if-changed={}", input.display());
    }

    match run_generation_sync(project_dir) {
        Ok(results) => {
            let total_files: usize = results.iter().map(|r| r.files_generated.len()).sum();
            if total_files > 0 {
                println!(
                    "cargo:warning=✅ Code generation completed: {} files generated",
                    total_files
                );
            }

            let mut failed = false;
            for result in &results {
                for warning in &result.warnings {
                    println!("cargo:warning=⚠️ {warning}");
                }
                if !result.success {
                    failed = true;
                    println!(
                        "cargo:warning=❌ {} generator failed: {}",
                        result.generator_name, result.message
                    );
                }
            }
            if failed {
                std::process::exit(1);
            }
        }
        Err(e) => {
            println!("cargo:warning=❌ Code generation failed: {e:#}");
            std::process::exit(1);
        }
    }
}
