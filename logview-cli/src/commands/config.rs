//! Show the effective engine configuration.

use logview_engine::EngineConfig;
use std::path::Path;

/// Run the config command.
pub fn run(config: &EngineConfig, source: Option<&Path>) {
    println!("=== logview config ===");
    println!();
    match source {
        Some(path) => println!("Source: {}", path.display()),
        None => println!("Source: built-in defaults"),
    }
    println!();
    print!("{}", config.to_toml());
}
