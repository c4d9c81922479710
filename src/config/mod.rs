// Engine configuration: defaults plus an optional `.svsc` YAML overlay.

mod loader;
mod types;

pub use loader::{CONFIG_ENV, CONFIG_FILE, FileConfig, config_path, load, load_from};
pub use types::{Config, PortRange, RuntimeEnvironment};
