// utils module - Contains utility modules for configuration, logging, and version information

pub mod config;
pub mod logging;
pub mod version;

// Re-export commonly used items for convenience
pub use config::Config;
pub use logging::init_tracing;
pub use version::VersionInfo;
