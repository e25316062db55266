//! Configuration loading
//!
//! Reads [`ClientConfig`](mentorlink_domain::ClientConfig) from a TOML or
//! JSON file and `MENTORLINK_*` environment overrides.

pub mod loader;

// Re-export commonly used items
pub use loader::{apply_env_overrides, discover_config_path, load, load_from_file};
