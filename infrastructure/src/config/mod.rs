//! Configuration: TOML file schema and multi-source loading.

pub mod file_config;
pub mod loader;
