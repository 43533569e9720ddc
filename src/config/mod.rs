#[cfg(feature = "cli")]
pub mod cli;
pub mod deploy;
pub mod toml_config;

pub use deploy::{DeployConfig, DeployStep};
pub use toml_config::{resolve_params, MonitorConfig};
