pub mod adapters;
pub mod analysis;
pub mod config;
pub mod core;
pub mod domain;
pub mod strategies;
pub mod utils;

pub use config::{DeployConfig, MonitorConfig};
pub use core::{AppContext, NotificationQueue};
pub use utils::error::{MonitorError, Result};
