pub mod code_export;
pub mod error;
pub mod logger;
pub mod monitor;
pub mod timeframe;
pub mod validation;
