// Domain layer: market data models and ports implemented by adapters.

pub mod model;
pub mod ports;
