pub mod alerts;
pub mod context;
pub mod deploy;
pub mod market_data;
pub mod notifications;
pub mod report;
pub mod scanner;
pub mod scheduler;
pub mod universe;

pub use alerts::{AlertDispatcher, DispatchOutcome};
pub use context::{build_exchange, AppContext};
pub use notifications::NotificationQueue;
pub use universe::SymbolCache;
