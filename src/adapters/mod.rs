// Adapters layer: concrete implementations of the domain ports (exchange, notifiers, commands, state file)

pub mod binance;
pub mod command;
pub mod console;
pub mod cooldown_store;
pub mod dingtalk;

pub use binance::{BinanceExchange, BinanceOptions};
pub use command::SystemCommandRunner;
pub use console::ConsoleNotifier;
pub use cooldown_store::CooldownStore;
pub use dingtalk::DingTalkNotifier;
