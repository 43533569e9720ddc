use crate::domain::model::{Candle, Notification, Ticker};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// 公開行情資料來源
#[async_trait]
pub trait Exchange: Send + Sync {
    fn id(&self) -> &str;

    /// 連續請求之間建議的最小間隔
    fn rate_limit(&self) -> Duration;

    async fn fetch_tickers(&self) -> Result<Vec<Ticker>>;

    async fn fetch_ohlcv(&self, symbol: &str, timeframe: &str, limit: usize)
        -> Result<Vec<Candle>>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, notification: &Notification) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    /// 被訊號終止時沒有結束碼
    pub code: Option<i32>,
}

/// 外部指令執行（git / docker）
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], work_dir: &Path) -> Result<CommandOutcome>;
}
