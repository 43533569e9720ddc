use crate::domain::model::Notification;
use crate::domain::ports::Notifier;
use crate::utils::error::Result;
use async_trait::async_trait;

/// 在終端機輸出標題與交易對
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn render(notification: &Notification) -> String {
        format!("🔔 {}\n   交易对: {}", notification.title, notification.symbol)
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        println!("{}", Self::render(notification));
        Ok(())
    }
}
