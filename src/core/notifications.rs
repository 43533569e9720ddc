use crate::adapters::{ConsoleNotifier, DingTalkNotifier};
use crate::config::toml_config::NotificationSettings;
use crate::domain::model::Notification;
use crate::domain::ports::Notifier;
use crate::utils::error::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// 通知佇列；寫入端永不阻塞
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::UnboundedSender<Notification>,
}

impl NotificationQueue {
    pub fn channel() -> (Self, NotificationReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn send_alert(&self, title: &str, message: &str, symbol: &str) {
        let notification = Notification {
            title: title.to_string(),
            message: message.to_string(),
            symbol: symbol.to_string(),
        };
        if self.sender.send(notification).is_err() {
            tracing::warn!("⚠️ Notification queue closed, dropping: {}", title);
        }
    }
}

/// 依設定建立啟用中的通知通道
pub fn build_notifiers(settings: &NotificationSettings) -> Result<Vec<Arc<dyn Notifier>>> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();

    if settings.console.enabled {
        notifiers.push(Arc::new(ConsoleNotifier));
    }
    if settings.dingtalk.enabled {
        notifiers.push(Arc::new(DingTalkNotifier::new(&settings.dingtalk)?));
    }

    Ok(notifiers)
}

/// 逐則取出並依序交給每個通知通道，直到佇列關閉或收到關閉訊號
pub async fn run_consumer(
    mut receiver: NotificationReceiver,
    notifiers: Vec<Arc<dyn Notifier>>,
    shutdown: CancellationToken,
) {
    tracing::info!("📨 Notification consumer started with {} notifier(s)", notifiers.len());

    loop {
        let notification = tokio::select! {
            _ = shutdown.cancelled() => break,
            item = receiver.recv() => match item {
                Some(notification) => notification,
                None => break,
            },
        };

        for notifier in &notifiers {
            match notifier.send(&notification).await {
                Ok(()) => tracing::debug!("📤 [{}] delivered: {}", notifier.name(), notification.title),
                Err(e) => tracing::error!(
                    "❌ [{}] failed to deliver '{}': {}",
                    notifier.name(),
                    notification.title,
                    e
                ),
            }
        }
    }

    tracing::info!("👋 Notification consumer stopped");
}

pub fn spawn_consumer(
    receiver: NotificationReceiver,
    notifiers: Vec<Arc<dyn Notifier>>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_consumer(receiver, notifiers, shutdown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::MonitorError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        titles: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, notification: &Notification) -> Result<()> {
            self.titles.lock().unwrap().push(notification.title.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn send(&self, _: &Notification) -> Result<()> {
            Err(MonitorError::NotificationError {
                message: "boom".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_consumer_delivers_in_order_despite_failures() {
        let (queue, receiver) = NotificationQueue::channel();
        let recording = Arc::new(Recording::default());
        let notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(Failing), recording.clone()];

        queue.send_alert("first", "m", "BTC/USDT:USDT");
        queue.send_alert("second", "m", "ETH/USDT:USDT");
        drop(queue);

        run_consumer(receiver, notifiers, CancellationToken::new()).await;

        assert_eq!(*recording.titles.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_consumer_stops_on_shutdown() {
        let (_queue, receiver) = NotificationQueue::channel();
        let shutdown = CancellationToken::new();
        let handle = spawn_consumer(receiver, Vec::new(), shutdown.clone());

        shutdown.cancel();
        assert!(handle.await.is_ok());
    }

    #[test]
    fn test_build_notifiers_from_settings() {
        let mut settings = NotificationSettings::default();
        assert_eq!(build_notifiers(&settings).unwrap().len(), 1);

        settings.console.enabled = false;
        settings.dingtalk.enabled = true;
        settings.dingtalk.webhook_url = "https://oapi.dingtalk.com/robot/send?access_token=x".to_string();
        let notifiers = build_notifiers(&settings).unwrap();
        assert_eq!(notifiers.len(), 1);
        assert_eq!(notifiers[0].name(), "dingtalk");
    }
}
