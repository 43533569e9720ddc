use crate::config::toml_config::DingTalkSettings;
use crate::domain::model::Notification;
use crate::domain::ports::Notifier;
use crate::utils::error::{MonitorError, Result};
use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::Sha256;
use std::time::Duration;

/// 釘釘自訂機器人（markdown 訊息，可選加簽）
pub struct DingTalkNotifier {
    client: Client,
    webhook_url: String,
    secret: Option<String>,
}

impl DingTalkNotifier {
    pub fn new(settings: &DingTalkSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            webhook_url: settings.webhook_url.clone(),
            secret: settings.secret.clone().filter(|s| !s.trim().is_empty()),
        })
    }

    /// 加簽後的 webhook 位址；未設定 secret 時原樣回傳
    pub fn signed_url(&self, timestamp_ms: i64) -> Result<String> {
        let Some(secret) = &self.secret else {
            return Ok(self.webhook_url.clone());
        };
        let sign = sign(secret, timestamp_ms)?;
        Ok(format!(
            "{}&timestamp={}&sign={}",
            self.webhook_url, timestamp_ms, sign
        ))
    }

    pub fn payload(notification: &Notification) -> Value {
        json!({
            "msgtype": "markdown",
            "markdown": {
                "title": notification.title,
                "text": format!("### {}\n\n{}", notification.title, notification.message),
            },
            "at": { "isAtAll": false }
        })
    }
}

/// urlencode(base64(HMAC-SHA256(secret, "{timestamp}\n{secret}")))
pub fn sign(secret: &str, timestamp_ms: i64) -> Result<String> {
    let string_to_sign = format!("{}\n{}", timestamp_ms, secret);
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret.as_bytes()).map_err(|e| {
        MonitorError::NotificationError {
            message: format!("Invalid DingTalk secret: {}", e),
        }
    })?;
    mac.update(string_to_sign.as_bytes());
    let digest = mac.finalize().into_bytes();
    let encoded = base64::engine::general_purpose::STANDARD.encode(digest);
    Ok(urlencoding::encode(&encoded).into_owned())
}

#[async_trait]
impl Notifier for DingTalkNotifier {
    fn name(&self) -> &str {
        "dingtalk"
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        let url = self.signed_url(chrono::Utc::now().timestamp_millis())?;
        let response = self
            .client
            .post(&url)
            .json(&Self::payload(notification))
            .send()
            .await?;

        let body: Value = response.json().await?;
        match body.get("errcode").and_then(Value::as_i64) {
            Some(0) => {
                tracing::info!("✅ DingTalk alert sent: {}", notification.title);
                Ok(())
            }
            _ => Err(MonitorError::NotificationError {
                message: format!("DingTalk rejected alert: {}", body),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(secret: Option<&str>) -> DingTalkSettings {
        DingTalkSettings {
            enabled: true,
            webhook_url: "https://oapi.dingtalk.com/robot/send?access_token=abc".to_string(),
            secret: secret.map(str::to_string),
            timeout_seconds: 5,
        }
    }

    #[test]
    fn test_sign_is_url_safe_base64_of_hmac() {
        let signature = sign("SECtest", 1_700_000_000_000).unwrap();

        let decoded = urlencoding::decode(&signature).unwrap();
        let raw = base64::engine::general_purpose::STANDARD
            .decode(decoded.as_bytes())
            .unwrap();
        assert_eq!(raw.len(), 32);
        assert!(!signature.contains('+') && !signature.contains('/') && !signature.contains('='));
        // 同樣輸入產生同樣簽名
        assert_eq!(signature, sign("SECtest", 1_700_000_000_000).unwrap());
        assert_ne!(signature, sign("SECtest", 1_700_000_000_001).unwrap());
    }

    #[test]
    fn test_signed_url() {
        let notifier = DingTalkNotifier::new(&settings(Some("SECtest"))).unwrap();
        let url = notifier.signed_url(42).unwrap();
        assert!(url.starts_with("https://oapi.dingtalk.com/robot/send?access_token=abc&timestamp=42&sign="));

        let plain = DingTalkNotifier::new(&settings(Some("  "))).unwrap();
        assert_eq!(
            plain.signed_url(42).unwrap(),
            "https://oapi.dingtalk.com/robot/send?access_token=abc"
        );
    }

    #[test]
    fn test_markdown_payload() {
        let payload = DingTalkNotifier::payload(&Notification {
            title: "🚀 EMA 有效突破: BTC/USDT:USDT (1h)".to_string(),
            message: "body".to_string(),
            symbol: "BTC/USDT:USDT".to_string(),
        });

        assert_eq!(payload["msgtype"], "markdown");
        assert_eq!(
            payload["markdown"]["text"],
            "### 🚀 EMA 有效突破: BTC/USDT:USDT (1h)\n\nbody"
        );
        assert_eq!(payload["at"]["isAtAll"], false);
    }
}
