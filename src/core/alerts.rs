use crate::adapters::cooldown_store::{CooldownSnapshot, CooldownStore};
use crate::analysis::volume::{realtime_volume_check, VolumeCheck};
use crate::core::notifications::NotificationQueue;
use crate::domain::model::{AlertCandidate, VolumePolicy, VOLUME_LABEL_SLOT};
use crate::strategies::SignalContext;
use crate::utils::error::Result;
use crate::utils::timeframe::{cooldown_until, timeframe_to_minutes};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 同一訊號仍在冷卻中
    CoolingDown,
    /// 要求放量確認但量能不足
    LowVolume,
    Queued,
}

/// 冷卻檢查 → 量能確認 → 入佇列 → 設定冷卻
pub struct AlertDispatcher {
    cooldowns: Mutex<CooldownStore>,
    /// 已寫入磁碟的最新快照版本
    persisted: Mutex<u64>,
    queue: NotificationQueue,
}

impl AlertDispatcher {
    pub fn new(cooldowns: CooldownStore, queue: NotificationQueue) -> Self {
        Self {
            cooldowns: Mutex::new(cooldowns),
            persisted: Mutex::new(0),
            queue,
        }
    }

    pub async fn active_cooldowns(&self) -> usize {
        self.cooldowns.lock().await.len()
    }

    pub async fn dispatch(
        &self,
        ctx: &SignalContext<'_>,
        candidate: AlertCandidate,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome> {
        let mut cooldowns = self.cooldowns.lock().await;
        if cooldowns.is_cooling_down(&candidate.alert_key, now) {
            tracing::trace!("⏳ {} still cooling down", candidate.alert_key);
            return Ok(DispatchOutcome::CoolingDown);
        }

        let tf_minutes = timeframe_to_minutes(ctx.timeframe);
        let volume = match candidate.volume_policy {
            VolumePolicy::Skip => None,
            VolumePolicy::Annotate | VolumePolicy::MustConfirm => {
                let multiplier = ctx
                    .settings
                    .dynamic_volume_multipliers
                    .as_ref()
                    .map(|dynamic| dynamic.value_for_rank(ctx.rank, candidate.fallback_volume_multiplier))
                    .unwrap_or(candidate.fallback_volume_multiplier);
                Some(realtime_volume_check(
                    ctx.candles,
                    tf_minutes,
                    ctx.settings.volume.volume_ma_period,
                    multiplier,
                    now,
                ))
            }
        };

        if candidate.volume_policy == VolumePolicy::MustConfirm
            && !volume.as_ref().map(|v| v.is_over).unwrap_or(false)
        {
            tracing::debug!(
                "[{}|{}] '{}' filtered out by low volume",
                ctx.symbol,
                ctx.timeframe,
                candidate.log_name
            );
            return Ok(DispatchOutcome::LowVolume);
        }

        let (title, message) = render(&candidate, volume.as_ref());
        self.queue.send_alert(&title, &message, ctx.symbol);
        tracing::info!("🔔 [{}|{}] {} queued", ctx.symbol, ctx.timeframe, candidate.log_name);

        let until = cooldown_until(now, tf_minutes as f64 * candidate.cooldown_multiplier);
        let snapshot = cooldowns.arm(&candidate.alert_key, until, now)?;
        drop(cooldowns);

        self.persist(snapshot).await?;
        Ok(DispatchOutcome::Queued)
    }

    // 檔案寫入在冷卻鎖之外進行；較舊的快照不會覆蓋較新的
    async fn persist(&self, snapshot: CooldownSnapshot) -> Result<()> {
        let mut persisted = self.persisted.lock().await;
        if snapshot.version() <= *persisted {
            return Ok(());
        }
        snapshot.write().await?;
        *persisted = snapshot.version();
        Ok(())
    }
}

fn render(candidate: &AlertCandidate, volume: Option<&VolumeCheck>) -> (String, String) {
    match volume {
        Some(check) => {
            let label = check.label();
            (
                candidate.title.replace(VOLUME_LABEL_SLOT, &label),
                format!("{}{}", candidate.body.replace(VOLUME_LABEL_SLOT, &label), check.text),
            )
        }
        None => (
            candidate.title.replace(VOLUME_LABEL_SLOT, ""),
            candidate.body.replace(VOLUME_LABEL_SLOT, ""),
        ),
    }
}
