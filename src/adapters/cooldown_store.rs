use crate::utils::error::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// 訊號冷卻狀態，以 JSON 檔保存 `alert_key → 到期時間`
#[derive(Debug)]
pub struct CooldownStore {
    path: PathBuf,
    entries: HashMap<String, DateTime<Utc>>,
    version: u64,
}

impl CooldownStore {
    /// 讀取狀態檔並丟棄已過期項目；檔案不存在或無法解析時從空狀態開始
    pub fn load(path: impl AsRef<Path>, now: DateTime<Utc>) -> Self {
        let path = path.as_ref().to_path_buf();

        let raw: Option<HashMap<String, String>> = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok());

        let Some(raw) = raw else {
            tracing::info!("ℹ️ No readable cooldown state at {}, starting empty", path.display());
            return Self {
                path,
                entries: HashMap::new(),
                version: 0,
            };
        };

        let total = raw.len();
        let entries: HashMap<String, DateTime<Utc>> = raw
            .into_iter()
            .filter_map(|(key, value)| parse_expiry(&value).map(|until| (key, until)))
            .filter(|(_, until)| *until > now)
            .collect();

        tracing::info!(
            "✅ Loaded cooldown state: {} active of {} entries",
            entries.len(),
            total
        );

        Self {
            path,
            entries,
            version: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn expiry(&self, alert_key: &str) -> Option<DateTime<Utc>> {
        self.entries.get(alert_key).copied()
    }

    pub fn is_cooling_down(&self, alert_key: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .get(alert_key)
            .map(|until| now < *until)
            .unwrap_or(false)
    }

    /// 設定冷卻，回傳待寫回的狀態快照（只保留未過期的項目）
    pub fn arm(
        &mut self,
        alert_key: &str,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<CooldownSnapshot> {
        self.entries.insert(alert_key.to_string(), until);
        self.snapshot(now)
    }

    pub fn snapshot(&mut self, now: DateTime<Utc>) -> Result<CooldownSnapshot> {
        self.entries.retain(|_, until| *until > now);

        let serialized: BTreeMap<&str, String> = self
            .entries
            .iter()
            .map(|(key, until)| (key.as_str(), until.to_rfc3339()))
            .collect();

        self.version += 1;
        Ok(CooldownSnapshot {
            path: self.path.clone(),
            contents: serde_json::to_string_pretty(&serialized)?,
            version: self.version,
        })
    }
}

/// 某一時刻的冷卻狀態；`version` 越大越新
#[derive(Debug, Clone)]
pub struct CooldownSnapshot {
    path: PathBuf,
    contents: String,
    version: u64,
}

impl CooldownSnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub async fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, &self.contents).await?;
        Ok(())
    }
}

// 沒有時區資訊的時間視為 UTC
fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_missing_and_corrupt_files_start_empty() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();

        let missing = CooldownStore::load(dir.path().join("none.json"), now);
        assert!(missing.is_empty());

        let corrupt_path = dir.path().join("corrupt.json");
        std::fs::write(&corrupt_path, "{ not json").unwrap();
        assert!(CooldownStore::load(&corrupt_path, now).is_empty());
    }

    #[test]
    fn test_load_drops_expired_and_accepts_naive_timestamps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cooldown_status.json");
        let now = Utc::now();

        let active = (now + Duration::hours(1)).to_rfc3339();
        let expired = (now - Duration::hours(1)).to_rfc3339();
        let naive = (now + Duration::hours(2))
            .naive_utc()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();
        std::fs::write(
            &path,
            serde_json::json!({ "A": active, "B": expired, "C": naive, "D": "garbage" }).to_string(),
        )
        .unwrap();

        let store = CooldownStore::load(&path, now);
        assert_eq!(store.len(), 2);
        assert!(store.is_cooling_down("A", now));
        assert!(!store.is_cooling_down("B", now));
        assert!(store.is_cooling_down("C", now));
        assert!(!store.is_cooling_down("C", now + Duration::hours(3)));
    }

    #[tokio::test]
    async fn test_arm_persists_only_active_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("cooldown.json");
        let now = Utc::now();

        let mut store = CooldownStore::load(&path, now);
        let first = store.arm("OLD", now + Duration::minutes(1), now).unwrap();
        first.write().await.unwrap();
        let later = now + Duration::minutes(5);
        let second = store.arm("NEW", later + Duration::minutes(30), later).unwrap();
        assert!(second.version() > first.version());
        second.write().await.unwrap();

        assert_eq!(store.expiry("OLD"), None);

        let reloaded = CooldownStore::load(&path, later);
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.is_cooling_down("NEW", later));
    }
}
