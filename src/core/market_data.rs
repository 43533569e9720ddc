use crate::domain::model::Candle;
use crate::domain::ports::Exchange;

/// 少於此根數的 K 線不足以計算任何策略
pub const MIN_CANDLES: usize = 50;

/// 取得 K 線；請求失敗或資料不足時回傳 `None`
pub async fn fetch_candles(
    exchange: &dyn Exchange,
    symbol: &str,
    timeframe: &str,
    limit: usize,
) -> Option<Vec<Candle>> {
    match exchange.fetch_ohlcv(symbol, timeframe, limit).await {
        Ok(candles) if candles.len() >= MIN_CANDLES => Some(candles),
        Ok(candles) => {
            tracing::debug!(
                "Only {} candles for {} {}, skipping",
                candles.len(),
                symbol,
                timeframe
            );
            None
        }
        Err(e) => {
            tracing::debug!("Failed to fetch OHLCV for {} {}: {}", symbol, timeframe, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::indicators::tests::candle;
    use crate::strategies::tests::OfflineExchange;
    use crate::domain::model::Ticker;
    use crate::utils::error::Result;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedExchange(usize);

    #[async_trait]
    impl Exchange for FixedExchange {
        fn id(&self) -> &str {
            "fixed"
        }

        fn rate_limit(&self) -> Duration {
            Duration::ZERO
        }

        async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
            Ok(Vec::new())
        }

        async fn fetch_ohlcv(&self, _: &str, _: &str, limit: usize) -> Result<Vec<Candle>> {
            Ok((0..self.0.min(limit))
                .map(|i| candle(i, 1.0, 1.0, 1.0, 1.0, 1.0))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_fetch_candles_thresholds() {
        assert_eq!(
            fetch_candles(&FixedExchange(60), "BTC/USDT:USDT", "1h", 200)
                .await
                .map(|c| c.len()),
            Some(60)
        );
        assert!(fetch_candles(&FixedExchange(49), "BTC/USDT:USDT", "1h", 200)
            .await
            .is_none());
        assert!(fetch_candles(&OfflineExchange, "BTC/USDT:USDT", "1h", 200)
            .await
            .is_none());
    }
}
