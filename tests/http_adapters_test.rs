use httpmock::prelude::*;
use signal_monitor::adapters::{BinanceExchange, BinanceOptions, DingTalkNotifier};
use signal_monitor::config::toml_config::DingTalkSettings;
use signal_monitor::core::universe::{top_symbols_by_volume, UniverseOptions};
use signal_monitor::domain::model::{MarketType, Notification};
use signal_monitor::domain::ports::{Exchange, Notifier};
use signal_monitor::MonitorError;
use std::collections::HashSet;
use std::time::Duration;

fn exchange_for(server: &MockServer) -> BinanceExchange {
    BinanceExchange::new(BinanceOptions {
        market_type: MarketType::Swap,
        base_url: Some(server.base_url()),
        request_timeout: Duration::from_secs(5),
        rate_limit: Duration::from_millis(1),
    })
    .unwrap()
}

fn mock_exchange_info(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/fapi/v1/exchangeInfo");
        then.status(200).json_body(serde_json::json!({
            "timezone": "UTC",
            "symbols": [
                {"symbol": "BTCUSDT", "status": "TRADING", "baseAsset": "BTC", "quoteAsset": "USDT",
                 "marginAsset": "USDT", "contractType": "PERPETUAL"},
                {"symbol": "ETHUSDT", "status": "TRADING", "baseAsset": "ETH", "quoteAsset": "USDT",
                 "marginAsset": "USDT", "contractType": "PERPETUAL"},
                {"symbol": "ETHUSDC", "status": "TRADING", "baseAsset": "ETH", "quoteAsset": "USDC",
                 "marginAsset": "USDC", "contractType": "PERPETUAL"},
                {"symbol": "BTCUSDT_250926", "status": "TRADING", "baseAsset": "BTC", "quoteAsset": "USDT",
                 "marginAsset": "USDT", "contractType": "CURRENT_QUARTER"}
            ]
        }));
    })
}

#[tokio::test]
async fn test_binance_tickers_and_universe() {
    let server = MockServer::start();
    let info_mock = mock_exchange_info(&server);
    let ticker_mock = server.mock(|when, then| {
        when.method(GET).path("/fapi/v1/ticker/24hr");
        then.status(200).json_body(serde_json::json!([
            {"symbol": "BTCUSDT", "lastPrice": "65000", "quoteVolume": "9000000"},
            {"symbol": "ETHUSDT", "lastPrice": "3000", "quoteVolume": "12000000"},
            {"symbol": "ETHUSDC", "lastPrice": "3000", "quoteVolume": "100000"},
            {"symbol": "BTCUSDT_250926", "lastPrice": "66000", "quoteVolume": "99999999"}
        ]));
    });

    let exchange = exchange_for(&server);
    let tickers = exchange.fetch_tickers().await.unwrap();
    assert_eq!(tickers.len(), 3);
    assert!(tickers
        .iter()
        .any(|t| t.symbol == "ETH/USDC:USDC" && t.quote == "USDC" && t.quote_volume == 100000.0));

    let mut opts = UniverseOptions {
        top_n: 10,
        exclude: HashSet::new(),
        market_type: MarketType::Swap,
        primary_quote: "USDT".to_string(),
        must_exist_in: None,
        retries: 2,
    };
    let symbols = top_symbols_by_volume(&exchange, &opts).await;
    assert_eq!(symbols, vec!["ETH/USDT:USDT", "BTC/USDT:USDT"]);

    opts.must_exist_in = Some(["USDC".to_string()].into_iter().collect());
    let symbols = top_symbols_by_volume(&exchange, &opts).await;
    assert_eq!(symbols, vec!["ETH/USDT:USDT"]);

    // 交易對資訊只載入一次
    info_mock.assert_hits(1);
    ticker_mock.assert_hits(3);
}

#[tokio::test]
async fn test_binance_klines() {
    let server = MockServer::start();
    mock_exchange_info(&server);

    let rows: Vec<serde_json::Value> = (0..60)
        .map(|i| {
            serde_json::json!([
                1_700_000_000_000i64 + i * 3_600_000,
                "100.0", "101.5", "99.5", format!("{}", 100 + i), "1500.25",
                1_700_003_599_999i64 + i * 3_600_000, "150000", 42, "700", "70000", "0"
            ])
        })
        .collect();
    let klines_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/fapi/v1/klines")
            .query_param("symbol", "BTCUSDT")
            .query_param("interval", "4h")
            .query_param("limit", "60");
        then.status(200).json_body(serde_json::Value::Array(rows));
    });

    let exchange = exchange_for(&server);
    let candles = exchange.fetch_ohlcv("BTC/USDT:USDT", "4h", 60).await.unwrap();

    klines_mock.assert();
    assert_eq!(candles.len(), 60);
    assert_eq!(candles[0].timestamp, 1_700_000_000_000);
    assert_eq!(candles[59].close, 159.0);
    assert_eq!(candles[59].volume, 1500.25);

    let unknown = exchange.fetch_ohlcv("DOGE/USDT:USDT", "4h", 60).await;
    assert!(matches!(unknown, Err(MonitorError::ExchangeError { .. })));
}

#[tokio::test]
async fn test_binance_error_status_and_universe_gives_up() {
    let server = MockServer::start();
    let info_mock = server.mock(|when, then| {
        when.method(GET).path("/fapi/v1/exchangeInfo");
        then.status(418).body("banned");
    });

    let exchange = exchange_for(&server);
    let result = exchange.fetch_tickers().await;
    match result {
        Err(MonitorError::ExchangeError { message }) => assert!(message.contains("418")),
        other => panic!("unexpected result: {:?}", other.map(|t| t.len())),
    }

    let opts = UniverseOptions {
        top_n: 10,
        exclude: HashSet::new(),
        market_type: MarketType::Swap,
        primary_quote: "USDT".to_string(),
        must_exist_in: None,
        retries: 3,
    };
    assert!(top_symbols_by_volume(&exchange, &opts).await.is_empty());
    info_mock.assert_hits(4);
}

fn notification() -> Notification {
    Notification {
        title: "🚀 EMA 放量(2.0x) 有效突破: BTC/USDT:USDT (1h)".to_string(),
        message: "**信号**: test".to_string(),
        symbol: "BTC/USDT:USDT".to_string(),
    }
}

#[tokio::test]
async fn test_dingtalk_signed_markdown_delivery() {
    let server = MockServer::start();
    let webhook_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/robot/send")
            .query_param("access_token", "abc")
            .query_param_exists("timestamp")
            .query_param_exists("sign")
            .json_body_partial(r#"{"msgtype": "markdown", "at": {"isAtAll": false}}"#);
        then.status(200)
            .json_body(serde_json::json!({"errcode": 0, "errmsg": "ok"}));
    });

    let notifier = DingTalkNotifier::new(&DingTalkSettings {
        enabled: true,
        webhook_url: server.url("/robot/send?access_token=abc"),
        secret: Some("SECtest".to_string()),
        timeout_seconds: 5,
    })
    .unwrap();

    notifier.send(&notification()).await.unwrap();
    webhook_mock.assert();
}

#[tokio::test]
async fn test_dingtalk_rejection_is_notification_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/robot/send");
        then.status(200)
            .json_body(serde_json::json!({"errcode": 310000, "errmsg": "sign not match"}));
    });

    let notifier = DingTalkNotifier::new(&DingTalkSettings {
        enabled: true,
        webhook_url: server.url("/robot/send?access_token=abc"),
        secret: None,
        timeout_seconds: 5,
    })
    .unwrap();

    let result = notifier.send(&notification()).await;
    assert!(matches!(result, Err(MonitorError::NotificationError { .. })));
}
