use chrono::{Duration, Utc};

use crate::types::SnapshotRow;

/// A row that passes every long-side rule.
pub fn long_row() -> SnapshotRow {
    SnapshotRow {
        symbol: "GOOD_STOCK".to_string(),
        ticker: "NASDAQ:GOOD_STOCK".to_string(),
        close: Some(700.0),
        ema8: Some(680.0),
        ema21: Some(670.0),
        ema34: Some(660.0),
        ema55: Some(650.0),
        ema89: Some(640.0),
        sma50: Some(620.0),
        sma100: Some(610.0),
        sma200: Some(600.0),
        adx: Some(25.0),
        stoch_k: Some(30.0),
        atr: Some(30.0),
        relative_volume: Some(1.5),
        change_pct: Some(0.8),
        rsi2: Some(15.0),
        rsi2_prev: Some(5.0),
        earnings_next: Some(Utc::now() + Duration::days(100)),
    }
}

/// A row that passes every short-side rule.
pub fn short_row() -> SnapshotRow {
    SnapshotRow {
        symbol: "WEAK_STOCK".to_string(),
        ticker: "NYSE:WEAK_STOCK".to_string(),
        close: Some(500.0),
        ema8: Some(520.0),
        ema21: Some(530.0),
        ema34: Some(540.0),
        ema55: Some(550.0),
        ema89: Some(560.0),
        sma50: Some(580.0),
        sma100: Some(590.0),
        sma200: Some(600.0),
        adx: Some(28.0),
        stoch_k: Some(70.0),
        atr: Some(30.0),
        relative_volume: Some(2.1),
        change_pct: Some(-1.2),
        rsi2: Some(85.0),
        rsi2_prev: Some(95.0),
        earnings_next: None,
    }
}
