use chrono::{DateTime, Duration, Utc};

use crate::config::bounce;
use crate::types::{Direction, SnapshotRow};

// Every rule rejects a row whose inputs are missing, except the earnings rule
// where a missing date counts as safe.

/// ADX at or above the floor and price on the trend side of SMA50/100/200.
pub fn trend_and_strength(row: &SnapshotRow, direction: Direction) -> bool {
    let (Some(adx), Some(close)) = (row.adx, row.close) else {
        return false;
    };
    if adx < bounce::ADX_MIN {
        return false;
    }
    row.sma_chain().iter().all(|sma| match (sma, direction) {
        (Some(sma), Direction::Long) => close > *sma,
        (Some(sma), Direction::Short) => close < *sma,
        (None, _) => false,
    })
}

/// Full EMA chain strictly ordered: 8 > 21 > 34 > 55 > 89 for long, reversed for short.
pub fn ema_stacked(row: &SnapshotRow, direction: Direction) -> bool {
    row.ema_chain().windows(2).all(|pair| match (pair[0], pair[1], direction) {
        (Some(fast), Some(slow), Direction::Long) => fast > slow,
        (Some(fast), Some(slow), Direction::Short) => fast < slow,
        _ => false,
    })
}

/// Stochastic %K has pulled back against the trend.
pub fn pulled_back(row: &SnapshotRow, direction: Direction) -> bool {
    match (row.stoch_k, direction) {
        (Some(k), Direction::Long) => k <= bounce::STOCH_BULLISH_PULLBACK,
        (Some(k), Direction::Short) => k >= bounce::STOCH_BEARISH_PULLBACK,
        (None, _) => false,
    }
}

/// Price within one ATR of EMA21. Direction-agnostic; the boundary is inside.
pub fn in_action_zone(row: &SnapshotRow) -> bool {
    match (row.close, row.ema21, row.atr) {
        (Some(close), Some(ema21), Some(atr)) => (close - ema21).abs() <= atr,
        _ => false,
    }
}

/// False when the next earnings release falls within `[now, now + buffer]`.
pub fn clear_of_earnings(row: &SnapshotRow, now: DateTime<Utc>) -> bool {
    let Some(earnings) = row.earnings_next else {
        return true;
    };
    let window_end = now + Duration::days(bounce::EARNINGS_BUFFER_DAYS);
    !(earnings >= now && earnings <= window_end)
}

/// RSI(2) completed its cross on the current bar: prior bar at or beyond the
/// level, current bar strictly back inside.
pub fn rsi_triggered(row: &SnapshotRow, direction: Direction) -> bool {
    let (Some(prev), Some(curr)) = (row.rsi2_prev, row.rsi2) else {
        return false;
    };
    match direction {
        Direction::Long => {
            prev <= bounce::RSI_BULLISH_CROSS_LEVEL && curr > bounce::RSI_BULLISH_CROSS_LEVEL
        }
        Direction::Short => {
            prev >= bounce::RSI_BEARISH_CROSS_LEVEL && curr < bounce::RSI_BEARISH_CROSS_LEVEL
        }
    }
}
