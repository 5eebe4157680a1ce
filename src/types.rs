use chrono::{DateTime, Utc};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Long,
    Short,
}

impl Direction {
    /// Uppercase label used in the `signal_direction` column.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }

    /// +1 for long, -1 for short. Scales ATR offsets when deriving targets.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::Long => "long",
            Direction::Short => "short",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            other => Err(AppError::Config(format!(
                "Invalid direction: {other} (expected 'long' or 'short')"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One equity's indicator values at fetch time.
///
/// Every numeric field is optional: the screener sends nulls and placeholder
/// strings for indicators it could not compute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotRow {
    pub symbol: String,
    /// Exchange-qualified ticker, e.g. `NASDAQ:AAPL`.
    pub ticker: String,
    pub close: Option<f64>,
    pub ema8: Option<f64>,
    pub ema21: Option<f64>,
    pub ema34: Option<f64>,
    pub ema55: Option<f64>,
    pub ema89: Option<f64>,
    pub sma50: Option<f64>,
    pub sma100: Option<f64>,
    pub sma200: Option<f64>,
    pub adx: Option<f64>,
    pub stoch_k: Option<f64>,
    pub atr: Option<f64>,
    pub relative_volume: Option<f64>,
    pub change_pct: Option<f64>,
    pub rsi2: Option<f64>,
    pub rsi2_prev: Option<f64>,
    pub earnings_next: Option<DateTime<Utc>>,
}

impl SnapshotRow {
    /// The EMA chain in period order (8, 21, 34, 55, 89).
    pub fn ema_chain(&self) -> [Option<f64>; 5] {
        [self.ema8, self.ema21, self.ema34, self.ema55, self.ema89]
    }

    /// The SMA trend references in period order (50, 100, 200).
    pub fn sma_chain(&self) -> [Option<f64>; 3] {
        [self.sma50, self.sma100, self.sma200]
    }
}

/// Result of one screener query.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Server-reported number of matches, which may exceed `rows.len()` when the
    /// requested range truncated the result.
    pub total_count: usize,
    pub rows: Vec<SnapshotRow>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Scan metadata
// ---------------------------------------------------------------------------

/// Ordered key/value pairs describing a run, rendered alongside the results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanMetadata {
    entries: Vec<(String, String)>,
}

impl ScanMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.entries.push((key.into(), value.to_string()));
        self
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
