use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::{bounce, Config, HTTP_TIMEOUT_SECS, MARKET};
use crate::error::{AppError, Result};
use crate::types::{Direction, Snapshot, SnapshotRow};

/// Columns requested from the screener. Response values arrive positionally in
/// this order.
pub const FIELDS: &[&str] = &[
    "name",
    "close",
    "EMA8",
    "EMA21",
    "EMA34",
    "EMA55",
    "EMA89",
    "SMA50",
    "SMA100",
    "SMA200",
    "ADX",
    "Stoch.K",
    "ATR",
    "relative_volume_10d_calc",
    "change",
    "RSI2",
    "RSI2[1]",
    "earnings_release_next_date",
];

// ---------------------------------------------------------------------------
// Server-side predicates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operation {
    #[serde(rename = "greater")]
    Greater,
    #[serde(rename = "less")]
    Less,
    #[serde(rename = "egreater")]
    GreaterOrEqual,
    #[serde(rename = "eless")]
    LessOrEqual,
    #[serde(rename = "in_range")]
    InRange,
    #[serde(rename = "not_in_range")]
    NotInRange,
}

/// One screener filter clause. `right` is a constant, a list, or the name of
/// another field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub left: String,
    pub operation: Operation,
    pub right: Value,
}

impl Predicate {
    pub fn new(left: &str, operation: Operation, right: impl Into<Value>) -> Self {
        Self {
            left: left.to_string(),
            operation,
            right: right.into(),
        }
    }
}

/// Predicates pushed to the screener to shrink the transferred row-set.
///
/// The indicator clauses duplicate the local pipeline; the local pipeline stays
/// authoritative because the remote semantics are not under our control. The
/// action zone needs an absolute difference and has no server-side form.
pub fn server_predicates(direction: Direction, now: DateTime<Utc>) -> Vec<Predicate> {
    use Operation::*;

    let mut preds = vec![
        Predicate::new("type", InRange, json!([bounce::SECURITY_TYPE])),
        Predicate::new("subtype", InRange, json!([bounce::SECURITY_SUBTYPE])),
        Predicate::new("market_cap_basic", Greater, bounce::MIN_MARKET_CAP),
        Predicate::new("average_volume_30d_calc", Greater, bounce::MIN_AVG_VOLUME_30D),
        Predicate::new("exchange", InRange, json!(bounce::EXCHANGES)),
        Predicate::new("ADX", GreaterOrEqual, bounce::ADX_MIN),
    ];

    let (trend_op, stack_op) = match direction {
        Direction::Long => (Greater, Greater),
        Direction::Short => (Less, Less),
    };
    for period in bounce::SMA_PERIODS.iter().rev() {
        preds.push(Predicate::new("close", trend_op, format!("SMA{period}")));
    }
    let emas = bounce::EMA_PERIODS.map(|period| format!("EMA{period}"));
    for pair in emas.windows(2) {
        preds.push(Predicate::new(&pair[0], stack_op, pair[1].as_str()));
    }

    match direction {
        Direction::Long => {
            preds.push(Predicate::new("Stoch.K", LessOrEqual, bounce::STOCH_BULLISH_PULLBACK));
            preds.push(Predicate::new("RSI2[1]", LessOrEqual, bounce::RSI_BULLISH_CROSS_LEVEL));
            preds.push(Predicate::new("RSI2", Greater, bounce::RSI_BULLISH_CROSS_LEVEL));
        }
        Direction::Short => {
            preds.push(Predicate::new("Stoch.K", GreaterOrEqual, bounce::STOCH_BEARISH_PULLBACK));
            preds.push(Predicate::new("RSI2[1]", GreaterOrEqual, bounce::RSI_BEARISH_CROSS_LEVEL));
            preds.push(Predicate::new("RSI2", Less, bounce::RSI_BEARISH_CROSS_LEVEL));
        }
    }

    let window_end = now + chrono::Duration::days(bounce::EARNINGS_BUFFER_DAYS);
    preds.push(Predicate::new(
        "earnings_release_next_date",
        NotInRange,
        json!([now.timestamp(), window_end.timestamp()]),
    ));

    preds
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ScanRequest<'a> {
    markets: [&'a str; 1],
    symbols: Value,
    options: Value,
    columns: &'a [&'a str],
    filter: &'a [Predicate],
    range: [usize; 2],
}

#[derive(Debug, Deserialize)]
struct ScanResponse {
    #[serde(rename = "totalCount", default)]
    total_count: usize,
    #[serde(default)]
    data: Option<Vec<ScanItem>>,
}

#[derive(Debug, Deserialize)]
pub struct ScanItem {
    /// Exchange-qualified ticker.
    pub s: String,
    /// Values in `FIELDS` order.
    pub d: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Anything that can produce one snapshot per run.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, direction: Direction) -> Result<Snapshot>;
}

/// Client for the remote screener's scan endpoint.
pub struct ScreenerClient {
    client: reqwest::Client,
    api_url: String,
    row_limit: usize,
}

impl ScreenerClient {
    pub fn new(api_url: &str, row_limit: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            row_limit,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(&cfg.api_url, cfg.row_limit)
    }

    async fn query(&self, filter: &[Predicate]) -> Result<Snapshot> {
        let url = format!("{}/{}/scan", self.api_url, MARKET);
        let body = ScanRequest {
            markets: [MARKET],
            symbols: json!({ "query": { "types": [] }, "tickers": [] }),
            options: json!({ "lang": "en" }),
            columns: FIELDS,
            filter,
            range: [0, self.row_limit],
        };
        debug!(url = %url, predicates = filter.len(), "Querying screener");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let text = resp.text().await?;
        let parsed: ScanResponse = serde_json::from_str(&text).map_err(|e| {
            AppError::Fetch(format!("unexpected screener response ({e})"))
        })?;

        let rows: Vec<SnapshotRow> = parsed.data.unwrap_or_default().iter().map(parse_row).collect();
        Ok(Snapshot {
            total_count: parsed.total_count.max(rows.len()),
            rows,
        })
    }
}

#[async_trait]
impl SnapshotSource for ScreenerClient {
    async fn fetch(&self, direction: Direction) -> Result<Snapshot> {
        let filter = server_predicates(direction, Utc::now());
        let snapshot = self.query(&filter).await?;
        info!(
            rows = snapshot.rows.len(),
            total_count = snapshot.total_count,
            direction = %direction,
            "Screener returned {} rows ({} matched server-side)",
            snapshot.rows.len(),
            snapshot.total_count,
        );
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Row parsing
// ---------------------------------------------------------------------------

/// Map a positional screener item onto a `SnapshotRow`, coercing every numeric
/// field. Values that do not coerce become `None`.
pub fn parse_row(item: &ScanItem) -> SnapshotRow {
    let field = |name: &str| {
        FIELDS
            .iter()
            .position(|f| *f == name)
            .and_then(|i| item.d.get(i))
    };
    let num = |name: &str| field(name).and_then(coerce_f64);

    let symbol = field("name")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            item.s
                .rsplit(':')
                .next()
                .unwrap_or(item.s.as_str())
                .to_string()
        });

    SnapshotRow {
        symbol,
        ticker: item.s.clone(),
        close: num("close"),
        ema8: num("EMA8"),
        ema21: num("EMA21"),
        ema34: num("EMA34"),
        ema55: num("EMA55"),
        ema89: num("EMA89"),
        sma50: num("SMA50"),
        sma100: num("SMA100"),
        sma200: num("SMA200"),
        adx: num("ADX"),
        stoch_k: num("Stoch.K"),
        atr: num("ATR"),
        relative_volume: num("relative_volume_10d_calc"),
        change_pct: num("change"),
        rsi2: num("RSI2"),
        rsi2_prev: num("RSI2[1]"),
        earnings_next: field("earnings_release_next_date").and_then(coerce_timestamp),
    }
}

/// Numbers pass through; numeric strings are parsed; anything else, including
/// NaN and infinities, is treated as missing.
pub fn coerce_f64(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Unix seconds → UTC timestamp.
pub fn coerce_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    let secs = coerce_f64(v)?;
    DateTime::<Utc>::from_timestamp(secs.trunc() as i64, 0)
}
