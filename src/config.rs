use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::types::Direction;

pub const SCANNER_API_URL: &str = "https://scanner.tradingview.com";

/// Screener market identifier for US listings.
pub const MARKET: &str = "america";

/// Timeout applied to every outbound HTTP call (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Rows requested from the screener when SCANNER_ROW_LIMIT is unset.
pub const DEFAULT_ROW_LIMIT: usize = 500;

/// CSV files are named `<FILE_PREFIX>_<YYYYMMDD>.csv`.
pub const FILE_PREFIX: &str = "tao_scan";

/// Notification subjects read `<NOTIFY_SUBJECT_PREFIX> Results - <date> (<n> candidates)`.
pub const NOTIFY_SUBJECT_PREFIX: &str = "Tao Bounce Scan";

/// SNS rejects subjects longer than this.
pub const SNS_SUBJECT_MAX_LEN: usize = 100;

/// Bounce 2.0 rule set. Fixed at compile time; only the direction varies per run.
pub mod bounce {
    /// Liquidity floor, applied server-side only.
    pub const MIN_MARKET_CAP: f64 = 1_000_000_000.0;
    pub const MIN_AVG_VOLUME_30D: f64 = 500_000.0;

    pub const EXCHANGES: &[&str] = &["NYSE", "NASDAQ"];
    pub const SECURITY_TYPE: &str = "stock";
    pub const SECURITY_SUBTYPE: &str = "common";

    /// Minimum ADX for a trend to count as strong.
    pub const ADX_MIN: f64 = 20.0;

    /// Long pullbacks need stoch %K at or below this.
    pub const STOCH_BULLISH_PULLBACK: f64 = 40.0;
    /// Short pullbacks need stoch %K at or above this.
    pub const STOCH_BEARISH_PULLBACK: f64 = 60.0;

    /// RSI(2) must cross up through this level for a long trigger.
    pub const RSI_BULLISH_CROSS_LEVEL: f64 = 10.0;
    /// RSI(2) must cross down through this level for a short trigger.
    pub const RSI_BEARISH_CROSS_LEVEL: f64 = 90.0;

    /// Rows with earnings inside this many days from now are dropped.
    pub const EARNINGS_BUFFER_DAYS: i64 = 14;

    pub const EMA_PERIODS: [u32; 5] = [8, 21, 34, 55, 89];
    pub const SMA_PERIODS: [u32; 3] = [50, 100, 200];

    /// ATR multiples added to (long) or subtracted from (short) EMA21.
    pub const TARGET_CONSERVATIVE_ATR: f64 = 2.0;
    pub const TARGET_STRETCH_ATR: f64 = 3.0;
}

/// Where the result table goes. Each variant carries exactly the fields its sink needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Log,
    File { dir: PathBuf },
    Notify { topic_id: String, region: String },
}

impl OutputTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            OutputTarget::Log => "log",
            OutputTarget::File { .. } => "file",
            OutputTarget::Notify { .. } => "notify",
        }
    }
}

/// Static AWS credentials for the notification publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output: OutputTarget,
    pub direction: Direction,
    pub api_url: String,
    /// Upper bound on rows requested from the screener (SCANNER_ROW_LIMIT)
    pub row_limit: usize,
    /// Overrides the regional SNS endpoint (SNS_ENDPOINT_URL), e.g. for localstack
    pub sns_endpoint: Option<String>,
    /// `None` unless both AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY are set
    pub aws_credentials: Option<AwsCredentials>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. All validation happens here, so a
    /// `Config` value is always internally consistent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let output_type = get("OUTPUT_TYPE")
            .ok_or_else(|| AppError::Config("Missing 'OUTPUT_TYPE'".to_string()))?;

        let output = match output_type.to_lowercase().as_str() {
            "log" => OutputTarget::Log,
            "file" => {
                let dir = get("OUTPUT_PATH").ok_or_else(|| {
                    AppError::Config("Missing 'OUTPUT_PATH' for 'file' output type".to_string())
                })?;
                OutputTarget::File { dir: PathBuf::from(dir) }
            }
            "notify" | "email" => {
                let topic_id = get("NOTIFICATION_TOPIC_ID")
                    .or_else(|| get("SNS_TOPIC_ARN"))
                    .ok_or_else(|| {
                        AppError::Config(format!(
                            "Missing 'NOTIFICATION_TOPIC_ID' for '{output_type}' output type"
                        ))
                    })?;
                let region = get("AWS_REGION")
                    .or_else(|| region_from_arn(&topic_id))
                    .ok_or_else(|| {
                        AppError::Config(format!(
                            "Missing 'AWS_REGION' for '{output_type}' output type"
                        ))
                    })?;
                OutputTarget::Notify { topic_id, region }
            }
            other => {
                return Err(AppError::Config(format!("Invalid output_type: {other}")));
            }
        };

        let direction = match get("DIRECTION") {
            Some(d) => d.parse()?,
            None => Direction::default(),
        };

        let row_limit = match get("SCANNER_ROW_LIMIT") {
            Some(v) => v
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    AppError::Config("SCANNER_ROW_LIMIT must be a positive integer".to_string())
                })?,
            None => DEFAULT_ROW_LIMIT,
        };

        let aws_credentials = match (get("AWS_ACCESS_KEY_ID"), get("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key_id), Some(secret_access_key)) => Some(AwsCredentials {
                access_key_id,
                secret_access_key,
                session_token: get("AWS_SESSION_TOKEN"),
            }),
            _ => None,
        };

        Ok(Self {
            output,
            direction,
            api_url: get("SCANNER_API_URL").unwrap_or_else(|| SCANNER_API_URL.to_string()),
            row_limit,
            sns_endpoint: get("SNS_ENDPOINT_URL"),
            aws_credentials,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// `arn:aws:sns:us-east-1:123456789012:topic` → `us-east-1`.
pub fn region_from_arn(arn: &str) -> Option<String> {
    let mut parts = arn.split(':');
    if parts.next()? != "arn" {
        return None;
    }
    let region = parts.nth(2)?;
    (!region.is_empty()).then(|| region.to_string())
}
