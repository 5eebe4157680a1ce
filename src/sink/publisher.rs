use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::config::{AwsCredentials, HTTP_TIMEOUT_SECS};
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

const SNS_API_VERSION: &str = "2010-03-31";
const SERVICE: &str = "sns";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Delivers a message to a pub/sub topic, returning the broker's message id.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic_id: &str, subject: &str, message: &str) -> Result<String>;
}

/// Publishes through the SNS query API, signed with AWS Signature V4.
pub struct SnsPublisher {
    client: reqwest::Client,
    region: String,
    endpoint: Url,
    /// `None` makes every publish fail with `AppError::Publish`.
    credentials: Option<AwsCredentials>,
}

impl SnsPublisher {
    pub fn new(
        region: &str,
        endpoint: Option<&str>,
        credentials: Option<AwsCredentials>,
    ) -> Result<Self> {
        if region.trim().is_empty() {
            return Err(AppError::Config("Missing region for notification publisher".to_string()));
        }
        let raw = endpoint
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://sns.{region}.amazonaws.com/"));
        let endpoint = Url::parse(&raw)
            .map_err(|e| AppError::Config(format!("Invalid SNS endpoint '{raw}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            region: region.to_string(),
            endpoint,
            credentials,
        })
    }

    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

#[async_trait]
impl Publisher for SnsPublisher {
    async fn publish(&self, topic_id: &str, subject: &str, message: &str) -> Result<String> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            AppError::Publish("AWS credentials are not configured".to_string())
        })?;

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "Publish")
            .append_pair("Version", SNS_API_VERSION)
            .append_pair("TopicArn", topic_id)
            .append_pair("Subject", subject)
            .append_pair("Message", message)
            .finish();

        let signed = sign_request(&SigningInput {
            credentials,
            region: &self.region,
            host: &self.host(),
            path: self.endpoint.path(),
            body: &body,
            now: Utc::now(),
        });

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", FORM_CONTENT_TYPE)
            .header("x-amz-date", &signed.amz_date)
            .header("authorization", &signed.authorization);
        if let Some(token) = &credentials.session_token {
            request = request.header("x-amz-security-token", token);
        }
        debug!(endpoint = %self.endpoint, topic = topic_id, "Publishing notification");

        let resp = request.body(body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            let detail = extract_tag(&text, "Message").unwrap_or(text.trim());
            return Err(AppError::Publish(format!("SNS returned {status}: {detail}")));
        }

        extract_tag(&text, "MessageId")
            .map(str::to_string)
            .ok_or_else(|| AppError::Publish("SNS response had no MessageId".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Signature V4
// ---------------------------------------------------------------------------

pub struct SigningInput<'a> {
    pub credentials: &'a AwsCredentials,
    pub region: &'a str,
    pub host: &'a str,
    pub path: &'a str,
    pub body: &'a str,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub amz_date: String,
    pub authorization: String,
}

/// Sign a form-encoded POST. Signs content-type, host, x-amz-date and, when
/// present, the session token.
pub fn sign_request(input: &SigningInput<'_>) -> SignedHeaders {
    let amz_date = input.now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = input.now.format("%Y%m%d").to_string();
    let scope = format!("{date}/{}/{SERVICE}/aws4_request", input.region);

    let mut headers = vec![
        ("content-type", FORM_CONTENT_TYPE.to_string()),
        ("host", input.host.to_string()),
        ("x-amz-date", amz_date.clone()),
    ];
    if let Some(token) = &input.credentials.session_token {
        headers.push(("x-amz-security-token", token.clone()));
    }
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{k}:{}\n", v.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(k, _)| *k)
        .collect::<Vec<_>>()
        .join(";");

    let path = if input.path.is_empty() { "/" } else { input.path };
    let canonical_request = format!(
        "POST\n{path}\n\n{canonical_headers}\n{signed_headers}\n{}",
        sha256_hex(input.body.as_bytes())
    );
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(&input.credentials.secret_access_key, &date, input.region, SERVICE);
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    SignedHeaders {
        authorization: format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            input.credentials.access_key_id
        ),
        amz_date,
    }
}

pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Text content of the first `<tag ...>…</tag>` in an SNS query-API response.
/// The opening tag may carry attributes (`xmlns`); namespace prefixes are not
/// handled, SNS does not emit them.
fn extract_tag<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut from = 0;
    loop {
        let at = from + xml[from..].find(&open)?;
        let after = at + open.len();
        match xml[after..].chars().next()? {
            '>' | ' ' | '\t' | '\r' | '\n' => {
                let start = after + xml[after..].find('>')? + 1;
                let end = start + xml[start..].find(&close)?;
                return Some(xml[start..end].trim());
            }
            // `<MessageId>` while looking for `<Message>`
            _ => from = after,
        }
    }
}
