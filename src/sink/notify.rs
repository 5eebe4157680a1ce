use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use tracing::{error, info};

use crate::config::{NOTIFY_SUBJECT_PREFIX, SNS_SUBJECT_MAX_LEN};
use crate::error::{AppError, Result};
use crate::reporter::ResultTable;
use crate::sink::format::markdown_table;
use crate::sink::publisher::Publisher;
use crate::sink::OutputSink;
use crate::types::ScanMetadata;

pub const FOOTER: &str =
    "_Generated automatically by the Bounce 2.0 scanner. Not financial advice._";

/// `Tao Bounce Scan Results - 2026-10-16 (3 candidates)`, capped at the SNS limit.
pub fn subject_for(date: NaiveDate, candidates: usize) -> String {
    let subject = format!(
        "{NOTIFY_SUBJECT_PREFIX} Results - {} ({candidates} candidates)",
        date.format("%Y-%m-%d")
    );
    subject.chars().take(SNS_SUBJECT_MAX_LEN).collect()
}

/// Markdown message: header, optional metadata bullets, result table, footer.
pub fn body_for(date: NaiveDate, table: &ResultTable, metadata: Option<&ScanMetadata>) -> String {
    let mut out = format!(
        "# {NOTIFY_SUBJECT_PREFIX} Results - {}\n\n",
        date.format("%Y-%m-%d")
    );

    if let Some(meta) = metadata.filter(|m| !m.is_empty()) {
        out.push_str("## Scan Details\n\n");
        for (key, value) in meta.entries() {
            out.push_str(&format!("- **{key}**: {value}\n"));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "## {} Candidates ({})\n\n",
        table.direction.label(),
        table.len()
    ));
    out.push_str(&markdown_table(table.headers(), &table.records(Some(2))));
    out.push_str("\n\n---\n");
    out.push_str(FOOTER);
    out.push('\n');
    out
}

/// Publishes the result table to a notification topic. Delivery failures are
/// logged and swallowed.
pub struct NotifySink {
    topic_id: String,
    publisher: Box<dyn Publisher>,
}

impl NotifySink {
    pub fn new(topic_id: &str, publisher: Box<dyn Publisher>) -> Result<Self> {
        let topic_id = topic_id.trim();
        if topic_id.is_empty() {
            return Err(AppError::Config(
                "Missing notification topic id for 'notify' output type".to_string(),
            ));
        }
        Ok(Self {
            topic_id: topic_id.to_string(),
            publisher,
        })
    }
}

#[async_trait]
impl OutputSink for NotifySink {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn write(&self, table: &ResultTable, metadata: Option<&ScanMetadata>) -> Result<()> {
        if table.is_empty() {
            info!("No candidates found. Skipping notification.");
            return Ok(());
        }

        let today = Local::now().date_naive();
        let subject = subject_for(today, table.len());
        let body = body_for(today, table, metadata);

        match self.publisher.publish(&self.topic_id, &subject, &body).await {
            Ok(message_id) => info!(
                topic = %self.topic_id,
                message_id = %message_id,
                "Notification sent. Message ID: {message_id}"
            ),
            Err(e) => error!(topic = %self.topic_id, "Failed to send notification: {e}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::long_row;
    use crate::types::Direction;
    use std::sync::{Arc, Mutex};

    /// Records every publish; optionally fails them all.
    #[derive(Clone, Default)]
    struct FakePublisher {
        sent: Arc<Mutex<Vec<(String, String, String)>>>,
        fail: bool,
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        async fn publish(&self, topic_id: &str, subject: &str, message: &str) -> Result<String> {
            self.sent.lock().unwrap().push((
                topic_id.to_string(),
                subject.to_string(),
                message.to_string(),
            ));
            if self.fail {
                Err(AppError::Publish("AWS Error".to_string()))
            } else {
                Ok("msg-1".to_string())
            }
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn missing_topic_is_a_config_error() {
        let err = NotifySink::new("  ", Box::new(FakePublisher::default())).err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn subject_follows_template() {
        assert_eq!(
            subject_for(date(), 3),
            "Tao Bounce Scan Results - 2026-10-16 (3 candidates)"
        );
    }

    #[test]
    fn body_has_header_metadata_table_and_footer() {
        let table = ResultTable::new(vec![long_row()], Direction::Long);
        let meta = ScanMetadata::new().with("Direction", "LONG").with("Rows fetched", 12);
        let body = body_for(date(), &table, Some(&meta));

        assert!(body.starts_with("# Tao Bounce Scan Results - 2026-10-16\n"));
        assert!(body.contains("- **Direction**: LONG\n"));
        assert!(body.contains("- **Rows fetched**: 12\n"));
        assert!(body.contains("| name | close |"));
        assert!(body.contains("| GOOD_STOCK | 700.00 |"));
        assert!(body.trim_end().ends_with(FOOTER));
    }

    #[test]
    fn body_without_metadata_skips_details() {
        let table = ResultTable::new(vec![long_row()], Direction::Long);
        let body = body_for(date(), &table, None);
        assert!(!body.contains("Scan Details"));
    }

    #[tokio::test]
    async fn publishes_when_table_has_rows() {
        let publisher = FakePublisher::default();
        let sink = NotifySink::new("arn:aws:sns:us-east-1:1:t", Box::new(publisher.clone())).unwrap();
        let table = ResultTable::new(vec![long_row(), long_row()], Direction::Long);

        sink.write(&table, None).await.unwrap();

        let sent = publisher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "arn:aws:sns:us-east-1:1:t");
        assert!(sent[0].1.ends_with("(2 candidates)"));
        assert!(sent[0].2.contains("GOOD_STOCK"));
    }

    #[tokio::test]
    async fn skips_publish_when_table_is_empty() {
        let publisher = FakePublisher::default();
        let sink = NotifySink::new("topic", Box::new(publisher.clone())).unwrap();
        let table = ResultTable::new(Vec::new(), Direction::Long);

        sink.write(&table, None).await.unwrap();
        assert!(publisher.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn publish_failure_does_not_propagate() {
        let publisher = FakePublisher {
            fail: true,
            ..Default::default()
        };
        let sink = NotifySink::new("topic", Box::new(publisher.clone())).unwrap();
        let table = ResultTable::new(vec![long_row()], Direction::Long);

        assert!(sink.write(&table, None).await.is_ok());
        assert_eq!(publisher.sent.lock().unwrap().len(), 1);
    }
}
