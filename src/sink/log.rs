use async_trait::async_trait;
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::info;

use crate::error::Result;
use crate::reporter::ResultTable;
use crate::sink::OutputSink;
use crate::types::ScanMetadata;

/// Writes the result table to the diagnostic log.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    /// Left-aligned, borderless columns with numbers rounded to 2 decimals.
    pub fn render(table: &ResultTable) -> String {
        let mut builder = Builder::default();
        builder.push_record(table.headers().iter().map(|h| h.to_string()));
        for record in table.records(Some(2)) {
            builder.push_record(record);
        }
        builder.build().with(Style::blank()).to_string()
    }
}

#[async_trait]
impl OutputSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn write(&self, table: &ResultTable, metadata: Option<&ScanMetadata>) -> Result<()> {
        if table.is_empty() {
            info!("No candidates found.");
            return Ok(());
        }

        if let Some(meta) = metadata {
            for (key, value) in meta.entries() {
                info!("{key}: {value}");
            }
        }
        info!(
            candidates = table.len(),
            "Bounce 2.0 {} candidates ({}):\n{}",
            table.direction.label(),
            table.len(),
            Self::render(table),
        );
        Ok(())
    }
}
