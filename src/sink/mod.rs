pub mod file;
pub mod format;
pub mod log;
pub mod notify;
pub mod publisher;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::config::{Config, OutputTarget};
use crate::error::Result;
use crate::reporter::ResultTable;
use crate::types::ScanMetadata;

pub use file::FileSink;
pub use self::log::LogSink;
pub use notify::NotifySink;
pub use publisher::SnsPublisher;

/// Destination for the final result table.
///
/// Sinks must accept an empty table without failing; callers are expected not
/// to send one.
#[async_trait]
pub trait OutputSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn write(&self, table: &ResultTable, metadata: Option<&ScanMetadata>) -> Result<()>;
}

/// Build the sink selected by the config. Fails before any network or
/// filesystem work when a required field is missing.
pub fn build_sink(cfg: &Config) -> Result<Box<dyn OutputSink>> {
    match &cfg.output {
        OutputTarget::Log => Ok(Box::new(LogSink)),
        OutputTarget::File { dir } => Ok(Box::new(FileSink::new(dir)?)),
        OutputTarget::Notify { topic_id, region } => {
            let publisher = SnsPublisher::new(
                region,
                cfg.sns_endpoint.as_deref(),
                cfg.aws_credentials.clone(),
            )?;
            Ok(Box::new(NotifySink::new(topic_id, Box::new(publisher))?))
        }
    }
}
