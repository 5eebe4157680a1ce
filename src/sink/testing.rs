use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::reporter::ResultTable;
use crate::sink::OutputSink;
use crate::types::ScanMetadata;

/// Sink that remembers every write.
#[derive(Default)]
pub struct RecordingSink {
    writes: Mutex<Vec<(ResultTable, Option<ScanMetadata>)>>,
}

impl RecordingSink {
    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn last_write(&self) -> Option<(ResultTable, Option<ScanMetadata>)> {
        self.writes.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl OutputSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn write(&self, table: &ResultTable, metadata: Option<&ScanMetadata>) -> Result<()> {
        self.writes
            .lock()
            .unwrap()
            .push((table.clone(), metadata.cloned()));
        Ok(())
    }
}
