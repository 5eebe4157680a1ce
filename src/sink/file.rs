use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use tracing::info;

use crate::config::FILE_PREFIX;
use crate::error::{AppError, Result};
use crate::reporter::ResultTable;
use crate::sink::OutputSink;
use crate::types::ScanMetadata;

/// `tao_scan_20261016.csv`
pub fn file_name_for(date: NaiveDate) -> String {
    format!("{FILE_PREFIX}_{}.csv", date.format("%Y%m%d"))
}

/// Writes one CSV per calendar day into a directory. Same-day runs overwrite.
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if dir.as_os_str().is_empty() {
            return Err(AppError::Config(
                "Missing 'path' for 'file' output type".to_string(),
            ));
        }
        Ok(Self { dir: dir.to_path_buf() })
    }

    /// Target path for the given day.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(file_name_for(date))
    }

    fn write_csv(&self, table: &ResultTable, path: &Path) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(table.headers())?;
        for record in table.records(None) {
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl OutputSink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn write(&self, table: &ResultTable, _metadata: Option<&ScanMetadata>) -> Result<()> {
        if table.is_empty() {
            info!("No candidates found. Skipping file write.");
            return Ok(());
        }

        let path = self.path_for(Local::now().date_naive());
        self.write_csv(table, &path)?;
        info!(
            path = %path.display(),
            "Scan complete. {} candidates found. Saved to {}.",
            table.len(),
            path.display(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::{long_row, short_row};
    use crate::reporter::COLUMNS;
    use crate::types::Direction;

    #[test]
    fn missing_path_is_a_config_error() {
        let err = FileSink::new("").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn file_name_uses_compact_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(file_name_for(date), "tao_scan_20260307.csv");
    }

    #[tokio::test]
    async fn writes_header_and_rows_without_index() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path()).unwrap();
        let table = ResultTable::new(vec![long_row()], Direction::Long);

        sink.write(&table, None).await.unwrap();

        let path = sink.path_for(Local::now().date_naive());
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, COLUMNS.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "GOOD_STOCK");
        assert_eq!(&rows[0][17], "LONG");
        assert_eq!(&rows[0][18], "730");
    }

    #[tokio::test]
    async fn same_day_runs_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path()).unwrap();

        let first = ResultTable::new(vec![long_row(), long_row()], Direction::Long);
        sink.write(&first, None).await.unwrap();
        let second = ResultTable::new(vec![short_row()], Direction::Short);
        sink.write(&second, None).await.unwrap();

        let path = sink.path_for(Local::now().date_naive());
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "WEAK_STOCK");
    }

    #[tokio::test]
    async fn empty_table_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path()).unwrap();
        let table = ResultTable::new(Vec::new(), Direction::Long);

        sink.write(&table, None).await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
