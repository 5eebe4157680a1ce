use chrono::Local;
use tracing::info;

use crate::error::Result;
use crate::fetcher::SnapshotSource;
use crate::pipeline::{FilterPipeline, PipelineStats};
use crate::reporter::Reporter;
use crate::sink::OutputSink;
use crate::types::{Direction, ScanMetadata, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The screener returned nothing; the pipeline never ran.
    EmptySnapshot,
    /// Rows were fetched but none survived the pipeline.
    NoCandidates,
    /// This many candidates were handed to the sink.
    Delivered(usize),
}

/// One fetch → filter → report pass.
pub struct Scanner<'a> {
    source: &'a dyn SnapshotSource,
    sink: &'a dyn OutputSink,
    direction: Direction,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a dyn SnapshotSource, sink: &'a dyn OutputSink, direction: Direction) -> Self {
        Self { source, sink, direction }
    }

    pub async fn run(&self) -> Result<ScanOutcome> {
        info!(direction = %self.direction, sink = self.sink.name(), "Starting Bounce 2.0 scan");

        let snapshot = self.source.fetch(self.direction).await?;
        if snapshot.is_empty() {
            info!("No stocks currently meet the Bounce 2.0 criteria.");
            return Ok(ScanOutcome::EmptySnapshot);
        }
        info!("Fetched {}", describe(&snapshot));

        let fetched = snapshot.rows.len();
        let total_count = snapshot.total_count;
        let (rows, stats) = FilterPipeline::new(self.direction).run(snapshot.rows);
        if let Some(stage) = stats.emptied_at {
            info!(stage = %stage, "Last remaining rows were rejected at {stage}");
        }
        let metadata = scan_metadata(self.direction, fetched, total_count, &stats);

        let delivered = Reporter::new(self.sink)
            .report(rows, self.direction, Some(&metadata))
            .await?;

        Ok(match delivered {
            0 => ScanOutcome::NoCandidates,
            n => ScanOutcome::Delivered(n),
        })
    }
}

fn scan_metadata(
    direction: Direction,
    fetched: usize,
    total_count: usize,
    stats: &PipelineStats,
) -> ScanMetadata {
    let funnel = std::iter::once(stats.input)
        .chain(stats.stages.iter().map(|s| s.retained))
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" → ");

    ScanMetadata::new()
        .with("Direction", direction.label())
        .with("Generated at", Local::now().format("%Y-%m-%d %H:%M:%S %Z"))
        .with("Rows fetched", fetched)
        .with("Server-side matches", total_count)
        .with("Filter funnel", funnel)
        .with("Candidates", stats.retained())
}

/// Summarise a snapshot for the startup log.
pub fn describe(snapshot: &Snapshot) -> String {
    let truncated = snapshot.total_count > snapshot.rows.len();
    format!(
        "{} rows{}",
        snapshot.rows.len(),
        if truncated {
            format!(" (of {} matches; raise SCANNER_ROW_LIMIT to fetch more)", snapshot.total_count)
        } else {
            String::new()
        }
    )
}
