use tracing::info;

use crate::config::bounce;
use crate::error::Result;
use crate::sink::OutputSink;
use crate::types::{Direction, ScanMetadata, SnapshotRow};

/// Output schema, in column order.
pub const COLUMNS: [&str; 20] = [
    "name",
    "close",
    "SMA50",
    "SMA100",
    "SMA200",
    "EMA8",
    "EMA21",
    "EMA34",
    "EMA55",
    "EMA89",
    "ATR",
    "ADX",
    "Stoch.K",
    "RSI2",
    "RSI2[1]",
    "relative_volume_10d_calc",
    "change",
    "signal_direction",
    "target_conservative",
    "target_stretch",
];

/// `(conservative, stretch)` targets: EMA21 pushed 2 and 3 ATRs in the trade direction.
pub fn targets(ema21: f64, atr: f64, direction: Direction) -> (f64, f64) {
    let sign = direction.sign();
    (
        ema21 + sign * bounce::TARGET_CONSERVATIVE_ATR * atr,
        ema21 + sign * bounce::TARGET_STRETCH_ATR * atr,
    )
}

/// A surviving row plus its derived columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub row: SnapshotRow,
    pub signal_direction: Direction,
    pub target_conservative: Option<f64>,
    pub target_stretch: Option<f64>,
}

impl Candidate {
    pub fn new(row: SnapshotRow, direction: Direction) -> Self {
        let (target_conservative, target_stretch) = match (row.ema21, row.atr) {
            (Some(ema21), Some(atr)) => {
                let (c, s) = targets(ema21, atr, direction);
                (Some(c), Some(s))
            }
            _ => (None, None),
        };
        Self {
            row,
            signal_direction: direction,
            target_conservative,
            target_stretch,
        }
    }

    /// Cell values in `COLUMNS` order. `precision` rounds numbers for display;
    /// `None` keeps full precision. Missing values render empty.
    pub fn cells(&self, precision: Option<usize>) -> Vec<String> {
        let num = |v: Option<f64>| match (v, precision) {
            (Some(v), Some(p)) => format!("{v:.p$}"),
            (Some(v), None) => v.to_string(),
            (None, _) => String::new(),
        };
        let r = &self.row;
        vec![
            r.symbol.clone(),
            num(r.close),
            num(r.sma50),
            num(r.sma100),
            num(r.sma200),
            num(r.ema8),
            num(r.ema21),
            num(r.ema34),
            num(r.ema55),
            num(r.ema89),
            num(r.atr),
            num(r.adx),
            num(r.stoch_k),
            num(r.rsi2),
            num(r.rsi2_prev),
            num(r.relative_volume),
            num(r.change_pct),
            self.signal_direction.label().to_string(),
            num(self.target_conservative),
            num(self.target_stretch),
        ]
    }
}

/// Final result of a run, ready for a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub direction: Direction,
    pub candidates: Vec<Candidate>,
}

impl ResultTable {
    pub fn new(rows: Vec<SnapshotRow>, direction: Direction) -> Self {
        Self {
            direction,
            candidates: rows.into_iter().map(|r| Candidate::new(r, direction)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn headers(&self) -> &'static [&'static str] {
        &COLUMNS
    }

    pub fn records(&self, precision: Option<usize>) -> Vec<Vec<String>> {
        self.candidates.iter().map(|c| c.cells(precision)).collect()
    }
}

/// Projects filtered rows and hands them to the configured sink.
pub struct Reporter<'a> {
    sink: &'a dyn OutputSink,
}

impl<'a> Reporter<'a> {
    pub fn new(sink: &'a dyn OutputSink) -> Self {
        Self { sink }
    }

    /// Returns the number of candidates delivered. An empty table never reaches
    /// the sink.
    pub async fn report(
        &self,
        rows: Vec<SnapshotRow>,
        direction: Direction,
        metadata: Option<&ScanMetadata>,
    ) -> Result<usize> {
        let table = ResultTable::new(rows, direction);
        if table.is_empty() {
            info!("No stocks found after filtering to write to output.");
            return Ok(0);
        }

        info!(
            candidates = table.len(),
            sink = self.sink.name(),
            "Handing {} {} candidates to {} sink",
            table.len(),
            direction.label(),
            self.sink.name(),
        );
        self.sink.write(&table, metadata).await?;
        Ok(table.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::{long_row, short_row};
    use crate::sink::testing::RecordingSink;

    #[test]
    fn long_targets_add_atr_multiples() {
        assert_eq!(targets(670.0, 30.0, Direction::Long), (730.0, 760.0));
    }

    #[test]
    fn short_targets_subtract_atr_multiples() {
        assert_eq!(targets(530.0, 30.0, Direction::Short), (470.0, 440.0));
    }

    #[test]
    fn candidate_carries_label_and_targets() {
        let c = Candidate::new(long_row(), Direction::Long);
        assert_eq!(c.target_conservative, Some(730.0));
        assert_eq!(c.target_stretch, Some(760.0));

        let cells = c.cells(None);
        assert_eq!(cells.len(), COLUMNS.len());
        assert_eq!(cells[0], "GOOD_STOCK");
        assert_eq!(cells[1], "700");
        assert_eq!(cells[17], "LONG");
        assert_eq!(cells[18], "730");
        assert_eq!(cells[19], "760");
    }

    #[test]
    fn display_cells_are_rounded_and_missing_is_blank() {
        let mut row = short_row();
        row.relative_volume = None;
        row.change_pct = Some(-1.23456);
        let cells = Candidate::new(row, Direction::Short).cells(Some(2));
        assert_eq!(cells[15], "");
        assert_eq!(cells[16], "-1.23");
        assert_eq!(cells[17], "SHORT");
        assert_eq!(cells[18], "470.00");
        assert_eq!(cells[19], "440.00");
    }

    #[test]
    fn targets_absent_without_atr() {
        let mut row = long_row();
        row.atr = None;
        let c = Candidate::new(row, Direction::Long);
        assert_eq!(c.target_conservative, None);
        assert_eq!(c.target_stretch, None);
    }

    #[tokio::test]
    async fn report_skips_sink_when_nothing_survived() {
        let sink = RecordingSink::default();
        let delivered = Reporter::new(&sink)
            .report(Vec::new(), Direction::Long, None)
            .await
            .unwrap();
        assert_eq!(delivered, 0);
        assert_eq!(sink.write_count(), 0);
    }

    #[tokio::test]
    async fn report_writes_table_with_metadata() {
        let sink = RecordingSink::default();
        let meta = ScanMetadata::new().with("Direction", "LONG");
        let delivered = Reporter::new(&sink)
            .report(vec![long_row()], Direction::Long, Some(&meta))
            .await
            .unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(sink.write_count(), 1);
        let (table, seen_meta) = sink.last_write().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(seen_meta, Some(meta));
    }
}
