pub mod rules;

#[cfg(test)]
pub(crate) mod fixtures;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::types::{Direction, SnapshotRow};

/// Pipeline stages in execution order. The rules are independent, so the order
/// only affects diagnostics and where an empty set short-circuits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    TrendStrength,
    EmaStack,
    Pullback,
    ActionZone,
    Earnings,
    RsiTrigger,
}

impl Stage {
    pub const ORDER: [Stage; 6] = [
        Stage::TrendStrength,
        Stage::EmaStack,
        Stage::Pullback,
        Stage::ActionZone,
        Stage::Earnings,
        Stage::RsiTrigger,
    ];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::TrendStrength => "trend_strength",
            Stage::EmaStack => "ema_stack",
            Stage::Pullback => "pullback",
            Stage::ActionZone => "action_zone",
            Stage::Earnings => "earnings",
            Stage::RsiTrigger => "rsi_trigger",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOutcome {
    pub stage: Stage,
    pub input: usize,
    pub retained: usize,
}

impl StageOutcome {
    pub fn rejected(&self) -> usize {
        self.input - self.retained
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub input: usize,
    /// One entry per stage that actually ran.
    pub stages: Vec<StageOutcome>,
    /// Stage that reduced the set to nothing, if any.
    pub emptied_at: Option<Stage>,
}

impl PipelineStats {
    pub fn retained(&self) -> usize {
        self.stages.last().map(|s| s.retained).unwrap_or(self.input)
    }
}

/// Applies the Bounce 2.0 rules for one direction against a fixed `now`.
#[derive(Debug, Clone, Copy)]
pub struct FilterPipeline {
    direction: Direction,
    now: DateTime<Utc>,
}

impl FilterPipeline {
    pub fn new(direction: Direction) -> Self {
        Self::at(direction, Utc::now())
    }

    /// Pin the clock used by the earnings rule.
    pub fn at(direction: Direction, now: DateTime<Utc>) -> Self {
        Self { direction, now }
    }

    pub fn retains(&self, stage: Stage, row: &SnapshotRow) -> bool {
        match stage {
            Stage::TrendStrength => rules::trend_and_strength(row, self.direction),
            Stage::EmaStack => rules::ema_stacked(row, self.direction),
            Stage::Pullback => rules::pulled_back(row, self.direction),
            Stage::ActionZone => rules::in_action_zone(row),
            Stage::Earnings => rules::clear_of_earnings(row, self.now),
            Stage::RsiTrigger => rules::rsi_triggered(row, self.direction),
        }
    }

    /// Run a single stage. Consumes the input and returns the survivors; clone
    /// first to keep the unfiltered set.
    pub fn apply(&self, stage: Stage, rows: Vec<SnapshotRow>) -> Vec<SnapshotRow> {
        if rows.is_empty() {
            return rows;
        }
        rows.into_iter()
            .filter(|row| {
                let keep = self.retains(stage, row);
                if !keep {
                    debug!(ticker = %row.ticker, stage = %stage, "[FILTER] rejected");
                }
                keep
            })
            .collect()
    }

    /// Run every stage in order, stopping early once nothing is left.
    pub fn run(&self, rows: Vec<SnapshotRow>) -> (Vec<SnapshotRow>, PipelineStats) {
        let mut stats = PipelineStats {
            input: rows.len(),
            ..Default::default()
        };
        let mut rows = rows;

        for stage in Stage::ORDER {
            if rows.is_empty() {
                break;
            }
            let input = rows.len();
            rows = self.apply(stage, rows);
            let outcome = StageOutcome {
                stage,
                input,
                retained: rows.len(),
            };
            info!(
                stage = %outcome.stage,
                input = outcome.input,
                retained = outcome.retained,
                "[FILTER] {}: {} -> {} ({} rejected)",
                outcome.stage,
                outcome.input,
                outcome.retained,
                outcome.rejected(),
            );
            stats.stages.push(outcome);

            if rows.is_empty() {
                stats.emptied_at = Some(stage);
                info!("[FILTER] no rows left after {stage}; skipping remaining stages");
            }
        }

        (rows, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::{long_row, short_row};

    #[test]
    fn good_long_row_survives_every_stage() {
        let pipeline = FilterPipeline::new(Direction::Long);
        let (rows, stats) = pipeline.run(vec![long_row()]);
        assert_eq!(rows.len(), 1);
        assert_eq!(stats.stages.len(), Stage::ORDER.len());
        assert_eq!(stats.retained(), 1);
        assert!(stats.emptied_at.is_none());
    }

    #[test]
    fn good_short_row_survives_every_stage() {
        let pipeline = FilterPipeline::new(Direction::Short);
        let (rows, _) = pipeline.run(vec![short_row(), long_row()]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "WEAK_STOCK");
    }

    #[test]
    fn empty_input_runs_no_stages() {
        let (rows, stats) = FilterPipeline::new(Direction::Long).run(Vec::new());
        assert!(rows.is_empty());
        assert!(stats.stages.is_empty());
        assert_eq!(stats.retained(), 0);
    }

    #[test]
    fn short_circuits_after_emptying_stage() {
        let mut row = long_row();
        row.stoch_k = Some(80.0);
        let (rows, stats) = FilterPipeline::new(Direction::Long).run(vec![row]);
        assert!(rows.is_empty());
        assert_eq!(stats.emptied_at, Some(Stage::Pullback));
        assert_eq!(stats.stages.len(), 3);
        assert_eq!(stats.stages[2].rejected(), 1);
    }

    #[test]
    fn apply_on_empty_input_is_a_no_op() {
        let pipeline = FilterPipeline::new(Direction::Long);
        for stage in Stage::ORDER {
            assert!(pipeline.apply(stage, Vec::new()).is_empty());
        }
    }

    #[test]
    fn stage_order_does_not_change_the_result() {
        let pipeline = FilterPipeline::new(Direction::Long);
        let mut slow = long_row();
        slow.symbol = "SLOW".to_string();
        slow.rsi2 = Some(8.0);
        let mut late = long_row();
        late.symbol = "LATE".to_string();
        late.atr = Some(10.0);
        let input = vec![long_row(), slow, late];

        let (forward, _) = pipeline.run(input.clone());
        let mut reversed = input;
        for stage in Stage::ORDER.iter().rev() {
            reversed = pipeline.apply(*stage, reversed);
        }
        assert_eq!(forward, reversed);
        assert_eq!(forward.len(), 1);
    }

    #[test]
    fn earnings_stage_uses_pinned_clock() {
        let now = Utc::now();
        let mut row = long_row();
        row.earnings_next = Some(now + chrono::Duration::days(5));
        let pipeline = FilterPipeline::at(Direction::Long, now);
        assert!(!pipeline.retains(Stage::Earnings, &row));
        let later = FilterPipeline::at(Direction::Long, now + chrono::Duration::days(6));
        assert!(later.retains(Stage::Earnings, &row));
    }

    #[test]
    fn caller_copy_is_untouched() {
        let input = vec![long_row(), short_row()];
        let (rows, _) = FilterPipeline::new(Direction::Long).run(input.clone());
        assert_eq!(rows.len(), 1);
        assert_eq!(input.len(), 2);
    }
}
