//! Trade extraction state machine.
//!
//! Walks a price table with a shrinking working copy:
//! 1. `ScanningForEntry` - evaluate buy criteria, first `Buy` row is the entry
//! 2. `ScanningForExit` - drop history before the entry, evaluate sell
//!    criteria, first `Sell` row is the exit (no sell signal: the first
//!    remaining row)
//! 3. Entry and exit on the same row: drop that single row and rescan
//! 4. Otherwise record the trade, drop history before the exit and rescan
//! 5. `Done` once no buy signal remains
//!
//! Every cycle removes at least one row, so the number of entry scans is
//! bounded by the row count. Going past that bound is reported as
//! [`TraderError::IterationLimit`].

use chrono::NaiveDateTime;
use tracing::{debug, debug_span, warn};

use crate::domain::criteria::{Criteria, Side};
use crate::domain::error::TraderError;
use crate::domain::evaluator::{self, EvaluatorConfig};
use crate::domain::price_table::PriceTable;
use crate::domain::trade::{Trade, TradeParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorState {
    ScanningForEntry,
    ScanningForExit { entry: NaiveDateTime },
    Done,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionConfig {
    /// Inclusive date window applied once before scanning.
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub trade: TradeParams,
    pub evaluator: EvaluatorConfig,
}

/// Extract sequential, non-overlapping trades from `table`.
pub fn execute_trades(
    criteria: &Criteria,
    table: &PriceTable,
    config: &ExtractionConfig,
) -> Result<Vec<Trade>, TraderError> {
    let working = table.between(config.start, config.end);
    let limit = working.len() + 1;
    extract(criteria, working, config, limit)
}

/// Run the state machine on an already windowed table, allowing at most
/// `limit` entry scans.
fn extract(
    criteria: &Criteria,
    mut working: PriceTable,
    config: &ExtractionConfig,
    limit: usize,
) -> Result<Vec<Trade>, TraderError> {
    let _span = debug_span!("execute_trades", rows = working.len()).entered();

    let mut trades = Vec::new();
    let mut entry_scans = 0usize;
    let mut state = ExtractorState::ScanningForEntry;

    loop {
        state = match state {
            ExtractorState::ScanningForEntry => {
                entry_scans += 1;
                if entry_scans > limit {
                    return Err(TraderError::IterationLimit { limit });
                }
                let entry = first_signal(criteria, &mut working, Side::Buy, &config.evaluator)?;
                match entry {
                    Some(entry) => {
                        debug!(%entry, "entry signal");
                        working = working.truncate_from(entry);
                        ExtractorState::ScanningForExit { entry }
                    }
                    None => ExtractorState::Done,
                }
            }
            ExtractorState::ScanningForExit { entry } => {
                let exit = first_signal(criteria, &mut working, Side::Sell, &config.evaluator)?;
                let exit = match exit {
                    Some(exit) => exit,
                    None => {
                        warn!(%entry, "no sell signal, exiting on first remaining row");
                        working.first_timestamp().unwrap_or(entry)
                    }
                };

                if exit == entry {
                    warn!(%entry, "entry and exit on the same row, skipping it");
                    working = working.skip_rows(1);
                } else {
                    let trade = Trade::new(entry, exit, &working, config.trade.clone())?;
                    debug!(%entry, %exit, profit = trade.profit(), "trade recorded");
                    trades.push(trade);
                    working = working.truncate_from(exit);
                }
                ExtractorState::ScanningForEntry
            }
            ExtractorState::Done => break,
        };
    }

    debug!(trades = trades.len(), entry_scans, "extraction finished");
    Ok(trades)
}

/// Evaluate one side on the working table and return the first signalling row.
fn first_signal(
    criteria: &Criteria,
    working: &mut PriceTable,
    side: Side,
    config: &EvaluatorConfig,
) -> Result<Option<NaiveDateTime>, TraderError> {
    let signal = match evaluator::evaluate(criteria.for_side(side), working, side, config)? {
        Some(signal) => signal,
        None => return Ok(None),
    };
    Ok(signal
        .iter()
        .position(|s| *s)
        .map(|i| working.timestamps()[i]))
}
