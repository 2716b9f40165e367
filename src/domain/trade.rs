//! Simulated trade and its profit model.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::domain::error::TraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::price_table::{PriceTable, parse_timestamp};

/// Price scale of one pip.
pub const PIP: f64 = 0.0001;

pub const DEFAULT_TAKE_PROFIT_PIPS: f64 = 30.0;
pub const DEFAULT_STOP_LOSS_PIPS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfitMode {
    /// Profit from the actual exit-bar prices.
    Realized,
    /// Fixed take-profit / stop-loss magnitude.
    #[default]
    Theoretical,
}

impl FromStr for ProfitMode {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "realized" | "r" => Ok(ProfitMode::Realized),
            "theoretical" | "t" => Ok(ProfitMode::Theoretical),
            other => Err(TraderError::InvalidProfitMode {
                mode: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ProfitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitMode::Realized => f.write_str("realized"),
            ProfitMode::Theoretical => f.write_str("theoretical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeParams {
    pub profit_mode: ProfitMode,
    pub take_profit_pips: f64,
    pub stop_loss_pips: f64,
}

impl Default for TradeParams {
    fn default() -> Self {
        TradeParams {
            profit_mode: ProfitMode::Theoretical,
            take_profit_pips: DEFAULT_TAKE_PROFIT_PIPS,
            stop_loss_pips: DEFAULT_STOP_LOSS_PIPS,
        }
    }
}

/// Anything that can name a row of a price table.
pub trait IntoTimestamp {
    fn into_timestamp(self) -> Result<NaiveDateTime, TraderError>;
}

impl IntoTimestamp for NaiveDateTime {
    fn into_timestamp(self) -> Result<NaiveDateTime, TraderError> {
        Ok(self)
    }
}

impl IntoTimestamp for NaiveDate {
    fn into_timestamp(self) -> Result<NaiveDateTime, TraderError> {
        self.and_hms_opt(0, 0, 0)
            .ok_or_else(|| TraderError::InvalidTradeBounds {
                reason: format!("cannot convert {} to a timestamp", self),
            })
    }
}

impl IntoTimestamp for &str {
    fn into_timestamp(self) -> Result<NaiveDateTime, TraderError> {
        parse_timestamp(self).map_err(|e| TraderError::InvalidTradeBounds {
            reason: e.to_string(),
        })
    }
}

impl IntoTimestamp for String {
    fn into_timestamp(self) -> Result<NaiveDateTime, TraderError> {
        self.as_str().into_timestamp()
    }
}

/// One completed long trade. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    entry: NaiveDateTime,
    exit: NaiveDateTime,
    bars: Vec<OhlcvBar>,
    params: TradeParams,
    duration: TimeDelta,
    profit: f64,
}

impl Trade {
    /// Build a trade between two rows of `table`.
    ///
    /// Both timestamps must be rows of the table and `entry` must precede `exit`.
    pub fn new(
        entry: impl IntoTimestamp,
        exit: impl IntoTimestamp,
        table: &PriceTable,
        params: TradeParams,
    ) -> Result<Self, TraderError> {
        let entry = entry.into_timestamp()?;
        let exit = exit.into_timestamp()?;

        if entry >= exit {
            return Err(TraderError::InvalidTradeBounds {
                reason: format!("entry {} is not before exit {}", entry, exit),
            });
        }
        for ts in [entry, exit] {
            if table.position(ts).is_none() {
                return Err(TraderError::InvalidTradeBounds {
                    reason: format!("{} is not a row of the price table", ts),
                });
            }
        }

        let bars = table.bars_between(entry, exit);
        let (entry_bar, exit_bar) = match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(TraderError::InvalidTradeBounds {
                    reason: format!("no price rows between {} and {}", entry, exit),
                });
            }
        };
        let profit = compute_profit(entry_bar, exit_bar, &params);

        Ok(Trade {
            entry,
            exit,
            bars,
            params,
            duration: exit - entry,
            profit,
        })
    }

    /// Same as [`new`](Self::new) with a validated profit mode string.
    pub fn with_mode(
        entry: impl IntoTimestamp,
        exit: impl IntoTimestamp,
        table: &PriceTable,
        profit_mode: &str,
        take_profit_pips: f64,
        stop_loss_pips: f64,
    ) -> Result<Self, TraderError> {
        let params = TradeParams {
            profit_mode: profit_mode.parse()?,
            take_profit_pips,
            stop_loss_pips,
        };
        Self::new(entry, exit, table, params)
    }

    pub fn entry_date(&self) -> NaiveDateTime {
        self.entry
    }

    pub fn exit_date(&self) -> NaiveDateTime {
        self.exit
    }

    /// Price rows from entry through exit.
    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn params(&self) -> &TradeParams {
        &self.params
    }

    pub fn duration(&self) -> TimeDelta {
        self.duration
    }

    pub fn profit(&self) -> f64 {
        self.profit
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({}m) {:+.4}",
            self.entry,
            self.exit,
            self.duration.num_minutes(),
            self.profit
        )
    }
}

/// Compare entry close against exit high. A favourable move books the exit
/// high (or the fixed take-profit); otherwise the exit open (or the fixed
/// stop-loss) is booked.
fn compute_profit(entry: &OhlcvBar, exit: &OhlcvBar, params: &TradeParams) -> f64 {
    if exit.high > entry.close {
        match params.profit_mode {
            ProfitMode::Realized => round4(exit.high - entry.close),
            ProfitMode::Theoretical => params.take_profit_pips * PIP,
        }
    } else {
        match params.profit_mode {
            ProfitMode::Realized => round4(exit.open - entry.close),
            ProfitMode::Theoretical => -params.stop_loss_pips * PIP,
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
