#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use sigtrader::domain::criteria::{Criteria, Criterion};
use sigtrader::domain::error::TraderError;
pub use sigtrader::domain::ohlcv::OhlcvBar;
use sigtrader::domain::price_table::PriceTable;
use sigtrader::ports::criteria_source::CriteriaSource;
use sigtrader::ports::price_source::PriceSource;
use std::collections::HashMap;

pub struct MockPriceSource {
    pub tables: HashMap<String, PriceTable>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    pub fn with_table(mut self, symbol: &str, table: PriceTable) -> Self {
        self.tables.insert(symbol.to_string(), table);
        self
    }
}

impl PriceSource for MockPriceSource {
    fn load_table(&self, symbol: &str) -> Result<PriceTable, TraderError> {
        self.tables
            .get(symbol)
            .cloned()
            .ok_or_else(|| TraderError::Data {
                reason: format!("no data for {}", symbol),
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, TraderError> {
        let mut symbols: Vec<String> = self.tables.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub struct MockCriteriaSource {
    pub strategies: HashMap<String, Criteria>,
}

impl MockCriteriaSource {
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    pub fn with_strategy(mut self, name: &str, criteria: Criteria) -> Self {
        self.strategies.insert(name.to_string(), criteria);
        self
    }
}

impl CriteriaSource for MockCriteriaSource {
    fn load_criteria(&self, name: &str) -> Result<Criteria, TraderError> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| TraderError::StrategyLoad {
                name: name.to_string(),
                reason: "unknown strategy".to_string(),
            })
    }

    fn list_strategies(&self) -> Result<Vec<String>, TraderError> {
        let mut names: Vec<String> = self.strategies.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Hourly timestamps starting 2024-01-02 00:00.
pub fn hour(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + TimeDelta::hours(i as i64)
}

/// Table where every OHLC value of row `i` equals `closes[i]`.
pub fn flat_table(closes: &[f64]) -> PriceTable {
    let bars: Vec<OhlcvBar> = closes
        .iter()
        .enumerate()
        .map(|(i, c)| OhlcvBar::flat(hour(i), *c))
        .collect();
    PriceTable::from_bars(&bars).unwrap()
}

/// Table with per-row `(open, high, close)`; low is the smallest of the three.
pub fn ohc_table(rows: &[(f64, f64, f64)]) -> PriceTable {
    let bars: Vec<OhlcvBar> = rows
        .iter()
        .enumerate()
        .map(|(i, (o, h, c))| OhlcvBar::new(hour(i), *o, *h, o.min(*c).min(*h), *c))
        .collect();
    PriceTable::from_bars(&bars).unwrap()
}

pub fn criteria(buy: &[(&str, &str, &str)], sell: &[(&str, &str, &str)]) -> Criteria {
    let build = |list: &[(&str, &str, &str)]| -> Vec<Criterion> {
        list.iter()
            .map(|(s, o, v)| Criterion::new(s, o, v))
            .collect()
    };
    Criteria::new(build(buy), build(sell))
}
