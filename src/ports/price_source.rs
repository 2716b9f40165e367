//! Price data port trait.

use crate::domain::error::TraderError;
use crate::domain::price_table::PriceTable;

pub trait PriceSource {
    /// Full price history of `symbol`, OHLC plus any indicator columns.
    fn load_table(&self, symbol: &str) -> Result<PriceTable, TraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, TraderError>;
}
