//! Single OHLC price row.

use chrono::NaiveDateTime;

/// One row of a [`PriceTable`](crate::domain::price_table::PriceTable),
/// reduced to the four price columns every table carries.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl OhlcvBar {
    pub fn new(timestamp: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    /// Bar with all four prices set to `price`.
    pub fn flat(timestamp: NaiveDateTime, price: f64) -> Self {
        Self::new(timestamp, price, price, price, price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn flat_bar_has_equal_prices() {
        let bar = OhlcvBar::flat(ts(), 1.1);
        assert_eq!(bar.open, 1.1);
        assert_eq!(bar.high, 1.1);
        assert_eq!(bar.low, 1.1);
        assert_eq!(bar.close, 1.1);
    }
}
