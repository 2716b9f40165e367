//! Core domain types and logic.

pub mod ohlcv;
pub mod price_table;
pub mod criteria;
pub mod value_expr;
pub mod evaluator;
pub mod trade;
pub mod extractor;
pub mod summary;
pub mod date_range;
pub mod config_validation;
pub mod error;
