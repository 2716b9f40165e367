//! Criteria evaluation engine.
//!
//! Turns one side's criterion list into boolean signal columns on a
//! [`PriceTable`].
//!
//! # Evaluation Semantics
//!
//! - Each criterion compares its `statistic` column, row by row, against its
//!   resolved value and is stored as `"{statistic}_{operation}_{value}"`
//! - Buy columns are combined with AND, sell columns with OR, into `Buy`/`Sell`
//! - `=` and `!=` compare exactly
//! - A missing value (`NaN`) fails every comparison except `!=`
//! - `inRange` takes a `[low, high]` pair and is inclusive on both ends
//! - All columns are computed before any is written, so a failing criterion
//!   leaves the table untouched

use tracing::debug;

use crate::domain::criteria::{Criterion, Operation, Side};
use crate::domain::error::TraderError;
use crate::domain::price_table::{CLOSE, PriceTable};
use crate::domain::value_expr;

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorConfig {
    /// Input column of the `avg_k` / `max_k` / `min_k` statistics.
    pub rolling_column: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            rolling_column: CLOSE.to_string(),
        }
    }
}

/// Evaluate `criteria` for `side` on `table`.
///
/// Writes one signal column per criterion plus the combined `Buy`/`Sell`
/// column (replacing earlier ones of the same name) and returns the combined
/// series. An empty criterion list is a no-op and returns `None`.
pub fn evaluate(
    criteria: &[Criterion],
    table: &mut PriceTable,
    side: Side,
    config: &EvaluatorConfig,
) -> Result<Option<Vec<bool>>, TraderError> {
    if criteria.is_empty() {
        return Ok(None);
    }

    let mut columns: Vec<(String, Vec<bool>)> = Vec::with_capacity(criteria.len());
    for criterion in criteria {
        let values = evaluate_criterion(criterion, table, config)?;
        columns.push((criterion.column_name(), values));
    }

    let combined: Vec<bool> = (0..table.len())
        .map(|row| {
            let results: Vec<bool> = columns.iter().map(|(_, v)| v[row]).collect();
            side.combine(&results)
        })
        .collect();

    debug!(
        side = %side,
        rows = table.len(),
        signals = combined.iter().filter(|s| **s).count(),
        "criteria evaluated"
    );

    for (name, values) in columns {
        table.set_signal(name, values)?;
    }
    table.set_signal(side.column().to_string(), combined.clone())?;

    Ok(Some(combined))
}

/// Evaluate a single criterion without touching the table.
pub fn evaluate_criterion(
    criterion: &Criterion,
    table: &PriceTable,
    config: &EvaluatorConfig,
) -> Result<Vec<bool>, TraderError> {
    let operation = criterion.operation()?;
    let statistic = table.column(&criterion.statistic)?;

    let expr = value_expr::parse_value(&criterion.value)?;
    let values = value_expr::resolve(&criterion.value, &expr, table, &config.rolling_column)?;

    if values.len() != operation.arity() {
        return Err(TraderError::UnresolvableValueExpression {
            expression: criterion.value.clone(),
            reason: format!(
                "operator '{}' takes {} value(s), expression has {}",
                operation,
                operation.arity(),
                values.len()
            ),
        });
    }

    let result = match operation {
        Operation::Greater => binary(statistic, &values[0], |l, r| l > r),
        Operation::GreaterEqual => binary(statistic, &values[0], |l, r| l >= r),
        Operation::Equal => binary(statistic, &values[0], |l, r| l == r),
        Operation::LessEqual => binary(statistic, &values[0], |l, r| l <= r),
        Operation::Less => binary(statistic, &values[0], |l, r| l < r),
        Operation::NotEqual => binary(statistic, &values[0], |l, r| l != r),
        Operation::InRange => statistic
            .iter()
            .zip(values[0].iter().zip(&values[1]))
            .map(|(s, (lo, hi))| in_range(*s, *lo, *hi))
            .collect(),
    };
    Ok(result)
}

fn binary(statistic: &[f64], values: &[f64], cmp: impl Fn(f64, f64) -> bool) -> Vec<bool> {
    statistic
        .iter()
        .zip(values)
        .map(|(s, v)| cmp(*s, *v))
        .collect()
}

fn in_range(value: f64, lower: f64, upper: f64) -> bool {
    value >= lower && value <= upper
}
