//! Declarative trading criteria.
//!
//! - `Operation`: comparison operator of a single criterion
//! - `Criterion`: `statistic <operation> value`
//! - `Criteria`: the buy and sell criterion lists of one strategy
//! - `Side`: which list is being evaluated, and how its results combine

use std::fmt;
use std::str::FromStr;

use crate::domain::error::TraderError;
use crate::domain::value_expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Greater,
    GreaterEqual,
    Equal,
    LessEqual,
    Less,
    NotEqual,
    InRange,
}

impl Operation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operation::Greater => ">",
            Operation::GreaterEqual => ">=",
            Operation::Equal => "=",
            Operation::LessEqual => "<=",
            Operation::Less => "<",
            Operation::NotEqual => "!=",
            Operation::InRange => "inRange",
        }
    }

    /// Number of value series the operator consumes.
    pub fn arity(&self) -> usize {
        match self {
            Operation::InRange => 2,
            _ => 1,
        }
    }
}

impl FromStr for Operation {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(Operation::Greater),
            ">=" => Ok(Operation::GreaterEqual),
            "=" => Ok(Operation::Equal),
            "<=" => Ok(Operation::LessEqual),
            "<" => Ok(Operation::Less),
            "!=" => Ok(Operation::NotEqual),
            "inRange" => Ok(Operation::InRange),
            other => Err(TraderError::UnknownOperator {
                operator: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One rule: compare the `statistic` column against the resolved `value`.
///
/// The operator is kept as written so that an unknown symbol surfaces as
/// [`TraderError::UnknownOperator`] at evaluation time, before any signal
/// column is written.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub statistic: String,
    pub operation: String,
    pub value: String,
}

impl Criterion {
    pub fn new(statistic: &str, operation: &str, value: &str) -> Self {
        Self {
            statistic: statistic.to_string(),
            operation: operation.to_string(),
            value: value.to_string(),
        }
    }

    pub fn operation(&self) -> Result<Operation, TraderError> {
        self.operation.parse()
    }

    /// Deterministic name of the boolean column this criterion produces.
    pub fn column_name(&self) -> String {
        format!("{}_{}_{}", self.statistic, self.operation, self.value)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.statistic, self.operation, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Name of the combined signal column.
    pub fn column(&self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }

    /// Buy needs every criterion to hold; any single sell criterion triggers an exit.
    pub fn combine(&self, results: &[bool]) -> bool {
        match self {
            Side::Buy => results.iter().all(|r| *r),
            Side::Sell => results.iter().any(|r| *r),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Buy and sell criteria of one strategy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub buy_on: Vec<Criterion>,
    pub sell_on: Vec<Criterion>,
}

impl Criteria {
    pub fn new(buy_on: Vec<Criterion>, sell_on: Vec<Criterion>) -> Self {
        Self { buy_on, sell_on }
    }

    pub fn for_side(&self, side: Side) -> &[Criterion] {
        match side {
            Side::Buy => &self.buy_on,
            Side::Sell => &self.sell_on,
        }
    }

    /// Check that every operator is recognised and every value expression
    /// lexes. Whether a name resolves depends on the table, so that is left
    /// to evaluation.
    pub fn validate(&self) -> Result<(), TraderError> {
        for criterion in self.buy_on.iter().chain(&self.sell_on) {
            criterion.operation()?;
            value_expr::parse_value(&criterion.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_parses_all_symbols() {
        for (sym, op) in [
            (">", Operation::Greater),
            (">=", Operation::GreaterEqual),
            ("=", Operation::Equal),
            ("<=", Operation::LessEqual),
            ("<", Operation::Less),
            ("!=", Operation::NotEqual),
            ("inRange", Operation::InRange),
        ] {
            assert_eq!(sym.parse::<Operation>().unwrap(), op);
            assert_eq!(op.to_string(), sym);
        }
    }

    #[test]
    fn operation_unknown_symbol() {
        match "~".parse::<Operation>() {
            Err(TraderError::UnknownOperator { operator }) => assert_eq!(operator, "~"),
            other => panic!("expected UnknownOperator, got {:?}", other),
        }
    }

    #[test]
    fn operation_arity() {
        assert_eq!(Operation::InRange.arity(), 2);
        assert_eq!(Operation::Less.arity(), 1);
    }

    #[test]
    fn column_name_uses_raw_expression() {
        let c = Criterion::new("Close", ">", "max_5");
        assert_eq!(c.column_name(), "Close_>_max_5");
        let r = Criterion::new("RSI", "inRange", "[30:70]");
        assert_eq!(r.column_name(), "RSI_inRange_[30:70]");
    }

    #[test]
    fn side_combination_is_asymmetric() {
        assert!(Side::Buy.combine(&[true, true]));
        assert!(!Side::Buy.combine(&[true, false]));
        assert!(Side::Sell.combine(&[false, true]));
        assert!(!Side::Sell.combine(&[false, false]));
    }

    #[test]
    fn criteria_validate_flags_unknown_operator() {
        let criteria = Criteria::new(
            vec![Criterion::new("Close", ">", "1.0")],
            vec![Criterion::new("Close", "=<", "1.0")],
        );
        assert!(matches!(
            criteria.validate(),
            Err(TraderError::UnknownOperator { .. })
        ));
    }

    #[test]
    fn criteria_validate_flags_malformed_value() {
        let criteria = Criteria::new(
            vec![Criterion::new("Close", ">", "[1.0:")],
            vec![Criterion::new("Close", "<", "1.0")],
        );
        match criteria.validate() {
            Err(TraderError::UnresolvableValueExpression { expression, reason }) => {
                assert_eq!(expression, "[1.0:");
                assert!(reason.contains("     ^"));
            }
            other => panic!("expected UnresolvableValueExpression, got {:?}", other),
        }
    }

    #[test]
    fn criteria_validate_leaves_names_to_evaluation() {
        let criteria = Criteria::new(
            vec![Criterion::new("Close", ">", "Adj Close")],
            vec![Criterion::new("Close", "<", "median_3")],
        );
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn criteria_for_side() {
        let criteria = Criteria::new(
            vec![Criterion::new("Close", ">", "1.0")],
            vec![],
        );
        assert_eq!(criteria.for_side(Side::Buy).len(), 1);
        assert!(criteria.for_side(Side::Sell).is_empty());
    }
}
