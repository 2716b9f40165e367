//! Value expressions on the right-hand side of a criterion.
//!
//! An expression is a single token (`1.05`, `Close_SMA_20`, `Adj Close`,
//! `max_5`) or a list of tokens separated by `:` or `,`, optionally wrapped in
//! brackets (`[avg_20:TP_30]`). Spaces inside a token belong to the name.
//! Lexing happens once; resolution against a concrete table happens on every
//! evaluation, because derived values depend on the current working table.
//!
//! # Resolution order
//!
//! 1. Numeric literal: constant series
//! 2. Existing column: that column
//! 3. `avg_k` / `max_k` / `min_k`: statistic of the `k` rows preceding each row
//! 4. `SL_k` / `TP_k`: constant stop-loss/take-profit level anchored on the
//!    close of the second row of the table
//! 5. Anything else: [`TraderError::UnresolvableValueExpression`]
//!
//! Lexing failures are reported as the same error, with the caret context of
//! [`ParseError::display_with_context`] as the reason.

use crate::domain::error::{ParseError, TraderError};
use crate::domain::price_table::{CLOSE, PriceTable};
use crate::domain::trade::PIP;

#[derive(Debug, Clone, PartialEq)]
pub enum ValueToken {
    Number(f64),
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueExpr {
    pub tokens: Vec<ValueToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedKind {
    Avg,
    Max,
    Min,
    StopLoss,
    TakeProfit,
}

/// Split a `name_k` token into its derived-statistic kind and period.
pub fn derived(name: &str) -> Option<(DerivedKind, usize)> {
    let (prefix, period) = name.split_once('_')?;
    let kind = match prefix {
        "avg" => DerivedKind::Avg,
        "max" => DerivedKind::Max,
        "min" => DerivedKind::Min,
        "SL" => DerivedKind::StopLoss,
        "TP" => DerivedKind::TakeProfit,
        _ => return None,
    };
    let period: usize = period.parse().ok()?;
    (period > 0).then_some((kind, period))
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError {
                message: format!("expected '{}', found '{}'", expected, ch),
                position: self.pos,
            }),
            None => Err(ParseError {
                message: format!("expected '{}', found end of input", expected),
                position: self.pos,
            }),
        }
    }

    fn is_token_char(ch: char) -> bool {
        ch.is_alphanumeric() || matches!(ch, '_' | '.' | '-' | '+')
    }

    fn parse_token(&mut self) -> Result<ValueToken, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut end = start;
        while let Some(ch) = self.peek() {
            if Self::is_token_char(ch) {
                self.advance();
                end = self.pos;
            } else if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }

        let word = &self.input[start..end];
        if word.is_empty() {
            let found = self
                .peek()
                .map(|c| format!("'{}'", c))
                .unwrap_or_else(|| "end of input".to_string());
            return Err(ParseError {
                message: format!("expected value token, found {}", found),
                position: start,
            });
        }

        Ok(match word.parse::<f64>() {
            Ok(n) if n.is_finite() => ValueToken::Number(n),
            _ => ValueToken::Name(word.to_string()),
        })
    }

    fn parse_tokens(&mut self) -> Result<Vec<ValueToken>, ParseError> {
        let mut tokens = vec![self.parse_token()?];
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(':') | Some(',') => {
                    self.advance();
                    tokens.push(self.parse_token()?);
                }
                _ => return Ok(tokens),
            }
        }
    }

    fn parse_expr(&mut self) -> Result<ValueExpr, ParseError> {
        self.skip_whitespace();
        let bracketed = self.peek() == Some('[');
        if bracketed {
            self.advance();
        }
        let tokens = self.parse_tokens()?;
        if bracketed {
            self.expect_char(']')?;
        }
        self.skip_whitespace();
        if let Some(ch) = self.peek() {
            return Err(ParseError {
                message: format!("unexpected '{}' after value expression", ch),
                position: self.pos,
            });
        }
        Ok(ValueExpr { tokens })
    }
}

/// Lex a raw value expression.
pub fn parse(input: &str) -> Result<ValueExpr, ParseError> {
    Parser::new(input).parse_expr()
}

/// Lex a raw value expression, reporting failures as unresolvable.
pub fn parse_value(raw: &str) -> Result<ValueExpr, TraderError> {
    parse(raw).map_err(|e| TraderError::UnresolvableValueExpression {
        expression: raw.to_string(),
        reason: e.display_with_context(raw),
    })
}

/// Resolve every token of `expr` into a series aligned with `table`.
pub fn resolve(
    raw: &str,
    expr: &ValueExpr,
    table: &PriceTable,
    rolling_column: &str,
) -> Result<Vec<Vec<f64>>, TraderError> {
    expr.tokens
        .iter()
        .map(|token| resolve_token(raw, token, table, rolling_column))
        .collect()
}

fn resolve_token(
    raw: &str,
    token: &ValueToken,
    table: &PriceTable,
    rolling_column: &str,
) -> Result<Vec<f64>, TraderError> {
    let name = match token {
        ValueToken::Number(n) => return Ok(vec![*n; table.len()]),
        ValueToken::Name(name) => name,
    };

    if table.has_column(name) {
        return Ok(table.column(name)?.to_vec());
    }

    let (kind, period) = derived(name).ok_or_else(|| TraderError::UnresolvableValueExpression {
        expression: raw.to_string(),
        reason: format!("'{}' is neither a number, a column nor a derived statistic", name),
    })?;

    match kind {
        DerivedKind::Avg | DerivedKind::Max | DerivedKind::Min => {
            Ok(rolling(table.column(rolling_column)?, period, kind))
        }
        DerivedKind::StopLoss | DerivedKind::TakeProfit => {
            let close = table.column(CLOSE)?;
            let anchor = match close.get(1).or(close.first()) {
                Some(c) => *c,
                None => return Ok(Vec::new()),
            };
            let offset = period as f64 * PIP;
            let level = if kind == DerivedKind::StopLoss {
                anchor - offset
            } else {
                anchor + offset
            };
            Ok(vec![level; table.len()])
        }
    }
}

/// Statistic over the `period` values preceding each row. The first `period`
/// rows have no value. On short tables the window is clamped to `len - 1`.
fn rolling(source: &[f64], period: usize, kind: DerivedKind) -> Vec<f64> {
    let n = source.len();
    let window = period.min(n.saturating_sub(1));
    let mut out = vec![f64::NAN; n];
    if window == 0 {
        return out;
    }

    for i in window..n {
        let slice = &source[i - window..i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = match kind {
            DerivedKind::Avg => slice.iter().sum::<f64>() / window as f64,
            DerivedKind::Max => slice.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            DerivedKind::Min => slice.iter().copied().fold(f64::INFINITY, f64::min),
            DerivedKind::StopLoss | DerivedKind::TakeProfit => f64::NAN,
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn table(closes: &[f64]) -> PriceTable {
        let bars: Vec<OhlcvBar> = closes
            .iter()
            .enumerate()
            .map(|(i, c)| OhlcvBar::flat(ts(i as u32 + 1), *c))
            .collect();
        PriceTable::from_bars(&bars).unwrap()
    }

    fn resolve_one(raw: &str, table: &PriceTable) -> Result<Vec<f64>, TraderError> {
        let expr = parse_value(raw)?;
        let mut series = resolve(raw, &expr, table, CLOSE)?;
        Ok(series.remove(0))
    }

    #[test]
    fn parse_single_number() {
        let expr = parse("1.05").unwrap();
        assert_eq!(expr.tokens, vec![ValueToken::Number(1.05)]);
    }

    #[test]
    fn parse_negative_number() {
        let expr = parse("-0.5").unwrap();
        assert_eq!(expr.tokens, vec![ValueToken::Number(-0.5)]);
    }

    #[test]
    fn parse_name() {
        let expr = parse("Close_SMA_20").unwrap();
        assert_eq!(expr.tokens, vec![ValueToken::Name("Close_SMA_20".into())]);
    }

    #[test]
    fn parse_bracketed_list() {
        let expr = parse("[30 : 70]").unwrap();
        assert_eq!(
            expr.tokens,
            vec![ValueToken::Number(30.0), ValueToken::Number(70.0)]
        );
    }

    #[test]
    fn parse_colon_list_without_brackets() {
        let expr = parse("min_5:max_5").unwrap();
        assert_eq!(
            expr.tokens,
            vec![
                ValueToken::Name("min_5".into()),
                ValueToken::Name("max_5".into())
            ]
        );
    }

    #[test]
    fn parse_comma_list() {
        let expr = parse("[SL_30, TP_30]").unwrap();
        assert_eq!(expr.tokens.len(), 2);
    }

    #[test]
    fn parse_error_empty_token() {
        let err = parse("[1.0:]").unwrap_err();
        assert_eq!(err.position, 5);
    }

    #[test]
    fn parse_error_unclosed_bracket() {
        let err = parse("[1.0:2.0").unwrap_err();
        assert!(err.message.contains("expected ']'"));
    }

    #[test]
    fn parse_error_trailing_garbage() {
        let err = parse("1.0]").unwrap_err();
        assert_eq!(err.position, 3);
        let err = parse("Close$").unwrap_err();
        assert_eq!(err.position, 5);
    }

    #[test]
    fn parse_name_with_interior_space() {
        let expr = parse("  Adj Close ").unwrap();
        assert_eq!(expr.tokens, vec![ValueToken::Name("Adj Close".into())]);

        let expr = parse("[Adj Close : 1.5]").unwrap();
        assert_eq!(
            expr.tokens,
            vec![ValueToken::Name("Adj Close".into()), ValueToken::Number(1.5)]
        );
    }

    #[test]
    fn parse_value_reports_unresolvable_with_caret() {
        match parse_value("[1.0:") {
            Err(TraderError::UnresolvableValueExpression { expression, reason }) => {
                assert_eq!(expression, "[1.0:");
                let lines: Vec<&str> = reason.lines().collect();
                assert_eq!(lines[0], "[1.0:");
                assert_eq!(lines[1], "     ^");
            }
            other => panic!("expected UnresolvableValueExpression, got {:?}", other),
        }
    }

    #[test]
    fn spaced_numbers_are_not_a_list() {
        let t = table(&[1.0, 2.0]);
        assert!(matches!(
            resolve_one("1.0 2.0", &t),
            Err(TraderError::UnresolvableValueExpression { .. })
        ));
    }

    #[test]
    fn parse_error_empty_input() {
        assert!(parse("").is_err());
    }

    #[test]
    fn derived_patterns() {
        assert_eq!(derived("avg_20"), Some((DerivedKind::Avg, 20)));
        assert_eq!(derived("max_5"), Some((DerivedKind::Max, 5)));
        assert_eq!(derived("min_5"), Some((DerivedKind::Min, 5)));
        assert_eq!(derived("SL_30"), Some((DerivedKind::StopLoss, 30)));
        assert_eq!(derived("TP_30"), Some((DerivedKind::TakeProfit, 30)));
        assert_eq!(derived("avg_0"), None);
        assert_eq!(derived("avg_x"), None);
        assert_eq!(derived("median_5"), None);
        assert_eq!(derived("avg"), None);
    }

    #[test]
    fn resolve_literal_is_constant() {
        let t = table(&[1.0, 2.0, 3.0]);
        assert_eq!(resolve_one("1.5", &t).unwrap(), vec![1.5, 1.5, 1.5]);
    }

    #[test]
    fn resolve_column() {
        let t = table(&[1.0, 2.0, 3.0]);
        assert_eq!(resolve_one("Open", &t).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn resolve_column_with_space_in_name() {
        let t = table(&[1.0, 2.0, 3.0])
            .with_column("Adj Close", vec![0.9, 1.9, 2.9])
            .unwrap();
        assert_eq!(resolve_one("Adj Close", &t).unwrap(), vec![0.9, 1.9, 2.9]);
    }

    #[test]
    fn column_wins_over_derived_pattern() {
        let t = table(&[1.0, 2.0, 3.0])
            .with_column("max_2", vec![9.0, 9.0, 9.0])
            .unwrap();
        assert_eq!(resolve_one("max_2", &t).unwrap(), vec![9.0, 9.0, 9.0]);
    }

    #[test]
    fn resolve_unknown_name_is_unresolvable() {
        let t = table(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            resolve_one("SMA_20", &t),
            Err(TraderError::UnresolvableValueExpression { .. })
        ));
    }

    #[test]
    fn rolling_max_uses_preceding_rows() {
        let t = table(&[1.0, 3.0, 2.0, 5.0, 4.0]);
        let max = resolve_one("max_2", &t).unwrap();
        assert!(max[0].is_nan());
        assert!(max[1].is_nan());
        assert_eq!(&max[2..], &[3.0, 3.0, 5.0]);
    }

    #[test]
    fn rolling_min_and_avg() {
        let t = table(&[1.0, 3.0, 2.0, 5.0]);
        let min = resolve_one("min_2", &t).unwrap();
        assert_eq!(&min[2..], &[1.0, 2.0]);
        let avg = resolve_one("avg_3", &t).unwrap();
        assert!(avg[..3].iter().all(|v| v.is_nan()));
        assert_relative_eq!(avg[3], 2.0);
    }

    #[test]
    fn rolling_window_clamps_on_short_table() {
        let t = table(&[1.0, 4.0, 2.0]);
        let max = resolve_one("max_5", &t).unwrap();
        assert!(max[0].is_nan());
        assert!(max[1].is_nan());
        assert_eq!(max[2], 4.0);
    }

    #[test]
    fn rolling_single_row_has_no_value() {
        let t = table(&[1.0]);
        let avg = resolve_one("avg_5", &t).unwrap();
        assert_eq!(avg.len(), 1);
        assert!(avg[0].is_nan());
    }

    #[test]
    fn rolling_uses_configured_column() {
        let t = table(&[1.0, 2.0, 3.0])
            .with_column("RSI", vec![10.0, 20.0, 30.0])
            .unwrap();
        let expr = parse("avg_2").unwrap();
        let series = resolve("avg_2", &expr, &t, "RSI").unwrap();
        assert_relative_eq!(series[0][2], 15.0);
    }

    #[test]
    fn rolling_missing_source_column() {
        let t = table(&[1.0, 2.0, 3.0]);
        let expr = parse("avg_2").unwrap();
        assert!(matches!(
            resolve("avg_2", &expr, &t, "RSI"),
            Err(TraderError::MissingColumn { .. })
        ));
    }

    #[test]
    fn stop_loss_anchors_on_second_row() {
        let t = table(&[1.0, 1.2, 1.4]);
        let sl = resolve_one("SL_30", &t).unwrap();
        for v in &sl {
            assert_relative_eq!(*v, 1.2 - 0.003, epsilon = 1e-12);
        }
    }

    #[test]
    fn take_profit_anchors_on_second_row() {
        let t = table(&[1.0, 1.2, 1.4]);
        let tp = resolve_one("TP_30", &t).unwrap();
        assert_relative_eq!(tp[0], 1.203, epsilon = 1e-12);
        assert_eq!(tp.len(), 3);
    }

    #[test]
    fn anchor_falls_back_to_first_row() {
        let t = table(&[1.5]);
        let tp = resolve_one("TP_10", &t).unwrap();
        assert_relative_eq!(tp[0], 1.501, epsilon = 1e-12);
    }

    #[test]
    fn anchor_moves_with_truncated_table() {
        let t = table(&[1.0, 1.1, 1.3, 1.05]);
        let tail = t.truncate_from(ts(3));
        let sl = resolve_one("SL_50", &tail).unwrap();
        assert_relative_eq!(sl[0], 1.05 - 0.005, epsilon = 1e-12);
    }

    #[test]
    fn resolve_list_yields_one_series_per_token() {
        let t = table(&[1.0, 2.0]);
        let expr = parse("[0.5:Close]").unwrap();
        let series = resolve("[0.5:Close]", &expr, &t, CLOSE).unwrap();
        assert_eq!(series, vec![vec![0.5, 0.5], vec![1.0, 2.0]]);
    }
}
