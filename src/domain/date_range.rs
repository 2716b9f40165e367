//! Shorthand date-range tokens.
//!
//! | token  | as start                          | as end                              |
//! |--------|-----------------------------------|-------------------------------------|
//! | `Y-n`  | today, n years ago                | end of that day                     |
//! | `W-n`  | Monday of the week n weeks ago    | end of Friday of that week          |
//! | `W+n`  | Monday of the week n weeks ahead  | end of Friday of that week          |
//! | `H-n`  | top of the hour, n hours ago      | top of the hour, n - 1 hours ago    |
//!
//! Literal timestamps are accepted as well; an empty token leaves that side open.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use crate::domain::error::TraderError;
use crate::domain::price_table::parse_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Inclusive `[start, end]` window. `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

/// Decode a start/end token pair relative to `now`.
pub fn decode_range(start: &str, end: &str, now: NaiveDateTime) -> Result<DateRange, TraderError> {
    let range = DateRange {
        start: decode(start, Bound::Start, now)?,
        end: decode(end, Bound::End, now)?,
    };
    if let (Some(s), Some(e)) = (range.start, range.end) {
        if s > e {
            return Err(TraderError::InvalidDateRange {
                token: format!("{}..{}", start, end),
                reason: format!("start {} is after end {}", s, e),
            });
        }
    }
    Ok(range)
}

/// Decode one token.
pub fn decode(
    token: &str,
    bound: Bound,
    now: NaiveDateTime,
) -> Result<Option<NaiveDateTime>, TraderError> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(None);
    }

    let invalid = |reason: &str| TraderError::InvalidDateRange {
        token: token.to_string(),
        reason: reason.to_string(),
    };

    let (prefix, rest) = match token.get(..2).zip(token.get(2..)) {
        Some(split) => split,
        None => return literal(token).map(Some),
    };
    if !matches!(prefix, "Y-" | "W-" | "W+" | "H-") {
        return literal(token).map(Some);
    }

    let n: u32 = rest
        .parse()
        .map_err(|_| invalid("expected a non-negative count after the prefix"))?;
    let today = now.date();

    let ts = match prefix {
        "Y-" => {
            let day = today
                .checked_sub_months(Months::new(n.saturating_mul(12)))
                .ok_or_else(|| invalid("date out of range"))?;
            day_bound(day, bound)
        }
        "W-" | "W+" => {
            let monday = today - TimeDelta::days(i64::from(today.weekday().num_days_from_monday()));
            let weeks = TimeDelta::weeks(i64::from(n));
            let monday = if prefix == "W-" {
                monday - weeks
            } else {
                monday + weeks
            };
            match bound {
                Bound::Start => day_bound(monday, Bound::Start),
                Bound::End => day_bound(monday + TimeDelta::days(4), Bound::End),
            }
        }
        _ => {
            let hour = now
                .with_minute(0)
                .and_then(|t| t.with_second(0))
                .and_then(|t| t.with_nanosecond(0))
                .ok_or_else(|| invalid("cannot truncate to the hour"))?;
            let hours = match bound {
                Bound::Start => i64::from(n),
                Bound::End => i64::from(n) - 1,
            };
            hour - TimeDelta::hours(hours)
        }
    };
    Ok(Some(ts))
}

fn day_bound(day: NaiveDate, bound: Bound) -> NaiveDateTime {
    match bound {
        Bound::Start => day.and_time(chrono::NaiveTime::MIN),
        Bound::End => {
            day.and_time(chrono::NaiveTime::MIN) + TimeDelta::days(1) - TimeDelta::seconds(1)
        }
    }
}

fn literal(token: &str) -> Result<NaiveDateTime, TraderError> {
    parse_timestamp(token).map_err(|_| TraderError::InvalidDateRange {
        token: token.to_string(),
        reason: "expected Y-n, W-n, W+n, H-n or a timestamp".to_string(),
    })
}
