//! Aggregate statistics over a list of extracted trades.

use chrono::TimeDelta;

use super::trade::Trade;

#[derive(Debug, Clone, PartialEq)]
pub struct TradeSummary {
    pub trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub breakeven: usize,
    pub win_rate: f64,
    pub total_profit: f64,
    pub avg_profit: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_duration: TimeDelta,
}

impl TradeSummary {
    pub fn compute(trades: &[Trade]) -> Self {
        let mut winners = 0usize;
        let mut losers = 0usize;
        let mut breakeven = 0usize;
        let mut total_profit = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_duration = TimeDelta::zero();

        for trade in trades {
            let profit = trade.profit();
            total_profit += profit;
            total_duration = total_duration + trade.duration();
            if profit > 0.0 {
                winners += 1;
                largest_win = largest_win.max(profit);
            } else if profit < 0.0 {
                losers += 1;
                largest_loss = largest_loss.max(profit.abs());
            } else {
                breakeven += 1;
            }
        }

        let count = trades.len();
        let (win_rate, avg_profit, avg_duration) = if count > 0 {
            (
                winners as f64 / count as f64,
                total_profit / count as f64,
                total_duration / count as i32,
            )
        } else {
            (0.0, 0.0, TimeDelta::zero())
        };

        Self {
            trades: count,
            winners,
            losers,
            breakeven,
            win_rate,
            total_profit,
            avg_profit,
            largest_win,
            largest_loss,
            avg_duration,
        }
    }
}

impl std::fmt::Display for TradeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Trades:        {}", self.trades)?;
        writeln!(
            f,
            "Won/Lost/Even: {}/{}/{}",
            self.winners, self.losers, self.breakeven
        )?;
        writeln!(f, "Win rate:      {:.1}%", self.win_rate * 100.0)?;
        writeln!(f, "Total profit:  {:+.4}", self.total_profit)?;
        writeln!(f, "Avg profit:    {:+.4}", self.avg_profit)?;
        writeln!(f, "Largest win:   {:.4}", self.largest_win)?;
        writeln!(f, "Largest loss:  {:.4}", self.largest_loss)?;
        write!(f, "Avg duration:  {}m", self.avg_duration.num_minutes())
    }
}
