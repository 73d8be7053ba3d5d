//! Take-profit ladder and stop-loss evaluation for an open position.
//!
//! `PositionTracker` is the decision core of the holding period: it is fed the
//! current native-asset value of the position once per check and answers with
//! hold, stop-loss, or take-profit.

use serde::{Deserialize, Serialize};

/// Percent-PnL band that trails price upward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitBand {
    pub tp_level: f64,
    pub higher_tp: f64,
    pub lower_tp: f64,
}

impl ProfitBand {
    /// Band centered on `level` with the configured intervals
    pub fn at(level: f64, lower_interval: f64, higher_interval: f64) -> Self {
        Self {
            tp_level: level,
            higher_tp: level + higher_interval,
            lower_tp: level - lower_interval,
        }
    }
}

/// Parameters of the profit ladder, fixed for a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitLadder {
    /// Level the band starts from and resets to (percent)
    pub baseline: f64,
    pub lower_interval: f64,
    pub higher_interval: f64,
}

impl ProfitLadder {
    pub fn baseline_band(&self) -> ProfitBand {
        ProfitBand::at(self.baseline, self.lower_interval, self.higher_interval)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnlDecision {
    Hold,
    StopLoss,
    TakeProfit,
}

/// Result of one PnL check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PnlCheck {
    pub pnl_pct: f64,
    pub decision: PnlDecision,
    /// Set when this check moved the band upward
    pub ratcheted: bool,
}

/// Round to 6 decimal places, the precision the stop-loss floor is quoted in
fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

#[derive(Debug, Clone)]
pub struct PositionTracker {
    buy_amount: f64,
    stop_loss_floor: f64,
    ladder: ProfitLadder,
    band: ProfitBand,
    tp_reached: bool,
}

impl PositionTracker {
    /// `buy_amount` is the native-asset cost of the position, `stop_loss_pct` the
    /// tolerated loss in percent.
    pub fn new(buy_amount: f64, stop_loss_pct: f64, ladder: ProfitLadder) -> Self {
        Self {
            buy_amount,
            stop_loss_floor: round6(buy_amount * (100.0 - stop_loss_pct) / 100.0),
            ladder,
            band: ladder.baseline_band(),
            tp_reached: false,
        }
    }

    pub fn stop_loss_floor(&self) -> f64 {
        self.stop_loss_floor
    }

    pub fn band(&self) -> ProfitBand {
        self.band
    }

    pub fn tp_reached(&self) -> bool {
        self.tp_reached
    }

    pub fn pnl_pct(&self, value: f64) -> f64 {
        (value - self.buy_amount) / self.buy_amount * 100.0
    }

    /// Feed the current position value and decide.
    ///
    /// The ladder bookkeeping (tp marking, negative reset) happens on every
    /// check so that a failed exit does not lose state. Stop-loss wins over
    /// any take-profit outcome.
    pub fn evaluate(&mut self, value: f64) -> PnlCheck {
        let pnl = self.pnl_pct(value);

        if pnl > self.band.tp_level && !self.tp_reached {
            self.tp_reached = true;
        }

        if pnl < 0.0 {
            self.tp_reached = false;
            self.band = self.ladder.baseline_band();
        }

        if value < self.stop_loss_floor {
            return PnlCheck {
                pnl_pct: pnl,
                decision: PnlDecision::StopLoss,
                ratcheted: false,
            };
        }

        let mut ratcheted = false;
        let mut decision = PnlDecision::Hold;

        if pnl > 0.0 {
            if pnl > self.band.higher_tp {
                let level = self.band.tp_level.max(pnl.floor());
                self.band = ProfitBand::at(
                    level,
                    self.ladder.lower_interval,
                    self.ladder.higher_interval,
                );
                ratcheted = true;
            } else if pnl < self.band.lower_tp && self.tp_reached {
                decision = PnlDecision::TakeProfit;
            }
        }

        PnlCheck {
            pnl_pct: pnl,
            decision,
            ratcheted,
        }
    }
}
