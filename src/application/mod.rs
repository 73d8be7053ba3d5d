pub mod controller;
pub mod hold_monitor;
pub mod retry;
pub mod trading_loop;

pub use controller::TradingController;
pub use hold_monitor::{ExitReason, HoldError, HoldOutcome};
pub use retry::{retry_until, RetryError, RetryPolicy};
pub use trading_loop::{AbandonReason, LoopTiming, SessionOutcome, TradingError, TradingLoop};
