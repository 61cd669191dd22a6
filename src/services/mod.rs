pub mod history;
pub mod risk;
pub mod scanner;
pub mod signals;
pub mod sink;

pub use history::{HistoryStore, PriceHistory, PriceSource};
pub use risk::{profit_loss, AccountSource, PositionSizer, RiskManager};
pub use scanner::{CycleOptions, CycleReport, Scanner};
pub use signals::{
    calibrate_confidence, ConfidenceScorer, CooldownTracker, IndicatorEngine, SignalGenerator,
    SignalOutcome,
};
pub use sink::{LogSink, SignalSink};
