//! Pure computation engine(s) for deterministic ledger logic.
//!
//! Nothing in here performs I/O: the ledger mutates an in-memory lot list,
//! the risk and reporting views are recomputed from whatever lots they get.

pub mod fees;
pub mod ledger;
pub mod reporting;
pub mod risk;

pub use fees::{AmountOutOfRange, FeeSchedule, LegCost, Settlement, MAX_NOTIONAL};
pub use ledger::{CloseOutcome, Ledger, LedgerError};
pub use reporting::Period;
pub use risk::{PositionStatus, PriceSource, RiskSignal, RiskSummary};
