pub mod ledger_service;

pub use ledger_service::{
    Committed, LedgerService, LedgerView, PerformanceReport, RiskReport, ServiceError,
};
