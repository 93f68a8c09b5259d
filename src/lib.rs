pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod store;

pub use config::Config;
pub use datasource::{HttpQuoteSource, MockQuoteSource, QuoteError, QuoteSource};
pub use db::init_db;
pub use domain::{Decimal, Lot, LotId, LotStatus, OpenLotRequest, Symbol};
pub use engine::{FeeSchedule, Ledger, LedgerError};
pub use error::AppError;
pub use orchestration::{LedgerService, ServiceError};
pub use store::{CsvLotStore, LotStore, MemoryLotStore, Revision, SqliteLotStore};
