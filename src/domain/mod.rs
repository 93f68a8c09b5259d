//! Domain types for the position ledger.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: LotId, Symbol, LotStatus
//! - The Lot record and the OpenLot request

pub mod decimal;
pub mod lot;
pub mod primitives;

pub use decimal::Decimal;
pub use lot::{Lot, OpenLotRequest};
pub use primitives::{LotId, LotStatus, LotStatusParseError, Symbol};
