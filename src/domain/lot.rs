//! Lot record: a quantity of one symbol bought at one price on one date.

use crate::domain::{Decimal, LotId, LotStatus, Symbol};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A tracked lot, either OPEN or CLOSED.
///
/// While OPEN, `exit_price`, `net_profit` and `exit_date` stay zero/empty.
/// `entry_price` and `open_date` never change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub id: LotId,
    pub symbol: Symbol,
    pub open_date: NaiveDate,
    pub strategy: String,
    pub entry_price: Decimal,
    /// Zero means unset.
    pub stop_loss: Decimal,
    pub quantity: u64,
    /// Commission discount in tenths, e.g. 2.8 pays 28% of standard commission.
    pub discount_rate: Decimal,
    pub status: LotStatus,
    pub exit_price: Decimal,
    /// Realized net profit in whole currency units.
    pub net_profit: i64,
    pub exit_date: Option<NaiveDate>,
    pub note: String,
}

/// Arguments of an OpenLot command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenLotRequest {
    pub symbol: Symbol,
    pub strategy: String,
    pub entry_price: Decimal,
    #[serde(default)]
    pub stop_loss: Decimal,
    pub quantity: u64,
    pub discount_rate: Decimal,
    pub open_date: NaiveDate,
}

impl Lot {
    /// Build a fresh OPEN lot from an open request.
    pub fn open(id: LotId, request: OpenLotRequest) -> Self {
        Lot {
            id,
            symbol: request.symbol,
            open_date: request.open_date,
            strategy: request.strategy,
            entry_price: request.entry_price,
            stop_loss: request.stop_loss,
            quantity: request.quantity,
            discount_rate: request.discount_rate,
            status: LotStatus::Open,
            exit_price: Decimal::zero(),
            net_profit: 0,
            exit_date: None,
            note: String::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == LotStatus::Open
    }

    pub fn is_closed(&self) -> bool {
        self.status == LotStatus::Closed
    }

    pub fn has_stop_loss(&self) -> bool {
        self.stop_loss.is_positive()
    }

    /// Whole days between open and exit, unclamped. `None` while open.
    pub fn raw_holding_days(&self) -> Option<i64> {
        self.exit_date
            .map(|exit| (exit - self.open_date).num_days())
    }
}
