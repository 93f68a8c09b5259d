//! The lot list and the commands that change it.
//!
//! Commands either succeed completely or leave the lot list untouched.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use super::fees::{AmountOutOfRange, FeeSchedule, Settlement};
use crate::domain::{Decimal, Lot, LotId, LotStatus, OpenLotRequest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("no {wanted} lot with id {id}")]
    NotFound { id: LotId, wanted: &'static str },
    #[error("invalid quantity {requested} for lot {id} (open quantity {available})")]
    InvalidQuantity {
        id: LotId,
        requested: u64,
        available: u64,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<AmountOutOfRange> for LedgerError {
    fn from(err: AmountOutOfRange) -> Self {
        LedgerError::InvalidInput(err.to_string())
    }
}

impl LedgerError {
    fn not_found(id: &LotId, wanted: &'static str) -> Self {
        LedgerError::NotFound {
            id: id.clone(),
            wanted,
        }
    }
}

/// Result of a successful close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The whole lot was closed in place.
    Full {
        lot_id: LotId,
        settlement: Settlement,
    },
    /// Part of the lot was split off into a new CLOSED lot.
    Split {
        open_lot_id: LotId,
        closed_lot_id: LotId,
        remaining: u64,
        settlement: Settlement,
    },
}

impl CloseOutcome {
    pub fn settlement(&self) -> &Settlement {
        match self {
            CloseOutcome::Full { settlement, .. } | CloseOutcome::Split { settlement, .. } => {
                settlement
            }
        }
    }

    /// Id of the lot now holding the realized portion.
    pub fn closed_lot_id(&self) -> &LotId {
        match self {
            CloseOutcome::Full { lot_id, .. } => lot_id,
            CloseOutcome::Split { closed_lot_id, .. } => closed_lot_id,
        }
    }
}

/// In-memory snapshot of every lot plus the commands that mutate it.
///
/// Lots are kept most-recent-first: new lots, including the closed half of a
/// split, are inserted at the front. The ledger never touches storage; the
/// caller owns the load/save cycle.
#[derive(Debug, Clone)]
pub struct Ledger {
    lots: Vec<Lot>,
    schedule: FeeSchedule,
}

impl Ledger {
    pub fn new(lots: Vec<Lot>, schedule: FeeSchedule) -> Self {
        Self { lots, schedule }
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    pub fn into_lots(self) -> Vec<Lot> {
        self.lots
    }

    pub fn get(&self, id: &LotId) -> Option<&Lot> {
        self.lots.iter().find(|lot| &lot.id == id)
    }

    pub fn lots_with_status(&self, status: LotStatus) -> Vec<&Lot> {
        self.lots.iter().filter(|lot| lot.status == status).collect()
    }

    pub fn open_lots(&self) -> Vec<&Lot> {
        self.lots_with_status(LotStatus::Open)
    }

    pub fn closed_lots(&self) -> Vec<&Lot> {
        self.lots_with_status(LotStatus::Closed)
    }

    fn position_with_status(&self, id: &LotId, status: LotStatus) -> Option<usize> {
        self.lots
            .iter()
            .position(|lot| &lot.id == id && lot.status == status)
    }

    fn fresh_id(&self) -> LotId {
        let mut id = LotId::generate();
        while self.get(&id).is_some() {
            id = LotId::generate();
        }
        id
    }

    /// Append a new OPEN lot and return its id.
    pub fn open_lot(&mut self, request: OpenLotRequest) -> Result<LotId, LedgerError> {
        if request.quantity == 0 {
            return Err(LedgerError::InvalidInput(
                "quantity must be positive".to_string(),
            ));
        }
        if request.entry_price.is_negative() || request.stop_loss.is_negative() {
            return Err(LedgerError::InvalidInput(
                "prices must be non-negative".to_string(),
            ));
        }
        if request.discount_rate.is_negative() {
            return Err(LedgerError::InvalidInput(
                "discount rate must be non-negative".to_string(),
            ));
        }
        self.schedule
            .compute(request.entry_price, request.quantity, request.discount_rate)?;

        let id = self.fresh_id();
        let lot = Lot::open(id.clone(), request);
        info!(
            lot_id = %id,
            symbol = %lot.symbol,
            entry_price = %lot.entry_price,
            quantity = lot.quantity,
            "Opened lot"
        );
        self.lots.insert(0, lot);
        Ok(id)
    }

    /// Close `exit_quantity` shares of an OPEN lot.
    ///
    /// Closing the full quantity flips the lot to CLOSED in place. Closing
    /// less splits: the original keeps the remainder and stays OPEN, and a new
    /// CLOSED lot carrying the original open date takes the sold shares.
    pub fn close_lot(
        &mut self,
        id: &LotId,
        exit_price: Decimal,
        exit_quantity: u64,
        exit_date: NaiveDate,
    ) -> Result<CloseOutcome, LedgerError> {
        let idx = self
            .position_with_status(id, LotStatus::Open)
            .ok_or_else(|| LedgerError::not_found(id, "open"))?;

        if exit_price.is_negative() {
            return Err(LedgerError::InvalidInput(
                "exit price must be non-negative".to_string(),
            ));
        }

        let available = self.lots[idx].quantity;
        if exit_quantity == 0 || exit_quantity > available {
            return Err(LedgerError::InvalidQuantity {
                id: id.clone(),
                requested: exit_quantity,
                available,
            });
        }

        let settlement = {
            let lot = &self.lots[idx];
            self.schedule
                .settle(lot.entry_price, exit_price, exit_quantity, lot.discount_rate)?
        };

        if exit_quantity == available {
            let lot = &mut self.lots[idx];
            lot.status = LotStatus::Closed;
            lot.exit_price = exit_price;
            lot.net_profit = settlement.net_profit;
            lot.exit_date = Some(exit_date);

            info!(
                lot_id = %id,
                exit_price = %exit_price,
                quantity = exit_quantity,
                net_profit = settlement.net_profit,
                "Closed lot"
            );
            return Ok(CloseOutcome::Full {
                lot_id: id.clone(),
                settlement,
            });
        }

        let closed_lot_id = self.fresh_id();
        let remaining = available - exit_quantity;

        let mut closed = self.lots[idx].clone();
        closed.id = closed_lot_id.clone();
        closed.quantity = exit_quantity;
        closed.status = LotStatus::Closed;
        closed.exit_price = exit_price;
        closed.net_profit = settlement.net_profit;
        closed.exit_date = Some(exit_date);
        closed.note.clear();

        self.lots[idx].quantity = remaining;
        self.lots.insert(0, closed);

        info!(
            lot_id = %id,
            closed_lot_id = %closed_lot_id,
            exit_price = %exit_price,
            quantity = exit_quantity,
            remaining,
            net_profit = settlement.net_profit,
            "Partially closed lot"
        );

        Ok(CloseOutcome::Split {
            open_lot_id: id.clone(),
            closed_lot_id,
            remaining,
            settlement,
        })
    }

    pub fn update_stop_loss(&mut self, id: &LotId, stop_loss: Decimal) -> Result<(), LedgerError> {
        if stop_loss.is_negative() {
            return Err(LedgerError::InvalidInput(
                "stop-loss must be non-negative".to_string(),
            ));
        }
        let idx = self
            .position_with_status(id, LotStatus::Open)
            .ok_or_else(|| LedgerError::not_found(id, "open"))?;

        self.lots[idx].stop_loss = stop_loss;
        info!(lot_id = %id, stop_loss = %stop_loss, "Updated stop-loss");
        Ok(())
    }

    pub fn update_discount_rate(
        &mut self,
        id: &LotId,
        discount_rate: Decimal,
    ) -> Result<(), LedgerError> {
        if discount_rate.is_negative() {
            return Err(LedgerError::InvalidInput(
                "discount rate must be non-negative".to_string(),
            ));
        }
        let idx = self
            .position_with_status(id, LotStatus::Open)
            .ok_or_else(|| LedgerError::not_found(id, "open"))?;

        let lot = &self.lots[idx];
        self.schedule
            .compute(lot.entry_price, lot.quantity, discount_rate)?;

        self.lots[idx].discount_rate = discount_rate;
        info!(lot_id = %id, discount_rate = %discount_rate, "Updated discount rate");
        Ok(())
    }

    /// Notes only apply to realized trades.
    pub fn annotate(&mut self, id: &LotId, note: String) -> Result<(), LedgerError> {
        let idx = self
            .position_with_status(id, LotStatus::Closed)
            .ok_or_else(|| LedgerError::not_found(id, "closed"))?;

        self.lots[idx].note = note;
        info!(lot_id = %id, "Annotated lot");
        Ok(())
    }

    /// Remove a lot regardless of status. Absent ids are `NotFound`.
    pub fn delete_lot(&mut self, id: &LotId) -> Result<Lot, LedgerError> {
        let idx = self
            .lots
            .iter()
            .position(|lot| &lot.id == id)
            .ok_or_else(|| LedgerError::not_found(id, "existing"))?;

        let removed = self.lots.remove(idx);
        info!(lot_id = %id, status = %removed.status, "Deleted lot");
        Ok(removed)
    }
}
