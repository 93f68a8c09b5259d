//! Load → apply → save cycle around the pure ledger.
//!
//! Every command reads the whole sheet, checks the caller's revision, runs
//! one ledger operation and writes the whole sheet back with a
//! compare-and-swap on the revision it loaded. Nothing is written when the
//! operation fails.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::HoldingPeriodPolicy;
use crate::datasource::{QuoteDiagnostic, QuoteSource};
use crate::domain::{Decimal, Lot, LotId, LotStatus, OpenLotRequest};
use crate::engine::reporting::{self, CurvePoint, HoldingPeriod, PeriodTotal, StrategyTotal, Summary};
use crate::engine::risk;
use crate::engine::{
    CloseOutcome, FeeSchedule, Ledger, LedgerError, Period, PositionStatus, RiskSummary,
};
use crate::store::{LotStore, Revision, Snapshot, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("revision conflict: expected {expected}, ledger is at {actual}")]
    Conflict { expected: Revision, actual: Revision },
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("stored ledger is corrupt: {0}")]
    Corrupt(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ServiceError::StoreUnavailable(msg),
            StoreError::Conflict { expected, actual } => ServiceError::Conflict { expected, actual },
            StoreError::Corrupt(msg) => ServiceError::Corrupt(msg),
        }
    }
}

/// Outcome of a committed command plus the revision it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    pub outcome: T,
    pub revision: Revision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerView {
    pub revision: Revision,
    pub lots: Vec<Lot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub revision: Revision,
    pub positions: Vec<PositionStatus>,
    pub summary: RiskSummary,
    pub diagnostics: Vec<QuoteDiagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub revision: Revision,
    pub summary: Summary,
    pub curve: Vec<CurvePoint>,
    pub period: Period,
    pub periods: Vec<PeriodTotal>,
    pub holding: Vec<HoldingPeriod>,
    pub holding_distribution: BTreeMap<i64, usize>,
    pub strategies: Vec<StrategyTotal>,
}

#[derive(Debug, Clone)]
pub struct LedgerService {
    store: Arc<dyn LotStore>,
    quotes: Arc<dyn QuoteSource>,
    schedule: FeeSchedule,
    holding_policy: HoldingPeriodPolicy,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn LotStore>,
        quotes: Arc<dyn QuoteSource>,
        schedule: FeeSchedule,
        holding_policy: HoldingPeriodPolicy,
    ) -> Self {
        Self {
            store,
            quotes,
            schedule,
            holding_policy,
        }
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    async fn load(&self) -> Result<(Snapshot, Revision), ServiceError> {
        let loaded = self.store.read_all().await?;
        let snapshot = Snapshot::from_table(&loaded.table);
        debug!(lots = snapshot.lots.len(), revision = %loaded.revision, "Loaded ledger");
        Ok((snapshot, loaded.revision))
    }

    /// Run one ledger command against the current sheet and persist it.
    async fn apply<T, F>(&self, expected: &Revision, op: F) -> Result<Committed<T>, ServiceError>
    where
        F: FnOnce(&mut Ledger) -> Result<T, LedgerError> + Send,
        T: Send,
    {
        let (mut snapshot, loaded) = self.load().await?;
        if &loaded != expected {
            return Err(ServiceError::Conflict {
                expected: expected.clone(),
                actual: loaded,
            });
        }

        let mut ledger = Ledger::new(std::mem::take(&mut snapshot.lots), self.schedule);
        let outcome = op(&mut ledger)?;
        snapshot.lots = ledger.into_lots();

        let revision = self.store.write_all(&snapshot.to_table(), &loaded).await?;
        info!(from = %loaded, to = %revision, "Committed ledger");
        Ok(Committed { outcome, revision })
    }

    pub async fn open_lot(
        &self,
        expected: &Revision,
        request: OpenLotRequest,
    ) -> Result<Committed<LotId>, ServiceError> {
        self.apply(expected, |ledger| ledger.open_lot(request)).await
    }

    pub async fn close_lot(
        &self,
        expected: &Revision,
        id: &LotId,
        exit_price: Decimal,
        exit_quantity: u64,
        exit_date: NaiveDate,
    ) -> Result<Committed<CloseOutcome>, ServiceError> {
        self.apply(expected, |ledger| {
            ledger.close_lot(id, exit_price, exit_quantity, exit_date)
        })
        .await
    }

    pub async fn update_stop_loss(
        &self,
        expected: &Revision,
        id: &LotId,
        stop_loss: Decimal,
    ) -> Result<Committed<()>, ServiceError> {
        self.apply(expected, |ledger| ledger.update_stop_loss(id, stop_loss))
            .await
    }

    pub async fn update_discount_rate(
        &self,
        expected: &Revision,
        id: &LotId,
        discount_rate: Decimal,
    ) -> Result<Committed<()>, ServiceError> {
        self.apply(expected, |ledger| {
            ledger.update_discount_rate(id, discount_rate)
        })
        .await
    }

    pub async fn annotate(
        &self,
        expected: &Revision,
        id: &LotId,
        note: String,
    ) -> Result<Committed<()>, ServiceError> {
        self.apply(expected, |ledger| ledger.annotate(id, note)).await
    }

    pub async fn delete_lot(
        &self,
        expected: &Revision,
        id: &LotId,
    ) -> Result<Committed<Lot>, ServiceError> {
        self.apply(expected, |ledger| ledger.delete_lot(id)).await
    }

    /// Current revision of the stored sheet.
    pub async fn revision(&self) -> Result<Revision, ServiceError> {
        Ok(self.store.read_all().await?.revision)
    }

    /// All lots, or only those with `status`, in snapshot order.
    pub async fn view(&self, status: Option<LotStatus>) -> Result<LedgerView, ServiceError> {
        let (snapshot, revision) = self.load().await?;
        let lots = match status {
            Some(status) => snapshot
                .lots
                .into_iter()
                .filter(|lot| lot.status == status)
                .collect(),
            None => snapshot.lots,
        };
        Ok(LedgerView { revision, lots })
    }

    /// Price every open lot and flag stop-loss breaches.
    ///
    /// Codes without a quote fall back to the entry price and are listed in
    /// `diagnostics`; the report itself never fails on quotes.
    pub async fn risk(&self) -> Result<RiskReport, ServiceError> {
        let (snapshot, revision) = self.load().await?;
        let open: Vec<&Lot> = snapshot.lots.iter().filter(|lot| lot.is_open()).collect();

        let codes: BTreeSet<String> = open.iter().filter_map(|lot| lot.symbol.code()).collect();
        let lookup = self.quotes.lookup_prices(&codes).await;

        let positions = risk::evaluate(open, &lookup.prices, &self.schedule);
        let summary = risk::summarize(&positions);
        info!(
            positions = summary.positions,
            breaches = summary.breaches,
            fallbacks = summary.fallbacks,
            "Evaluated open lots"
        );
        Ok(RiskReport {
            revision,
            positions,
            summary,
            diagnostics: lookup.diagnostics,
        })
    }

    pub async fn report(&self, period: Period) -> Result<PerformanceReport, ServiceError> {
        let (snapshot, revision) = self.load().await?;
        let lots = &snapshot.lots;
        let policy = self.holding_policy;

        Ok(PerformanceReport {
            revision,
            summary: reporting::summary(lots, policy),
            curve: reporting::cumulative_curve(lots),
            period,
            periods: reporting::period_totals(lots, period),
            holding: reporting::holding_periods(lots, policy),
            holding_distribution: reporting::holding_distribution(lots, policy),
            strategies: reporting::strategy_breakdown(lots),
        })
    }
}
