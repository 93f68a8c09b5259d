//! Aggregates over closed lots.
//!
//! Everything here is recomputed from the lot list on each call.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::HoldingPeriodPolicy;
use crate::domain::{Decimal, Lot, LotId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
}

impl Period {
    /// Bucket label: ISO week `2024-W05` or month `2024-02`.
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            Period::Week => {
                let week = date.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Period::Month => format!("{}-{:02}", date.year(), date.month()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurvePoint {
    pub lot_id: LotId,
    pub exit_date: NaiveDate,
    pub net_profit: i64,
    pub cumulative: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotal {
    pub period: String,
    pub trades: usize,
    pub net_profit: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingPeriod {
    pub lot_id: LotId,
    pub days: i64,
    pub net_profit: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_net_profit: i64,
    pub win_rate: Option<Decimal>,
    pub average_holding_days: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyTotal {
    pub strategy: String,
    pub trades: usize,
    pub net_profit: i64,
    pub win_rate: Option<Decimal>,
}

fn closed<'a>(lots: impl IntoIterator<Item = &'a Lot>) -> impl Iterator<Item = &'a Lot> {
    lots.into_iter().filter(|lot| lot.is_closed())
}

/// Closed lots with an exit date, ascending by exit date.
///
/// Lots sharing an exit date keep their relative order reversed from the
/// snapshot, so earlier-recorded trades come first.
fn dated_ascending<'a>(lots: impl IntoIterator<Item = &'a Lot>) -> Vec<(&'a Lot, NaiveDate)> {
    let mut dated: Vec<_> = closed(lots)
        .filter_map(|lot| lot.exit_date.map(|date| (lot, date)))
        .collect();
    dated.reverse();
    dated.sort_by_key(|(_, date)| *date);
    dated
}

pub fn cumulative_curve<'a>(lots: impl IntoIterator<Item = &'a Lot>) -> Vec<CurvePoint> {
    let mut running = 0i64;
    dated_ascending(lots)
        .into_iter()
        .map(|(lot, exit_date)| {
            running += lot.net_profit;
            CurvePoint {
                lot_id: lot.id.clone(),
                exit_date,
                net_profit: lot.net_profit,
                cumulative: running,
            }
        })
        .collect()
}

pub fn period_totals<'a>(
    lots: impl IntoIterator<Item = &'a Lot>,
    period: Period,
) -> Vec<PeriodTotal> {
    let mut buckets: BTreeMap<String, (usize, i64)> = BTreeMap::new();
    for (lot, exit_date) in dated_ascending(lots) {
        let entry = buckets.entry(period.label(exit_date)).or_default();
        entry.0 += 1;
        entry.1 += lot.net_profit;
    }
    buckets
        .into_iter()
        .map(|(period, (trades, net_profit))| PeriodTotal {
            period,
            trades,
            net_profit,
        })
        .collect()
}

pub fn holding_days(lot: &Lot, policy: HoldingPeriodPolicy) -> Option<i64> {
    let raw = lot.raw_holding_days()?;
    Some(match policy {
        HoldingPeriodPolicy::ClampToOneDay => raw.max(1),
        HoldingPeriodPolicy::Raw => raw,
    })
}

pub fn holding_periods<'a>(
    lots: impl IntoIterator<Item = &'a Lot>,
    policy: HoldingPeriodPolicy,
) -> Vec<HoldingPeriod> {
    closed(lots)
        .filter_map(|lot| {
            holding_days(lot, policy).map(|days| HoldingPeriod {
                lot_id: lot.id.clone(),
                days,
                net_profit: lot.net_profit,
            })
        })
        .collect()
}

/// Number of trades per holding length in days.
pub fn holding_distribution<'a>(
    lots: impl IntoIterator<Item = &'a Lot>,
    policy: HoldingPeriodPolicy,
) -> BTreeMap<i64, usize> {
    let mut distribution = BTreeMap::new();
    for period in holding_periods(lots, policy) {
        *distribution.entry(period.days).or_insert(0) += 1;
    }
    distribution
}

fn ratio(numerator: usize, denominator: usize) -> Option<Decimal> {
    if denominator == 0 {
        return None;
    }
    Some(Decimal::from_u64(numerator as u64) / Decimal::from_u64(denominator as u64))
}

/// Share of closed lots with a positive net profit. `None` when nothing closed.
pub fn win_rate<'a>(lots: impl IntoIterator<Item = &'a Lot>) -> Option<Decimal> {
    let (wins, total) = closed(lots).fold((0usize, 0usize), |(w, t), lot| {
        (w + usize::from(lot.net_profit > 0), t + 1)
    });
    ratio(wins, total)
}

pub fn summary<'a>(
    lots: impl IntoIterator<Item = &'a Lot> + Clone,
    policy: HoldingPeriodPolicy,
) -> Summary {
    let closed_lots: Vec<&Lot> = closed(lots.clone()).collect();
    let wins = closed_lots.iter().filter(|l| l.net_profit > 0).count();
    let losses = closed_lots.iter().filter(|l| l.net_profit < 0).count();
    let total_net_profit = closed_lots.iter().map(|l| l.net_profit).sum();

    let periods = holding_periods(lots, policy);
    let average_holding_days = if periods.is_empty() {
        None
    } else {
        let total_days: i64 = periods.iter().map(|p| p.days).sum();
        Some(Decimal::from_i64(total_days) / Decimal::from_u64(periods.len() as u64))
    };

    Summary {
        trades: closed_lots.len(),
        wins,
        losses,
        total_net_profit,
        win_rate: ratio(wins, closed_lots.len()),
        average_holding_days,
    }
}

/// Per-strategy totals, ordered by strategy tag.
pub fn strategy_breakdown<'a>(lots: impl IntoIterator<Item = &'a Lot>) -> Vec<StrategyTotal> {
    let mut by_strategy: BTreeMap<&str, (usize, usize, i64)> = BTreeMap::new();
    for lot in closed(lots) {
        let entry = by_strategy.entry(lot.strategy.as_str()).or_default();
        entry.0 += 1;
        entry.1 += usize::from(lot.net_profit > 0);
        entry.2 += lot.net_profit;
    }
    by_strategy
        .into_iter()
        .map(|(strategy, (trades, wins, net_profit))| StrategyTotal {
            strategy: strategy.to_string(),
            trades,
            net_profit,
            win_rate: ratio(wins, trades),
        })
        .collect()
}
