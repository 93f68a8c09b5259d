//! Stop-loss and unrealized P/L evaluation for open lots.
//!
//! Read-only: evaluation never mutates the ledger.

use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use super::fees::{FeeSchedule, Settlement};
use crate::domain::{Decimal, Lot, LotId, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskSignal {
    /// Current price is below a set stop-loss.
    Breach,
    Profit,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Quote,
    /// No quote was available; the entry price stands in.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionStatus {
    pub lot_id: LotId,
    pub symbol: Symbol,
    pub code: Option<String>,
    pub quantity: u64,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub current_price: Decimal,
    pub price_source: PriceSource,
    /// Hypothetical full close at `current_price`.
    pub unrealized: Settlement,
    pub signal: RiskSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RiskSummary {
    pub positions: usize,
    pub market_value: i64,
    pub unrealized_net_profit: i64,
    pub breaches: usize,
    pub fallbacks: usize,
}

fn classify(lot: &Lot, current_price: Decimal, unrealized: &Settlement) -> RiskSignal {
    if lot.has_stop_loss() && current_price < lot.stop_loss {
        RiskSignal::Breach
    } else if unrealized.net_profit > 0 {
        RiskSignal::Profit
    } else {
        RiskSignal::Normal
    }
}

/// Evaluate every open lot against the quoted prices (keyed by symbol code).
pub fn evaluate<'a, I>(
    open_lots: I,
    price_by_code: &HashMap<String, Decimal>,
    schedule: &FeeSchedule,
) -> Vec<PositionStatus>
where
    I: IntoIterator<Item = &'a Lot>,
{
    open_lots
        .into_iter()
        .filter(|lot| lot.is_open())
        .filter_map(|lot| {
            let code = lot.symbol.code();
            let quoted = code.as_ref().and_then(|c| price_by_code.get(c)).copied();
            let settle = |price: Decimal| {
                schedule.settle(lot.entry_price, price, lot.quantity, lot.discount_rate)
            };

            let priced = match quoted.map(|px| (px, settle(px))) {
                Some((px, Ok(unrealized))) => Some((px, PriceSource::Quote, unrealized)),
                Some((px, Err(e))) => {
                    warn!(lot_id = %lot.id, price = %px, error = %e, "Quote out of range, using entry price");
                    None
                }
                None => None,
            };
            let (current_price, price_source, unrealized) = match priced {
                Some(priced) => priced,
                None => match settle(lot.entry_price) {
                    Ok(unrealized) => (lot.entry_price, PriceSource::Fallback, unrealized),
                    Err(e) => {
                        warn!(lot_id = %lot.id, error = %e, "Lot amounts out of range, skipping");
                        return None;
                    }
                },
            };
            let signal = classify(lot, current_price, &unrealized);

            Some(PositionStatus {
                lot_id: lot.id.clone(),
                symbol: lot.symbol.clone(),
                code,
                quantity: lot.quantity,
                entry_price: lot.entry_price,
                stop_loss: lot.stop_loss,
                current_price,
                price_source,
                unrealized,
                signal,
            })
        })
        .collect()
}

pub fn summarize(statuses: &[PositionStatus]) -> RiskSummary {
    statuses.iter().fold(RiskSummary::default(), |mut acc, s| {
        acc.positions += 1;
        acc.market_value = acc.market_value.saturating_add(s.unrealized.gross_proceeds);
        acc.unrealized_net_profit = acc
            .unrealized_net_profit
            .saturating_add(s.unrealized.net_profit);
        if s.signal == RiskSignal::Breach {
            acc.breaches += 1;
        }
        if s.price_source == PriceSource::Fallback {
            acc.fallbacks += 1;
        }
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LotStatus, OpenLotRequest};
    use chrono::NaiveDate;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn lot(id: &str, symbol: &str, entry: &str, stop: &str) -> Lot {
        Lot::open(
            LotId::from(id),
            OpenLotRequest {
                symbol: Symbol::new(symbol.to_string()),
                strategy: "突破追價".to_string(),
                entry_price: d(entry),
                stop_loss: d(stop),
                quantity: 1000,
                discount_rate: d("2.8"),
                open_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            },
        )
    }

    fn prices(pairs: &[(&str, &str)]) -> HashMap<String, Decimal> {
        pairs.iter().map(|(c, p)| (c.to_string(), d(p))).collect()
    }

    #[test]
    fn test_breach_below_stop_loss() {
        let lots = vec![lot("a", "2330 台積電", "100", "95")];
        let statuses = evaluate(&lots, &prices(&[("2330", "90")]), &FeeSchedule::default());
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].signal, RiskSignal::Breach);
        assert_eq!(statuses[0].price_source, PriceSource::Quote);
        assert_eq!(statuses[0].current_price, d("90"));
    }

    #[test]
    fn test_above_stop_loss_never_breach() {
        let lots = vec![lot("a", "2330 台積電", "100", "95")];
        let statuses = evaluate(&lots, &prices(&[("2330", "96")]), &FeeSchedule::default());
        // 96 is below entry, so the hypothetical close loses money.
        assert_eq!(statuses[0].signal, RiskSignal::Normal);

        let statuses = evaluate(&lots, &prices(&[("2330", "110")]), &FeeSchedule::default());
        assert_eq!(statuses[0].signal, RiskSignal::Profit);
        assert_eq!(statuses[0].unrealized.net_profit, 9588);
    }

    #[test]
    fn test_no_stop_loss_means_no_breach() {
        let lots = vec![lot("a", "2330", "100", "0")];
        let statuses = evaluate(&lots, &prices(&[("2330", "1")]), &FeeSchedule::default());
        assert_eq!(statuses[0].signal, RiskSignal::Normal);
    }

    #[test]
    fn test_missing_quote_falls_back_to_entry_price() {
        let lots = vec![lot("a", "2330 台積電", "100", "95"), lot("b", "台積電", "50", "0")];
        let statuses = evaluate(&lots, &HashMap::new(), &FeeSchedule::default());
        assert!(statuses
            .iter()
            .all(|s| s.price_source == PriceSource::Fallback));
        assert_eq!(statuses[0].current_price, d("100"));
        assert_eq!(statuses[1].code, None);
        // Flat price still pays fees and tax.
        assert!(statuses[0].unrealized.net_profit < 0);
        assert_eq!(statuses[0].signal, RiskSignal::Normal);
    }

    #[test]
    fn test_closed_lots_are_skipped() {
        let mut closed = lot("a", "2330", "100", "95");
        closed.status = LotStatus::Closed;
        let statuses = evaluate(&[closed], &prices(&[("2330", "90")]), &FeeSchedule::default());
        assert!(statuses.is_empty());
    }

    #[test]
    fn test_out_of_range_amounts_do_not_panic() {
        let mut huge = lot("a", "2330", "10000000", "0");
        huge.quantity = 10_000_000_000_000;
        let normal = lot("b", "2317", "100", "0");

        let statuses = evaluate(
            &[huge, normal],
            &prices(&[("2330", "10000000"), ("2317", "1e25")]),
            &FeeSchedule::default(),
        );
        // The oversized lot is skipped; the absurd quote falls back to entry.
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].lot_id, LotId::from("b"));
        assert_eq!(statuses[0].price_source, PriceSource::Fallback);
        assert_eq!(statuses[0].current_price, d("100"));
    }

    #[test]
    fn test_summary_totals() {
        let lots = vec![lot("a", "2330", "100", "95"), lot("b", "2317", "100", "0")];
        let statuses = evaluate(&lots, &prices(&[("2330", "90")]), &FeeSchedule::default());
        let summary = summarize(&statuses);
        assert_eq!(summary.positions, 2);
        assert_eq!(summary.breaches, 1);
        assert_eq!(summary.fallbacks, 1);
        assert_eq!(summary.market_value, 90_000 + 100_000);
        assert_eq!(
            summary.unrealized_net_profit,
            statuses[0].unrealized.net_profit + statuses[1].unrealized.net_profit
        );
    }
}
