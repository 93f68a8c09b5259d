//! Commission and transaction-tax arithmetic.
//!
//! Every intermediate amount is truncated to whole currency units before it is
//! combined, so results match a broker statement to the unit. Do not fold the
//! truncations into a single rounding at the end.

use crate::config::ZeroNotionalFee;
use crate::domain::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Standard commission: 0.1425% of notional, per leg.
pub const STANDARD_COMMISSION_RATE: (i64, u32) = (1425, 6);
/// Transaction tax: 0.3% of the sell notional.
pub const TRANSACTION_TAX_RATE: (i64, u32) = (3, 3);
/// Minimum commission per leg, in currency units.
pub const MIN_FEE: i64 = 1;
/// Largest amount, in currency units, any single leg may reach.
pub const MAX_NOTIONAL: i64 = 1_000_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("amount exceeds the supported notional of 10^15 currency units")]
pub struct AmountOutOfRange;

fn to_units(amount: Option<Decimal>) -> Result<i64, AmountOutOfRange> {
    amount
        .and_then(|a| a.checked_trunc_to_i64())
        .filter(|units| units.abs() <= MAX_NOTIONAL)
        .ok_or(AmountOutOfRange)
}

/// Cost of one leg (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegCost {
    /// Truncated notional, price × quantity.
    pub cost: i64,
    pub fee: i64,
}

/// Full breakdown of a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub buy_cost: i64,
    pub buy_fee: i64,
    pub gross_proceeds: i64,
    pub sell_fee: i64,
    pub tax: i64,
    pub net_profit: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub commission_rate: Decimal,
    pub tax_rate: Decimal,
    pub min_fee: i64,
    pub zero_notional: ZeroNotionalFee,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::new(ZeroNotionalFee::Floor)
    }
}

impl FeeSchedule {
    pub fn new(zero_notional: ZeroNotionalFee) -> Self {
        let (c_num, c_scale) = STANDARD_COMMISSION_RATE;
        let (t_num, t_scale) = TRANSACTION_TAX_RATE;
        Self {
            commission_rate: Decimal::from_scaled(c_num, c_scale),
            tax_rate: Decimal::from_scaled(t_num, t_scale),
            min_fee: MIN_FEE,
            zero_notional,
        }
    }

    /// Effective commission rate: standard × (discount / 10).
    pub fn effective_rate(&self, discount_rate: Decimal) -> Decimal {
        self.commission_rate * (discount_rate / Decimal::from_i64(10))
    }

    /// Commission on a notional, floored at `min_fee`.
    pub fn fee(&self, notional: i64, discount_rate: Decimal) -> Result<i64, AmountOutOfRange> {
        if notional == 0 && self.zero_notional == ZeroNotionalFee::Waive {
            return Ok(0);
        }
        let raw = to_units(
            Decimal::from_i64(notional).checked_mul(self.effective_rate(discount_rate)),
        )?;
        Ok(raw.max(self.min_fee))
    }

    /// Transaction tax on a sell notional. No minimum.
    pub fn tax(&self, sell_notional: i64) -> Result<i64, AmountOutOfRange> {
        to_units(Decimal::from_i64(sell_notional).checked_mul(self.tax_rate))
    }

    /// Notional and commission of a single leg.
    pub fn compute(
        &self,
        price: Decimal,
        quantity: u64,
        discount_rate: Decimal,
    ) -> Result<LegCost, AmountOutOfRange> {
        let cost = to_units(price.checked_mul(Decimal::from_u64(quantity)))?;
        Ok(LegCost {
            cost,
            fee: self.fee(cost, discount_rate)?,
        })
    }

    /// Round-trip breakdown: buy at `entry_price`, sell at `exit_price`.
    pub fn settle(
        &self,
        entry_price: Decimal,
        exit_price: Decimal,
        quantity: u64,
        discount_rate: Decimal,
    ) -> Result<Settlement, AmountOutOfRange> {
        let buy = self.compute(entry_price, quantity, discount_rate)?;
        let sell = self.compute(exit_price, quantity, discount_rate)?;
        let tax = self.tax(sell.cost)?;
        // Each term is within MAX_NOTIONAL, so the sum fits in i64.
        let net_profit = (sell.cost - sell.fee - tax) - (buy.cost + buy.fee);

        Ok(Settlement {
            buy_cost: buy.cost,
            buy_fee: buy.fee,
            gross_proceeds: sell.cost,
            sell_fee: sell.fee,
            tax,
            net_profit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_settle_reference_example() {
        let schedule = FeeSchedule::default();
        let s = schedule.settle(d("100"), d("110"), 1000, d("2.8")).unwrap();
        assert_eq!(s.buy_cost, 100_000);
        assert_eq!(s.buy_fee, 39);
        assert_eq!(s.gross_proceeds, 110_000);
        assert_eq!(s.sell_fee, 43);
        assert_eq!(s.tax, 330);
        assert_eq!(s.net_profit, 9588);
    }

    #[test]
    fn test_fee_floor_applies_to_small_notional() {
        let schedule = FeeSchedule::default();
        // 100 * 0.001425 * 0.28 = 0.0399 -> 0 -> floored to 1
        assert_eq!(schedule.compute(d("10"), 10, d("2.8")).unwrap().fee, 1);
        // 10000 * 0.001425 = 14.25 at full commission
        assert_eq!(schedule.compute(d("10"), 1000, d("10")).unwrap().fee, 14);
    }

    #[test]
    fn test_fee_truncates_rather_than_rounds() {
        let schedule = FeeSchedule::default();
        // 35000 * 0.001425 * 0.6 = 29.925
        assert_eq!(schedule.fee(35_000, d("6")), Ok(29));
    }

    #[test]
    fn test_zero_notional_floor_policy_charges_minimum() {
        let schedule = FeeSchedule::new(ZeroNotionalFee::Floor);
        let leg = schedule.compute(Decimal::zero(), 1000, d("2.8")).unwrap();
        assert_eq!(leg.cost, 0);
        assert_eq!(leg.fee, 1);
    }

    #[test]
    fn test_zero_notional_waive_policy_charges_nothing() {
        let schedule = FeeSchedule::new(ZeroNotionalFee::Waive);
        let leg = schedule.compute(Decimal::zero(), 1000, d("2.8")).unwrap();
        assert_eq!(leg.fee, 0);
        // Waive only affects an exactly-zero notional.
        assert_eq!(schedule.compute(d("0.01"), 1, d("2.8")).unwrap().fee, 1);
    }

    #[test]
    fn test_tax_has_no_floor() {
        let schedule = FeeSchedule::default();
        assert_eq!(schedule.tax(100).unwrap(), 0);
        assert_eq!(schedule.tax(0).unwrap(), 0);
        assert_eq!(schedule.tax(1_000).unwrap(), 3);
    }

    #[test]
    fn test_notional_truncated_before_fee() {
        let schedule = FeeSchedule::default();
        // 33.35 * 3 = 100.05 -> 100
        let leg = schedule.compute(d("33.35"), 3, d("10")).unwrap();
        assert_eq!(leg.cost, 100);
    }

    #[test]
    fn test_losing_trade_is_negative() {
        let schedule = FeeSchedule::default();
        let s = schedule.settle(d("100"), d("90"), 1000, d("2.8")).unwrap();
        // 90000 - 35 - 270 - (100000 + 39)
        assert_eq!(s.sell_fee, 35);
        assert_eq!(s.tax, 270);
        assert_eq!(s.net_profit, -10_344);
    }

    #[test]
    fn test_oversized_amounts_are_rejected() {
        let schedule = FeeSchedule::default();
        assert_eq!(
            schedule.settle(
                Decimal::from_i64(10_000_000),
                Decimal::from_i64(10_000_000),
                10_000_000_000_000,
                Decimal::from_i64(10),
            ),
            Err(AmountOutOfRange)
        );
        assert_eq!(
            schedule.compute(d("1e20"), u64::MAX, d("2.8")),
            Err(AmountOutOfRange)
        );
        assert_eq!(schedule.fee(1_000_000, d("1e27")), Err(AmountOutOfRange));
        // Exactly at the cap is still accepted.
        assert_eq!(
            schedule.compute(Decimal::from_i64(MAX_NOTIONAL), 1, d("2.8")).unwrap().cost,
            MAX_NOTIONAL
        );
    }

    #[test]
    fn test_flat_trade_still_costs_fees_and_tax() {
        let schedule = FeeSchedule::default();
        let s = schedule.settle(d("50"), d("50"), 1000, d("2.8")).unwrap();
        assert!(s.net_profit < 0);
        assert_eq!(s.net_profit, -(s.buy_fee + s.sell_fee + s.tax));
    }
}
