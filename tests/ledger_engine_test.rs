use chrono::NaiveDate;
use lotledger::engine::{CloseOutcome, FeeSchedule, Ledger, LedgerError};
use lotledger::store::Snapshot;
use lotledger::{Decimal, LotStatus, OpenLotRequest, Symbol};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn date(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn request(symbol: &str, price: &str, quantity: u64) -> OpenLotRequest {
    OpenLotRequest {
        symbol: Symbol::new(symbol.to_string()),
        strategy: "突破".to_string(),
        entry_price: d(price),
        stop_loss: d("0"),
        quantity,
        discount_rate: d("2.8"),
        open_date: date(2024, 5, 2),
    }
}

fn total_quantity(ledger: &Ledger, symbol: &str) -> u64 {
    ledger
        .lots()
        .iter()
        .filter(|lot| lot.symbol.as_str() == symbol)
        .map(|lot| lot.quantity)
        .sum()
}

#[test]
fn test_repeated_partial_closes_conserve_quantity() {
    let mut ledger = Ledger::new(Vec::new(), FeeSchedule::default());
    let id = ledger.open_lot(request("2454 聯發科", "1000", 1000)).unwrap();

    let mut realized = 0i64;
    for (qty, px) in [(100, "1010"), (250, "990"), (300, "1050.5"), (350, "1100")] {
        let outcome = ledger
            .close_lot(&id, d(px), qty, date(2024, 6, 3))
            .unwrap();
        realized += outcome.settlement().net_profit;
        assert_eq!(total_quantity(&ledger, "2454 聯發科"), 1000);
    }

    // The last close took everything left, so the original lot is closed in place.
    let original = ledger.get(&id).unwrap();
    assert_eq!(original.status, LotStatus::Closed);
    assert_eq!(original.quantity, 350);
    assert!(ledger.open_lots().is_empty());
    assert_eq!(ledger.closed_lots().len(), 4);

    let booked: i64 = ledger.closed_lots().iter().map(|l| l.net_profit).sum();
    assert_eq!(booked, realized);
}

#[test]
fn test_split_fee_floor_applies_per_closed_lot() {
    let mut ledger = Ledger::new(Vec::new(), FeeSchedule::default());
    let id = ledger.open_lot(request("0050", "10", 3)).unwrap();

    // Notional 10 per leg: the raw fee truncates to 0 and is floored to 1.
    let outcome = ledger.close_lot(&id, d("10"), 1, date(2024, 5, 2)).unwrap();
    let settlement = outcome.settlement();
    assert_eq!(settlement.buy_fee, 1);
    assert_eq!(settlement.sell_fee, 1);
    assert_eq!(settlement.tax, 0);
    assert_eq!(settlement.net_profit, -2);
    assert!(matches!(outcome, CloseOutcome::Split { remaining: 2, .. }));
}

#[test]
fn test_closed_lot_rejects_further_closes_and_stop_loss() {
    let mut ledger = Ledger::new(Vec::new(), FeeSchedule::default());
    let id = ledger.open_lot(request("2330", "100", 1000)).unwrap();
    ledger.close_lot(&id, d("110"), 1000, date(2024, 5, 3)).unwrap();

    assert!(matches!(
        ledger.close_lot(&id, d("110"), 1, date(2024, 5, 3)),
        Err(LedgerError::NotFound { .. })
    ));
    assert!(matches!(
        ledger.update_stop_loss(&id, d("95")),
        Err(LedgerError::NotFound { .. })
    ));
    assert!(ledger.annotate(&id, "done".to_string()).is_ok());
}

#[test]
fn test_snapshot_round_trip_after_commands() {
    let mut ledger = Ledger::new(Vec::new(), FeeSchedule::default());
    let a = ledger.open_lot(request("2330 台積電", "585.5", 2000)).unwrap();
    ledger.open_lot(request("3008", "2450", 50)).unwrap();
    ledger.close_lot(&a, d("601"), 500, date(2024, 5, 20)).unwrap();
    ledger.update_stop_loss(&a, d("570.25")).unwrap();

    let snapshot = Snapshot::new(Snapshot::default().header, ledger.lots().to_vec());
    let decoded = Snapshot::from_table(&snapshot.to_table());
    assert_eq!(decoded.lots, ledger.lots());

    // Encoding the decoded snapshot again yields identical cells.
    assert_eq!(decoded.to_table(), snapshot.to_table());
}
