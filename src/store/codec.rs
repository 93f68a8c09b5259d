//! Mapping between the stored table and `Lot` records.
//!
//! Reading is lenient: missing columns are backfilled (numbers with 0, text
//! with an empty string) and unparseable cells fall back to the same defaults
//! with a warning. The header of the loaded table keeps its column order on
//! write; unknown columns and their cells are carried through untouched.
//!
//! Sheets kept by the older journal app use Chinese column names and carry no
//! id column. Those names are read as aliases, and rows without a usable id
//! get one derived from their position and contents, so the same unchanged
//! sheet always yields the same ids.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

use super::Table;
use crate::domain::{Decimal, Lot, LotId, LotStatus, Symbol};

pub const COLUMNS: [&str; 13] = [
    "id",
    "open_date",
    "strategy",
    "symbol",
    "entry_price",
    "stop_loss",
    "quantity",
    "discount_rate",
    "status",
    "exit_price",
    "net_profit",
    "exit_date",
    "note",
];

/// Column names written by the older journal app.
pub const LEGACY_ALIASES: [(&str, &str); 8] = [
    ("日期", "open_date"),
    ("策略", "strategy"),
    ("代號", "symbol"),
    ("買入價", "entry_price"),
    ("股數", "quantity"),
    ("狀態", "status"),
    ("賣出價", "exit_price"),
    ("損益", "net_profit"),
];

/// Canonical column a header cell stands for, if any.
fn canonical_name(column: &str) -> Option<&'static str> {
    let column = column.trim();
    COLUMNS.iter().copied().find(|c| *c == column).or_else(|| {
        LEGACY_ALIASES
            .iter()
            .find(|(alias, _)| *alias == column)
            .map(|(_, canonical)| *canonical)
    })
}

/// Id for a row that has none (or a duplicate), stable for unchanged input.
fn derived_id(row: usize, cells: &[String], attempt: u32) -> LotId {
    let mut hasher = Sha256::new();
    hasher.update((row as u64).to_le_bytes());
    for cell in cells {
        hasher.update(cell.trim().as_bytes());
        hasher.update([0x1f]);
    }
    hasher.update(attempt.to_le_bytes());
    let hash = hasher.finalize();
    LotId::new(format!("row-{}", hex::encode(&hash[..12])))
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const LEGACY_DATE_FORMAT: &str = "%Y/%m/%d";

/// Decoded sheet: lots in stored order plus what is needed to write the
/// sheet back in its original shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub header: Vec<String>,
    pub lots: Vec<Lot>,
    extras: HashMap<LotId, BTreeMap<String, String>>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            header: COLUMNS.iter().map(|c| c.to_string()).collect(),
            lots: Vec::new(),
            extras: HashMap::new(),
        }
    }
}

struct RowReader<'a> {
    index: &'a HashMap<&'a str, usize>,
    cells: &'a [String],
    row: usize,
}

impl<'a> RowReader<'a> {
    fn text(&self, column: &str) -> &'a str {
        self.index
            .get(column)
            .and_then(|&i| self.cells.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    fn decimal(&self, column: &str) -> Decimal {
        let raw = self.text(column);
        if raw.is_empty() {
            return Decimal::zero();
        }
        Decimal::from_str_canonical(raw).unwrap_or_else(|e| {
            warn!(row = self.row, column, value = raw, error = %e, "Unparseable number, using 0");
            Decimal::zero()
        })
    }

    /// Integer cell; tolerates `"1000.0"` as written by spreadsheet tools.
    fn integer(&self, column: &str) -> i64 {
        let raw = self.text(column);
        if raw.is_empty() {
            return 0;
        }
        raw.parse::<i64>()
            .unwrap_or_else(|_| self.decimal(column).trunc_to_i64())
    }

    fn date(&self, column: &str) -> Option<NaiveDate> {
        let raw = self.text(column);
        if raw.is_empty() {
            return None;
        }
        let date_part = raw.split_whitespace().next().unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, DATE_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(date_part, LEGACY_DATE_FORMAT))
            .map_err(|e| {
                warn!(row = self.row, column, value = raw, error = %e, "Unparseable date");
            })
            .ok()
    }
}

fn encode_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn encode_cell(lot: &Lot, column: &str) -> Option<String> {
    let cell = match column {
        "id" => lot.id.as_str().to_string(),
        "open_date" => encode_date(Some(lot.open_date)),
        "strategy" => lot.strategy.clone(),
        "symbol" => lot.symbol.as_str().to_string(),
        "entry_price" => lot.entry_price.to_canonical_string(),
        "stop_loss" => lot.stop_loss.to_canonical_string(),
        "quantity" => lot.quantity.to_string(),
        "discount_rate" => lot.discount_rate.to_canonical_string(),
        "status" => lot.status.as_str().to_string(),
        "exit_price" => lot.exit_price.to_canonical_string(),
        "net_profit" => lot.net_profit.to_string(),
        "exit_date" => encode_date(lot.exit_date),
        "note" => lot.note.clone(),
        _ => return None,
    };
    Some(cell)
}

impl Snapshot {
    pub fn new(header: Vec<String>, lots: Vec<Lot>) -> Self {
        Self {
            header,
            lots,
            extras: HashMap::new(),
        }
    }

    /// Decode a stored table. Never fails; anomalies are logged.
    pub fn from_table(table: &Table) -> Self {
        if table.header.iter().all(|h| h.trim().is_empty()) && table.rows.is_empty() {
            return Self::default();
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, name) in table.header.iter().enumerate() {
            if let Some(column) = canonical_name(name) {
                index.entry(column).or_insert(i);
            }
        }
        for column in COLUMNS {
            if !index.contains_key(column) {
                warn!(column, "Column missing from stored sheet, backfilling defaults");
            }
        }

        let explicit: HashSet<LotId> = table
            .rows
            .iter()
            .filter_map(|cells| index.get("id").and_then(|&i| cells.get(i)))
            .map(|id| LotId::new(id.trim().to_string()))
            .filter(|id| !id.is_empty())
            .collect();
        let mut seen: HashSet<LotId> = HashSet::new();
        let mut lots = Vec::with_capacity(table.rows.len());
        let mut extras = HashMap::new();

        for (row, cells) in table.rows.iter().enumerate() {
            if cells.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            let reader = RowReader {
                index: &index,
                cells,
                row,
            };

            let quantity = reader.integer("quantity");
            if quantity <= 0 {
                warn!(row, quantity, "Skipping stored row with non-positive quantity");
                continue;
            }

            let mut id = LotId::new(reader.text("id").to_string());
            if id.is_empty() || seen.contains(&id) {
                let mut attempt = 0;
                let mut derived = derived_id(row, cells, attempt);
                while seen.contains(&derived) || explicit.contains(&derived) {
                    attempt += 1;
                    derived = derived_id(row, cells, attempt);
                }
                if !id.is_empty() {
                    warn!(row, old_id = %id, new_id = %derived, "Duplicate lot id, deriving a new one");
                }
                id = derived;
            }
            seen.insert(id.clone());

            let status = reader.text("status").parse::<LotStatus>().unwrap_or_else(|e| {
                warn!(row, error = %e, "Unknown status, treating lot as open");
                LotStatus::Open
            });

            let open_date = reader.date("open_date").unwrap_or_else(|| {
                warn!(row, lot_id = %id, "Missing open date, using epoch");
                NaiveDate::default()
            });

            let lot = Lot {
                id: id.clone(),
                symbol: Symbol::new(reader.text("symbol").to_string()),
                open_date,
                strategy: reader.text("strategy").to_string(),
                entry_price: reader.decimal("entry_price"),
                stop_loss: reader.decimal("stop_loss"),
                quantity: quantity as u64,
                discount_rate: reader.decimal("discount_rate"),
                status,
                exit_price: reader.decimal("exit_price"),
                net_profit: reader.integer("net_profit"),
                exit_date: reader.date("exit_date"),
                note: reader.text("note").to_string(),
            };

            let lot_extras: BTreeMap<String, String> = table
                .header
                .iter()
                .enumerate()
                .filter(|(_, name)| canonical_name(name).is_none())
                .filter_map(|(i, name)| cells.get(i).map(|v| (name.clone(), v.clone())))
                .collect();
            if !lot_extras.is_empty() {
                extras.insert(id, lot_extras);
            }

            lots.push(lot);
        }

        let mut header = table.header.clone();
        for column in COLUMNS {
            if !header.iter().any(|h| canonical_name(h) == Some(column)) {
                header.push(column.to_string());
            }
        }

        Self {
            header,
            lots,
            extras,
        }
    }

    /// Encode back into a table with this snapshot's header order.
    pub fn to_table(&self) -> Table {
        let rows = self
            .lots
            .iter()
            .map(|lot| {
                let extras = self.extras.get(&lot.id);
                self.header
                    .iter()
                    .map(|column| {
                        canonical_name(column)
                            .and_then(|c| encode_cell(lot, c))
                            .unwrap_or_else(|| {
                                extras
                                    .and_then(|e| e.get(column))
                                    .cloned()
                                    .unwrap_or_default()
                            })
                    })
                    .collect()
            })
            .collect();

        Table {
            header: self.header.clone(),
            rows,
        }
    }
}
