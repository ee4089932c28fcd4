//! # Row Classifier
//!
//! Decides, for each source row, whether the target needs an insert, an
//! update, or nothing at all. The decision is made entirely against the
//! in-memory snapshot so the streaming phase never issues point lookups.

use std::collections::HashMap;

use crate::domain::entities::{InventoryRecord, SourceRow, SyncOperation, TargetRecord};
use crate::domain::pricing::{calculate_prices, round2_opt, PricingConfig};

/// Classifies one source row against the target snapshot.
///
/// Decimal fields are compared in `round2` space on both sides; quantity is
/// compared exactly because source quantities are integral or half-step. A
/// null description or quantity on the target side always forces an update.
pub fn classify(
    row: &SourceRow,
    index: &HashMap<i64, TargetRecord>,
    cfg: &PricingConfig,
) -> SyncOperation {
    let derived = calculate_prices(row.cost, cfg);
    let cost = round2_opt(row.cost);
    let usd_value = round2_opt(row.usd_value);

    let record = InventoryRecord {
        id: row.id,
        description: row.description.clone(),
        quantity: row.quantity,
        cost,
        usd_value,
        sell_price: derived.sell_price,
        price_3x: derived.price_3x,
        price_6x: derived.price_6x,
        price_10x: derived.price_10x,
    };

    let existing = match index.get(&row.id) {
        Some(existing) => existing,
        None => return SyncOperation::Insert(record),
    };

    let unchanged = existing.description.as_deref() == Some(row.description.as_str())
        && existing.quantity == Some(row.quantity)
        && round2_opt(existing.cost) == cost
        && round2_opt(existing.usd_value) == usd_value
        && round2_opt(existing.sell_price) == derived.sell_price
        && round2_opt(existing.price_3x) == derived.price_3x
        && round2_opt(existing.price_6x) == derived.price_6x
        && round2_opt(existing.price_10x) == derived.price_10x;

    if unchanged {
        SyncOperation::Ignore
    } else {
        SyncOperation::Update(record)
    }
}
