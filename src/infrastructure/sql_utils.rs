//! Shared SQL text for the inventory sync. Both the live MySQL adapters and
//! the developer-mode SQLite adapters execute these statements, so the text
//! sticks to the portable subset of SQL.

/// Fixed projection of active source rows: stock joined with its quantity
/// and, when present, the USD indexer value.
pub const SOURCE_PROJECTION: &str = "\
SELECT s.id, s.description, p.current_qty, s.cost, i.usd_value \
FROM stock s \
JOIN stock_product p ON s.id = p.product_id \
LEFT JOIN stock_indexer i ON i.stock_id = s.id \
WHERE s.status = 'A'";

/// Row count used to pre-allocate the snapshot index.
pub const SNAPSHOT_COUNT: &str = "SELECT COUNT(*) FROM inventory WHERE id IS NOT NULL";

/// Full snapshot of the target table, nine columns per row.
pub const SNAPSHOT_SELECT: &str = "\
SELECT id, description, quantity, cost, usd_value, sell_price, price_3x, price_6x, price_10x \
FROM inventory WHERE id IS NOT NULL";

/// Per-row update statement, prepared once per batch transaction.
pub const UPDATE_STATEMENT: &str = "\
UPDATE inventory \
SET description = ?, quantity = ?, cost = ?, usd_value = ?, \
    sell_price = ?, price_3x = ?, price_6x = ?, price_10x = ? \
WHERE id = ?";

const INSERT_PREFIX: &str = "\
INSERT INTO inventory (id, description, quantity, cost, usd_value, \
sell_price, price_3x, price_6x, price_10x) VALUES ";

const INSERT_VALUE_GROUP: &str = "(?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// Builds the multi-row insert statement for `count` value groups.
pub fn build_insert_statement(count: usize) -> String {
    let mut sql =
        String::with_capacity(INSERT_PREFIX.len() + count * (INSERT_VALUE_GROUP.len() + 2));
    sql.push_str(INSERT_PREFIX);
    for i in 0..count {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(INSERT_VALUE_GROUP);
    }
    sql
}
