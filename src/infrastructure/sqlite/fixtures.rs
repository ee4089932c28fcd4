//! Developer-mode fixtures backed by embedded SQLite files.
//!
//! When `dev_mode` is on, both endpoints are local SQLite databases so the
//! whole pipeline can run without a live server. The source database is
//! seeded from `dev_source_data.sql` when that file exists, falling back to
//! a small built-in sample; the target starts out as an empty inventory
//! table and fills up across runs.

use std::path::Path;

use log::{info, warn};
use rusqlite::Connection;

use crate::domain::errors::Result;

pub const DEV_SOURCE_PATH: &str = "./dev_source.db";
pub const DEV_TARGET_PATH: &str = "./dev_target.db";
pub const DEV_SEED_FILE: &str = "./dev_source_data.sql";

const SOURCE_SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS stock (
    id INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    cost REAL,
    status TEXT DEFAULT 'A'
);

CREATE TABLE IF NOT EXISTS stock_product (
    product_id INTEGER PRIMARY KEY,
    current_qty REAL DEFAULT 0,
    FOREIGN KEY (product_id) REFERENCES stock(id)
);

CREATE TABLE IF NOT EXISTS stock_indexer (
    stock_id INTEGER PRIMARY KEY,
    usd_value REAL DEFAULT 0,
    FOREIGN KEY (stock_id) REFERENCES stock(id)
);
";

const SOURCE_SAMPLE_DATA: &str = "\
INSERT INTO stock (id, description, cost, status) VALUES
    (1, 'Product A - Sample Item', 100.00, 'A'),
    (2, 'Product B - Test Widget', 250.50, 'A'),
    (3, 'Product C - Development Kit', 500.00, 'A'),
    (4, 'Product D - Mock Component', 75.25, 'A'),
    (5, 'Product E - Testing Tool', 150.00, 'A'),
    (100, 'Inactive Product', 200.00, 'I');

INSERT INTO stock_product (product_id, current_qty) VALUES
    (1, 50),
    (2, 25),
    (3, 10),
    (4, 100),
    (5, 35),
    (100, 0);

INSERT INTO stock_indexer (stock_id, usd_value) VALUES
    (1, 18.50),
    (2, 46.20),
    (3, 92.40),
    (4, 13.90),
    (5, 27.70),
    (100, 36.90);
";

const TARGET_SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS inventory (
    id INTEGER PRIMARY KEY,
    description TEXT,
    quantity REAL,
    cost REAL,
    usd_value REAL,
    sell_price REAL,
    price_3x REAL,
    price_6x REAL,
    price_10x REAL
);
";

/// Opens the fixture source database, creating and seeding it on first use.
pub fn open_dev_source(path: &str) -> Result<Connection> {
    let fresh = !Path::new(path).exists();
    let conn = Connection::open(path)?;
    if fresh {
        init_source_schema(&conn)?;
    }
    info!("SQLite source fixture ready at {} (DEV MODE)", path);
    Ok(conn)
}

/// Opens the fixture target database, creating the empty table on first use.
pub fn open_dev_target(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(TARGET_SCHEMA)?;
    info!("SQLite target fixture ready at {} (DEV MODE)", path);
    Ok(conn)
}

fn init_source_schema(conn: &Connection) -> Result<()> {
    match std::fs::read_to_string(DEV_SEED_FILE) {
        Ok(sql) => {
            info!("Seeding source fixture from {}", DEV_SEED_FILE);
            conn.execute_batch(&sql)?;
        }
        Err(_) => {
            warn!(
                "{} not found, seeding source fixture with built-in sample data",
                DEV_SEED_FILE
            );
            conn.execute_batch(SOURCE_SCHEMA)?;
            conn.execute_batch(SOURCE_SAMPLE_DATA)?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn open_sample_source_in_memory() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SOURCE_SCHEMA).unwrap();
    conn.execute_batch(SOURCE_SAMPLE_DATA).unwrap();
    conn
}

#[cfg(test)]
pub(crate) fn open_target_in_memory() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(TARGET_SCHEMA).unwrap();
    conn
}
