pub mod mysql;
pub mod sql_utils;
pub mod sqlite;
