// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Core error definitions for the inventory synchronizer.
//!
//! This module provides a centralized `SyncError` enum and a `Result` type
//! used throughout the application. Scan failures on individual source rows
//! are recovered locally (logged and skipped) and therefore have no variant
//! here.

use std::fmt;

use thiserror::Error;

/// Which side of the sync a connection-level failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Target,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Source => write!(f, "source"),
            Endpoint::Target => write!(f, "target"),
        }
    }
}

/// Which kind of bulk batch a write failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Insert,
    Update,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKind::Insert => write!(f, "insert"),
            BatchKind::Update => write!(f, "update"),
        }
    }
}

/// Error types encountered during a synchronization run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot connect to {which} database: {reason}")]
    Connect { which: Endpoint, reason: String },

    #[error("Loading target snapshot failed: {0}")]
    Load(String),

    #[error("Source query failed: {0}")]
    SourceQuery(String),

    #[error("{kind} batch of {count} rows failed: {reason}")]
    Write {
        kind: BatchKind,
        count: usize,
        reason: String,
    },

    #[error("{kind} batch of {count} rows exceeds the server packet limit")]
    PacketTooLarge { kind: BatchKind, count: usize },

    #[error("Post-processing routine {name} failed: {reason}")]
    PostProcessing { name: String, reason: String },

    #[error("Synchronization cancelled")]
    Cancelled,

    #[error("Update check failed: {0}")]
    UpdateCheck(String),

    #[error("Report generation failed: {0}")]
    Report(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<mysql::Error> for SyncError {
    fn from(e: mysql::Error) -> Self {
        SyncError::Database(e.to_string())
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(e: rusqlite::Error) -> Self {
        SyncError::Database(e.to_string())
    }
}

/// A specialized Result type for the synchronizer.
pub type Result<T> = std::result::Result<T, SyncError>;
