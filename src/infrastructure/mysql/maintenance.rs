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

//! Target-side maintenance adapter: server variable probes, session tunings
//! around the write phase, and the post-processing stored routines.

use std::sync::Arc;

use log::{debug, warn};
use mysql::prelude::Queryable;
use r2d2::Pool;

use crate::domain::entities::ServerLimits;
use crate::domain::errors::{Result, SyncError};
use crate::infrastructure::mysql::connection_manager::MySqlConnectionManager;
use crate::ports::maintenance_port::MaintenancePort;

pub struct MySqlMaintenance {
    pool: Arc<Pool<MySqlConnectionManager>>,
}

impl MySqlMaintenance {
    pub fn new(pool: Arc<Pool<MySqlConnectionManager>>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<MySqlConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| SyncError::Database(format!("no connection available: {}", e)))
    }
}

impl MaintenancePort for MySqlMaintenance {
    /// Reads `max_connections` and `max_allowed_packet`; a probe that fails
    /// falls back to the documented defaults with a warning.
    fn server_limits(&self) -> Result<ServerLimits> {
        let mut conn = self.get_conn()?;
        let mut limits = ServerLimits::default();

        match conn.query_first::<(String, u32), _>("SHOW VARIABLES LIKE 'max_connections'") {
            Ok(Some((_, value))) => limits.max_connections = value,
            Ok(None) => warn!("max_connections not reported, using default"),
            Err(e) => warn!("Could not read max_connections, using default: {}", e),
        }

        match conn.query_first::<(String, u64), _>("SHOW VARIABLES LIKE 'max_allowed_packet'") {
            Ok(Some((_, value))) => limits.max_allowed_packet = value,
            Ok(None) => warn!("max_allowed_packet not reported, using default"),
            Err(e) => warn!("Could not read max_allowed_packet, using default: {}", e),
        }

        Ok(limits)
    }

    /// Toggles `unique_checks` and `foreign_key_checks` for the session.
    /// A tuning the server refuses is logged and skipped, not fatal.
    fn set_bulk_load_mode(&self, enabled: bool) -> Result<()> {
        let mut conn = self.get_conn()?;
        let flag = if enabled { 0 } else { 1 };
        for stmt in [
            format!("SET unique_checks={}", flag),
            format!("SET foreign_key_checks={}", flag),
        ] {
            if let Err(e) = conn.query_drop(&stmt) {
                warn!("Could not apply session tuning `{}`: {}", stmt, e);
            }
        }
        debug!("session tunings {}", if enabled { "relaxed" } else { "restored" });
        Ok(())
    }

    fn run_routine(&self, name: &str) -> Result<()> {
        let mut conn = self.get_conn().map_err(|e| SyncError::PostProcessing {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        conn.query_drop(format!("CALL {}()", name))
            .map_err(|e| SyncError::PostProcessing {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        debug!("routine {} executed", name);
        Ok(())
    }
}
