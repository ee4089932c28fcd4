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

//! # Runtime Context
//!
//! Sets up the shared resources a live run needs:
//! 1. **Connection pools**: `r2d2` over the MySQL driver, one pool per
//!    endpoint, each tuned separately.
//! 2. **Worker scaling**: twice the CPU count, clamped to `[4, 20]` and
//!    never above the target pool capacity.
//!
//! The target pool size is derived from the server's own `max_connections`
//! so the sync cannot starve other clients.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use mysql::prelude::Queryable;
use r2d2::{ManageConnection, Pool};

use crate::config::AppConfig;
use crate::domain::errors::{Endpoint, Result, SyncError};
use crate::infrastructure::mysql::connection_manager::MySqlConnectionManager;

const SOURCE_POOL_MAX: u32 = 25;
const SOURCE_POOL_IDLE: u32 = 10;
const DEFAULT_MAX_CONNECTIONS: u32 = 200;

/// Shared resources that exist for the whole life of a live run.
pub struct RuntimeContext {
    pub source_pool: Arc<Pool<MySqlConnectionManager>>,
    pub target_pool: Arc<Pool<MySqlConnectionManager>>,
    pub workers: usize,
}

impl RuntimeContext {
    pub fn init(config: &AppConfig) -> Result<Self> {
        let source_manager = manager_for(Endpoint::Source, &config.source.dsn)?;
        let target_manager = manager_for(Endpoint::Target, &config.target.dsn)?;

        // The target pool size depends on the server's declared capacity,
        // which has to be probed on a direct connection before the pool
        // exists.
        let max_connections = probe_max_connections(&target_manager);
        let target_cap = target_pool_cap(max_connections);
        let workers = worker_count(num_cpus::get()).min(target_cap as usize);

        info!(
            "Initializing pools: source={}/{} target={} workers={}",
            SOURCE_POOL_MAX, SOURCE_POOL_IDLE, target_cap, workers
        );

        let source_pool = Pool::builder()
            .max_size(SOURCE_POOL_MAX)
            .min_idle(Some(SOURCE_POOL_IDLE))
            .idle_timeout(Some(Duration::from_secs(2 * 60)))
            .max_lifetime(Some(Duration::from_secs(30 * 60)))
            .build(source_manager)
            .map_err(|e| SyncError::Connect {
                which: Endpoint::Source,
                reason: e.to_string(),
            })?;

        let target_pool = Pool::builder()
            .max_size(target_cap)
            .min_idle(Some(2))
            .idle_timeout(Some(Duration::from_secs(2 * 60)))
            .max_lifetime(Some(Duration::from_secs(5 * 60)))
            .build(target_manager)
            .map_err(|e| SyncError::Connect {
                which: Endpoint::Target,
                reason: e.to_string(),
            })?;

        Ok(Self {
            source_pool: Arc::new(source_pool),
            target_pool: Arc::new(target_pool),
            workers,
        })
    }
}

fn manager_for(which: Endpoint, dsn: &str) -> Result<MySqlConnectionManager> {
    MySqlConnectionManager::from_dsn(dsn).map_err(|e| SyncError::Connect {
        which,
        reason: format!("invalid DSN: {}", e),
    })
}

/// Twice the CPU count, clamped to `[4, 20]`.
pub fn worker_count(cpus: usize) -> usize {
    (cpus * 2).clamp(4, 20)
}

/// 80 % of the server's declared `max_connections`, clamped to `[50, 200]`.
pub fn target_pool_cap(max_connections: u32) -> u32 {
    ((max_connections as f64 * 0.8) as u32).clamp(50, 200)
}

fn probe_max_connections(manager: &MySqlConnectionManager) -> u32 {
    match manager.connect() {
        Ok(mut conn) => {
            match conn.query_first::<(String, u32), _>("SHOW VARIABLES LIKE 'max_connections'") {
                Ok(Some((_, value))) => value,
                Ok(None) => DEFAULT_MAX_CONNECTIONS,
                Err(e) => {
                    warn!("Could not read max_connections, using default pool size: {}", e);
                    DEFAULT_MAX_CONNECTIONS
                }
            }
        }
        Err(e) => {
            // The pool build below will surface the real connect error.
            warn!("Probe connection failed, using default pool size: {}", e);
            DEFAULT_MAX_CONNECTIONS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_is_clamped() {
        assert_eq!(worker_count(1), 4);
        assert_eq!(worker_count(2), 4);
        assert_eq!(worker_count(6), 12);
        assert_eq!(worker_count(16), 20);
        assert_eq!(worker_count(64), 20);
    }

    #[test]
    fn target_pool_cap_tracks_server_capacity() {
        assert_eq!(target_pool_cap(40), 50);
        assert_eq!(target_pool_cap(100), 80);
        assert_eq!(target_pool_cap(151), 120);
        assert_eq!(target_pool_cap(1000), 200);
    }
}
