//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::config::Config;
use crate::db;
use crate::models::doctor::doctor_schema;
use crate::query::{PgStore, QueryStore};

/// Store delegate returning JSON records.
pub type JsonStore = dyn QueryStore<Record = Value>;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Store backing the doctor listing.
    doctors: Arc<JsonStore>,
}

impl AppState {
    /// Connect to PostgreSQL and build the entity stores.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        let doctors = PgStore::new(pool, doctor_schema())
            .with_statement_timeout(config.query_statement_timeout);

        Ok(Self::with_doctor_store(Arc::new(doctors)))
    }

    /// Build state around an existing doctor store.
    pub fn with_doctor_store(doctors: Arc<JsonStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { doctors }),
        }
    }

    pub fn doctors(&self) -> &JsonStore {
        self.inner.doctors.as_ref()
    }
}
