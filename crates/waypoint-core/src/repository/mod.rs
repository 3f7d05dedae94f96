//! Durable storage of plan aggregates.
//!
//! [`PlanRepository`] is the async face of [`crate::db::Database`]: every
//! operation opens a connection on the blocking pool, so the executor never
//! blocks the runtime on SQLite.
//!
//! # Whole-document semantics
//!
//! The store only reads and replaces entire plan documents. Step and status
//! updates are read-modify-write cycles over the full plan:
//!
//! ```text
//! read (plan, version n) → mutate in memory → replace where version = n
//! ```
//!
//! A replace that finds a different version means another writer got there
//! first; the cycle is re-run against the fresh document, up to
//! `max_write_retries` times, before [`EngineError::Conflict`] is returned.
//!
//! ## Submodules
//!
//! - [`builder`]: Factory for creating [`PlanRepository`] instances
//! - [`plan_ops`]: Create, read, list and status updates
//! - [`step_ops`]: In-place step replacement and the claim/settle cycle
//! - [`message_ops`]: Session message log

use std::path::PathBuf;

use log::warn;
use tokio::task;

use crate::{
    db::Database,
    error::{EngineError, Result},
    models::Plan,
};

pub mod builder;
pub mod message_ops;
pub mod plan_ops;
pub mod step_ops;


pub use builder::RepositoryBuilder;

/// Default number of times a conflicting read-modify-write is retried.
pub const DEFAULT_WRITE_RETRIES: u32 = 3;

/// Async plan document store keyed by `(tenant_id, plan_id)`.
#[derive(Debug, Clone)]
pub struct PlanRepository {
    pub(crate) db_path: PathBuf,
    pub(crate) max_write_retries: u32,
}

impl PlanRepository {
    /// Creates a new repository over the database at `db_path`.
    pub(crate) fn new(db_path: PathBuf, max_write_retries: u32) -> Self {
        Self {
            db_path,
            max_write_retries,
        }
    }

    /// Runs `f` against a fresh connection on the blocking pool.
    pub(crate) async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            f(&mut db)
        })
        .await
        .map_err(EngineError::join)?
    }

    /// Read-modify-write of one plan document.
    ///
    /// `mutate` returns `Ok(false)` when the document needs no write; the
    /// stored plan is then returned unchanged. It may run more than once.
    /// The flag in the result tells whether a write happened.
    pub(crate) async fn modify_plan<F>(
        &self,
        tenant_id: &str,
        plan_id: &str,
        mutate: F,
    ) -> Result<(Plan, bool)>
    where
        F: Fn(&mut Plan) -> Result<bool> + Send + 'static,
    {
        let tenant_id = tenant_id.to_string();
        let plan_id = plan_id.to_string();
        let max_retries = self.max_write_retries;

        self.blocking(move |db| {
            let mut attempt = 0;
            loop {
                let mut plan = db
                    .get_plan(&tenant_id, &plan_id)?
                    .ok_or_else(|| EngineError::PlanNotFound { id: plan_id.clone() })?;

                if !mutate(&mut plan)? {
                    return Ok((plan, false));
                }
                plan.touch();

                match db.replace_plan(&plan) {
                    Err(EngineError::Conflict { expected, .. }) if attempt < max_retries => {
                        attempt += 1;
                        warn!(
                            "Plan {plan_id} changed under version {expected}, retrying write ({attempt}/{max_retries})"
                        );
                    }
                    other => return other.map(|plan| (plan, true)),
                }
            }
        })
        .await
    }
}
