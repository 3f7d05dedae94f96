//! Plan document reads and whole-document replaces.

use rusqlite::{params, ErrorCode, OptionalExtension};

use crate::{
    error::{DatabaseResultExt, EngineError, Result},
    models::Plan,
};

const INSERT_PLAN_SQL: &str = "INSERT INTO plans (tenant_id, id, session_id, status, version, document, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";
const SELECT_PLAN_SQL: &str =
    "SELECT version, document FROM plans WHERE tenant_id = ?1 AND id = ?2";
const SELECT_DOCUMENT_SQL: &str = "SELECT document FROM plans WHERE tenant_id = ?1 AND id = ?2";
const CHECK_PLAN_EXISTS_SQL: &str =
    "SELECT EXISTS(SELECT 1 FROM plans WHERE tenant_id = ?1 AND id = ?2)";
const REPLACE_PLAN_SQL: &str = "UPDATE plans SET status = ?1, version = ?2, document = ?3, updated_at = ?4 WHERE tenant_id = ?5 AND id = ?6 AND version = ?7";
const SELECT_TENANT_PLANS_SQL: &str = "SELECT version, document FROM plans WHERE tenant_id = ?1";
const SELECT_SESSION_PLANS_SQL: &str =
    "SELECT version, document FROM plans WHERE tenant_id = ?1 AND session_id = ?2";

impl super::Database {
    /// Persists a brand-new plan document.
    ///
    /// Fails with [`EngineError::AlreadyExists`] when the key is taken.
    pub fn insert_plan(&mut self, plan: &Plan) -> Result<()> {
        let document = serde_json::to_string(plan)?;

        self.connection
            .execute(
                INSERT_PLAN_SQL,
                params![
                    plan.tenant_id,
                    plan.id,
                    plan.session_id,
                    plan.status.as_str(),
                    plan.version as i64,
                    document,
                    plan.created_at.to_string(),
                    plan.updated_at.to_string(),
                ],
            )
            .map(|_| ())
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(ref failure, _)
                    if failure.code == ErrorCode::ConstraintViolation =>
                {
                    EngineError::AlreadyExists {
                        id: plan.id.clone(),
                    }
                }
                other => EngineError::database("Failed to insert plan").with_source(other),
            })
    }

    /// Point lookup of a plan document. Returns `None` when absent.
    pub fn get_plan(&self, tenant_id: &str, id: &str) -> Result<Option<Plan>> {
        let row = self
            .connection
            .query_row(SELECT_PLAN_SQL, params![tenant_id, id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .optional()
            .db_context("Failed to query plan")?;

        row.map(|(version, document)| Self::decode_plan(version, &document))
            .transpose()
    }

    /// Raw stored document text, exactly as last written.
    pub fn get_plan_document(&self, tenant_id: &str, id: &str) -> Result<Option<String>> {
        self.connection
            .query_row(SELECT_DOCUMENT_SQL, params![tenant_id, id], |row| row.get(0))
            .optional()
            .db_context("Failed to query plan document")
    }

    /// Replaces the whole stored document with `plan`, provided the stored
    /// version still equals `plan.version`. Returns the plan as written, with
    /// its version bumped.
    pub fn replace_plan(&mut self, plan: &Plan) -> Result<Plan> {
        let expected = plan.version;
        let mut written = plan.clone();
        written.version = expected + 1;
        let document = serde_json::to_string(&written)?;

        let changed = self
            .connection
            .execute(
                REPLACE_PLAN_SQL,
                params![
                    written.status.as_str(),
                    written.version as i64,
                    document,
                    written.updated_at.to_string(),
                    written.tenant_id,
                    written.id,
                    expected as i64,
                ],
            )
            .db_context("Failed to replace plan")?;

        if changed == 0 {
            return Err(if self.plan_exists(&plan.tenant_id, &plan.id)? {
                EngineError::Conflict {
                    id: plan.id.clone(),
                    expected,
                }
            } else {
                EngineError::PlanNotFound {
                    id: plan.id.clone(),
                }
            });
        }

        Ok(written)
    }

    /// Lists a tenant's plans, newest first, optionally for one session.
    pub fn list_plans(&self, tenant_id: &str, session_id: Option<&str>) -> Result<Vec<Plan>> {
        let rows: Vec<(i64, String)> = match session_id {
            Some(session_id) => {
                let mut stmt = self
                    .connection
                    .prepare(SELECT_SESSION_PLANS_SQL)
                    .db_context("Failed to prepare query")?;
                let rows = stmt
                    .query_map(params![tenant_id, session_id], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })
                    .db_context("Failed to query plans")?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .db_context("Failed to read plan rows")?;
                rows
            }
            None => {
                let mut stmt = self
                    .connection
                    .prepare(SELECT_TENANT_PLANS_SQL)
                    .db_context("Failed to prepare query")?;
                let rows = stmt
                    .query_map(params![tenant_id], |row| Ok((row.get(0)?, row.get(1)?)))
                    .db_context("Failed to query plans")?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .db_context("Failed to read plan rows")?;
                rows
            }
        };

        let mut plans = rows
            .iter()
            .map(|(version, document)| Self::decode_plan(*version, document))
            .collect::<Result<Vec<_>>>()?;
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(plans)
    }

    fn plan_exists(&self, tenant_id: &str, id: &str) -> Result<bool> {
        self.connection
            .query_row(CHECK_PLAN_EXISTS_SQL, params![tenant_id, id], |row| row.get(0))
            .db_context("Failed to check plan existence")
    }

    /// The version column is authoritative over the copy inside the document.
    fn decode_plan(version: i64, document: &str) -> Result<Plan> {
        let mut plan: Plan = serde_json::from_str(document)?;
        plan.version = version as u64;
        Ok(plan)
    }
}
