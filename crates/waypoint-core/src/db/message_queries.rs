//! Session message log queries.

use jiff::Timestamp;
use rusqlite::{params, types::Type};

use crate::{
    error::{DatabaseResultExt, Result},
    models::AgentMessage,
};

const INSERT_MESSAGE_SQL: &str = "INSERT INTO messages (id, tenant_id, session_id, user_id, plan_id, step_id, source, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";
const SELECT_PLAN_MESSAGES_SQL: &str = "SELECT id, tenant_id, session_id, user_id, plan_id, step_id, source, content, created_at FROM messages WHERE tenant_id = ?1 AND plan_id = ?2 ORDER BY seq";

impl super::Database {
    /// Appends a message to the log.
    pub fn insert_message(&mut self, message: &AgentMessage) -> Result<()> {
        self.connection
            .execute(
                INSERT_MESSAGE_SQL,
                params![
                    message.id,
                    message.tenant_id,
                    message.session_id,
                    message.user_id,
                    message.plan_id,
                    message.step_id,
                    message.source,
                    message.content,
                    message.created_at.to_string(),
                ],
            )
            .db_context("Failed to insert message")?;
        Ok(())
    }

    /// Messages recorded for a plan, in insertion order.
    pub fn get_messages(&self, tenant_id: &str, plan_id: &str) -> Result<Vec<AgentMessage>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_PLAN_MESSAGES_SQL)
            .db_context("Failed to prepare query")?;

        let messages = stmt
            .query_map(params![tenant_id, plan_id], |row| {
                Ok(AgentMessage {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    session_id: row.get(2)?,
                    user_id: row.get(3)?,
                    plan_id: row.get(4)?,
                    step_id: row.get(5)?,
                    source: row.get(6)?,
                    content: row.get(7)?,
                    created_at: row.get::<_, String>(8)?.parse::<Timestamp>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e))
                    })?,
                })
            })
            .db_context("Failed to query messages")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to read message rows")?;

        Ok(messages)
    }
}
