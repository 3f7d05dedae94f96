//! Message log operations for the PlanRepository.

use super::PlanRepository;
use crate::{error::Result, models::AgentMessage, params::PlanRef};

impl PlanRepository {
    /// Appends a message to the plan's session log.
    pub async fn add_message(&self, message: &AgentMessage) -> Result<()> {
        let message = message.clone();

        self.blocking(move |db| db.insert_message(&message)).await
    }

    /// Messages recorded for a plan, oldest first.
    pub async fn list_messages(&self, params: &PlanRef) -> Result<Vec<AgentMessage>> {
        let PlanRef { tenant_id, plan_id } = params.clone();

        self.blocking(move |db| db.get_messages(&tenant_id, &plan_id))
            .await
    }
}
