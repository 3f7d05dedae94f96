//! Agent role tags and the handler variant each one maps to.

use std::{fmt, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Closed set of roles a step can be assigned to.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema,
)]
pub enum AgentType {
    /// Decomposes an objective into a plan
    #[serde(rename = "Planner_Agent")]
    Planner,

    /// Financial analysis, market trends and investment strategy
    #[serde(rename = "Investment_Analyst_Agent")]
    InvestmentAnalyst,

    /// Property values, comparable sales and after-repair value
    #[serde(rename = "Valuation_Agent")]
    Valuation,

    /// Local laws, building codes and permitted use
    #[serde(rename = "Zoning_Compliance_Agent")]
    ZoningCompliance,

    /// Raw knowledge-base lookups
    #[serde(rename = "Document_Retrieval_Agent")]
    DocumentRetrieval,

    /// Direct user input or approval
    #[serde(rename = "Human_Agent")]
    Human,
}

/// Handler variant behind an agent type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Planner,
    Specialist,
    Retrieval,
    Human,
}

impl AgentType {
    /// Roles the planner may assign steps to.
    pub const ASSIGNABLE: [AgentType; 5] = [
        AgentType::InvestmentAnalyst,
        AgentType::Valuation,
        AgentType::ZoningCompliance,
        AgentType::DocumentRetrieval,
        AgentType::Human,
    ];

    /// Wire name of the role, also used as the remote definition name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Planner => "Planner_Agent",
            AgentType::InvestmentAnalyst => "Investment_Analyst_Agent",
            AgentType::Valuation => "Valuation_Agent",
            AgentType::ZoningCompliance => "Zoning_Compliance_Agent",
            AgentType::DocumentRetrieval => "Document_Retrieval_Agent",
            AgentType::Human => "Human_Agent",
        }
    }

    pub fn kind(&self) -> HandlerKind {
        match self {
            AgentType::Planner => HandlerKind::Planner,
            AgentType::InvestmentAnalyst | AgentType::Valuation | AgentType::ZoningCompliance => {
                HandlerKind::Specialist
            }
            AgentType::DocumentRetrieval => HandlerKind::Retrieval,
            AgentType::Human => HandlerKind::Human,
        }
    }

    pub fn is_human(&self) -> bool {
        self.kind() == HandlerKind::Human
    }

    /// One-line description used in the planner's instructions.
    pub fn capability(&self) -> &'static str {
        match self {
            AgentType::Planner => "Breaks an objective down into an ordered plan.",
            AgentType::InvestmentAnalyst => {
                "For financial analysis, market trends, and investment strategy."
            }
            AgentType::Valuation => {
                "For determining property values, finding comparable sales (comps), and estimating After-Repair Value (ARV)."
            }
            AgentType::ZoningCompliance => {
                "For questions about local laws, building codes, and what can be built on a property."
            }
            AgentType::DocumentRetrieval => {
                "Only retrieves documents from a knowledge base when asked."
            }
            AgentType::Human => "If direct user input or approval is required for a step.",
        }
    }
}

impl FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        let normalized = normalized.strip_suffix("_agent").unwrap_or(&normalized);
        match normalized {
            "planner" => Ok(AgentType::Planner),
            "investment_analyst" | "investment" => Ok(AgentType::InvestmentAnalyst),
            "valuation" => Ok(AgentType::Valuation),
            "zoning_compliance" | "zoning" => Ok(AgentType::ZoningCompliance),
            "document_retrieval" | "retrieval" => Ok(AgentType::DocumentRetrieval),
            "human" | "user_proxy" => Ok(AgentType::Human),
            _ => Err(format!("Unknown agent type: {s}")),
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
