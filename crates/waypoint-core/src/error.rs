//! Error types for the execution engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::AgentType;

/// Comprehensive error type for all engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Database connection or query errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// Plan not found for the given ID
    #[error("Plan with ID {id} not found")]
    PlanNotFound { id: String },
    /// Step not found within the given plan
    #[error("Step with ID {step_id} not found in plan {plan_id}")]
    StepNotFound { plan_id: String, step_id: String },
    /// A plan document with the same key already exists
    #[error("Plan with ID {id} already exists")]
    AlreadyExists { id: String },
    /// The stored document changed between read and replace
    #[error("Plan {id} was modified concurrently (expected version {expected})")]
    Conflict { id: String, expected: u64 },
    /// Illegal mutation or malformed input
    #[error("Invalid input for field '{field}': {reason}")]
    Validation { field: String, reason: String },
    /// A handler's backend call failed or returned malformed output
    #[error("Handler {agent} failed: {message}")]
    Handler { agent: AgentType, message: String },
    /// Provisioning a handler instance failed
    #[error("Failed to create handler {agent}: {message}")]
    HandlerCreation { agent: AgentType, message: String },
    /// The handler does not support the requested operation
    #[error("Handler {agent} does not support {operation}")]
    UnsupportedOperation {
        agent: AgentType,
        operation: &'static str,
    },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Builder for creating database errors with optional context.
pub struct DatabaseErrorBuilder {
    message: String,
}

impl DatabaseErrorBuilder {
    /// Create a new database error builder with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the error with the given source.
    pub fn with_source(self, source: rusqlite::Error) -> EngineError {
        EngineError::Database {
            message: self.message,
            source,
        }
    }
}

/// Builder for creating validation errors.
pub struct ValidationErrorBuilder {
    field: String,
}

impl ValidationErrorBuilder {
    /// Create a new validation error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> EngineError {
        EngineError::Validation {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl EngineError {
    /// Creates a builder for database errors.
    pub fn database(message: impl Into<String>) -> DatabaseErrorBuilder {
        DatabaseErrorBuilder::new(message)
    }

    /// Creates a builder for validation errors.
    pub fn validation(field: impl Into<String>) -> ValidationErrorBuilder {
        ValidationErrorBuilder::new(field)
    }

    /// Wraps a backend failure raised while a handler executed.
    pub fn handler(agent: AgentType, source: &anyhow::Error) -> Self {
        Self::Handler {
            agent,
            message: format!("{source:#}"),
        }
    }

    /// Wraps a backend failure raised while a handler was provisioned.
    pub fn handler_creation(agent: AgentType, source: &anyhow::Error) -> Self {
        Self::HandlerCreation {
            agent,
            message: format!("{source:#}"),
        }
    }

    /// Wraps a blocking task that panicked or was cancelled.
    pub(crate) fn join(source: tokio::task::JoinError) -> Self {
        Self::Configuration {
            message: format!("Task join error: {source}"),
        }
    }
}

/// Specialized extension trait for database-related Results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> Result<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|e| EngineError::database(message).with_source(e))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_keeps_context_chain() {
        let source = anyhow::anyhow!("connection reset").context("invoke Valuation_Agent");
        let err = EngineError::handler(AgentType::Valuation, &source);

        let text = err.to_string();
        assert!(text.contains("Valuation_Agent"));
        assert!(text.contains("connection reset"));
    }

    #[test]
    fn test_validation_builder() {
        let err = EngineError::validation("status").with_reason("plan is terminal");
        assert_eq!(
            err.to_string(),
            "Invalid input for field 'status': plan is terminal"
        );
    }
}
