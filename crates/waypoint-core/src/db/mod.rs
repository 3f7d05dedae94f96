//! Database operations and SQLite management for plan documents.
//!
//! This module provides the low-level, synchronous storage primitives: point
//! reads and whole-document replaces of plans keyed by `(tenant_id, id)`,
//! plus the append-only session message log. Read-modify-write sequences and
//! async access live in [`crate::repository`].

use std::path::Path;

use rusqlite::Connection;

use crate::error::{DatabaseResultExt, Result};

pub mod message_queries;
pub mod migrations;
pub mod plan_queries;

/// Database connection and operations handler.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Creates a new database connection and initializes the schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = Connection::open(path).db_context("Failed to open database connection")?;

        let db = Self { connection };
        db.initialize_schema()?;
        Ok(db)
    }
}
