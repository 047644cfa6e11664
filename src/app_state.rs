//! Defines the state of the application.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::db::initialize;

/// The state of the application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Handle to the application database.
    ///
    /// The mutex serializes all database access, including whole CSV
    /// ingestion runs, so concurrent requests cannot interleave their reads
    /// and writes.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create the app state, ensuring the database schema exists.
    ///
    /// # Errors
    /// Returns an error if the schema could not be created.
    pub fn new(db_connection: Connection) -> Result<Self, rusqlite::Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}
