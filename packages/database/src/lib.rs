#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Zone store access for the prediction engine.
//!
//! Uses `switchy_database` for all queries. The zones table belongs to the
//! web backend; this crate only reads the projection inputs and writes the
//! two prediction columns plus `updated_at`. Connections are opened per run
//! from [`db::StoreSettings`] and dropped when the run ends.

pub mod db;
pub mod zones;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Required connection settings are not set.
    #[error("Missing database configuration: {}", variables.join(", "))]
    MissingConfig {
        /// Names of the unset environment variables.
        variables: Vec<&'static str>,
    },

    /// Opening the connection failed.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
