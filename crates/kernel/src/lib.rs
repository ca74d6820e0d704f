//! Clinic API Kernel Library
//!
//! Exposes the list-query engine, entity models and HTTP routes.
//! The main entry point for running the server is the `clinic` binary.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod routes;
pub mod state;

pub use config::Config;
pub use state::AppState;
