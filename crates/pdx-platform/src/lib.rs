//! Pokedex platform — library crate for the platform HTTP service.
//!
//! Re-exports all modules so the binary (`main.rs`) and the test harness
//! (`pdx-testinfra`, `pdx-e2e-tests`) can reach `ApplicationContext`,
//! `build_router` and the configuration types.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod routes;
pub mod security;
pub mod shutdown;
pub mod state;
