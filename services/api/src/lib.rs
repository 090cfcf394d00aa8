//! services/api/src/lib.rs
//!
//! The API service: adapters for the core ports, the web surface, and the
//! periodic scrape. The `api` binary wires these together.

pub mod adapters;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod web;
