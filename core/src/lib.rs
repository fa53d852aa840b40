//! Data generation and aggregation engine for the dividend dashboard.
//!
//! Builds one consistent synthetic world (provinces → partners →
//! business agents → stores → users → transactions), filters it by
//! time range and region, and serves cached dashboard snapshots.

pub mod aggregation;
pub mod cache;
pub mod clock;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod factory;
pub mod filter;
pub mod name_generator;
pub mod region;
pub mod rng;
pub mod snapshot;
pub mod types;
pub mod world;
