//! Cryptofolio Portfolio Service Library
//!
//! Core components for an authenticated cryptocurrency portfolio service:
//! portfolio/asset aggregates with derived valuation, price synchronization
//! against an external quote provider, and the session/reset-token
//! credential lifecycle.

pub mod application;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
