//! MCP server connection management and tool registry aggregation.
//!
//! This module launches the configured MCP servers, tracks each connection
//! through its lifecycle, merges the tools every server exposes into one
//! registry snapshot, and closes every connection exactly once. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
