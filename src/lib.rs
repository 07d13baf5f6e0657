//! MCP agent: tool aggregation across MCP servers with operator-gated
//! execution.
//!
//! This crate connects a fixed set of Model Context Protocol servers,
//! merges the tools they expose into one registry, and runs streamed agent
//! responses through a loop that asks the operator to confirm every tool
//! call before it takes effect.
//!
//! # Architecture
//!
//! Each module follows hexagonal architecture principles:
//!
//! - **Domain**: Pure types and rules with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (STDIO processes,
//!   terminal prompts, in-memory doubles)
//!
//! # Modules
//!
//! - [`tool_registry`]: MCP server connections and tool aggregation
//! - [`execution`]: Confirmation-gated processing of response fragments
//! - [`config`]: Settings loading

pub mod config;
pub mod execution;
pub mod tool_registry;
