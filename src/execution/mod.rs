//! Confirmation-gated execution of streamed agent responses.
//!
//! A response from the inference engine arrives as an ordered stream of
//! fragments. The loop in [`services`] walks that stream, asks the operator
//! to authorize every tool invocation before it takes effect, cancels the
//! generation on the first denial, and closes the MCP connection manager
//! exactly once however the run ends.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - The loop itself in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
