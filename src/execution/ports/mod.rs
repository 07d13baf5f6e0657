//! Port contracts for the execution loop.

pub mod authorizer;
pub mod observer;
pub mod teardown;

pub use authorizer::ToolCallAuthorizer;
pub use observer::FragmentObserver;
pub use teardown::SessionTeardown;

#[cfg(test)]
pub use authorizer::MockToolCallAuthorizer;
#[cfg(test)]
pub use teardown::MockSessionTeardown;
