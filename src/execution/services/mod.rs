//! Services driving confirmation-gated execution.

mod gated_loop;

#[cfg(test)]
mod gated_loop_tests;

pub use gated_loop::ConfirmationGatedLoop;
