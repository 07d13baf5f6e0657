//! Adapter implementations for execution loop ports.

pub mod authorizer;
pub mod observer;
pub mod script;
mod teardown;

pub use authorizer::{PromptAuthorizer, StaticAuthorizer};
pub use observer::TracingFragmentObserver;
pub use script::{
    FragmentScriptError, MAX_FRAGMENT_LINE_LENGTH, fragment_script,
    fragment_script_with_max_line_length,
};
