//! Port for surfacing processed fragments.

use crate::execution::domain::ResponseFragment;

/// Receives every fragment the loop lets through.
///
/// Tool calls are only observed once they have been approved.
pub trait FragmentObserver: Send + Sync {
    /// Called once per processed fragment, in stream order.
    fn observe(&self, fragment: &ResponseFragment);
}

impl<F> FragmentObserver for F
where
    F: Fn(&ResponseFragment) + Send + Sync,
{
    fn observe(&self, fragment: &ResponseFragment) {
        self(fragment);
    }
}
