use std::time::Duration;

/// Tuning knobs for a [`FiberRoot`](crate::FiberRoot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootConfig {
    /// The work loop yields once the deadline has less than this left.
    pub yield_threshold: Duration,
    /// Panic when a component calls a different number of hooks than on its
    /// previous pass. Hook kind mismatches are always fatal.
    pub verify_hook_order: bool,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            yield_threshold: Duration::from_millis(1),
            verify_hook_order: cfg!(debug_assertions),
        }
    }
}

impl RootConfig {
    pub fn with_yield_threshold(mut self, threshold: Duration) -> Self {
        self.yield_threshold = threshold;
        self
    }

    pub fn with_hook_order_checks(mut self, enabled: bool) -> Self {
        self.verify_hook_order = enabled;
        self
    }
}
