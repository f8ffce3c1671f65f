//! Policy knobs for the reservation core.

use std::time::Duration;

use domain::HoldPolicy;

/// Runtime policy shared by the managers and the saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreConfig {
    /// How long a hold stays payable.
    pub hold_policy: HoldPolicy,

    /// Upper bound on every individual collaborator call.
    pub call_timeout: Duration,
}

impl CoreConfig {
    /// Default per-call bound.
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(hold_policy: HoldPolicy, call_timeout: Duration) -> Self {
        Self {
            hold_policy,
            call_timeout,
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(HoldPolicy::default(), Self::DEFAULT_CALL_TIMEOUT)
    }
}
