//! PL-002: Plan id factory.
//!
//! Ids are a monotonically increasing counter rendered as lowercase hex.
//! The counter is atomic so one factory can be shared across threads; given
//! the same starting number and input, compilation yields the same ids.

use super::types::{Plan, PlanId, PlanStep};
use std::sync::atomic::{AtomicU64, Ordering};

/// Issues unique plan ids.
#[derive(Debug, Default)]
pub struct PlanFactory {
    current: AtomicU64,
}

impl PlanFactory {
    /// The first issued id is `starting_num + 1`.
    pub fn new(starting_num: u64) -> Self {
        Self {
            current: AtomicU64::new(starting_num),
        }
    }

    /// Wrap a plan payload with a freshly minted id.
    pub fn new_plan(&self, step: impl Into<PlanStep>) -> Plan {
        Plan {
            id: self.next_id(),
            step: step.into(),
        }
    }

    /// Mint an id first, then build the payload from it.
    ///
    /// For nodes whose payload embeds sub-plans derived from their own id.
    pub fn new_plan_with<S: Into<PlanStep>>(&self, build: impl FnOnce(&PlanId) -> S) -> Plan {
        let id = self.next_id();
        let step = build(&id).into();
        Plan { id, step }
    }

    fn next_id(&self) -> PlanId {
        let num = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        PlanId::new(format!("{:x}", num))
    }
}
