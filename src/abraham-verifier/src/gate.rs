//! Tier-A sponsorship gate.
//!
//! Composes the stateless allow-list evaluation with an injected daily quota store:
//! - the policy decides *what* may be sponsored (target, selector, per-call value);
//! - the quota store decides *how much* a user may spend per UTC day.
//!
//! Both collaborators are passed in by the request-handling layer; nothing here holds
//! global state.

use alloy_primitives::Address;
use tracing::{info, warn};

use crate::{
    errors::{PolicyViolation, QuotaError},
    evaluator::check_call,
    types::{CandidateCall, QuotaReceipt, QuotaStore, TierAPolicy},
};

/// Why a sponsored call was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("policy: {0}")]
    Policy(#[from] PolicyViolation),
    #[error("quota: {0}")]
    Quota(#[from] QuotaError),
}

impl Rejection {
    /// HTTP status the API layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Rejection::Policy(_) | Rejection::Quota(QuotaError::DailyCapExceeded { .. }) => 403,
            Rejection::Quota(QuotaError::InvalidTimestamp(_)) => 500,
        }
    }
}

/// A call cleared for relaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorization {
    /// Index of the allow rule that matched.
    pub rule_index: usize,
    /// Quota state after this call, when the policy has a daily cap and the call moves value.
    pub quota: Option<QuotaReceipt>,
}

pub struct TierAGate<'a, Q> {
    policy: &'a TierAPolicy,
    quota: &'a Q,
}

impl<'a, Q: QuotaStore> TierAGate<'a, Q> {
    pub fn new(policy: &'a TierAPolicy, quota: &'a Q) -> Self {
        Self { policy, quota }
    }

    pub fn policy(&self) -> &TierAPolicy {
        self.policy
    }

    /// Check `call` for `user` and, if it passes, record its value against today's quota.
    ///
    /// The policy is evaluated first, so a denied call never consumes quota.
    pub fn authorize(
        &self,
        user: Address,
        call: &CandidateCall,
        now_unix: i64,
    ) -> Result<Authorization, Rejection> {
        let (rule_index, _) = check_call(self.policy, call).inspect_err(|violation| {
            warn!(%user, to = %call.to, selector = %call.selector, %violation, "tier-a call rejected by policy");
        })?;

        let quota = match self.policy.daily_cap_wei {
            Some(cap) if !call.value_wei.is_zero() => {
                Some(self.quota.try_spend(user, call.value_wei, cap, now_unix)?)
            }
            _ => None,
        };

        info!(%user, to = %call.to, selector = %call.selector, value = %call.value_wei, rule_index, "tier-a call authorised");
        Ok(Authorization { rule_index, quota })
    }
}
