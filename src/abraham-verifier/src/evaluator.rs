use tracing::debug;

use crate::{
    errors::PolicyViolation,
    types::policy::{AllowRule, CandidateCall, TierAPolicy},
};

/// Evaluate a candidate call against the allow-list, first matching rule wins.
///
/// Returns the rule that authorised the call and its index in `policy.allow`. The
/// policy's daily cap is not looked at here; that belongs to the quota store.
pub fn check_call<'p>(
    policy: &'p TierAPolicy,
    call: &CandidateCall,
) -> Result<(usize, &'p AllowRule), PolicyViolation> {
    let (index, rule) = policy
        .rule_for(&call.to)
        .ok_or(PolicyViolation::NoMatchingRule { to: call.to })?;

    if !rule.selectors.permits(&call.selector) {
        return Err(PolicyViolation::SelectorNotAllowed { to: call.to, selector: call.selector });
    }
    if let Some(max) = rule.max_wei_per_tx {
        if call.value_wei > max {
            return Err(PolicyViolation::ValueExceedsMax { value: call.value_wei, max });
        }
    }
    Ok((index, rule))
}

/// Whether `call` may be sponsored under `policy`. Deny by default.
pub fn is_allowed(policy: &TierAPolicy, call: &CandidateCall) -> bool {
    match check_call(policy, call) {
        Ok(_) => true,
        Err(violation) => {
            debug!(chain_id = policy.chain_id, %violation, "tier-a call denied");
            false
        }
    }
}
