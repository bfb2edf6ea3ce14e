use alloc::{collections::BTreeSet, vec::Vec};

use alloy_primitives::{hex, keccak256, Address, FixedBytes, U256};

/// 4-byte function selector.
pub type Selector = FixedBytes<4>;

/// Selector derived from a Solidity function signature, eg `transfer(address,uint256)`.
pub fn selector(sig: &str) -> Selector {
    let h = keccak256(sig.as_bytes());
    FixedBytes([h[0], h[1], h[2], h[3]])
}

/// Errors while reading a selector from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("selector must be 4 bytes, got {0} hex characters")]
    InvalidLength(usize),
    #[error("selector is not valid hex")]
    InvalidHex,
}

/// Parse a selector written either as hex (`0xa9059cbb`) or as a function signature.
pub fn parse_selector(s: &str) -> Result<Selector, SelectorError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(SelectorError::Empty);
    }
    if s.contains('(') {
        return Ok(selector(s));
    }
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.len() != 8 {
        return Err(SelectorError::InvalidLength(digits.len()));
    }
    let bytes: [u8; 4] = hex::decode_to_array(digits).map_err(|_| SelectorError::InvalidHex)?;
    Ok(FixedBytes(bytes))
}

/// Which functions of a target an [`AllowRule`] permits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectorRule {
    /// Wildcard (`"*"`): any selector.
    Any,
    /// Only the listed selectors.
    Only(BTreeSet<Selector>),
}

impl SelectorRule {
    pub fn only<I: IntoIterator<Item = Selector>>(selectors: I) -> Self {
        SelectorRule::Only(selectors.into_iter().collect())
    }

    pub fn permits(&self, selector: &Selector) -> bool {
        match self {
            SelectorRule::Any => true,
            SelectorRule::Only(set) => set.contains(selector),
        }
    }
}

/// One authorisation rule of a Tier-A policy.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AllowRule {
    /// Contract the sponsored call may target.
    pub to: Address,
    pub selectors: SelectorRule,
    /// Upper bound on `value` (wei) of a single call; `None` means unbounded.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub max_wei_per_tx: Option<U256>,
}

impl AllowRule {
    pub fn any(to: Address) -> Self {
        Self { to, selectors: SelectorRule::Any, max_wei_per_tx: None }
    }

    pub fn only<I: IntoIterator<Item = Selector>>(to: Address, selectors: I) -> Self {
        Self { to, selectors: SelectorRule::only(selectors), max_wei_per_tx: None }
    }

    pub fn with_max_wei(mut self, max: U256) -> Self {
        self.max_wei_per_tx = Some(max);
        self
    }
}

/// Chain-scoped allow-list for sponsored ("Tier A") transactions.
///
/// `daily_cap_wei` is carried for the quota collaborator; evaluating the allow-list
/// never looks at it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TierAPolicy {
    pub chain_id: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub allow: Vec<AllowRule>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub daily_cap_wei: Option<U256>,
}

impl TierAPolicy {
    pub fn new(chain_id: u64, allow: Vec<AllowRule>) -> Self {
        Self { chain_id, allow, daily_cap_wei: None }
    }

    pub fn with_daily_cap(mut self, cap: U256) -> Self {
        self.daily_cap_wei = Some(cap);
        self
    }

    /// First rule targeting `to` (first match wins), with its position in `allow`.
    pub fn rule_for(&self, to: &Address) -> Option<(usize, &AllowRule)> {
        self.allow.iter().enumerate().find(|(_, rule)| rule.to == *to)
    }
}

/// A proposed sponsored call, checked against a policy before relaying.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CandidateCall {
    pub to: Address,
    pub selector: Selector,
    pub value_wei: U256,
}

impl CandidateCall {
    pub fn new(to: Address, selector: Selector, value_wei: U256) -> Self {
        Self { to, selector, value_wei }
    }

    /// Build from raw calldata; `None` when there is no 4-byte selector to check.
    pub fn from_calldata(to: Address, calldata: &[u8], value_wei: U256) -> Option<Self> {
        let head: [u8; 4] = calldata.get(..4)?.try_into().ok()?;
        Some(Self { to, selector: FixedBytes(head), value_wei })
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use alloc::{collections::BTreeSet, string::String};
    use core::fmt;

    use serde::{
        de::{self, SeqAccess, Visitor},
        ser::SerializeSeq,
        Deserialize, Deserializer, Serialize, Serializer,
    };

    use super::{parse_selector, SelectorRule};

    const WILDCARD: &str = "*";

    impl Serialize for SelectorRule {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                SelectorRule::Any => serializer.serialize_str(WILDCARD),
                SelectorRule::Only(set) => {
                    let mut seq = serializer.serialize_seq(Some(set.len()))?;
                    for sel in set {
                        seq.serialize_element(sel)?;
                    }
                    seq.end()
                }
            }
        }
    }

    struct SelectorRuleVisitor;

    impl<'de> Visitor<'de> for SelectorRuleVisitor {
        type Value = SelectorRule;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("\"*\" or a list of selectors / function signatures")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            if v.trim() == WILDCARD {
                Ok(SelectorRule::Any)
            } else {
                Err(E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut set = BTreeSet::new();
            while let Some(entry) = seq.next_element::<String>()? {
                let sel = parse_selector(&entry).map_err(de::Error::custom)?;
                set.insert(sel);
            }
            Ok(SelectorRule::Only(set))
        }
    }

    impl<'de> Deserialize<'de> for SelectorRule {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(SelectorRuleVisitor)
        }
    }
}
