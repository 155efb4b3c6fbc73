//! Strongly-typed identifier value objects.
//!
//! Row-backed entities (members, tiers, trade-in batches) use stable numeric
//! ids allocated by their repositories. Ledger transactions use UUIDs since
//! they are minted by the crediting pipeline before persistence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Stable numeric identifier for a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(i64);

impl MemberId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable member number, e.g. `QF00042`.
///
/// Derived from the numeric member id at signup and printed on receipts,
/// so the format is load-bearing once issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberNumber(String);

impl MemberNumber {
    /// Derives the member number from a numeric member id.
    pub fn from_member_id(id: MemberId) -> Self {
        Self(format!("QF{:05}", id.value()))
    }

    /// Parses an existing member number, validating the `QF` prefix.
    pub fn parse(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        if !s.starts_with("QF") || s.len() < 7 || !s[2..].chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::invalid_format(
                "member_number",
                "expected QF followed by at least five digits",
            ));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a membership tier version.
///
/// Each id refers to exactly one immutable tier version; rate or window
/// changes allocate a new id rather than mutating the row in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierId(i64);

impl TierId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a subscription record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(i64);

impl SubscriptionId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a trade-in batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(i64);

impl BatchId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a bonus ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new random TransactionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives a deterministic TransactionId from an idempotency key.
    ///
    /// Retries of the same source event produce the same id, so a replayed
    /// ledger insert is byte-identical to the original.
    pub fn from_idempotency_key(key: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()))
    }

    /// Creates a TransactionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_number_derived_from_id() {
        let number = MemberNumber::from_member_id(MemberId::new(42));
        assert_eq!(number.as_str(), "QF00042");
    }

    #[test]
    fn member_number_keeps_width_for_large_ids() {
        let number = MemberNumber::from_member_id(MemberId::new(123456));
        assert_eq!(number.as_str(), "QF123456");
    }

    #[test]
    fn member_number_parse_accepts_valid() {
        assert!(MemberNumber::parse("QF00042").is_ok());
    }

    #[test]
    fn member_number_parse_rejects_bad_prefix() {
        assert!(MemberNumber::parse("XX00042").is_err());
    }

    #[test]
    fn member_number_parse_rejects_non_digits() {
        assert!(MemberNumber::parse("QF00a42").is_err());
    }

    #[test]
    fn transaction_id_roundtrips_through_string() {
        let id = TransactionId::new();
        let parsed: TransactionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn transaction_id_from_key_is_stable() {
        let a = TransactionId::from_idempotency_key("trade_in_sale:item-88:1700000000");
        let b = TransactionId::from_idempotency_key("trade_in_sale:item-88:1700000000");
        let c = TransactionId::from_idempotency_key("trade_in_sale:item-89:1700000000");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn numeric_ids_serialize_transparently() {
        let json = serde_json::to_string(&MemberId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
