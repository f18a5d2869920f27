//! Core types for the points ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Opaque string identities (never narrowed to a native integer)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque user identity.
///
/// Identities come from an external platform whose id space exceeds
/// f64-safe integer precision, so they are carried as strings end to
/// end: storage keys, signatures, comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes, used as the storage key
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Direction of a balance mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActionType {
    /// Credit points to the target
    Add = 1,
    /// Debit points from the target
    Remove = 2,
}

impl ActionType {
    /// Stable tag used in statements and audit output
    pub fn tag(&self) -> &'static str {
        match self {
            ActionType::Add => "ADD",
            ActionType::Remove => "REMOVE",
        }
    }

    /// Parse from tag
    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "ADD" => Some(ActionType::Add),
            "REMOVE" => Some(ActionType::Remove),
            _ => None,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Current balance for one user identity
///
/// Absence of a record is equivalent to `points: 0, version: 0`; the
/// record is created lazily by the first committed mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// Owner of the balance
    pub user_id: UserId,

    /// Current point total (signed; may be negative under permissive policy)
    pub points: i64,

    /// Number of committed mutations; fencing token and history sequence source
    pub version: u64,

    /// Timestamp of the last committed mutation
    pub updated_at: DateTime<Utc>,
}

impl BalanceRecord {
    /// Zero-value record for an identity with no committed mutations
    pub fn zero(user_id: UserId) -> Self {
        Self {
            user_id,
            points: 0,
            version: 0,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// One immutable audit entry for a single balance mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Unique record ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Per-user sequence number, strictly increasing from 1
    pub seq: u64,

    /// Whose balance changed
    pub target_user_id: UserId,

    /// Who requested the change
    pub action_by_user_id: UserId,

    /// Direction of the change
    pub action: ActionType,

    /// Magnitude of the change (always positive)
    pub amount: i64,

    /// Balance immediately before this mutation
    pub before_points: i64,

    /// Balance immediately after this mutation
    pub after_points: i64,

    /// Optional free-text annotation
    pub reason: Option<String>,

    /// Commit timestamp (UTC, non-decreasing per user)
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Signed delta this record applied to the balance
    pub fn signed_delta(&self) -> i64 {
        match self.action {
            ActionType::Add => self.amount,
            ActionType::Remove => -self.amount,
        }
    }

    /// Check the conservation invariant: `after - before == ±amount`
    pub fn is_conserved(&self) -> bool {
        self.after_points - self.before_points == self.signed_delta()
    }
}

/// Externally supplied mutation rules, enforced (not decided) by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Whether a REMOVE may take the balance below zero
    pub allow_negative: bool,

    /// Smallest permissible mutation amount (inclusive, at least 1)
    pub min_amount: i64,

    /// Largest permissible mutation amount (inclusive)
    pub max_amount: i64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allow_negative: false,
            min_amount: 1,
            max_amount: 1_000_000,
        }
    }
}

impl Policy {
    /// Whether `amount` is within this policy's bounds
    pub fn permits_amount(&self, amount: i64) -> bool {
        amount >= 1 && amount >= self.min_amount && amount <= self.max_amount
    }
}

/// A requested balance mutation, before validation
#[derive(Debug, Clone)]
pub struct Mutation {
    /// Whose balance to change
    pub target: UserId,

    /// Who is requesting the change
    pub actor: UserId,

    /// Direction of the change
    pub action: ActionType,

    /// Magnitude of the change
    pub amount: i64,

    /// Optional annotation, stored verbatim in the history record
    pub reason: Option<String>,
}

/// Before/after snapshot returned to the caller of a successful mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Balance immediately before the mutation
    pub before: i64,

    /// Balance immediately after the mutation
    pub after: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_round_trip() {
        // 2^53 + 1: not representable as f64, must survive as a string
        let id = UserId::new("9007199254740993");
        assert_eq!(id.as_str(), "9007199254740993");
        assert_eq!(id.to_string(), "9007199254740993");
    }

    #[test]
    fn test_action_type_tags() {
        assert_eq!(ActionType::Add.tag(), "ADD");
        assert_eq!(ActionType::Remove.tag(), "REMOVE");
        assert_eq!(ActionType::from_tag("ADD"), Some(ActionType::Add));
        assert_eq!(ActionType::from_tag("REMOVE"), Some(ActionType::Remove));
        assert_eq!(ActionType::from_tag("SET"), None);
    }

    #[test]
    fn test_history_record_conservation() {
        let record = HistoryRecord {
            id: Uuid::now_v7(),
            seq: 1,
            target_user_id: UserId::new("100"),
            action_by_user_id: UserId::new("200"),
            action: ActionType::Remove,
            amount: 20,
            before_points: 50,
            after_points: 30,
            reason: None,
            created_at: Utc::now(),
        };

        assert!(record.is_conserved());
        assert_eq!(record.signed_delta(), -20);
    }

    #[test]
    fn test_policy_amount_bounds() {
        let policy = Policy {
            allow_negative: false,
            min_amount: 1,
            max_amount: 100,
        };

        assert!(policy.permits_amount(1));
        assert!(policy.permits_amount(100));
        assert!(!policy.permits_amount(0));
        assert!(!policy.permits_amount(-3));
        assert!(!policy.permits_amount(101));
    }

    #[test]
    fn test_zero_balance_record() {
        let record = BalanceRecord::zero(UserId::new("42"));
        assert_eq!(record.points, 0);
        assert_eq!(record.version, 0);
    }
}
