//! Main ledger engine
//!
//! This module ties together storage, policy enforcement, and audit
//! emission into the single atomic mutation operation at the core of
//! the crate.
//!
//! # Example
//!
//! ```no_run
//! use points_ledger::{ActionType, Config, Ledger, Mutation, UserId};
//!
//! #[tokio::main]
//! async fn main() -> points_ledger::Result<()> {
//!     let config = Config::default();
//!     let policy = config.policy.to_policy();
//!     let ledger = Ledger::open(config)?;
//!
//!     let outcome = ledger
//!         .modify(
//!             Mutation {
//!                 target: UserId::new("100"),
//!                 actor: UserId::new("200"),
//!                 action: ActionType::Add,
//!                 amount: 50,
//!                 reason: Some("event bonus".to_string()),
//!             },
//!             &policy,
//!         )
//!         .await?;
//!
//!     assert_eq!(outcome.after, outcome.before + 50);
//!     Ok(())
//! }
//! ```

use crate::{
    audit::{AuditEvent, AuditSink, TracingAuditSink},
    metrics::Metrics,
    storage::StorageStats,
    types::{ActionType, BalanceRecord, HistoryRecord, Mutation, MutationOutcome, Policy, UserId},
    Config, Error, Result, Storage,
};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// The point-ledger engine
///
/// Concurrency contract: mutations for one user identity serialize on a
/// per-identity async mutex; mutations for different identities never
/// contend. Each mutation's balance write and history append go through
/// one RocksDB WriteBatch, so a failure leaves no partial state.
pub struct Ledger {
    /// Storage backend
    storage: Arc<Storage>,

    /// Per-identity locks; entries are created on first use
    locks: DashMap<UserId, Arc<Mutex<()>>>,

    /// Audit emission hook, invoked after commit, outside the lock
    audit: Arc<dyn AuditSink>,

    /// Metrics collector
    metrics: Metrics,
}

impl Ledger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);

        Ok(Self {
            storage,
            locks: DashMap::new(),
            audit: Arc::new(TracingAuditSink),
            metrics: Metrics::new()
                .map_err(|e| Error::Config(format!("Failed to register metrics: {}", e)))?,
        })
    }

    /// Replace the audit sink
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// Apply one balance mutation atomically.
    ///
    /// Validates `mutation.amount` against `policy` bounds, serializes
    /// with other mutations for the same target, re-reads the balance
    /// under the lock, enforces the non-negative policy, and commits
    /// the new balance plus its history record as one unit. Returns the
    /// before/after snapshot on success; on any failure neither the
    /// balance nor the history index is touched.
    pub async fn modify(&self, mutation: Mutation, policy: &Policy) -> Result<MutationOutcome> {
        if !policy.permits_amount(mutation.amount) {
            self.metrics.record_rejection();
            return Err(Error::InvalidAmount {
                amount: mutation.amount,
                min: policy.min_amount.max(1),
                max: policy.max_amount,
            });
        }

        let lock = self.user_lock(&mutation.target);
        let started = std::time::Instant::now();

        let (outcome, event) = {
            let _guard = lock.lock().await;

            let current = self
                .storage
                .get_balance(&mutation.target)?
                .unwrap_or_else(|| BalanceRecord::zero(mutation.target.clone()));

            let before = current.points;
            // Policy bounds cap the amount but not the running balance
            let delta = match mutation.action {
                ActionType::Add => mutation.amount,
                ActionType::Remove => -mutation.amount,
            };
            let after = before.checked_add(delta).ok_or_else(|| {
                self.metrics.record_rejection();
                Error::Overflow {
                    balance: before,
                    delta,
                }
            })?;

            if mutation.action == ActionType::Remove && !policy.allow_negative && after < 0 {
                self.metrics.record_rejection();
                return Err(Error::InsufficientBalance {
                    balance: before,
                    requested: mutation.amount,
                });
            }

            // Wall clocks can step backwards; per-user order must not
            let created_at = Utc::now().max(current.updated_at);

            let record = HistoryRecord {
                id: Uuid::now_v7(),
                seq: current.version + 1,
                target_user_id: mutation.target.clone(),
                action_by_user_id: mutation.actor.clone(),
                action: mutation.action,
                amount: mutation.amount,
                before_points: before,
                after_points: after,
                reason: mutation.reason,
                created_at,
            };

            let balance = BalanceRecord {
                user_id: mutation.target.clone(),
                points: after,
                version: record.seq,
                updated_at: created_at,
            };

            self.storage.commit_mutation(&balance, &record)?;

            let event = AuditEvent {
                action: mutation.action,
                target: mutation.target,
                actor: mutation.actor,
                amount: mutation.amount,
                timestamp: created_at,
            };

            (MutationOutcome { before, after }, event)
        };

        self.metrics.record_commit(started.elapsed().as_secs_f64());
        self.audit.emit(&event);

        Ok(outcome)
    }

    /// Current balance, 0 for identities with no committed mutation.
    ///
    /// Read-only snapshot; write decisions must go through [`modify`],
    /// which re-reads under the per-identity lock.
    ///
    /// [`modify`]: Ledger::modify
    pub fn balance(&self, user_id: &UserId) -> Result<i64> {
        Ok(self
            .storage
            .get_balance(user_id)?
            .map(|record| record.points)
            .unwrap_or(0))
    }

    /// Committed history for a user, newest first. Empty for unknown
    /// identities; never an error.
    pub fn history(&self, user_id: &UserId) -> Result<Vec<HistoryRecord>> {
        self.storage.get_history(user_id)
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn user_lock(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn test_ledger() -> (Ledger, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Ledger::open(config).unwrap(), temp_dir)
    }

    fn add(target: &str, actor: &str, amount: i64) -> Mutation {
        Mutation {
            target: UserId::new(target),
            actor: UserId::new(actor),
            action: ActionType::Add,
            amount,
            reason: None,
        }
    }

    fn remove(target: &str, actor: &str, amount: i64) -> Mutation {
        Mutation {
            target: UserId::new(target),
            actor: UserId::new(actor),
            action: ActionType::Remove,
            amount,
            reason: None,
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        events: StdMutex<Vec<AuditEvent>>,
    }

    impl AuditSink for CollectingSink {
        fn emit(&self, event: &AuditEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[tokio::test]
    async fn test_lazy_balance_init() {
        let (ledger, _temp) = test_ledger();
        let policy = Policy::default();

        assert_eq!(ledger.balance(&UserId::new("100")).unwrap(), 0);

        let outcome = ledger.modify(add("100", "200", 50), &policy).await.unwrap();
        assert_eq!(outcome, MutationOutcome { before: 0, after: 50 });
        assert_eq!(ledger.balance(&UserId::new("100")).unwrap(), 50);
    }

    #[tokio::test]
    async fn test_invalid_amount_rejected_before_store() {
        let (ledger, _temp) = test_ledger();
        let policy = Policy::default();

        for amount in [0, -3] {
            let result = ledger.modify(add("100", "200", amount), &policy).await;
            assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        }

        // Over the configured upper bound
        let result = ledger
            .modify(add("100", "200", policy.max_amount + 1), &policy)
            .await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        assert_eq!(ledger.balance(&UserId::new("100")).unwrap(), 0);
        assert!(ledger.history(&UserId::new("100")).unwrap().is_empty());
        assert_eq!(ledger.metrics().rejections_total.get(), 3);
    }

    #[tokio::test]
    async fn test_insufficient_balance_policy() {
        let (ledger, _temp) = test_ledger();
        let strict = Policy::default();

        ledger.modify(add("100", "200", 10), &strict).await.unwrap();

        let result = ledger.modify(remove("100", "200", 15), &strict).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientBalance {
                balance: 10,
                requested: 15
            })
        ));

        // Rejected call leaves no trace
        assert_eq!(ledger.balance(&UserId::new("100")).unwrap(), 10);
        assert_eq!(ledger.history(&UserId::new("100")).unwrap().len(), 1);

        // The same call under a permissive policy succeeds
        let permissive = Policy {
            allow_negative: true,
            ..Policy::default()
        };
        let outcome = ledger
            .modify(remove("100", "200", 15), &permissive)
            .await
            .unwrap();
        assert_eq!(outcome, MutationOutcome { before: 10, after: -5 });
        assert_eq!(ledger.balance(&UserId::new("100")).unwrap(), -5);
    }

    #[tokio::test]
    async fn test_history_chains_and_reconstructs() {
        let (ledger, _temp) = test_ledger();
        let policy = Policy::default();

        ledger.modify(add("100", "200", 50), &policy).await.unwrap();
        ledger.modify(remove("100", "201", 20), &policy).await.unwrap();
        ledger.modify(add("100", "202", 5), &policy).await.unwrap();

        let history = ledger.history(&UserId::new("100")).unwrap();
        assert_eq!(history.len(), 3);

        // Newest first, each record conserved and chained to the next
        assert_eq!(history[0].after_points, ledger.balance(&UserId::new("100")).unwrap());
        for record in &history {
            assert!(record.is_conserved());
        }
        for pair in history.windows(2) {
            assert_eq!(pair[0].before_points, pair[1].after_points);
            assert_eq!(pair[0].seq, pair[1].seq + 1);
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn test_balance_overflow_rejected_without_trace() {
        let (ledger, _temp) = test_ledger();
        let policy = Policy {
            allow_negative: true,
            max_amount: i64::MAX,
            ..Policy::default()
        };

        // A permissive policy admits the amount; the running balance
        // must still never wrap
        ledger
            .modify(add("100", "200", i64::MAX), &policy)
            .await
            .unwrap();

        let result = ledger.modify(add("100", "200", 1), &policy).await;
        assert!(matches!(
            result,
            Err(Error::Overflow {
                balance: i64::MAX,
                delta: 1
            })
        ));

        // Rejected call leaves no trace
        assert_eq!(ledger.balance(&UserId::new("100")).unwrap(), i64::MAX);
        assert_eq!(ledger.history(&UserId::new("100")).unwrap().len(), 1);

        // Same guard on the negative side
        ledger
            .modify(remove("200", "200", i64::MAX), &policy)
            .await
            .unwrap();
        let result = ledger.modify(remove("200", "200", i64::MAX), &policy).await;
        assert!(matches!(result, Err(Error::Overflow { .. })));
        assert_eq!(ledger.balance(&UserId::new("200")).unwrap(), -i64::MAX);
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back_everything() {
        let (ledger, _temp) = test_ledger();
        let policy = Policy::default();

        ledger.modify(add("100", "200", 30), &policy).await.unwrap();

        ledger.storage.set_fail_commits(true);
        let result = ledger.modify(add("100", "200", 10), &policy).await;
        assert!(matches!(result, Err(Error::Storage(_))));
        ledger.storage.set_fail_commits(false);

        // Neither the balance nor the history moved
        assert_eq!(ledger.balance(&UserId::new("100")).unwrap(), 30);
        let history = ledger.history(&UserId::new("100")).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].after_points, 30);
    }

    #[tokio::test]
    async fn test_audit_event_is_minimal() {
        let (ledger, _temp) = test_ledger();
        let sink = Arc::new(CollectingSink::default());
        let ledger = ledger.with_audit_sink(sink.clone());
        let policy = Policy::default();

        ledger
            .modify(
                Mutation {
                    target: UserId::new("100"),
                    actor: UserId::new("200"),
                    action: ActionType::Add,
                    amount: 50,
                    reason: Some("bonus".to_string()),
                },
                &policy,
            )
            .await
            .unwrap();

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ActionType::Add);
        assert_eq!(events[0].target, UserId::new("100"));
        assert_eq!(events[0].actor, UserId::new("200"));
        assert_eq!(events[0].amount, 50);
    }

    #[tokio::test]
    async fn test_no_audit_event_on_rejection() {
        let (ledger, _temp) = test_ledger();
        let sink = Arc::new(CollectingSink::default());
        let ledger = ledger.with_audit_sink(sink.clone());
        let policy = Policy::default();

        let _ = ledger.modify(remove("100", "200", 15), &policy).await;
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reason_stored_verbatim() {
        let (ledger, _temp) = test_ledger();
        let policy = Policy::default();

        ledger
            .modify(
                Mutation {
                    target: UserId::new("100"),
                    actor: UserId::new("200"),
                    action: ActionType::Add,
                    amount: 50,
                    reason: Some("bonus".to_string()),
                },
                &policy,
            )
            .await
            .unwrap();
        ledger.modify(remove("100", "200", 20), &policy).await.unwrap();

        let history = ledger.history(&UserId::new("100")).unwrap();
        assert_eq!(history[0].reason, None);
        assert_eq!(history[1].reason.as_deref(), Some("bonus"));
    }
}
