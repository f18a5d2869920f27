//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `balances` - Current balance per user (key: user_id bytes)
//! - `history` - Append-only mutation log (key: id_len_be || user_id || seq_be)
//!
//! History keys carry the user id length-prefixed, so no user's key
//! range is a prefix of another's (ids are opaque strings and may
//! contain any byte), and embed the per-user sequence number
//! big-endian so a forward scan over one user's prefix yields records
//! oldest first. There is no update or delete path for history
//! entries; the only write is the atomic commit in
//! [`Storage::commit_mutation`].

use crate::{
    error::{Error, Result},
    types::{BalanceRecord, HistoryRecord, UserId},
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Direction, IteratorMode, Options,
    WriteBatch, DB,
};
use std::sync::Arc;

/// Column family names
const CF_BALANCES: &str = "balances";
const CF_HISTORY: &str = "history";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,

    #[cfg(test)]
    fail_commits: std::sync::atomic::AtomicBool,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for the append-heavy history workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_BALANCES, Self::cf_options_balances()),
            ColumnFamilyDescriptor::new(CF_HISTORY, Self::cf_options_history()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self {
            db: Arc::new(db),
            #[cfg(test)]
            fail_commits: std::sync::atomic::AtomicBool::new(false),
        })
    }

    // Column family options

    fn cf_options_balances() -> Options {
        let mut opts = Options::default();
        // Balances are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_history() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Key helpers

    // Ids of equal length can never be strict prefixes of each other,
    // so `len_be || id` gives every user a disjoint key range without
    // restricting which bytes an opaque id may contain.

    fn history_key(user_id: &UserId, seq: u64) -> Vec<u8> {
        let mut key = Self::history_prefix(user_id);
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }

    fn history_prefix(user_id: &UserId) -> Vec<u8> {
        let id = user_id.as_bytes();
        let mut prefix = Vec::with_capacity(4 + id.len());
        prefix.extend_from_slice(&(id.len() as u32).to_be_bytes());
        prefix.extend_from_slice(id);
        prefix
    }

    // Balance operations

    /// Get balance record, `None` for identities with no committed mutation
    pub fn get_balance(&self, user_id: &UserId) -> Result<Option<BalanceRecord>> {
        let cf = self.cf_handle(CF_BALANCES)?;

        match self.db.get_cf(cf, user_id.as_bytes())? {
            Some(value) => {
                let record: BalanceRecord = bincode::deserialize(&value)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    // History operations

    /// Get all history records for a user, newest first
    pub fn get_history(&self, user_id: &UserId) -> Result<Vec<HistoryRecord>> {
        let cf = self.cf_handle(CF_HISTORY)?;
        let prefix = Self::history_prefix(user_id);

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut records = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let record: HistoryRecord = bincode::deserialize(&value)?;
            records.push(record);
        }

        // Scan order is oldest first; callers want newest first
        records.reverse();
        Ok(records)
    }

    // Atomic commit

    /// Commit one mutation: new balance plus its history record, as a
    /// single WriteBatch. Either both land or neither does.
    pub fn commit_mutation(&self, balance: &BalanceRecord, record: &HistoryRecord) -> Result<()> {
        #[cfg(test)]
        if self.fail_commits.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::Storage("injected commit failure".to_string()));
        }

        let mut batch = WriteBatch::default();

        let cf_balances = self.cf_handle(CF_BALANCES)?;
        let balance_value = bincode::serialize(balance)?;
        batch.put_cf(cf_balances, balance.user_id.as_bytes(), &balance_value);

        let cf_history = self.cf_handle(CF_HISTORY)?;
        let history_key = Self::history_key(&record.target_user_id, record.seq);
        let history_value = bincode::serialize(record)?;
        batch.put_cf(cf_history, &history_key, &history_value);

        self.db.write(batch)?;

        tracing::debug!(
            record_id = %record.id,
            target = %record.target_user_id,
            seq = record.seq,
            "Mutation committed"
        );

        Ok(())
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let cf_balances = self.cf_handle(CF_BALANCES)?;
        let cf_history = self.cf_handle(CF_HISTORY)?;

        Ok(StorageStats {
            total_users: self.approximate_count(cf_balances)?,
            total_records: self.approximate_count(cf_history)?,
        })
    }

    fn approximate_count(&self, cf: &ColumnFamily) -> Result<u64> {
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }

    /// Make every subsequent commit fail, to exercise rollback paths
    #[cfg(test)]
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Users with at least one committed mutation
    pub total_users: u64,
    /// Total history records across all users
    pub total_records: u64,
}
