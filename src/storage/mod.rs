//! Persistence layer.
//!
//! Saves and loads per-wallet bot state to/from a JSON document, guarded
//! against overlapping cycle invocations: writes go through a temp file and
//! an atomic rename, and each cycle holds an advisory lock file for the
//! duration of its read-modify-write. A typed JSONL event log per wallet
//! feeds the monitoring layer so it never parses log text.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::engine::events::EventRecord;
use crate::types::{BotError, BotState};

/// Per-wallet state store rooted at a directory.
pub struct StateStore {
    dir: PathBuf,
}

/// Advisory lock held for one cycle's read-modify-write.
/// Released (best-effort) on drop.
#[derive(Debug)]
pub struct CycleLock {
    path: PathBuf,
}

impl Drop for CycleLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release state lock");
        }
    }
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the state document for a wallet.
    pub fn state_path(&self, wallet: &str) -> PathBuf {
        self.dir.join(format!("{wallet}_state.json"))
    }

    /// Path of the JSONL event log for a wallet.
    pub fn events_path(&self, wallet: &str) -> PathBuf {
        self.dir.join(format!("{wallet}_events.jsonl"))
    }

    fn lock_path(&self, wallet: &str) -> PathBuf {
        self.dir.join(format!("{wallet}.lock"))
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create state dir {}", self.dir.display()))
    }

    /// Acquire the per-wallet advisory lock. Fails fast when another cycle
    /// for the same wallet is already running; a stale lock left by a crash
    /// must be removed by the operator.
    pub fn acquire_lock(&self, wallet: &str) -> Result<CycleLock> {
        self.ensure_dir()?;
        let path = self.lock_path(wallet);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                debug!(path = %path.display(), "State lock acquired");
                Ok(CycleLock { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(BotError::LockHeld {
                wallet: wallet.to_string(),
                path: path.display().to_string(),
            }
            .into()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to create lock file {}", path.display()))
            }
        }
    }

    /// Load wallet state. Returns None if no document exists (fresh start).
    pub fn load(&self, wallet: &str) -> Result<Option<BotState>> {
        let path = self.state_path(wallet);

        if !path.exists() {
            info!(path = %path.display(), "No saved state found, starting fresh");
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read state from {}", path.display()))?;

        let state: BotState = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse state from {}", path.display()))?;

        info!(
            wallet = %state.wallet_name,
            capital = %state.current_capital,
            trades = state.total_trades,
            daily = state.daily_trades,
            "State loaded from disk"
        );

        Ok(Some(state))
    }

    /// Persist wallet state, refreshing `updated_at` and the informational
    /// level. The document is written whole to a temp file and moved into
    /// place so readers never observe a torn write.
    pub fn save(&self, state: &mut BotState) -> Result<()> {
        self.ensure_dir()?;
        state.updated_at = Utc::now();
        state.refresh_level();

        let path = self.state_path(&state.wallet_name);
        let tmp = self.dir.join(format!("{}_state.json.tmp", state.wallet_name));

        let json =
            serde_json::to_string_pretty(state).context("Failed to serialise bot state")?;

        fs::write(&tmp, &json)
            .with_context(|| format!("Failed to write state to {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move state into {}", path.display()))?;

        debug!(path = %path.display(), capital = %state.current_capital, "State saved");
        Ok(())
    }

    /// Delete the state document (for testing or reset).
    pub fn delete(&self, wallet: &str) -> Result<()> {
        let path = self.state_path(wallet);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete state file {}", path.display()))?;
        }
        Ok(())
    }

    /// Append typed cycle events to the wallet's JSONL log.
    pub fn append_events(&self, wallet: &str, events: &[EventRecord]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        self.ensure_dir()?;
        let path = self.events_path(wallet);

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .with_context(|| format!("Failed to open event log {}", path.display()))?;

        for event in events {
            let line = serde_json::to_string(event).context("Failed to serialise cycle event")?;
            writeln!(file, "{line}")
                .with_context(|| format!("Failed to append to event log {}", path.display()))?;
        }

        debug!(path = %path.display(), count = events.len(), "Events appended");
        Ok(())
    }

    /// Read all typed events for a wallet, skipping unparsable lines.
    pub fn read_events(&self, wallet: &str) -> Result<Vec<EventRecord>> {
        let path = self.events_path(wallet);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read event log {}", path.display()))?;

        let mut events = Vec::new();
        for (n, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EventRecord>(line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(line = n + 1, error = %e, "Skipping malformed event record"),
            }
        }
        Ok(events)
    }

    /// Directory this store is rooted at.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::CycleEvent;
    use rust_decimal_macros::dec;

    fn temp_store() -> StateStore {
        let mut p = std::env::temp_dir();
        p.push(format!("midas_test_{}", uuid::Uuid::new_v4()));
        StateStore::new(p)
    }

    #[test]
    fn test_save_and_load() {
        let store = temp_store();
        let mut state = BotState::new("w1", dec!(10000));
        store.save(&mut state).unwrap();

        let loaded = store.load("w1").unwrap();
        assert!(loaded.is_some());
        let loaded = loaded.unwrap();
        assert_eq!(loaded.wallet_name, "w1");
        assert_eq!(loaded.current_capital, dec!(10000));

        store.delete("w1").unwrap();
    }

    #[test]
    fn test_load_nonexistent() {
        let store = temp_store();
        let loaded = store.load("nobody").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_refreshes_updated_at() {
        let store = temp_store();
        let mut state = BotState::new("w1", dec!(100));
        let before = state.updated_at;

        std::thread::sleep(std::time::Duration::from_millis(5));
        store.save(&mut state).unwrap();

        assert!(state.updated_at > before);
        let loaded = store.load("w1").unwrap().unwrap();
        assert_eq!(loaded.updated_at, state.updated_at);
    }

    #[test]
    fn test_save_preserves_fields() {
        let store = temp_store();
        let mut state = BotState::new("w1", dec!(500));
        state.total_trades = 10;
        state.daily_trades = 4;
        state.bear_market_skipped = 2;
        state.low_confidence_skipped = 5;
        state.last_trade_date = chrono::NaiveDate::from_ymd_opt(2026, 3, 14);

        store.save(&mut state).unwrap();
        let loaded = store.load("w1").unwrap().unwrap();

        assert_eq!(loaded.total_trades, 10);
        assert_eq!(loaded.daily_trades, 4);
        assert_eq!(loaded.bear_market_skipped, 2);
        assert_eq!(loaded.low_confidence_skipped, 5);
        assert_eq!(loaded.last_trade_date, state.last_trade_date);
    }

    #[test]
    fn test_no_tmp_file_left_behind() {
        let store = temp_store();
        let mut state = BotState::new("w1", dec!(100));
        store.save(&mut state).unwrap();
        assert!(!store.dir().join("w1_state.json.tmp").exists());
        assert!(store.state_path("w1").exists());
    }

    #[test]
    fn test_lock_excludes_second_holder() {
        let store = temp_store();
        let lock = store.acquire_lock("w1").unwrap();

        let second = store.acquire_lock("w1");
        assert!(second.is_err());
        let msg = second.unwrap_err().to_string();
        assert!(msg.contains("lock already held"), "unexpected error: {msg}");

        drop(lock);
        // Released on drop: can be re-acquired
        let third = store.acquire_lock("w1");
        assert!(third.is_ok());
    }

    #[test]
    fn test_locks_are_per_wallet() {
        let store = temp_store();
        let _a = store.acquire_lock("w1").unwrap();
        let b = store.acquire_lock("w2");
        assert!(b.is_ok());
    }

    #[test]
    fn test_events_round_trip() {
        let store = temp_store();
        let records = vec![
            EventRecord::new("w1", CycleEvent::CycleStarted),
            EventRecord::new(
                "w1",
                CycleEvent::PairSkipped {
                    pair: "BTC".into(),
                    cause: crate::engine::events::SkipCause::AdvisorError,
                },
            ),
        ];
        store.append_events("w1", &records).unwrap();
        store
            .append_events("w1", &[EventRecord::new("w1", CycleEvent::CycleStarted)])
            .unwrap();

        let read = store.read_events("w1").unwrap();
        assert_eq!(read.len(), 3);
        assert!(matches!(read[1].event, CycleEvent::PairSkipped { .. }));
    }

    #[test]
    fn test_read_events_skips_garbage_lines() {
        let store = temp_store();
        store
            .append_events("w1", &[EventRecord::new("w1", CycleEvent::CycleStarted)])
            .unwrap();
        let path = store.events_path("w1");
        let mut contents = fs::read_to_string(&path).unwrap();
        contents.push_str("this is not json\n");
        fs::write(&path, contents).unwrap();

        let read = store.read_events("w1").unwrap();
        assert_eq!(read.len(), 1);
    }

    #[test]
    fn test_read_events_empty_when_missing() {
        let store = temp_store();
        let read = store.read_events("w1").unwrap();
        assert!(read.is_empty());
    }
}
