//! SQLite persistence for trial results.
//!
//! RULE: Only store.rs talks to the database.
//! The engine never touches the store; callers record finished histories.

use crate::{
    error::SimResult,
    sir::SirCounts,
    snapshot::SnapshotHistory,
    types::{RunId, Tick},
};
use rusqlite::{params, Connection, OptionalExtension};

pub struct SimStore {
    conn: Connection,
}

/// One finished trial as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub trial_index:     u64,
    pub trial_seed:      u64,
    pub node_count:      usize,
    pub survival_rate:   f64,
    pub extinction_tick: Option<Tick>,
    pub peak_tick:       Tick,
    pub peak_infectious: usize,
}

/// A fresh, globally unique run id.
pub fn new_run_id() -> RunId {
    format!("run-{}", uuid::Uuid::new_v4())
}

impl SimStore {
    /// Open (or create) the results database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(
        &self,
        run_id: &str,
        seed: u64,
        version: &str,
        policy: &str,
        config_json: &str,
    ) -> SimResult<()> {
        let started_at = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, policy, config_json, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![run_id, seed as i64, version, policy, config_json, started_at],
        )?;
        Ok(())
    }

    pub fn run_seed(&self, run_id: &str) -> SimResult<Option<u64>> {
        let seed = self
            .conn
            .query_row(
                "SELECT seed FROM run WHERE run_id = ?1",
                params![run_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(seed.map(|s| s as u64))
    }

    // ── Trials ─────────────────────────────────────────────────

    /// Store a trial summary and its per-tick counts atomically.
    pub fn record_trial(
        &self,
        run_id: &str,
        trial_index: u64,
        trial_seed: u64,
        history: &SnapshotHistory,
    ) -> SimResult<TrialRecord> {
        let (peak_tick, peak_infectious) = history.peak_infectious();
        let record = TrialRecord {
            trial_index,
            trial_seed,
            node_count: history.initial().len(),
            survival_rate: history.survival_rate(),
            extinction_tick: history.time_to_extinction(),
            peak_tick,
            peak_infectious,
        };

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO trial (run_id, trial_index, trial_seed, node_count, survival_rate,
                                extinction_tick, peak_tick, peak_infectious)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run_id,
                trial_index as i64,
                trial_seed as i64,
                record.node_count as i64,
                record.survival_rate,
                record.extinction_tick.map(|t| t as i64),
                record.peak_tick as i64,
                record.peak_infectious as i64,
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tick_counts (run_id, trial_index, tick, susceptible, infectious, recovered)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (tick, counts) in history.counts_per_tick().iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    trial_index as i64,
                    tick as i64,
                    counts.susceptible as i64,
                    counts.infectious as i64,
                    counts.recovered as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(record)
    }

    /// Keep the full history as JSON, for replay and plotting tools.
    pub fn save_history(
        &self,
        run_id: &str,
        trial_index: u64,
        history: &SnapshotHistory,
    ) -> SimResult<()> {
        let json = serde_json::to_string(history)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO history (run_id, trial_index, history_json)
             VALUES (?1, ?2, ?3)",
            params![run_id, trial_index as i64, json],
        )?;
        Ok(())
    }

    pub fn load_history(
        &self,
        run_id: &str,
        trial_index: u64,
    ) -> SimResult<Option<SnapshotHistory>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT history_json FROM history WHERE run_id = ?1 AND trial_index = ?2",
                params![run_id, trial_index as i64],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn trial_count(&self, run_id: &str) -> SimResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM trial WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn trials(&self, run_id: &str) -> SimResult<Vec<TrialRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT trial_index, trial_seed, node_count, survival_rate,
                    extinction_tick, peak_tick, peak_infectious
             FROM trial WHERE run_id = ?1
             ORDER BY trial_index ASC",
        )?;
        let records = stmt
            .query_map(params![run_id], |row| {
                Ok(TrialRecord {
                    trial_index:     row.get::<_, i64>(0)? as u64,
                    trial_seed:      row.get::<_, i64>(1)? as u64,
                    node_count:      row.get::<_, i64>(2)? as usize,
                    survival_rate:   row.get(3)?,
                    extinction_tick: row.get::<_, Option<i64>>(4)?.map(|t| t as u64),
                    peak_tick:       row.get::<_, i64>(5)? as u64,
                    peak_infectious: row.get::<_, i64>(6)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn survival_rates(&self, run_id: &str) -> SimResult<Vec<f64>> {
        Ok(self.trials(run_id)?.into_iter().map(|t| t.survival_rate).collect())
    }

    pub fn tick_counts(&self, run_id: &str, trial_index: u64) -> SimResult<Vec<SirCounts>> {
        let mut stmt = self.conn.prepare(
            "SELECT susceptible, infectious, recovered FROM tick_counts
             WHERE run_id = ?1 AND trial_index = ?2
             ORDER BY tick ASC",
        )?;
        let counts = stmt
            .query_map(params![run_id, trial_index as i64], |row| {
                Ok(SirCounts {
                    susceptible: row.get::<_, i64>(0)? as usize,
                    infectious:  row.get::<_, i64>(1)? as usize,
                    recovered:   row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }
}
