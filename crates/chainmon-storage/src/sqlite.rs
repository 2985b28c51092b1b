use crate::error::{Result, StorageError};
use crate::{CommitSignRow, EventStore, LastEventRow, NetInfoRow, StatusRow};
use chainmon_common::types::{
    AgentMark, AlertRecord, CommitRecord, Event, NetInfoRecord, StatusRecord,
};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS event (
    event_id     TEXT PRIMARY KEY,
    agent_name   TEXT NOT NULL,
    service_name TEXT NOT NULL,
    run_id       TEXT NOT NULL,
    event_type   TEXT NOT NULL,
    created_at   INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_event_agent_created
    ON event (agent_name, run_id, created_at DESC);

CREATE TABLE IF NOT EXISTS status_sample (
    event_id              TEXT PRIMARY KEY,
    latest_block_height   INTEGER NOT NULL,
    latest_block_time     INTEGER NOT NULL,
    earliest_block_height INTEGER NOT NULL,
    earliest_block_time   INTEGER NOT NULL,
    catching_up           INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS net_info_sample (
    event_id  TEXT PRIMARY KEY,
    n_peers   INTEGER NOT NULL,
    listening INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS peer_info (
    event_id    TEXT NOT NULL,
    node_id     TEXT NOT NULL,
    listen_addr TEXT NOT NULL,
    chain_id    TEXT NOT NULL,
    moniker     TEXT NOT NULL,
    remote_ip   TEXT NOT NULL,
    is_outbound INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_peer_info_event ON peer_info (event_id);

CREATE TABLE IF NOT EXISTS commit_sample (
    event_id         TEXT PRIMARY KEY,
    agent_name       TEXT NOT NULL,
    run_id           TEXT NOT NULL,
    chain_id         TEXT NOT NULL,
    height           INTEGER NOT NULL,
    block_time       INTEGER NOT NULL,
    block_id_hash    TEXT NOT NULL,
    data_hash        TEXT NOT NULL,
    proposer_address TEXT NOT NULL,
    round            INTEGER NOT NULL,
    UNIQUE (agent_name, run_id, height)
);

CREATE TABLE IF NOT EXISTS commit_signature (
    event_id          TEXT NOT NULL,
    validator_address TEXT NOT NULL,
    timestamp         INTEGER NOT NULL,
    signature         TEXT NOT NULL,
    block_id_flag     INTEGER NOT NULL,
    PRIMARY KEY (event_id, validator_address)
);

CREATE TABLE IF NOT EXISTS alert_record (
    id           TEXT PRIMARY KEY,
    created_at   INTEGER NOT NULL,
    alert_name   TEXT NOT NULL,
    level        TEXT NOT NULL,
    alarmer_name TEXT NOT NULL,
    agent_name   TEXT NOT NULL,
    run_id       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alert_record_tuple
    ON alert_record (alert_name, alarmer_name, agent_name, run_id, created_at);

CREATE TABLE IF NOT EXISTS agent_mark (
    agent_name      TEXT NOT NULL,
    mark_start      INTEGER NOT NULL,
    mark_end        INTEGER,
    marker_identity TEXT NOT NULL,
    marker_source   TEXT NOT NULL,
    PRIMARY KEY (agent_name, mark_start)
);
";

/// SQLite-backed [`EventStore`]. One database file, WAL mode, a single
/// pooled connection behind a mutex; every query is scoped to `run_id`.
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
    run_id: String,
}

fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(column: &'static str, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(StorageError::InvalidTimestamp { column, millis })
}

impl SqliteEventStore {
    pub fn open<P: AsRef<Path>>(path: P, run_id: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            run_id: run_id.to_string(),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
        conn.execute(
            "INSERT INTO event (event_id, agent_name, service_name, run_id, event_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.event_id.to_string(),
                event.agent_name,
                event.service_name,
                event.run_id,
                event.event_type,
                to_millis(event.created_at),
            ],
        )?;
        Ok(())
    }
}

impl EventStore for SqliteEventStore {
    fn save_status(&self, record: &StatusRecord) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        Self::insert_event(&tx, &record.event)?;
        tx.execute(
            "INSERT INTO status_sample
                 (event_id, latest_block_height, latest_block_time,
                  earliest_block_height, earliest_block_time, catching_up)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.event.event_id.to_string(),
                record.latest_block_height as i64,
                to_millis(record.latest_block_time),
                record.earliest_block_height as i64,
                to_millis(record.earliest_block_time),
                record.catching_up,
            ],
        )?;
        tx.commit()?;
        tracing::debug!(
            agent = %record.event.agent_name,
            height = record.latest_block_height,
            "status sample stored"
        );
        Ok(())
    }

    fn save_net_info(&self, record: &NetInfoRecord) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        Self::insert_event(&tx, &record.event)?;
        tx.execute(
            "INSERT INTO net_info_sample (event_id, n_peers, listening) VALUES (?1, ?2, ?3)",
            params![
                record.event.event_id.to_string(),
                record.n_peers as i64,
                record.listening,
            ],
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO peer_info
                     (event_id, node_id, listen_addr, chain_id, moniker, remote_ip, is_outbound)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for peer in &record.peers {
                stmt.execute(params![
                    record.event.event_id.to_string(),
                    peer.node.node_id,
                    peer.node.listen_addr,
                    peer.node.chain_id,
                    peer.node.moniker,
                    peer.remote_ip,
                    peer.is_outbound,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(
            agent = %record.event.agent_name,
            n_peers = record.n_peers,
            "net-info sample stored"
        );
        Ok(())
    }

    fn save_commit_batch(&self, records: &[CommitRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut inserted = 0usize;
        for record in records {
            let changed = tx.execute(
                "INSERT OR IGNORE INTO commit_sample
                     (event_id, agent_name, run_id, chain_id, height, block_time,
                      block_id_hash, data_hash, proposer_address, round)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.event.event_id.to_string(),
                    record.event.agent_name,
                    record.event.run_id,
                    record.chain_id,
                    record.height as i64,
                    to_millis(record.block_time),
                    record.block_id_hash,
                    record.data_hash,
                    record.proposer_address,
                    record.round,
                ],
            )?;
            // Height already stored for this agent and run: keep the first
            // write, skip the event anchor and signatures for this one.
            if changed == 0 {
                continue;
            }
            Self::insert_event(&tx, &record.event)?;
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO commit_signature
                     (event_id, validator_address, timestamp, signature, block_id_flag)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for sig in &record.signatures {
                stmt.execute(params![
                    record.event.event_id.to_string(),
                    sig.validator_address,
                    to_millis(sig.timestamp),
                    sig.signature,
                    sig.block_id_flag,
                ])?;
            }
            inserted += 1;
        }
        tx.commit()?;
        tracing::debug!(total = records.len(), inserted, "commit batch stored");
        Ok(())
    }

    fn highest_commit_height(&self, agent: &str) -> Result<Option<u64>> {
        let conn = self.lock();
        let height: Option<i64> = conn.query_row(
            "SELECT MAX(height) FROM commit_sample WHERE agent_name = ?1 AND run_id = ?2",
            params![agent, self.run_id],
            |row| row.get(0),
        )?;
        Ok(height.map(|h| h as u64))
    }

    fn latest_event_per_type(&self, agent: &str) -> Result<Vec<LastEventRow>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT event_type, MAX(created_at) FROM event
             WHERE agent_name = ?1 AND run_id = ?2
             GROUP BY event_type",
        )?;
        let rows = stmt.query_map(params![agent, self.run_id], |row| {
            let event_type: String = row.get(0)?;
            let millis: i64 = row.get(1)?;
            Ok((event_type, millis))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (event_type, millis) = row?;
            out.push(LastEventRow {
                event_type,
                created_at: from_millis("event.created_at", millis)?,
            });
        }
        Ok(out)
    }

    fn status_window(&self, agent: &str, since: DateTime<Utc>) -> Result<Vec<StatusRow>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT s.latest_block_height, s.latest_block_time, e.created_at
             FROM status_sample s
             JOIN event e ON e.event_id = s.event_id
             WHERE e.agent_name = ?1 AND e.run_id = ?2 AND e.created_at > ?3
             ORDER BY e.created_at DESC",
        )?;
        let rows = stmt.query_map(params![agent, self.run_id, to_millis(since)], |row| {
            let height: i64 = row.get(0)?;
            let block_time: i64 = row.get(1)?;
            let created_at: i64 = row.get(2)?;
            Ok((height, block_time, created_at))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (height, block_time, created_at) = row?;
            out.push(StatusRow {
                latest_block_height: height as u64,
                latest_block_time: from_millis("status_sample.latest_block_time", block_time)?,
                created_at: from_millis("event.created_at", created_at)?,
            });
        }
        Ok(out)
    }

    fn commit_signature_window(
        &self,
        agent: &str,
        validator: &str,
        limit: u32,
    ) -> Result<Vec<CommitSignRow>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT c.height, cs.validator_address IS NOT NULL, c.block_time
             FROM commit_sample c
             LEFT JOIN commit_signature cs
                    ON cs.event_id = c.event_id AND cs.validator_address = ?3
             WHERE c.agent_name = ?1 AND c.run_id = ?2
             ORDER BY c.height DESC
             LIMIT ?4",
        )?;
        let rows = stmt.query_map(params![agent, self.run_id, validator, limit], |row| {
            let height: i64 = row.get(0)?;
            let signed: bool = row.get(1)?;
            let created_at: i64 = row.get(2)?;
            Ok((height, signed, created_at))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (height, signed, created_at) = row?;
            out.push(CommitSignRow {
                height: height as u64,
                signed,
                created_at: from_millis("commit_sample.block_time", created_at)?,
            });
        }
        Ok(out)
    }

    fn latest_net_info(&self, agent: &str) -> Result<Option<NetInfoRow>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT n.event_id, n.n_peers, n.listening, e.created_at,
                        (SELECT COUNT(*) FROM peer_info p WHERE p.event_id = n.event_id)
                 FROM net_info_sample n
                 JOIN event e ON e.event_id = n.event_id
                 WHERE e.agent_name = ?1 AND e.run_id = ?2
                 ORDER BY e.created_at DESC
                 LIMIT 1",
                params![agent, self.run_id],
                |row| {
                    let event_id: String = row.get(0)?;
                    let n_peers: i64 = row.get(1)?;
                    let listening: bool = row.get(2)?;
                    let created_at: i64 = row.get(3)?;
                    let stored_peer_count: i64 = row.get(4)?;
                    Ok((event_id, n_peers, listening, created_at, stored_peer_count))
                },
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((event_id, n_peers, listening, created_at, stored_peer_count)) => {
                Ok(Some(NetInfoRow {
                    event_id,
                    n_peers: n_peers as u64,
                    listening,
                    stored_peer_count: stored_peer_count as u64,
                    created_at: from_millis("event.created_at", created_at)?,
                }))
            }
        }
    }

    fn alert_sent_or_marked(
        &self,
        alert_name: &str,
        alarmer_name: &str,
        agent: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.lock();
        let since = now - window;
        let hit: bool = conn.query_row(
            "SELECT EXISTS(
                 SELECT 1 FROM alert_record
                 WHERE alert_name = ?1 AND alarmer_name = ?2 AND agent_name = ?3
                   AND run_id = ?4 AND created_at >= ?5 AND created_at <= ?6
             ) OR EXISTS(
                 SELECT 1 FROM agent_mark
                 WHERE agent_name = ?3 AND mark_start <= ?6
                   AND (mark_end IS NULL OR mark_end >= ?6)
             )",
            params![
                alert_name,
                alarmer_name,
                agent,
                self.run_id,
                to_millis(since),
                to_millis(now),
            ],
            |row| row.get(0),
        )?;
        Ok(hit)
    }

    fn save_alert_record(&self, record: &AlertRecord) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO alert_record
                 (id, created_at, alert_name, level, alarmer_name, agent_name, run_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                to_millis(record.created_at),
                record.alert_name,
                record.level,
                record.alarmer_name,
                record.agent_name,
                record.run_id,
            ],
        )?;
        tracing::debug!(
            alert = %record.alert_name,
            alarmer = %record.alarmer_name,
            agent = %record.agent_name,
            "alert record stored"
        );
        Ok(())
    }

    fn upsert_mark(&self, mark: &AgentMark) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO agent_mark
                 (agent_name, mark_start, mark_end, marker_identity, marker_source)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (agent_name, mark_start) DO UPDATE SET
                 mark_end = excluded.mark_end,
                 marker_identity = excluded.marker_identity,
                 marker_source = excluded.marker_source",
            params![
                mark.agent_name,
                to_millis(mark.mark_start),
                mark.mark_end.map(to_millis),
                mark.marker_identity,
                mark.marker_source,
            ],
        )?;
        Ok(())
    }

    fn clear_mark(&self, agent: &str, mark_start: DateTime<Utc>) -> Result<bool> {
        let conn = self.lock();
        let deleted = conn.execute(
            "DELETE FROM agent_mark WHERE agent_name = ?1 AND mark_start = ?2",
            params![agent, to_millis(mark_start)],
        )?;
        Ok(deleted > 0)
    }

    fn active_marks(&self, agent: &str, at: DateTime<Utc>) -> Result<Vec<AgentMark>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT agent_name, mark_start, mark_end, marker_identity, marker_source
             FROM agent_mark
             WHERE agent_name = ?1 AND mark_start <= ?2
               AND (mark_end IS NULL OR mark_end >= ?2)",
        )?;
        let rows = stmt.query_map(params![agent, to_millis(at)], |row| {
            let agent_name: String = row.get(0)?;
            let mark_start: i64 = row.get(1)?;
            let mark_end: Option<i64> = row.get(2)?;
            let marker_identity: String = row.get(3)?;
            let marker_source: String = row.get(4)?;
            Ok((agent_name, mark_start, mark_end, marker_identity, marker_source))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (agent_name, mark_start, mark_end, marker_identity, marker_source) = row?;
            out.push(AgentMark {
                agent_name,
                mark_start: from_millis("agent_mark.mark_start", mark_start)?,
                mark_end: match mark_end {
                    Some(millis) => Some(from_millis("agent_mark.mark_end", millis)?),
                    None => None,
                },
                marker_identity,
                marker_source,
            });
        }
        Ok(out)
    }
}
