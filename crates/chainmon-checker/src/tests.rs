use crate::config::{CheckerThresholds, MissingBlockConfig};
use crate::{heartbeat, height_stuck, low_peer, missing_block, CheckerKind};
use chainmon_common::types::{
    CommitRecord, CommitSignature, Event, NetInfoRecord, NodeInfo, PeerInfo, StatusRecord,
};
use chainmon_common::{AlertKind, EventType, TENDERMINT_SERVICE};
use chainmon_storage::sqlite::SqliteEventStore;
use chainmon_storage::EventStore;
use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;

const RUN_ID: &str = "run-test";
const AGENT: &str = "val-1";
const VALIDATOR: &str = "VALIDATOR_A";

fn open_store(dir: &TempDir) -> SqliteEventStore {
    SqliteEventStore::open(dir.path().join("chainmon.db"), RUN_ID).unwrap()
}

fn event_at(event_type: EventType, at: DateTime<Utc>) -> Event {
    let mut event = Event::new(AGENT, TENDERMINT_SERVICE, RUN_ID, event_type);
    event.created_at = at;
    event
}

fn seed_status(store: &SqliteEventStore, at: DateTime<Utc>, height: u64) {
    store
        .save_status(&StatusRecord {
            event: event_at(EventType::Status, at),
            latest_block_height: height,
            latest_block_time: at,
            earliest_block_height: 1,
            earliest_block_time: at - Duration::days(30),
            catching_up: false,
        })
        .unwrap();
}

fn seed_net_info(store: &SqliteEventStore, at: DateTime<Utc>, n_peers: u64) {
    let peers = (0..n_peers)
        .map(|i| PeerInfo {
            node: NodeInfo {
                node_id: format!("peer-{i}"),
                listen_addr: "tcp://0.0.0.0:26656".into(),
                chain_id: "testchain-1".into(),
                moniker: format!("sentry-{i}"),
            },
            remote_ip: format!("10.0.0.{i}"),
            is_outbound: i % 2 == 0,
        })
        .collect();
    store
        .save_net_info(&NetInfoRecord {
            event: event_at(EventType::NetInfo, at),
            n_peers,
            listening: true,
            peers,
        })
        .unwrap();
}

fn commit(height: u64, signed: bool) -> CommitRecord {
    let signatures = if signed {
        vec![CommitSignature {
            validator_address: VALIDATOR.into(),
            timestamp: Utc::now(),
            signature: "c2ln".into(),
            block_id_flag: 2,
        }]
    } else {
        Vec::new()
    };
    CommitRecord {
        event: event_at(EventType::Commit, Utc::now()),
        chain_id: "testchain-1".into(),
        height,
        block_time: Utc::now(),
        block_id_hash: "BB".into(),
        data_hash: "DD".into(),
        proposer_address: "PROP".into(),
        round: 0,
        signatures,
    }
}

fn missing_block_thresholds(target: u32, max_missing: u64) -> CheckerThresholds {
    CheckerThresholds {
        missing_block: Some(MissingBlockConfig {
            validator_address: VALIDATOR.into(),
            max_missing_count: max_missing,
            target_block_count: target,
        }),
        ..CheckerThresholds::default()
    }
}

// Heartbeat.

#[test]
fn heartbeat_flags_only_stale_event_types() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let now = Utc::now();
    seed_status(&store, now - Duration::minutes(10), 100);
    seed_net_info(&store, now - Duration::minutes(1), 6);

    let thresholds = CheckerThresholds::default();
    let candidates = heartbeat::check(&store, &thresholds, AGENT, now).unwrap();

    assert_eq!(candidates.len(), 1);
    let tokens = &candidates[0].tokens;
    assert!(tokens.contains(&AlertKind::Heartbeat.keyword().to_string()));
    assert!(tokens.contains(&EventType::Status.as_str().to_string()));
}

#[test]
fn heartbeat_honors_a_per_type_wait() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let now = Utc::now();
    seed_status(&store, now - Duration::minutes(10), 100);

    let mut thresholds = CheckerThresholds::default();
    thresholds
        .heartbeat_max_wait_secs
        .insert(EventType::Status.as_str().into(), 3600);

    let candidates = heartbeat::check(&store, &thresholds, AGENT, now).unwrap();
    assert!(candidates.is_empty());
}

#[test]
fn heartbeat_is_silent_with_no_history() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let candidates =
        heartbeat::check(&store, &CheckerThresholds::default(), AGENT, Utc::now()).unwrap();
    assert!(candidates.is_empty());
}

// Height stuck.

#[test]
fn frozen_height_across_the_window_alerts() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let now = Utc::now();
    for secs in [240, 120, 30] {
        seed_status(&store, now - Duration::seconds(secs), 1042);
    }

    let hit = height_stuck::check(&store, &CheckerThresholds::default(), AGENT, now)
        .unwrap()
        .unwrap();
    assert!(hit.message.contains("1042"));
    assert_eq!(hit.tokens, vec![AlertKind::HeightStuck.keyword().to_string()]);
}

#[test]
fn any_height_change_in_the_window_clears() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let now = Utc::now();
    seed_status(&store, now - Duration::seconds(240), 1041);
    seed_status(&store, now - Duration::seconds(120), 1042);
    seed_status(&store, now - Duration::seconds(30), 1042);

    let hit = height_stuck::check(&store, &CheckerThresholds::default(), AGENT, now).unwrap();
    assert!(hit.is_none());
}

#[test]
fn empty_status_window_is_inconclusive() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let now = Utc::now();
    // Only samples older than the window.
    seed_status(&store, now - Duration::hours(1), 1042);

    let hit = height_stuck::check(&store, &CheckerThresholds::default(), AGENT, now).unwrap();
    assert!(hit.is_none());
}

// Low peer.

#[test]
fn peer_count_below_floor_alerts() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let now = Utc::now();
    seed_net_info(&store, now - Duration::seconds(30), 2);

    let hit = low_peer::check(&store, &CheckerThresholds::default(), AGENT, now)
        .unwrap()
        .unwrap();
    assert!(hit.message.contains("Connected peers: 2"));
}

#[test]
fn peer_count_at_floor_is_quiet() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let now = Utc::now();
    seed_net_info(&store, now - Duration::seconds(30), 5);

    let hit = low_peer::check(&store, &CheckerThresholds::default(), AGENT, now).unwrap();
    assert!(hit.is_none());
}

#[test]
fn missing_net_info_sample_is_inconclusive() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let hit =
        low_peer::check(&store, &CheckerThresholds::default(), AGENT, Utc::now()).unwrap();
    assert!(hit.is_none());
}

// Missing block.

#[test]
fn unconfigured_validator_skips_the_signing_check() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let records: Vec<_> = (1..=10).map(|h| commit(h, false)).collect();
    store.save_commit_batch(&records).unwrap();

    let hit = missing_block::check(&store, &CheckerThresholds::default(), AGENT).unwrap();
    assert!(hit.is_none());
}

#[test]
fn misses_beyond_budget_alert() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    // Heights 1..=10, three of them unsigned.
    let records: Vec<_> = (1..=10).map(|h| commit(h, !(4..=6).contains(&h))).collect();
    store.save_commit_batch(&records).unwrap();

    let hit = missing_block::check(&store, &missing_block_thresholds(10, 2), AGENT)
        .unwrap()
        .unwrap();
    assert!(hit.message.contains("missed 3"));
    assert_eq!(hit.tokens, vec![AlertKind::MissingBlock.keyword().to_string()]);
}

#[test]
fn misses_within_budget_are_quiet() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let records: Vec<_> = (1..=10).map(|h| commit(h, !(5..=6).contains(&h))).collect();
    store.save_commit_batch(&records).unwrap();

    let hit = missing_block::check(&store, &missing_block_thresholds(10, 2), AGENT).unwrap();
    assert!(hit.is_none());
}

#[test]
fn a_height_gap_never_alerts() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    // Ten rows, all unsigned, but height 6 is missing.
    let records: Vec<_> = (1..=5)
        .chain(7..=11)
        .map(|h| commit(h, false))
        .collect();
    store.save_commit_batch(&records).unwrap();

    let hit = missing_block::check(&store, &missing_block_thresholds(10, 2), AGENT).unwrap();
    assert!(hit.is_none());
}

#[test]
fn short_commit_history_is_inconclusive() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let records: Vec<_> = (1..=5).map(|h| commit(h, false)).collect();
    store.save_commit_batch(&records).unwrap();

    let hit = missing_block::check(&store, &missing_block_thresholds(10, 2), AGENT).unwrap();
    assert!(hit.is_none());
}

// Kind dispatch.

#[test]
fn kind_run_normalizes_to_a_candidate_list() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let now = Utc::now();
    seed_net_info(&store, now - Duration::seconds(30), 2);

    let candidates = CheckerKind::LowPeer
        .run(&store, &CheckerThresholds::default(), AGENT, now)
        .unwrap();
    assert_eq!(candidates.len(), 1);
}

#[test]
fn kind_names_round_trip_through_serde() {
    let kinds: Vec<CheckerKind> =
        serde_json::from_str(r#"["heartbeat", "height_stuck", "low_peer", "missing_block"]"#)
            .unwrap();
    assert_eq!(
        kinds,
        vec![
            CheckerKind::Heartbeat,
            CheckerKind::HeightStuck,
            CheckerKind::LowPeer,
            CheckerKind::MissingBlock,
        ]
    );
}
