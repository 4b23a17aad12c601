//! End-to-end tests of the ingest and aggregate passes.

use analyzer::{run, KademliaClient, RunConfig, RunContext, StorageBackend};
use serde_json::json;
use shared::models::{DailyStat, HostState, LogEntry};
use shared::range::{TimeRange, SECONDS_PER_DAY};
use shared::storage::LogQuery;
use std::sync::Arc;
use tokio_test::assert_ok;

use super::common::{init_tracing, spawn_mock, storage_record, MockKademlia, WindowReply};

const DAY: i64 = SECONDS_PER_DAY;
const START: i64 = 1_600_041_600; // day aligned

async fn setup(api: MockKademlia) -> (Arc<MockKademlia>, KademliaClient) {
    init_tracing();
    let api = Arc::new(api);
    let client = KademliaClient::new(&spawn_mock(Arc::clone(&api)).await).unwrap();
    (api, client)
}

fn config(range: TimeRange) -> RunConfig {
    RunConfig::new("http://unused", range, StorageBackend::InMemory)
}

fn snapshot(context: &RunContext) -> (Vec<LogEntry>, Vec<HostState>) {
    let logs = assert_ok!(context.log_store().query(LogQuery::new()));
    let hosts = assert_ok!(context.host_store().list());
    (logs, hosts)
}

#[tokio::test]
async fn test_65_day_range_fetches_three_windows() {
    let (api, client) = setup(MockKademlia::default()).await;
    let context = RunContext::with_in_memory_store();
    let end = START + 65 * DAY;

    let report = run(&context, &client, &config(TimeRange::new(START, end))).await;

    assert_eq!(report.ingest.windows, 3);
    assert_eq!(
        api.calls(),
        vec![
            (START, START + 30 * DAY),
            (START + 30 * DAY, START + 60 * DAY),
            (START + 60 * DAY, end),
        ]
    );
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let (_api, client) = setup(MockKademlia::default().with_records(vec![
        storage_record(START + 10, "h1", 100, 40),
        storage_record(START + 20, "h2", 200, 50),
        storage_record(START + DAY + 5, "h1", 110, 30),
        storage_record(START + 31 * DAY, "h2", 210, 60),
    ]))
    .await;
    let context = RunContext::with_in_memory_store();
    let config = config(TimeRange::new(START, START + 40 * DAY));

    run(&context, &client, &config).await;
    let first = snapshot(&context);
    let first_stats = assert_ok!(context.statistics_store().query(config.range));

    run(&context, &client, &config).await;
    let second = snapshot(&context);
    let second_stats = assert_ok!(context.statistics_store().query(config.range));

    assert_eq!(first.0.len(), 4);
    assert_eq!(first.1.len(), 2);
    assert_eq!(first, second);
    assert_eq!(first_stats, second_stats);
}

#[tokio::test]
async fn test_filtered_records_are_never_written() {
    let (_api, client) = setup(MockKademlia::default().with_records(vec![
        json!({"ts": START + 1, "type": "storage", "totalSize": 5, "availableSize": 1}),
        json!({"ts": START + 2, "name": "", "type": "storage"}),
        json!({"ts": START + 3, "name": "h1", "type": "peer:connect"}),
        json!({"ts": START + 4, "name": "h1"}),
    ]))
    .await;
    let context = RunContext::with_in_memory_store();

    let report = run(&context, &client, &config(TimeRange::new(START, START + DAY))).await;

    assert_eq!(report.ingest.fetched, 4);
    assert_eq!(report.ingest.skipped, 4);
    assert_eq!(assert_ok!(context.log_store().count()), 0);
    assert_eq!(assert_ok!(context.host_store().count()), 0);
    assert_eq!(assert_ok!(context.statistics_store().count()), 0);
}

#[tokio::test]
async fn test_records_without_timestamp_are_skipped_even_if_served() {
    let (_api, client) = setup(MockKademlia::default().with_reply(
        START,
        WindowReply::Records(vec![json!({"name": "h1", "type": "storage", "totalSize": 9})]),
    ))
    .await;
    let context = RunContext::with_in_memory_store();

    run(&context, &client, &config(TimeRange::new(START, START + DAY))).await;

    assert_eq!(assert_ok!(context.log_store().count()), 0);
    assert_eq!(assert_ok!(context.host_store().count()), 0);
}

#[tokio::test]
async fn test_stored_records_carry_derived_reserved_size() {
    let (_api, client) = setup(MockKademlia::default().with_records(vec![
        storage_record(START + 1, "h1", 1000, 250),
        storage_record(START + 2, "h2", 300, 300),
        json!({"ts": START + 3, "name": "h3", "type": "log:storage", "totalSize": 70}),
    ]))
    .await;
    let context = RunContext::with_in_memory_store();

    run(&context, &client, &config(TimeRange::new(START, START + DAY))).await;

    let (logs, hosts) = snapshot(&context);
    assert_eq!(logs.len(), 3);
    for entry in logs.iter().chain(hosts.iter().map(|h| &h.entry)) {
        assert_eq!(entry.reserved_size, entry.total_size - entry.available_size);
    }
    assert_eq!(
        assert_ok!(context.host_store().get("h3")).unwrap().entry.reserved_size,
        70
    );
}

#[tokio::test]
async fn test_host_state_tracks_maximum_timestamp_across_windows() {
    // Windows are served out of chronological order for host H.
    let window = 10 * DAY;
    let (_api, client) = setup(
        MockKademlia::default()
            .with_reply(
                START,
                WindowReply::Records(vec![storage_record(START + 25 * DAY, "H", 300, 0)]),
            )
            .with_reply(
                START + window,
                WindowReply::Records(vec![storage_record(START + 5 * DAY, "H", 100, 0)]),
            )
            .with_reply(
                START + 2 * window,
                WindowReply::Records(vec![storage_record(START + 15 * DAY, "H", 200, 0)]),
            ),
    )
    .await;
    let context = RunContext::with_in_memory_store();
    let mut config = config(TimeRange::new(START, START + 3 * window));
    config.window_secs = window;

    run(&context, &client, &config).await;

    let state = assert_ok!(context.host_store().get("H")).unwrap();
    assert_eq!(state.timestamp(), START + 25 * DAY);
    assert_eq!(state.entry.total_size, 300);
    assert_eq!(assert_ok!(context.log_store().count()), 3);
}

#[tokio::test]
async fn test_latest_entry_per_host_wins_in_bucket() {
    let (_api, client) = setup(MockKademlia::default().with_records(vec![
        storage_record(START + 100, "A", 10, 2),
        storage_record(START + 200, "A", 20, 5),
    ]))
    .await;
    let context = RunContext::with_in_memory_store();

    run(&context, &client, &config(TimeRange::new(START, START + DAY))).await;

    let stat = assert_ok!(context.statistics_store().get(START)).unwrap();
    assert_eq!(stat, DailyStat::new(START, 20, 15));
    assert_eq!(stat.available_size, 5);
}

#[tokio::test]
async fn test_empty_buckets_produce_no_statistics() {
    let (_api, client) = setup(MockKademlia::default().with_records(vec![
        storage_record(START + 1, "h1", 10, 5),
        storage_record(START + 3 * DAY + 1, "h1", 10, 5),
    ]))
    .await;
    let context = RunContext::with_in_memory_store();

    let report = run(&context, &client, &config(TimeRange::new(START, START + 4 * DAY))).await;

    assert_eq!(report.aggregate.buckets, 4);
    assert_eq!(report.aggregate.written, 2);
    assert_eq!(report.aggregate.empty, 2);
    assert!(assert_ok!(context.statistics_store().get(START + DAY)).is_none());
    assert!(assert_ok!(context.statistics_store().get(START + 2 * DAY)).is_none());
    assert_eq!(assert_ok!(context.statistics_store().count()), 2);
}

#[tokio::test]
async fn test_failed_windows_do_not_stop_the_run() {
    let window = 10 * DAY;
    let (api, client) = setup(
        MockKademlia::default()
            .with_records(vec![
                storage_record(START + 1, "h1", 10, 5),
                storage_record(START + window + 1, "h1", 20, 5),
                storage_record(START + 2 * window + 1, "h1", 30, 5),
            ])
            .failing_at(START)
            .with_reply(START + window, WindowReply::Garbage),
    )
    .await;
    let context = RunContext::with_in_memory_store();
    let mut config = config(TimeRange::new(START, START + 3 * window));
    config.window_secs = window;

    let report = run(&context, &client, &config).await;

    assert_eq!(api.calls().len(), 3);
    assert_eq!(report.ingest.fetch_failures, 2);
    assert_eq!(report.ingest.stored, 1);
    let stored = assert_ok!(context.log_store().query(LogQuery::new()));
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].total_size, 30);
}

#[tokio::test]
async fn test_aggregation_covers_start_day_before_start() {
    let (_api, client) = setup(MockKademlia::default()).await;
    let context = RunContext::with_in_memory_store();
    // Persisted earlier on the same day, outside the fetch range.
    let earlier = LogEntry::new(START + 60, "h1", shared::models::LogType::Storage, 50, 10);
    assert_ok!(context.log_store().upsert(earlier));

    run(
        &context,
        &client,
        &config(TimeRange::new(START + 3600, START + 7200)),
    )
    .await;

    assert_eq!(
        assert_ok!(context.statistics_store().get(START)),
        Some(DailyStat::new(START, 50, 40))
    );
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires running ClickHouse instance"]
async fn test_full_run_against_clickhouse() {
    let (_api, client) = setup(MockKademlia::default().with_records(vec![
        storage_record(START + 100, "A", 10, 2),
        storage_record(START + 200, "A", 20, 5),
        storage_record(START + 300, "B", 40, 10),
    ]))
    .await;
    let db_config = analyzer::DatabaseConfig::from_env().with_database("bdstats_it");
    let context = RunContext::connect(&db_config).await.unwrap();
    assert_ok!(context.log_store().clear());
    assert_ok!(context.host_store().clear());
    assert_ok!(context.statistics_store().clear());

    let config = config(TimeRange::new(START, START + DAY));
    run(&context, &client, &config).await;
    run(&context, &client, &config).await;

    assert_eq!(assert_ok!(context.log_store().count()), 3);
    assert_eq!(assert_ok!(context.host_store().count()), 2);
    assert_eq!(
        assert_ok!(context.statistics_store().get(START)),
        Some(DailyStat::new(START, 60, 48))
    );
}
