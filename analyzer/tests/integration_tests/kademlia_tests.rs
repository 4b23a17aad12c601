//! Tests for the Kademlia activity log client.

use analyzer::{ActivityLogSource, FetchError, KademliaClient};
use shared::range::TimeRange;
use std::sync::Arc;

use super::common::{spawn_mock, storage_record, MockKademlia, WindowReply};

#[tokio::test]
async fn test_fetch_sends_window_as_query_parameters() {
    let api = Arc::new(MockKademlia::default().with_records(vec![
        storage_record(50, "h1", 10, 2),
        storage_record(150, "h1", 10, 2),
        storage_record(250, "h1", 10, 2),
    ]));
    let client = KademliaClient::new(&spawn_mock(Arc::clone(&api)).await).unwrap();

    let records = client.fetch(TimeRange::new(100, 200)).await.unwrap();

    assert_eq!(api.calls(), vec![(100, 200)]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ts, Some(150));
    assert_eq!(records[0].name.as_deref(), Some("h1"));
    assert_eq!(records[0].total_size, 10);
}

#[tokio::test]
async fn test_fetch_server_error() {
    let api = Arc::new(MockKademlia::default().failing_at(0));
    let client = KademliaClient::new(&spawn_mock(api).await).unwrap();

    let result = client.fetch(TimeRange::new(0, 10)).await;

    assert!(matches!(result, Err(FetchError::Status(500))));
}

#[tokio::test]
async fn test_fetch_non_json_body() {
    let api = Arc::new(MockKademlia::default().with_reply(0, WindowReply::Garbage));
    let client = KademliaClient::new(&spawn_mock(api).await).unwrap();

    let result = client.fetch(TimeRange::new(0, 10)).await;

    assert!(matches!(result, Err(FetchError::Decode(_))));
}

#[tokio::test]
async fn test_fetch_unreachable_host() {
    let client = KademliaClient::new("http://127.0.0.1:1").unwrap();

    let result = client.fetch(TimeRange::new(0, 10)).await;

    assert!(matches!(result, Err(FetchError::Request(_))));
}
