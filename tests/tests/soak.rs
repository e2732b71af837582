mod utils;
#[allow(unused)]
use utils::*;

use mock_service::MockConfig;
use soak::core::{RunState, ServiceTier};
use soak::prelude::*;
use std::fs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn rows(summary: &RunSummary) -> Vec<Vec<String>> {
    fs::read_to_string(&summary.log_path)
        .unwrap()
        .lines()
        .skip(1)
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn full_plan_against_mock_endpoint() {
    let mock = mock(MockConfig::default()).await;
    let dir = tempfile::tempdir().unwrap();

    let config = quick_config(dir.path(), &[1, 3]).tiers(&[ServiceTier::Flex, ServiceTier::Priority]);
    let client = Arc::new(HttpInferenceClient::with_endpoint(&mock.endpoint(), None).unwrap());
    client.check_reachable().await.unwrap();

    let summary = SoakDriver::new(config, client, PromptPayload::text_only())
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert!(summary.completed);
    assert_eq!(summary.batches, 2);
    assert!(!summary.state_path.exists());
    assert_eq!(mock.requests(), 2 * (1 + 3));

    let header = fs::read_to_string(&summary.log_path).unwrap();
    assert!(header.starts_with("timestamp,concurrency,tier,"));

    let rows = rows(&summary);
    assert_eq!(rows.len(), 4);
    let tiers: Vec<_> = rows.iter().map(|r| (r[1].as_str(), r[2].as_str())).collect();
    assert_eq!(
        tiers,
        [("1", "flex"), ("1", "priority"), ("3", "flex"), ("3", "priority")]
    );
    for row in &rows {
        assert_eq!(row[4], "0", "no failures expected: {row:?}");
        assert_eq!(row[5], "5.00", "server latency comes from the mock header");
    }
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn throttled_requests_are_retried() {
    let mock = mock(MockConfig {
        throttle_first: 2,
        ..MockConfig::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();

    let config = quick_config(dir.path(), &[1]).tiers(&[ServiceTier::Default]);
    let client = Arc::new(HttpInferenceClient::with_endpoint(&mock.endpoint(), None).unwrap());

    let summary = SoakDriver::new(config, client, PromptPayload::text_only())
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(mock.requests(), 3);
    let rows = rows(&summary);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][3], "1");
    assert_eq!(rows[0][4], "0");
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn exhausted_retries_log_a_failed_batch() {
    let mock = mock(MockConfig {
        throttle_first: 100,
        ..MockConfig::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();

    let config = quick_config(dir.path(), &[2]).tiers(&[ServiceTier::Flex]);
    let client = Arc::new(HttpInferenceClient::with_endpoint(&mock.endpoint(), None).unwrap());

    let summary = SoakDriver::new(config, client, PromptPayload::text_only())
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(mock.requests(), 2 * 3);
    let rows = rows(&summary);
    assert_eq!(rows[0][3], "0");
    assert_eq!(rows[0][4], "2");
    assert_eq!(rows[0][5], "0.00");
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn resumes_from_saved_state() {
    let mock = mock(MockConfig::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let config = quick_config(dir.path(), &[1, 2, 4]).tiers(&[ServiceTier::Default]);

    // Leave the run as if it had been stopped after level 1.
    let mut state = RunState::fresh(time::OffsetDateTime::now_utc());
    state.complete_level();
    fs::create_dir_all(dir.path()).unwrap();
    fs::write(config.state_path(), serde_json::to_vec(&state).unwrap()).unwrap();

    let client = Arc::new(HttpInferenceClient::with_endpoint(&mock.endpoint(), None).unwrap());
    let summary = SoakDriver::new(config, client, PromptPayload::text_only())
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert!(summary.completed);
    assert_eq!(summary.run_id, state.run_id);
    assert_eq!(mock.requests(), 2 + 4);

    let levels: Vec<_> = rows(&summary).into_iter().map(|r| r[1].clone()).collect();
    assert_eq!(levels, ["2", "4"]);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn cancelled_run_keeps_state_for_next_process() {
    let mock = mock(MockConfig::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let config = quick_config(dir.path(), &[1, 2]).tiers(&[ServiceTier::Default]);

    let token = CancellationToken::new();
    token.cancel();

    let client = Arc::new(HttpInferenceClient::with_endpoint(&mock.endpoint(), None).unwrap());
    let summary = SoakDriver::new(config, client, PromptPayload::text_only())
        .run(token)
        .await
        .unwrap();

    assert!(!summary.completed);
    assert_eq!(mock.requests(), 0);
    assert!(summary.state_path.exists());
}
