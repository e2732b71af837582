mod utils;
#[allow(unused)]
use utils::*;

use mock_service::MockConfig;
use soak_runtime::{RuntimeError, SoakRuntime};
use std::fs;

#[tokio::test]
#[ntest::timeout(30_000)]
async fn runtime_rejects_missing_image_before_contacting_endpoint() {
    let mock = mock(MockConfig::default()).await;
    let dir = tempfile::tempdir().unwrap();

    let err = SoakRuntime::new()
        .endpoint(&mock.endpoint())
        .image(dir.path().join("absent.png"))
        .data_dir(dir.path())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, RuntimeError::Soak(soak::SoakError::MissingInput(_))));
    assert_eq!(mock.requests(), 0);
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}
