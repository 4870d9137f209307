//! Integration tests for the download, upload and cleanup pipeline

use crate::test_utils::constants::*;
use crate::test_utils::{FakeProvider, Harness, RecordingTransport};
use r_playbot::download::DownloadPipeline;
use r_playbot::executor::TaskExecutor;
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
mod download_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_download_without_link_needs_a_track() {
        let harness = Harness::new();
        harness.run(ALICE, "/dl").await;

        let notices = harness.transport.to_user(ALICE);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].starts_with("Invalid command. Usage: download <link>"));
        assert_eq!(harness.provider.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_download_uploads_to_requester_channel() {
        let harness = Harness::new();
        harness.run(ALICE, "/download https://www.youtube.com/watch?v=abc").await;

        let file_name = "https___www_youtube_com_watch_v_abc.m4a";
        assert_eq!(
            harness.transport.to_user(ALICE),
            vec![
                "Downloading audio. Please wait...".to_string(),
                format!("File {} downloaded and uploaded.", file_name),
            ]
        );
        assert_eq!(harness.transport.files_in(BOT_CHANNEL), vec![file_name]);
        assert!(harness.download_dir.path().join(file_name).exists());
        assert!(!harness.coordinator.downloads().is_in_flight());
        // No deletion delay configured.
        assert_eq!(harness.coordinator.downloads().scheduler().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_download_defaults_to_current_link() {
        let harness = Harness::new();
        harness.run(ALICE, "/u https://radio.example/show").await;
        harness.run(BOB, "/dl").await;

        assert_eq!(harness.transport.files_in(BOT_CHANNEL), vec!["https___radio_example_show.m4a"]);
        assert_eq!(harness.transport.to_user(BOB).len(), 2);
    }

    #[tokio::test]
    async fn test_second_download_is_rejected_while_first_runs() {
        let harness = Harness::new();
        harness.provider.hold_downloads();

        harness.coordinator.handle_text(ALICE, "/dl https://example.com/a").await;
        harness.coordinator.handle_text(BOB, "/dl https://example.com/b").await;
        assert!(harness.coordinator.downloads().is_in_flight());
        assert_eq!(harness.transport.to_user(BOB), vec!["Download already in progress. Please wait."]);

        harness.provider.release_downloads();
        harness.coordinator.wait_idle().await;

        assert!(!harness.coordinator.downloads().is_in_flight());
        assert_eq!(harness.provider.fetch_count(), 1);
        assert_eq!(harness.transport.files_in(BOT_CHANNEL), vec!["https___example_com_a.m4a"]);

        // The slot is free again.
        harness.run(BOB, "/dl https://example.com/b").await;
        assert_eq!(harness.provider.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_download_reports_and_releases() {
        let harness = Harness::new();
        harness.provider.fail_download("https://example.com/gone");

        harness.run(ALICE, "/dl https://example.com/gone").await;

        let notices = harness.transport.to_user(ALICE);
        assert_eq!(notices.len(), 2);
        assert!(notices[1].starts_with("Error downloading or uploading:"));
        assert!(notices[1].contains("https://example.com/gone is unavailable"));
        assert!(!harness.coordinator.downloads().is_in_flight());
        assert!(harness.transport.files_in(BOT_CHANNEL).is_empty());
    }

    #[tokio::test]
    async fn test_configured_delay_schedules_cleanup_until_shutdown() {
        let harness = Harness::with_settings(|settings| settings.deletion_delay_minutes = 5);
        harness.run(ALICE, "/dl https://example.com/a").await;
        harness.run(ALICE, "/dl https://example.com/a").await;

        // The second upload of the same file replaced the first timer.
        let scheduler = harness.coordinator.downloads().scheduler();
        assert_eq!(scheduler.pending_count(), 1);
        assert!(scheduler.is_pending(&harness.download_dir.path().join("https___example_com_a.m4a")));

        harness.coordinator.shutdown(Duration::from_secs(1)).await;
        assert_eq!(scheduler.pending_count(), 0);
        assert!(harness.transport.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_deletes_remote_and_local_copies() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FakeProvider::default());
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = DownloadPipeline::new(
            provider,
            transport.clone(),
            dir.path().to_path_buf(),
            Some(Duration::from_millis(30)),
        );
        let executor = TaskExecutor::new(1);

        pipeline
            .request_download(&executor, ALICE, "https://example.com/a".to_string())
            .unwrap();
        executor.wait_idle().await;

        let local = dir.path().join("https___example_com_a.m4a");
        assert!(local.exists());
        assert!(pipeline.scheduler().is_pending(&local));

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(!local.exists());
        assert_eq!(
            transport.deleted(),
            vec![(BOT_CHANNEL, "https___example_com_a.m4a".to_string())]
        );
        assert!(transport.files_in(BOT_CHANNEL).is_empty());
        assert_eq!(pipeline.scheduler().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_redownload_within_delay_cleans_every_remote_copy() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = DownloadPipeline::new(
            Arc::new(FakeProvider::default()),
            transport.clone(),
            dir.path().to_path_buf(),
            Some(Duration::from_millis(100)),
        );
        let executor = TaskExecutor::new(1);
        let name = "https___example_com_a.m4a";

        for _ in 0..2 {
            pipeline
                .request_download(&executor, ALICE, "https://example.com/a".to_string())
                .unwrap();
            executor.wait_idle().await;
        }
        assert_eq!(transport.files_in(BOT_CHANNEL), vec![name, name]);
        assert_eq!(pipeline.scheduler().pending_count(), 1);

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(transport.files_in(BOT_CHANNEL).is_empty());
        assert_eq!(transport.deleted().len(), 2);
        assert!(!dir.path().join(name).exists());
        assert_eq!(pipeline.scheduler().pending_count(), 0);
    }
}
