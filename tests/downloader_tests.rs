mod common;

use common::{mod_url, setup_logging, write_mod, FakeTransport};
use modpack_sync_lib::integrations::mrpack::FileEntry;
use modpack_sync_lib::sync::mod_downloader::{DownloadOutcome, ModDownloadService};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn entry(path: &str, size: u64) -> FileEntry {
    let name = path.rsplit('/').next().unwrap();
    FileEntry {
        path: PathBuf::from(path),
        size,
        downloads: vec![mod_url(name)],
    }
}

fn outcome_for<'a>(
    reports: &'a [modpack_sync_lib::sync::mod_downloader::DownloadReport],
    path: &str,
) -> &'a DownloadOutcome {
    &reports
        .iter()
        .find(|r| r.file.display_path() == path)
        .unwrap()
        .outcome
}

#[tokio::test]
async fn test_file_with_matching_size_is_not_requested() {
    setup_logging();
    let temp = tempfile::tempdir().unwrap();
    write_mod(&temp.path().join("mods"), "a.jar", 100);
    let transport = Arc::new(FakeTransport::new());

    let service = ModDownloadService::new(transport.clone());
    let reports = service
        .download_all(&[entry("mods/a.jar", 100)], temp.path())
        .await;

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, DownloadOutcome::AlreadyCurrent);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_missing_and_mismatched_files_are_downloaded() {
    let temp = tempfile::tempdir().unwrap();
    write_mod(&temp.path().join("mods"), "b.jar", 3);
    let transport = Arc::new(FakeTransport::new());
    transport.respond(&mod_url("a.jar"), vec![1u8; 10]);
    transport.respond(&mod_url("b.jar"), vec![2u8; 20]);
    transport.respond(&mod_url("pack.zip"), vec![3u8; 30]);

    let files = vec![
        entry("mods/a.jar", 10),
        entry("mods/b.jar", 20),
        entry("resourcepacks/pack.zip", 30),
    ];
    let reports = ModDownloadService::new(transport.clone())
        .download_all(&files, temp.path())
        .await;

    assert!(reports.iter().all(|r| r.outcome == DownloadOutcome::Updated));
    assert_eq!(
        std::fs::read(temp.path().join("mods/a.jar")).unwrap(),
        vec![1u8; 10]
    );
    assert_eq!(
        std::fs::read(temp.path().join("mods/b.jar")).unwrap(),
        vec![2u8; 20]
    );
    assert_eq!(
        std::fs::read(temp.path().join("resourcepacks/pack.zip")).unwrap(),
        vec![3u8; 30]
    );
}

#[tokio::test]
async fn test_one_failure_does_not_stop_the_others() {
    let temp = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::new().with_delay(Duration::from_millis(5)));
    transport.respond(&mod_url("a.jar"), vec![1u8; 10]);
    transport.fail(&mod_url("b.jar"), 500);
    transport.respond(&mod_url("c.jar"), vec![3u8; 30]);
    transport.respond(&mod_url("d.jar"), vec![4u8; 40]);

    let files = vec![
        entry("mods/a.jar", 10),
        entry("mods/b.jar", 20),
        entry("mods/c.jar", 30),
        entry("mods/d.jar", 40),
    ];
    let reports = ModDownloadService::new(transport.clone())
        .download_all(&files, temp.path())
        .await;

    assert_eq!(reports.len(), 4);
    assert!(matches!(
        outcome_for(&reports, "mods/b.jar"),
        DownloadOutcome::Failed(reason) if reason.contains("500")
    ));
    for ok in ["mods/a.jar", "mods/c.jar", "mods/d.jar"] {
        assert_eq!(outcome_for(&reports, ok), &DownloadOutcome::Updated);
        assert!(temp.path().join(ok).exists());
    }
    assert!(!temp.path().join("mods/b.jar").exists());
}

#[tokio::test]
async fn test_size_mismatch_after_download_is_a_failure() {
    let temp = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::new());
    transport.respond(&mod_url("a.jar"), vec![1u8; 9]);

    let reports = ModDownloadService::new(transport)
        .download_all(&[entry("mods/a.jar", 10)], temp.path())
        .await;

    assert!(matches!(reports[0].outcome, DownloadOutcome::Failed(_)));
}

#[tokio::test]
async fn test_entry_without_url_fails() {
    let temp = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::new());
    let file = FileEntry {
        path: PathBuf::from("mods/a.jar"),
        size: 10,
        downloads: Vec::new(),
    };

    let reports = ModDownloadService::new(transport.clone())
        .download_all(&[file], temp.path())
        .await;

    assert_eq!(
        reports[0].outcome,
        DownloadOutcome::Failed("no download URL".to_string())
    );
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let temp = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::new().with_delay(Duration::from_millis(20)));
    let files: Vec<FileEntry> = (0..12)
        .map(|i| {
            let name = format!("mod-{}.jar", i);
            transport.respond(&mod_url(&name), vec![0u8; 4]);
            entry(&format!("mods/{}", name), 4)
        })
        .collect();

    let reports = ModDownloadService::new(transport.clone())
        .with_concurrency(3)
        .download_all(&files, temp.path())
        .await;

    assert_eq!(reports.len(), 12);
    assert!(reports.iter().all(|r| r.outcome == DownloadOutcome::Updated));
    assert!(transport.max_in_flight() <= 3);
    assert!(transport.max_in_flight() > 1);
}

#[tokio::test]
async fn test_every_request_carries_the_configured_timeout() {
    let temp = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::new());
    transport.respond(&mod_url("a.jar"), vec![1u8; 10]);
    transport.fail(&mod_url("b.jar"), 500);

    let timeout = Duration::from_secs(7);
    ModDownloadService::new(transport.clone())
        .with_request_timeout(timeout)
        .download_all(&[entry("mods/a.jar", 10), entry("mods/b.jar", 20)], temp.path())
        .await;

    assert_eq!(transport.timeouts_for(&mod_url("a.jar")), vec![Some(timeout)]);
    assert_eq!(transport.timeouts_for(&mod_url("b.jar")), vec![Some(timeout)]);
}
