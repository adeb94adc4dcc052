use async_trait::async_trait;
use httpmock::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wdm_config::{FeedMatch, Preferences, PreferencesStore};
use wdm_errors::{Error, NetworkError, UpdateError};
use wdm_events::{AppEvent, EventEmitter, EventReceiver, UpdateEvent};
use wdm_net::NetClient;
use wdm_updater::{
    CheckOutcome, FeedSource, HostInfo, HttpFeedSource, Notifier, RemoteUpdateEntry,
    UpdateChecker, UpdateNotification, UpdateScheduler,
};

const REMOTE: &str = "387.10.10.10.40.105";
const LOCAL: &str = "387.10.10.10.40.40";
const BUILD: &str = "18A391";

struct FakeFeed {
    entries: Option<Vec<RemoteUpdateEntry>>,
    fetches: AtomicUsize,
}

impl FakeFeed {
    fn with(entries: Vec<RemoteUpdateEntry>) -> Self {
        Self {
            entries: Some(entries),
            fetches: AtomicUsize::new(0),
        }
    }

    fn unreachable() -> Self {
        Self {
            entries: None,
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    fn location(&self) -> &str {
        "fake://feed"
    }

    async fn fetch(&self) -> Result<Vec<RemoteUpdateEntry>, Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.entries
            .clone()
            .ok_or_else(|| NetworkError::NetworkUnavailable.into())
    }
}

struct FakeHost {
    installed: Option<String>,
}

#[async_trait]
impl HostInfo for FakeHost {
    async fn os_build(&self) -> Result<String, Error> {
        Ok(BUILD.to_string())
    }

    async fn os_product_version(&self) -> Result<String, Error> {
        Ok("10.14".to_string())
    }

    async fn installed_version(&self) -> Option<String> {
        self.installed.clone()
    }
}

#[derive(Default)]
struct RecordingNotifier {
    delivered: Mutex<Vec<UpdateNotification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    fn identifiers(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.identifier.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn schedule(&self, notification: &UpdateNotification) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(UpdateError::NotificationFailed {
                message: "osascript exited with status 1".into(),
            }
            .into());
        }
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

fn entry(os: &str, version: &str) -> RemoteUpdateEntry {
    RemoteUpdateEntry {
        os: os.to_string(),
        version: Some(version.to_string()),
        download_url: Some(format!("https://example.invalid/WebDriver-{version}.pkg")),
        checksum: None,
    }
}

struct Harness {
    feed: Arc<FakeFeed>,
    notifier: Arc<RecordingNotifier>,
    preferences: PreferencesStore,
    checker: UpdateChecker,
    rx: EventReceiver,
}

fn harness(feed: FakeFeed, installed: Option<&str>, automatic_checks: bool) -> Harness {
    let (tx, rx) = wdm_events::channel();
    let feed = Arc::new(feed);
    let notifier = Arc::new(RecordingNotifier::default());
    let preferences = PreferencesStore::in_memory(Preferences {
        automatic_checks,
        ..Preferences::default()
    });
    let checker = UpdateChecker::new(
        feed.clone(),
        Arc::new(FakeHost {
            installed: installed.map(str::to_string),
        }),
        notifier.clone(),
        preferences.clone(),
        Some(tx),
    )
    .with_notification_delay(Duration::ZERO);

    Harness {
        feed,
        notifier,
        preferences,
        checker,
        rx,
    }
}

fn update_events(rx: &mut EventReceiver) -> Vec<UpdateEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let AppEvent::Update(event) = event {
            events.push(event);
        }
    }
    events
}

#[tokio::test]
async fn newer_remote_version_notifies_once() {
    let h = harness(FakeFeed::with(vec![entry(BUILD, REMOTE)]), Some(LOCAL), true);

    assert!(h.checker.check_for_updates().await);
    assert_eq!(h.notifier.identifiers(), vec![REMOTE.to_string()]);
}

#[tokio::test]
async fn installed_version_does_not_notify() {
    let h = harness(FakeFeed::with(vec![entry(BUILD, REMOTE)]), Some(REMOTE), true);

    let outcome = h.checker.check().await.unwrap();
    assert_eq!(
        outcome,
        CheckOutcome::AlreadyInstalled {
            version: REMOTE.to_string()
        }
    );
    assert!(!h.checker.check_for_updates().await);
    assert!(h.notifier.identifiers().is_empty());
}

#[tokio::test]
async fn unknown_installed_version_is_not_up_to_date() {
    let h = harness(FakeFeed::with(vec![entry(BUILD, REMOTE)]), None, true);
    assert!(h.checker.check_for_updates().await);
}

#[tokio::test]
async fn other_builds_do_not_match() {
    let h = harness(FakeFeed::with(vec![entry("17G65", REMOTE)]), Some(LOCAL), true);

    let outcome = h.checker.check().await.unwrap();
    assert_eq!(
        outcome,
        CheckOutcome::NoMatchingEntry {
            build: BUILD.to_string()
        }
    );
    assert!(h.notifier.identifiers().is_empty());
}

#[tokio::test]
async fn duplicate_entries_use_configured_tie_break() {
    let feed = FakeFeed::with(vec![
        entry(BUILD, "387.10.10.10.40.100"),
        entry(BUILD, REMOTE),
    ]);
    let mut h = harness(feed, Some(LOCAL), true);

    assert!(h.checker.check_for_updates().await);
    assert_eq!(h.notifier.identifiers(), vec![REMOTE.to_string()]);
    assert!(update_events(&mut h.rx)
        .iter()
        .any(|e| matches!(e, UpdateEvent::DuplicateEntries { count: 2, .. })));

    let first = h.checker.clone().with_feed_match(FeedMatch::First);
    assert!(first.check_for_updates().await);
    assert_eq!(
        h.notifier.identifiers().last().map(String::as_str),
        Some("387.10.10.10.40.100")
    );
}

#[tokio::test]
async fn feed_failure_reports_false() {
    let mut h = harness(FakeFeed::unreachable(), Some(LOCAL), true);

    assert!(!h.checker.check_for_updates().await);
    let events = update_events(&mut h.rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, UpdateEvent::CheckFailed { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        UpdateEvent::CheckCompleted {
            notified: false,
            ..
        }
    )));
}

#[tokio::test]
async fn failed_notification_is_not_reported_as_scheduled() {
    let mut h = harness(FakeFeed::with(vec![entry(BUILD, REMOTE)]), Some(LOCAL), true);
    h.notifier.failing.store(true, Ordering::SeqCst);

    assert!(!h.checker.check_for_updates().await);

    let events = update_events(&mut h.rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, UpdateEvent::UpdateAvailable { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, UpdateEvent::CheckFailed { .. })));
    assert!(!events
        .iter()
        .any(|e| matches!(e, UpdateEvent::NotificationScheduled { .. })));
}

#[tokio::test]
async fn suppression_round_trip() {
    let h = harness(FakeFeed::with(vec![entry(BUILD, REMOTE)]), Some(LOCAL), false);
    let scheduler = UpdateScheduler::new(h.checker.clone(), Duration::from_secs(21_600), None);

    assert!(h.checker.check_for_updates().await);

    // "Don't Show Again"
    h.preferences.suppress(REMOTE).await.unwrap();
    assert_eq!(
        h.checker.check().await.unwrap(),
        CheckOutcome::Suppressed {
            version: REMOTE.to_string()
        }
    );
    assert_eq!(h.notifier.identifiers().len(), 1);

    // An explicit request clears the suppression and notifies again
    assert!(scheduler.check_now().await);
    assert_eq!(h.preferences.suppressed_version().await, None);
    assert_eq!(h.notifier.identifiers().len(), 2);
}

#[tokio::test]
async fn on_demand_check_runs_with_automatic_checks_disabled() {
    let mut h = harness(FakeFeed::with(vec![entry(BUILD, REMOTE)]), Some(LOCAL), false);
    let scheduler = UpdateScheduler::new(
        h.checker.clone(),
        Duration::from_secs(21_600),
        h.checker.event_sender().cloned(),
    );

    assert!(!scheduler.start().await);
    assert_eq!(h.feed.fetches(), 0);

    assert!(scheduler.check_now().await);
    assert_eq!(h.feed.fetches(), 1);
    assert!(!scheduler.has_pending_check());

    let events = update_events(&mut h.rx);
    assert!(matches!(
        events.first(),
        Some(UpdateEvent::CheckStarted { on_demand: true })
    ));
    assert!(matches!(events.last(), Some(UpdateEvent::ControlsEnabled)));
    assert!(!events
        .iter()
        .any(|e| matches!(e, UpdateEvent::NextCheckScheduled { .. })));
}

#[tokio::test]
async fn automatic_checks_arm_a_single_timer() {
    let h = harness(FakeFeed::with(vec![entry(BUILD, REMOTE)]), Some(REMOTE), true);
    let scheduler = UpdateScheduler::new(h.checker.clone(), Duration::from_secs(21_600), None);

    assert!(!scheduler.start().await);
    assert!(scheduler.has_pending_check());

    assert!(!scheduler.check_now().await);
    assert!(scheduler.has_pending_check());
    assert_eq!(h.feed.fetches(), 2);

    scheduler.cancel();
    assert!(!scheduler.has_pending_check());
}

#[tokio::test(start_paused = true)]
async fn armed_timer_runs_the_next_check() {
    let h = harness(FakeFeed::with(vec![entry(BUILD, REMOTE)]), Some(REMOTE), true);
    let scheduler = UpdateScheduler::new(h.checker.clone(), Duration::from_secs(60), None);

    scheduler.check_now().await;
    assert_eq!(h.feed.fetches(), 1);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(h.feed.fetches(), 2);
    assert!(scheduler.has_pending_check());

    h.preferences.set_automatic_checks(false).await.unwrap();
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(h.feed.fetches(), 3);
    assert!(!scheduler.has_pending_check());
}

#[tokio::test]
async fn http_feed_source_parses_remote_plist() {
    let server = MockServer::start();
    let feed = server.mock(|when, then| {
        when.method(GET).path("/mac-update");
        then.status(200).body(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0"><dict><key>updates</key><array>
<dict><key>OS</key><string>{BUILD}</string><key>version</key><string>{REMOTE}</string></dict>
</array></dict></plist>"#
        ));
    });

    let source = HttpFeedSource::new(
        NetClient::with_defaults().unwrap(),
        server.url("/mac-update"),
        None,
    );
    let entries = source.fetch().await.unwrap();

    feed.assert();
    assert_eq!(
        entries,
        vec![RemoteUpdateEntry {
            os: BUILD.to_string(),
            version: Some(REMOTE.to_string()),
            download_url: None,
            checksum: None,
        }]
    );
}

#[tokio::test]
async fn download_update_names_file_after_url() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/drivers/WebDriver-387.10.10.10.40.105.pkg");
        then.status(200).body("xar!");
    });
    let dir = tempfile::tempdir().unwrap();
    let entry = RemoteUpdateEntry {
        download_url: Some(server.url("/drivers/WebDriver-387.10.10.10.40.105.pkg")),
        ..entry(BUILD, REMOTE)
    };
    let (tx, mut rx) = wdm_events::channel();

    let path = wdm_updater::download_update(
        &NetClient::with_defaults().unwrap(),
        &entry,
        dir.path(),
        &tx,
    )
    .await
    .unwrap();

    assert_eq!(path, dir.path().join("WebDriver-387.10.10.10.40.105.pkg"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "xar!");
    let events = update_events(&mut rx);
    assert!(matches!(
        events.last(),
        Some(UpdateEvent::DownloadCompleted { bytes: 4, .. })
    ));

    let missing = RemoteUpdateEntry {
        download_url: None,
        ..entry
    };
    assert!(wdm_updater::download_update(
        &NetClient::with_defaults().unwrap(),
        &missing,
        dir.path(),
        &tx
    )
    .await
    .is_err());
}
