mod support;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use support::doubles::{
    ScriptedResolver, SwitchLocator, probe_with, reconciler_with, seed_tags, stored_tags,
};
use tempfile::NamedTempFile;
use vibetag::{
    session::{
        SessionEvent,
        runtime::{SessionCommand, spawn_session},
    },
    player::ProbeError,
    tags::{TagCatalog, TagSet, attributes::MemoryAttributes},
};

fn wait_for<F>(handle: &vibetag::session::runtime::SessionHandle, mut matches: F) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let event = handle
            .events()
            .recv_timeout(remaining)
            .expect("session event before deadline");
        if matches(&event) {
            return event;
        }
    }
}

#[test]
fn session_detects_on_start_and_applies_toggles() {
    let file = NamedTempFile::new().unwrap();
    let attributes = Arc::new(MemoryAttributes::new());
    let probe = probe_with(
        Arc::new(SwitchLocator::running()),
        Arc::new(ScriptedResolver::always(file.path())),
    );
    let handle = spawn_session(
        reconciler_with(&attributes, probe),
        None,
        Duration::from_millis(250),
    )
    .unwrap();

    let event = wait_for(&handle, |event| matches!(event, SessionEvent::FileChanged(_)));
    let SessionEvent::FileChanged(file_info) = event else {
        unreachable!()
    };
    assert_eq!(file_info.path, file.path());

    handle.toggle("Arc");
    wait_for(&handle, |event| {
        matches!(event, SessionEvent::TagsChanged { tags, .. } if tags.contains("Arc"))
    });
    assert_eq!(stored_tags(&attributes, file.path()), TagSet::from_iter(["Arc"]));

    handle.send(SessionCommand::Snapshot);
    let snapshot = wait_for(&handle, |event| matches!(event, SessionEvent::Snapshot(_)));
    let SessionEvent::Snapshot(snapshot) = snapshot else {
        unreachable!()
    };
    assert!(snapshot.auto_refresh);
    assert_eq!(snapshot.tags, TagSet::from_iter(["Arc"]));

    handle.shutdown();
}

#[test]
fn auto_refresh_off_stops_polling() {
    let file = NamedTempFile::new().unwrap();
    let attributes = Arc::new(MemoryAttributes::new());
    let resolver = Arc::new(ScriptedResolver::always(file.path()));
    let probe = probe_with(Arc::new(SwitchLocator::running()), resolver.clone());
    let mut reconciler = reconciler_with(&attributes, probe);
    reconciler.set_auto_refresh(false);
    let handle = spawn_session(reconciler, None, Duration::from_millis(250)).unwrap();

    // The initial detection still runs.
    wait_for(&handle, |event| matches!(event, SessionEvent::FileChanged(_)));
    std::thread::sleep(Duration::from_millis(700));
    assert_eq!(resolver.calls(), 1);

    handle.send(SessionCommand::SetAutoRefresh(true));
    let deadline = Instant::now() + Duration::from_secs(5);
    while resolver.calls() < 2 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(resolver.calls() >= 2);
    handle.shutdown();
}

#[test]
fn shutdown_returns_promptly() {
    let attributes = Arc::new(MemoryAttributes::new());
    let probe = probe_with(
        Arc::new(SwitchLocator::running()),
        Arc::new(ScriptedResolver::with(
            Vec::new(),
            Err(ProbeError::NoFileLoaded),
        )),
    );
    let handle = spawn_session(
        reconciler_with(&attributes, probe),
        None,
        Duration::from_secs(60),
    )
    .unwrap();
    let started = Instant::now();
    handle.shutdown();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn opened_file_is_tagged_and_follows_catalog_edits() {
    let file = NamedTempFile::new().unwrap();
    let attributes = Arc::new(MemoryAttributes::new());
    seed_tags(&attributes, file.path(), &["Arc", "TMP"]);
    let probe = probe_with(
        Arc::new(SwitchLocator::running()),
        Arc::new(ScriptedResolver::with(Vec::new(), Err(ProbeError::NoFileLoaded))),
    );
    let handle = spawn_session(
        reconciler_with(&attributes, probe),
        None,
        Duration::from_secs(60),
    )
    .unwrap();
    wait_for(&handle, |event| matches!(event, SessionEvent::Status(_)));

    handle.open(file.path());
    let event = wait_for(&handle, |event| matches!(event, SessionEvent::FileChanged(_)));
    let SessionEvent::FileChanged(file_info) = event else {
        unreachable!()
    };
    assert_eq!(file_info.path, file.path());
    assert!(!file_info.cached);

    let mut catalog = TagCatalog::default();
    catalog.set_enabled("TMP", false);
    handle.send(SessionCommand::SetCatalog(catalog));
    let event = wait_for(&handle, |event| {
        matches!(event, SessionEvent::TagsChanged { tags, .. } if !tags.contains("TMP"))
    });
    let SessionEvent::TagsChanged { tags, .. } = event else {
        unreachable!()
    };
    assert_eq!(tags, TagSet::from_iter(["Arc"]));
    assert_eq!(
        stored_tags(&attributes, file.path()),
        TagSet::from_iter(["Arc", "TMP"])
    );
    handle.shutdown();
}
