// tests/watch_registrar.rs

mod common;
use crate::common::{change, cwd_options, init_tracing, project, wait_idle, wait_until, with_timeout, FakeHost};

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use taskwatch::host::{App, TaskHost};
use taskwatch::plugin::{attach_build_trigger, GateState, WatchExt, WatchPlugin, WATCH_CAPABILITY};
use taskwatch::types::BuildTarget;
use taskwatch::watch::{create_watcher, WatchEventKind, WatchOptions};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
async fn sequential_events_each_trigger_one_build() -> TestResult {
    init_tracing();
    let dir = project();
    let settings = cwd_options(dir.path()).with("ignore_initial", true).resolve()?;
    let watcher = create_watcher(&"a.txt".into(), &settings)?;

    let host = Arc::new(FakeHost::new());
    let gate = attach_build_trigger(&watcher, host.clone(), vec![["build"].into()]);

    with_timeout(async {
        watcher.wait_ready().await;
        wait_idle(&gate).await;

        for n in 1..=5 {
            assert!(watcher.emit(change("a.txt")));
            host.wait_for_finished(n).await;
            wait_idle(&gate).await;
        }
    })
    .await;

    assert_eq!(host.call_count(), 5);
    assert_eq!(host.max_in_flight(), 1);
    assert!(host.calls().iter().all(|c| c == &vec!["build".to_string()]));
    Ok(())
}

#[tokio::test]
async fn initial_scan_events_do_not_trigger_builds() -> TestResult {
    init_tracing();
    let dir = project();
    fs::write(dir.path().join("b.txt"), "two")?;
    let settings = cwd_options(dir.path()).resolve()?;
    assert!(!settings.ignore_initial);

    // Single-threaded runtime: the dispatch task cannot start the scan
    // before both listeners below are attached.
    let watcher = create_watcher(&"*.txt".into(), &settings)?;
    let scanned = Arc::new(AtomicUsize::new(0));
    {
        let scanned = Arc::clone(&scanned);
        watcher.on(WatchEventKind::Add, move |_| {
            scanned.fetch_add(1, Ordering::SeqCst);
        });
    }
    let host = Arc::new(FakeHost::new());
    let gate = attach_build_trigger(&watcher, host.clone(), vec!["build".into()]);

    with_timeout(async {
        watcher.wait_ready().await;
        wait_idle(&gate).await;
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(scanned.load(Ordering::SeqCst), 2);
    assert_eq!(host.call_count(), 0);

    with_timeout(async {
        watcher.emit(change("a.txt"));
        host.wait_for_finished(1).await;
        wait_idle(&gate).await;
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(host.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn events_during_a_build_are_dropped() -> TestResult {
    init_tracing();
    let dir = project();
    let settings = cwd_options(dir.path()).with("ignore_initial", true).resolve()?;
    let watcher = create_watcher(&"a.txt".into(), &settings)?;

    let host = Arc::new(FakeHost::with_delay(Duration::from_millis(500)));
    let gate = attach_build_trigger(&watcher, host.clone(), vec!["build".into()]);

    with_timeout(async {
        watcher.wait_ready().await;
        wait_idle(&gate).await;

        watcher.emit(change("a.txt"));
        wait_until(|| host.call_count() == 1).await;
        assert_eq!(gate.state(), GateState::Building);

        watcher.emit(change("a.txt"));
        watcher.emit(change("a.txt"));

        host.wait_for_finished(1).await;
        wait_idle(&gate).await;
    })
    .await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(host.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_build_is_swallowed_and_watch_continues() -> TestResult {
    init_tracing();
    let dir = project();
    let settings = cwd_options(dir.path()).with("ignore_initial", true).resolve()?;
    let watcher = create_watcher(&"a.txt".into(), &settings)?;

    let host = Arc::new(FakeHost::new());
    host.set_failing(true);
    let gate = attach_build_trigger(&watcher, host.clone(), vec!["build".into()]);

    with_timeout(async {
        watcher.wait_ready().await;
        wait_idle(&gate).await;

        watcher.emit(change("a.txt"));
        host.wait_for_finished(1).await;
        wait_idle(&gate).await;

        host.set_failing(false);
        watcher.emit(change("a.txt"));
        host.wait_for_finished(2).await;
        wait_idle(&gate).await;
    })
    .await;

    assert_eq!(host.call_count(), 2);
    assert!(!watcher.is_closed());
    Ok(())
}

#[tokio::test]
async fn closed_watcher_accepts_no_events() -> TestResult {
    let dir = project();
    let settings = cwd_options(dir.path()).resolve()?;
    let mut watcher = create_watcher(&"a.txt".into(), &settings)?;

    let host = Arc::new(FakeHost::new());
    attach_build_trigger(&watcher, host.clone(), vec!["build".into()]);
    with_timeout(watcher.wait_ready()).await;

    watcher.close();
    assert!(watcher.is_closed());
    assert!(!watcher.emit(change("a.txt")));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(host.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn closures_are_forwarded_as_build_targets() -> TestResult {
    let dir = project();
    let settings = cwd_options(dir.path()).with("ignore_initial", true).resolve()?;
    let watcher = create_watcher(&"a.txt".into(), &settings)?;

    let app = App::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let body = taskwatch::types::task_fn(move || {
        let tx = tx.clone();
        async move {
            let _ = tx.send(());
            Ok(())
        }
    });
    let host: Arc<dyn TaskHost> = Arc::new(app);
    let gate = attach_build_trigger(&watcher, host, vec![BuildTarget::Func(body)]);

    with_timeout(async {
        watcher.wait_ready().await;
        wait_idle(&gate).await;
        watcher.emit(change("a.txt"));
        rx.recv().await;
    })
    .await;
    Ok(())
}

#[tokio::test]
async fn plugin_install_is_idempotent() -> TestResult {
    let app = App::new();
    app.use_plugin(WatchPlugin::default())?;
    app.use_plugin(WatchPlugin::default())?;

    assert_eq!(app.capability_names(), vec![WATCH_CAPABILITY.to_string()]);
    Ok(())
}

#[tokio::test]
async fn watch_without_targets_has_no_listeners() -> TestResult {
    let dir = project();
    let app = App::new();
    app.use_plugin(WatchPlugin::new(cwd_options(dir.path())))?;

    let watcher = app.watch("a.txt", vec![])?;
    assert_eq!(watcher.listener_count(), 0);

    let watcher = app.watch("a.txt", vec![WatchOptions::new().with("depth", 1).into()])?;
    assert_eq!(watcher.listener_count(), 0);
    Ok(())
}

#[tokio::test]
async fn task_list_in_second_position_is_not_options() -> TestResult {
    let dir = project();
    let app = App::new();
    app.use_plugin(WatchPlugin::new(cwd_options(dir.path()).with("depth", 2)))?;

    let watcher = app.watch("a.txt", vec![["build", "test"].into()])?;
    assert_eq!(watcher.listener_count(), 2);
    assert_eq!(watcher.settings().depth, Some(2));

    let watcher = app.watch("a.txt", vec!["build".into()])?;
    assert_eq!(watcher.listener_count(), 2);
    Ok(())
}

#[tokio::test]
async fn per_call_options_override_defaults() -> TestResult {
    let defaults_dir = project();
    let call_dir = project();

    let app = App::new();
    app.use_plugin(WatchPlugin::new(
        cwd_options(defaults_dir.path())
            .with("ignore_initial", true)
            .with("depth", 4),
    ))?;

    let watcher = app.watch(
        "a.txt",
        vec![
            cwd_options(call_dir.path()).with("depth", 1).into(),
            ["build"].into(),
        ],
    )?;

    let settings = watcher.settings();
    assert_eq!(settings.cwd.as_deref(), Some(call_dir.path()));
    assert_eq!(settings.depth, Some(1));
    assert!(settings.ignore_initial);
    Ok(())
}

#[tokio::test]
async fn invalid_pattern_is_an_error() -> TestResult {
    let dir = project();
    let app = App::new();
    app.use_plugin(WatchPlugin::new(cwd_options(dir.path())))?;

    assert!(app.watch("src/[", vec!["build".into()]).is_err());
    assert!(
        app.watch("a.txt", vec![WatchOptions::new().with("use_polling", "no").into()])
            .is_err()
    );
    Ok(())
}
