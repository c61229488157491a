//! Restart recovery against a SQLite job store.

#![cfg(feature = "sqlite")]

mod test_backends;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use qcomp_compile::CompilationConstraints;
use qcomp_service::{
    Dispatcher, DispatcherConfig, ErrorKind, JobFilter, JobState, JobStore, RecoveryReport,
    SqliteStorage, Transition,
};

use test_backends::{SLEEPY, ghz, registry};

fn open_store(path: &Path) -> JobStore {
    JobStore::with_storage(Arc::new(SqliteStorage::open(path).unwrap()))
}

#[tokio::test]
async fn test_recover_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.db");
    let constraints = CompilationConstraints::new(SLEEPY, 0);

    // State left behind by a process that stopped mid-flight.
    let (submitted, queued, running, finished) = {
        let store = open_store(&path);
        let submitted = store.create(ghz(2), constraints.clone()).await.unwrap();
        let queued = store.create(ghz(3), constraints.clone()).await.unwrap();
        store.transition(&queued.id, Transition::Queue).await.unwrap();
        let running = store.create(ghz(4), constraints.clone()).await.unwrap();
        store.transition(&running.id, Transition::Queue).await.unwrap();
        store.transition(&running.id, Transition::Start).await.unwrap();
        let finished = store.create(ghz(2), constraints.clone()).await.unwrap();
        store.transition(&finished.id, Transition::Cancel).await.unwrap();
        (submitted.id, queued.id, running.id, finished.id)
    };

    let dispatcher = Dispatcher::new(
        open_store(&path),
        registry(Duration::ZERO),
        DispatcherConfig::new(2, Duration::from_secs(10)),
    );
    let report = dispatcher.recover().await.unwrap();
    assert_eq!(
        report,
        RecoveryReport {
            requeued: 2,
            interrupted: 1,
        }
    );

    for id in [&submitted, &queued] {
        let job = dispatcher
            .await_result(id, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(job.state, JobState::Succeeded);
    }

    let interrupted = dispatcher.store().get(&running).await.unwrap();
    assert_eq!(interrupted.state, JobState::Failed);
    let error = interrupted.error.unwrap();
    assert_eq!(error.kind, ErrorKind::InternalCompilerError);
    assert!(error.message.contains("interrupted"));

    let untouched = dispatcher.store().get(&finished).await.unwrap();
    assert_eq!(untouched.state, JobState::Cancelled);

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_results_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.db");

    let id = {
        let dispatcher = Dispatcher::new(
            open_store(&path),
            registry(Duration::ZERO),
            DispatcherConfig::new(1, Duration::from_secs(10)),
        );
        let id = dispatcher
            .submit(ghz(3), CompilationConstraints::new("ideal-simulator", 0))
            .await
            .unwrap();
        dispatcher
            .await_result(&id, Duration::from_secs(5))
            .await
            .unwrap();
        dispatcher.shutdown().await;
        id
    };

    let store = open_store(&path);
    let job = store.get(&id).await.unwrap();
    assert_eq!(job.state, JobState::Succeeded);
    assert_eq!(job.result.unwrap(), ghz(3));

    let listed = store
        .list(&JobFilter::new().with_state(JobState::Succeeded))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}
