//! End-to-end dispatcher behavior against the in-memory store.

mod test_backends;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use qcomp_compile::{BackendRegistry, CompilationConstraints};
use qcomp_service::{
    Dispatcher, DispatcherConfig, Error, ErrorKind, JobEvent, JobId, JobState, JobStore,
};
use tokio::sync::broadcast;

use test_backends::{PANICKY, SLEEPY, ghz, registry};

fn dispatcher(workers: usize, delay: Duration, compile_timeout: Duration) -> Dispatcher {
    Dispatcher::new(
        JobStore::new(),
        registry(delay),
        DispatcherConfig::new(workers, compile_timeout),
    )
}

/// Receive events until `done` returns true for one of them.
async fn wait_for_event(
    events: &mut broadcast::Receiver<JobEvent>,
    mut done: impl FnMut(&JobEvent) -> bool,
) -> JobEvent {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = events.recv().await.unwrap();
            if done(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event not observed in time")
}

#[tokio::test]
async fn test_unknown_backend_fails_job() {
    let dispatcher = Dispatcher::new(
        JobStore::new(),
        Arc::new(BackendRegistry::with_defaults()),
        DispatcherConfig::new(2, Duration::from_secs(10)),
    );
    let id = dispatcher
        .submit(ghz(2), CompilationConstraints::new("foo", 1))
        .await
        .unwrap();

    let job = dispatcher
        .await_result(&id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert!(job.result.is_none());
    let error = job.error.unwrap();
    assert_eq!(error.kind, ErrorKind::UnsupportedBackend);
    assert!(error.message.contains("foo"));
}

#[tokio::test]
async fn test_ideal_simulator_compiles_three_qubits() {
    let dispatcher = Dispatcher::new(
        JobStore::new(),
        Arc::new(BackendRegistry::with_defaults()),
        DispatcherConfig::new(1, Duration::from_secs(10)),
    );
    let id = dispatcher
        .submit(ghz(3), CompilationConstraints::new("ideal-simulator", 0))
        .await
        .unwrap();

    let job = dispatcher
        .await_result(&id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(job.state, JobState::Succeeded);
    assert!(job.error.is_none());
    assert_eq!(job.result.unwrap().num_qubits(), 3);
}

#[tokio::test]
async fn test_unsatisfiable_constraints_fail_job() {
    let dispatcher = Dispatcher::new(
        JobStore::new(),
        Arc::new(BackendRegistry::with_defaults()),
        DispatcherConfig::new(1, Duration::from_secs(10)),
    );
    let id = dispatcher
        .submit(ghz(6), CompilationConstraints::new("linear-5q", 1))
        .await
        .unwrap();

    let job = dispatcher
        .await_result(&id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.error.unwrap().kind, ErrorKind::UnsatisfiableConstraints);
}

#[tokio::test]
async fn test_running_jobs_never_exceed_workers() {
    const WORKERS: usize = 2;
    const JOBS: usize = 10;

    let dispatcher = dispatcher(WORKERS, Duration::from_millis(30), Duration::from_secs(10));
    let mut events = dispatcher.subscribe();

    for _ in 0..JOBS {
        dispatcher
            .submit(ghz(2), CompilationConstraints::new(SLEEPY, 0))
            .await
            .unwrap();
    }

    let mut running = 0usize;
    let mut max_running = 0usize;
    let mut finished = 0usize;
    while finished < JOBS {
        let event = wait_for_event(&mut events, |_| true).await;
        match event.state {
            JobState::Running => {
                running += 1;
                max_running = max_running.max(running);
            }
            state if state.is_terminal() => {
                running -= 1;
                finished += 1;
            }
            _ => {}
        }
    }

    assert!(max_running <= WORKERS, "saw {max_running} running jobs");
    assert_eq!(max_running, WORKERS);
    assert_eq!(dispatcher.queue_depth().await, 0);

    let counts: HashMap<_, _> = dispatcher
        .store()
        .count_by_state()
        .await
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(counts[&JobState::Succeeded], JOBS);
}

#[tokio::test]
async fn test_jobs_start_in_submission_order() {
    let dispatcher = dispatcher(1, Duration::from_millis(10), Duration::from_secs(10));
    let mut events = dispatcher.subscribe();

    let mut submitted = Vec::new();
    for _ in 0..5 {
        submitted.push(
            dispatcher
                .submit(ghz(2), CompilationConstraints::new(SLEEPY, 0))
                .await
                .unwrap(),
        );
    }

    let mut started = Vec::new();
    while started.len() < submitted.len() {
        let event = wait_for_event(&mut events, |e| e.state == JobState::Running).await;
        started.push(event.id);
    }
    assert_eq!(started, submitted);
}

#[tokio::test]
async fn test_every_job_follows_a_valid_state_path() {
    let dispatcher = dispatcher(2, Duration::from_millis(5), Duration::from_secs(10));
    let mut events = dispatcher.subscribe();

    let backends = [SLEEPY, "foo", PANICKY, "ideal-simulator"];
    let mut ids = Vec::new();
    for backend in backends {
        ids.push(
            dispatcher
                .submit(ghz(2), CompilationConstraints::new(backend, 0))
                .await
                .unwrap(),
        );
    }
    let cancelled = ids[3].clone();
    dispatcher.cancel(&cancelled).await.unwrap();

    let mut paths: HashMap<JobId, Vec<JobState>> = HashMap::new();
    let mut terminal = 0;
    while terminal < ids.len() {
        let event = wait_for_event(&mut events, |_| true).await;
        if event.state.is_terminal() {
            terminal += 1;
        }
        paths.entry(event.id).or_default().push(event.state);
    }

    for id in &ids {
        let path = &paths[id];
        assert_eq!(path[0], JobState::Submitted, "path {path:?}");
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "illegal step {:?} -> {:?}",
                pair[0],
                pair[1]
            );
        }
        assert!(path.last().unwrap().is_terminal());
    }

    // Cancelled jobs may or may not have started; the dispatcher must
    // honor whichever transition the store accepted first.
    let final_state = *paths[&cancelled].last().unwrap();
    let record = dispatcher.store().get(&cancelled).await.unwrap();
    assert_eq!(record.state, final_state);
}

#[tokio::test]
async fn test_cancel_queued_and_running_jobs() {
    let dispatcher = dispatcher(1, Duration::from_millis(300), Duration::from_secs(10));
    let mut events = dispatcher.subscribe();

    let first = dispatcher
        .submit(ghz(2), CompilationConstraints::new(SLEEPY, 0))
        .await
        .unwrap();
    let second = dispatcher
        .submit(ghz(2), CompilationConstraints::new(SLEEPY, 0))
        .await
        .unwrap();

    wait_for_event(&mut events, |e| e.id == first && e.state == JobState::Running).await;

    assert!(dispatcher.cancel(&second).await.unwrap());
    assert!(!dispatcher.cancel(&first).await.unwrap());
    assert!(!dispatcher.cancel(&second).await.unwrap());
    assert_eq!(dispatcher.queue_depth().await, 0);

    let first_job = dispatcher
        .await_result(&first, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(first_job.state, JobState::Succeeded);

    let second_job = dispatcher.store().get(&second).await.unwrap();
    assert_eq!(second_job.state, JobState::Cancelled);
    assert!(second_job.started_at.is_none());
    assert!(second_job.finished_at.is_some());

    let missing = dispatcher.cancel(&JobId::new("missing")).await;
    assert!(matches!(missing, Err(Error::JobNotFound(_))));
}

#[tokio::test]
async fn test_await_result_times_out_without_affecting_job() {
    let dispatcher = dispatcher(1, Duration::from_millis(300), Duration::from_secs(10));
    let id = dispatcher
        .submit(ghz(2), CompilationConstraints::new(SLEEPY, 0))
        .await
        .unwrap();

    let err = dispatcher
        .await_result(&id, Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));

    let job = dispatcher
        .await_result(&id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(job.state, JobState::Succeeded);
}

#[tokio::test]
async fn test_await_result_returns_finished_job_immediately() {
    let dispatcher = dispatcher(1, Duration::ZERO, Duration::from_secs(10));
    let id = dispatcher
        .submit(ghz(2), CompilationConstraints::new(SLEEPY, 0))
        .await
        .unwrap();
    dispatcher
        .await_result(&id, Duration::from_secs(5))
        .await
        .unwrap();

    let again = dispatcher
        .await_result(&id, Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(again.state, JobState::Succeeded);
}

#[tokio::test]
async fn test_slow_compilation_times_out() {
    let dispatcher = dispatcher(1, Duration::from_millis(400), Duration::from_millis(50));
    let id = dispatcher
        .submit(ghz(2), CompilationConstraints::new(SLEEPY, 0))
        .await
        .unwrap();

    let job = dispatcher
        .await_result(&id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.error.unwrap().kind, ErrorKind::CompilationTimeout);
}

#[tokio::test]
async fn test_backend_panic_is_contained() {
    let dispatcher = dispatcher(1, Duration::ZERO, Duration::from_secs(10));
    let panicked = dispatcher
        .submit(ghz(2), CompilationConstraints::new(PANICKY, 0))
        .await
        .unwrap();
    let job = dispatcher
        .await_result(&panicked, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(job.state, JobState::Failed);
    let error = job.error.unwrap();
    assert_eq!(error.kind, ErrorKind::InternalCompilerError);
    assert!(error.message.contains("routing table corrupted"));

    // The worker slot came back.
    let next = dispatcher
        .submit(ghz(2), CompilationConstraints::new(SLEEPY, 0))
        .await
        .unwrap();
    let job = dispatcher
        .await_result(&next, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(job.state, JobState::Succeeded);
}

#[tokio::test]
async fn test_shutdown_waits_for_running_jobs() {
    let dispatcher = dispatcher(1, Duration::from_millis(100), Duration::from_secs(10));
    let mut events = dispatcher.subscribe();
    let running = dispatcher
        .submit(ghz(2), CompilationConstraints::new(SLEEPY, 0))
        .await
        .unwrap();
    let waiting = dispatcher
        .submit(ghz(2), CompilationConstraints::new(SLEEPY, 0))
        .await
        .unwrap();
    wait_for_event(&mut events, |e| e.id == running && e.state == JobState::Running).await;

    dispatcher.shutdown().await;

    let running = dispatcher.store().get(&running).await.unwrap();
    assert_eq!(running.state, JobState::Succeeded);
    let waiting = dispatcher.store().get(&waiting).await.unwrap();
    assert_eq!(waiting.state, JobState::Queued);
}
