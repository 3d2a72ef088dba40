// tests/pull_lifecycle.rs

//! End-to-end pull lifecycle: subscriptions open pulls, arrivals and
//! unsubscribes close them, and pending local execution suppresses them.

use taskdep::TaskDependencyManager;
use taskdep_test_utils::builders::{actor_restart_task, obj_ref, object, owner, task_id, worker_id};
use taskdep_test_utils::init_tracing;
use taskdep_test_utils::recording::{RecordingPolicy, RecordingTransport, RemoteEvent, RemoteLog};

fn new_manager(log: &RemoteLog) -> TaskDependencyManager<RecordingTransport, RecordingPolicy> {
    TaskDependencyManager::new(
        RecordingTransport::new(log.clone()),
        RecordingPolicy::new(log.clone()),
    )
}

#[test]
fn single_pull_opens_and_closes() {
    init_tracing();
    let log = RemoteLog::new();
    let mut manager = new_manager(&log);

    let t1 = task_id(1);
    let o1 = object(task_id(100), 0);
    let a = owner("worker-a");

    let ready = manager.subscribe_get_dependencies(t1, &[obj_ref(o1, a.clone())]);
    assert!(!ready);
    assert_eq!(
        log.take(),
        vec![
            RemoteEvent::Pull(o1, a.clone()),
            RemoteEvent::Listen(o1, a.clone()),
        ]
    );

    let ready_tasks = manager.handle_object_local(o1);
    assert_eq!(ready_tasks, vec![t1]);
    assert_eq!(
        log.take(),
        vec![RemoteEvent::CancelPull(o1), RemoteEvent::CancelListen(o1)]
    );
    assert!(manager.is_object_local(o1));
    assert!(!manager.pull_active(o1));
}

#[test]
fn concurrent_subscribers_share_one_pull() {
    init_tracing();
    let log = RemoteLog::new();
    let mut manager = new_manager(&log);

    let t1 = task_id(1);
    let t2 = task_id(2);
    let o1 = object(task_id(100), 0);
    let a = owner("worker-a");

    manager.subscribe_get_dependencies(t1, &[obj_ref(o1, a.clone())]);
    manager.subscribe_get_dependencies(t2, &[obj_ref(o1, a.clone())]);
    assert_eq!(log.pulls_of(o1), 1);

    assert!(manager.unsubscribe_get_dependencies(t1));
    assert_eq!(log.cancels_of(o1), 0);

    assert!(manager.unsubscribe_get_dependencies(t2));
    assert_eq!(log.cancels_of(o1), 1);
    assert_eq!(manager.required_task_count(), 0);
}

#[test]
fn pending_local_execution_suppresses_pull() {
    init_tracing();
    let log = RemoteLog::new();
    let mut manager = new_manager(&log);

    let t1 = task_id(1);
    let creator = task_id(100);
    let o1 = object(creator, 0);
    let a = owner("worker-a");

    manager.subscribe_get_dependencies(t1, &[obj_ref(o1, a.clone())]);
    assert_eq!(log.pulls_of(o1), 1);

    // The creating task is being restarted locally; its output will appear
    // without a remote fetch.
    manager.task_pending(&actor_restart_task(creator));
    assert_eq!(log.cancels_of(o1), 1);
    assert!(!manager.pull_active(o1));
    assert_eq!(manager.pending_task_count(), 1);

    // Local production is no longer guaranteed once the task is canceled.
    manager.task_canceled(creator);
    assert_eq!(log.pulls_of(o1), 2);
    assert!(manager.pull_active(o1));
    assert_eq!(manager.pending_task_count(), 0);
}

#[test]
fn wait_is_satisfied_on_arrival() {
    init_tracing();
    let log = RemoteLog::new();
    let mut manager = new_manager(&log);

    let w1 = worker_id(1);
    let o1 = object(task_id(100), 0);
    let o2 = object(task_id(101), 0);
    let a = owner("worker-a");
    let b = owner("worker-b");

    // o1 is already local when the worker blocks.
    manager.handle_object_local(o1);
    log.take();

    manager.subscribe_wait_dependencies(
        w1,
        &[obj_ref(o1, a.clone()), obj_ref(o2, b.clone())],
    );
    assert_eq!(
        log.take(),
        vec![
            RemoteEvent::Pull(o2, b.clone()),
            RemoteEvent::Listen(o2, b.clone()),
        ]
    );
    assert_eq!(manager.worker_wait_count(w1), Some(1));

    let ready_tasks = manager.handle_object_local(o2);
    assert!(ready_tasks.is_empty());
    assert_eq!(
        log.take(),
        vec![RemoteEvent::CancelPull(o2), RemoteEvent::CancelListen(o2)]
    );
    assert_eq!(manager.worker_wait_count(w1), Some(0));
    assert_eq!(manager.required_task_count(), 0);
}

#[test]
fn missing_then_local_restores_readiness() {
    init_tracing();
    let log = RemoteLog::new();
    let mut manager = new_manager(&log);

    let t1 = task_id(1);
    let o1 = object(task_id(100), 0);
    let a = owner("worker-a");

    manager.subscribe_get_dependencies(t1, &[obj_ref(o1, a.clone())]);
    assert_eq!(manager.handle_object_local(o1), vec![t1]);

    // Eviction switches the task back to waiting and reopens the pull.
    assert_eq!(manager.handle_object_missing(o1), vec![t1]);
    assert_eq!(log.pulls_of(o1), 2);
    assert_eq!(manager.missing_dependency_count(t1), Some(1));

    assert_eq!(manager.handle_object_local(o1), vec![t1]);
    assert_eq!(manager.missing_dependency_count(t1), Some(0));
}

#[test]
fn satisfied_waits_do_not_rearm_after_eviction() {
    init_tracing();
    let log = RemoteLog::new();
    let mut manager = new_manager(&log);

    let w1 = worker_id(1);
    let o1 = object(task_id(100), 0);
    let a = owner("worker-a");

    manager.subscribe_wait_dependencies(w1, &[obj_ref(o1, a.clone())]);
    assert_eq!(log.pulls_of(o1), 1);

    manager.handle_object_local(o1);
    assert_eq!(manager.worker_wait_count(w1), Some(0));

    // The wait was served on arrival; eviction does not revive it, so no
    // new pull is opened for the worker.
    manager.handle_object_missing(o1);
    assert_eq!(log.pulls_of(o1), 1);
    assert!(!manager.pull_active(o1));
}
