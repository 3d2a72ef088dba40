// tests/bulk_removal.rs

//! Bulk administrative purge of tasks and everything they were subscribed
//! to.

use std::collections::HashSet;

use taskdep::TaskDependencyManager;
use taskdep_test_utils::builders::{actor_restart_task, obj_ref, object, owner, task_id};
use taskdep_test_utils::init_tracing;
use taskdep_test_utils::recording::{RecordingPolicy, RecordingTransport, RemoteLog};

fn new_manager(log: &RemoteLog) -> TaskDependencyManager<RecordingTransport, RecordingPolicy> {
    TaskDependencyManager::new(
        RecordingTransport::new(log.clone()),
        RecordingPolicy::new(log.clone()),
    )
}

#[test]
fn purge_drops_all_subscribers_and_cancels_once() {
    init_tracing();
    let log = RemoteLog::new();
    let mut manager = new_manager(&log);

    let t1 = task_id(1);
    let t2 = task_id(2);
    let o1 = object(task_id(100), 0);
    let a = owner("worker-a");

    manager.subscribe_get_dependencies(t1, &[obj_ref(o1, a.clone())]);
    manager.subscribe_get_dependencies(t2, &[obj_ref(o1, a.clone())]);
    log.take();

    let purged: HashSet<_> = [t1, t2].into_iter().collect();
    manager.remove_tasks_and_related_objects(&purged);

    assert_eq!(manager.subscribed_task_count(), 0);
    assert_eq!(manager.required_task_count(), 0);
    assert_eq!(log.cancels_of(o1), 1);

    // Nothing is subscribed any more, so a late arrival readies nothing.
    assert!(manager.handle_object_local(o1).is_empty());
}

#[test]
fn purge_clears_pending_membership() {
    init_tracing();
    let log = RemoteLog::new();
    let mut manager = new_manager(&log);

    let creator = task_id(100);
    manager.task_pending(&actor_restart_task(creator));
    assert_eq!(manager.pending_task_count(), 1);

    let purged: HashSet<_> = [creator].into_iter().collect();
    manager.remove_tasks_and_related_objects(&purged);
    assert_eq!(manager.pending_task_count(), 0);
}

#[test]
fn purge_of_unknown_tasks_is_a_no_op() {
    init_tracing();
    let log = RemoteLog::new();
    let mut manager = new_manager(&log);

    let purged: HashSet<_> = [task_id(7), task_id(8)].into_iter().collect();
    manager.remove_tasks_and_related_objects(&purged);

    assert_eq!(manager.subscribed_task_count(), 0);
    assert!(log.events().is_empty());
}

#[test]
#[should_panic(expected = "still depends on its outputs")]
fn purge_with_surviving_dependent_aborts() {
    init_tracing();
    let log = RemoteLog::new();
    let mut manager = new_manager(&log);

    let victim = task_id(100);
    let survivor = task_id(1);
    let o1 = object(victim, 0);

    // A task outside the purge set depends on the victim's output.
    manager.subscribe_get_dependencies(survivor, &[obj_ref(o1, owner("worker-a"))]);

    let purged: HashSet<_> = [victim].into_iter().collect();
    manager.remove_tasks_and_related_objects(&purged);
}
