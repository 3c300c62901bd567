use kiln::{Builder, Executor, SubmitError};
use std::{sync::mpsc, thread};

#[test]
fn builder_configures_the_pool() {
    let executor = Builder::new()
        .worker_threads(2)
        .thread_name("builder-test")
        .stack_size(256 * 1024)
        .build();

    let name = executor
        .submit(
            |name: &mut String| {
                *name = thread::current().name().unwrap_or("").to_string();
            },
            String::new(),
        )
        .unwrap()
        .join()
        .unwrap();

    assert!(
        name.starts_with("builder-test-"),
        "unexpected thread name: {name}"
    );
}

#[test]
fn shutdown_rejects_new_submissions() {
    let executor = Executor::new();
    executor.shutdown();

    let rejected = executor.submit(|value: &mut i32| *value += 1, 0);
    assert!(matches!(rejected, Err(SubmitError::Shutdown)));
}

#[test]
fn shutdown_is_idempotent() {
    let executor = Executor::new();
    executor.shutdown();
    executor.shutdown();
}

#[test]
fn shutdown_drains_queued_tasks() {
    let executor = Builder::new().worker_threads(1).build();
    let (sender, receiver) = mpsc::channel::<()>();

    // the only worker blocks on the channel while the rest queue up
    let blocker = executor
        .submit(move |_: &mut ()| receiver.recv().unwrap(), ())
        .unwrap();
    let queued: Vec<_> = (0..10)
        .map(|i| executor.submit(|value: &mut i32| *value *= 3, i).unwrap())
        .collect();

    sender.send(()).unwrap();
    executor.shutdown();

    blocker.wait().unwrap();
    for (i, task) in queued.into_iter().enumerate() {
        assert_eq!(task.join().unwrap(), i as i32 * 3);
    }
}

#[test]
fn drop_joins_the_workers() {
    let task = {
        let executor = Executor::new();
        executor.submit(|value: &mut i32| *value = 13, 0).unwrap()
        // dropping the executor drains and joins before returning
    };

    assert_eq!(task.wait().unwrap(), 13);
}

#[test]
fn task_ids_are_submission_ordered() {
    let executor = Executor::new();

    let first = executor.submit(|_: &mut ()| {}, ()).unwrap();
    let second = executor.submit(|_: &mut ()| {}, ()).unwrap();
    assert!(second.id() > first.id());
}

#[test]
fn global_run_submits_to_a_shared_pool() {
    let task = kiln::run(|value: &mut i32| *value += 40, 2).unwrap();
    assert_eq!(task.wait().unwrap(), 42);
}
