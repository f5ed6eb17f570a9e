//! Cross-thread settlement and scheduling.

mod common;

use common::*;
use parking_lot::Mutex;
use pledge::{all, Error, Promise, Schedule, SchedulerHandle, State, Task};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn racing_resolvers_produce_exactly_one_outcome() {
    let (queue, handle) = test_queue();
    test_phase!("racing_resolvers_produce_exactly_one_outcome");
    let threads = 16;

    for _round in 0..32 {
        let (promise, resolver) = Promise::<usize>::pending(&handle);
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let _ = promise.map(move |v| sink.lock().push(v));

        let barrier = Arc::new(Barrier::new(threads));
        let workers: Vec<_> = (0..threads)
            .map(|i| {
                let resolver = resolver.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    if i % 3 == 0 {
                        resolver.reject(Error::user("lost race"))
                    } else {
                        resolver.fulfill(i)
                    }
                })
            })
            .collect();
        let winners = workers
            .into_iter()
            .map(|w| w.join().expect("worker panicked"))
            .filter(|won| *won)
            .count();
        drain(&queue);

        assert_eq!(winners, 1);
        let expected_observations = match promise.state() {
            State::Fulfilled => 1,
            State::Rejected => 0,
            State::Pending => panic!("a resolver call won but the cell is still pending"),
        };
        assert_eq!(observed.lock().len(), expected_observations);
    }
    test_complete!("racing_resolvers_produce_exactly_one_outcome");
}

#[test]
fn cells_settled_from_worker_threads_feed_all() {
    let (queue, handle) = test_queue();
    let (promises, resolvers): (Vec<_>, Vec<_>) =
        (0..8).map(|_| Promise::<u64>::pending(&handle)).unzip();
    let joined: Promise<Vec<u64>> = all(&handle, promises);

    let workers: Vec<_> = resolvers
        .into_iter()
        .enumerate()
        .map(|(i, resolver)| thread::spawn(move || resolver.fulfill(i as u64 * 2)))
        .collect();
    for w in workers {
        assert!(w.join().expect("worker panicked"));
    }
    drain(&queue);

    assert_eq!(expect_value(&joined), (0..8).map(|i| i * 2).collect::<Vec<u64>>());
}

/// Forwards to a queue, but parks the first `schedule` call until released.
struct StallFirstSchedule {
    queue: SchedulerHandle,
    gate: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
}

impl Schedule for StallFirstSchedule {
    fn schedule(&self, task: Task) {
        let gate = self.gate.lock().take();
        if let Some((entered, release)) = gate {
            let _ = entered.send(());
            let _ = release.recv();
        }
        self.queue.schedule(task);
    }
}

#[test]
fn observer_registered_after_settlement_runs_after_earlier_ones() {
    let (queue, _) = test_queue();
    test_phase!("observer_registered_after_settlement_runs_after_earlier_ones");
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let handle = SchedulerHandle::new(StallFirstSchedule {
        queue: queue.handle(),
        gate: Mutex::new(Some((entered_tx, release_rx))),
    });

    let order = Arc::new(Mutex::new(Vec::new()));
    let (promise, resolver) = Promise::pending(&handle);
    let early = Arc::clone(&order);
    let _ = promise.map(move |()| early.lock().push("registered-before-settlement"));

    let settler = thread::spawn(move || resolver.fulfill(()));
    entered_rx
        .recv()
        .expect("settling thread should reach the scheduler");
    assert_eq!(promise.state(), State::Fulfilled);

    // The settling thread is parked mid-dispatch; register from elsewhere.
    let observed = promise.clone();
    let late = Arc::clone(&order);
    thread::spawn(move || {
        let _ = observed.map(move |()| late.lock().push("registered-after-settlement"));
    })
    .join()
    .expect("late registration should not block");

    release_tx.send(()).expect("settling thread should be waiting");
    assert!(settler.join().expect("settling thread panicked"));
    drain(&queue);

    assert_eq!(
        *order.lock(),
        vec!["registered-before-settlement", "registered-after-settlement"]
    );
    test_complete!("observer_registered_after_settlement_runs_after_earlier_ones");
}

/// A scheduler that ships tasks to a dedicated executor thread.
struct ChannelScheduler {
    sender: Mutex<mpsc::Sender<Task>>,
}

impl Schedule for ChannelScheduler {
    fn schedule(&self, task: Task) {
        // The executor only stops once every handle is gone.
        let _ = self.sender.lock().send(task);
    }
}

#[test]
fn custom_scheduler_runs_continuations_off_thread() {
    init_test_logging();
    let (sender, receiver) = mpsc::channel::<Task>();
    let executor = thread::spawn(move || {
        let mut ran = 0;
        while let Ok(task) = receiver.recv() {
            task();
            ran += 1;
        }
        ran
    });

    let handle = SchedulerHandle::new(ChannelScheduler {
        sender: Mutex::new(sender),
    });
    let (done_tx, done_rx) = mpsc::channel();
    let caller = thread::current().id();

    let (promise, resolver) = Promise::pending(&handle);
    let _ = promise.map(move |v: i32| {
        let _ = done_tx.send((v, thread::current().id()));
    });
    resolver.fulfill(5);

    let (value, ran_on) = done_rx.recv().expect("continuation should run");
    assert_eq!(value, 5);
    assert_ne!(ran_on, caller);

    drop(promise);
    drop(resolver);
    drop(handle);
    let ran = executor.join().expect("executor panicked");
    assert!(ran >= 1);
}
