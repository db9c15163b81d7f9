use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::*;

#[test]
fn owner_is_thread_safe() {
    let (_main, dispatcher) = MainLoop::new();
    assert!(dispatcher.is_thread_safe());

    let remote = dispatcher.clone();
    let off_thread = thread::spawn(move || remote.is_thread_safe()).join().unwrap();
    assert!(!off_thread);
}

#[test]
fn posted_tasks_run_in_fifo_order() {
    let (main, dispatcher) = MainLoop::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for i in 0..5 {
        let seen = Arc::clone(&seen);
        dispatcher.post(move || seen.lock().unwrap().push(i));
    }
    assert!(seen.lock().unwrap().is_empty());

    assert_eq!(main.run_pending(), 5);
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn posts_from_other_threads_arrive() {
    let (main, dispatcher) = MainLoop::new();
    let count = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            let count = Arc::clone(&count);
            thread::spawn(move || {
                for _ in 0..10 {
                    let count = Arc::clone(&count);
                    dispatcher.post(move || {
                        count.fetch_add(1, Ordering::SeqCst);
                    });
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    main.run_pending();
    assert_eq!(count.load(Ordering::SeqCst), 40);
}

#[test]
fn dispatch_inline_on_owner() {
    let (_main, dispatcher) = MainLoop::new();
    assert_eq!(dispatcher.dispatch(|| 7), Ok(7));
}

#[test]
fn dispatch_from_other_thread_blocks_for_result() {
    let (main, dispatcher) = MainLoop::new();
    let owner = thread::current().id();

    let remote = dispatcher.clone();
    let worker = thread::spawn(move || remote.dispatch(move || thread::current().id() == owner));

    let mut answered = false;
    for _ in 0..200 {
        if main.run_for(Duration::from_millis(10)) > 0 {
            answered = true;
            break;
        }
    }
    assert!(answered);
    assert_eq!(worker.join().unwrap(), Ok(true));
}

#[test]
fn post_after_stop_is_dropped() {
    let (main, dispatcher) = MainLoop::new();
    main.stop();

    let ran = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&ran);
    dispatcher.post(move || {
        r.fetch_add(1, Ordering::SeqCst);
    });
    main.run_pending();
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn dispatch_after_stop_is_not_running() {
    let (main, dispatcher) = MainLoop::new();
    drop(main);

    assert_eq!(dispatcher.dispatch(|| 1), Err(NotRunning));
    let remote = dispatcher.clone();
    let result = thread::spawn(move || remote.dispatch(|| 1)).join().unwrap();
    assert_eq!(result, Err(NotRunning));
}

#[test]
fn queued_dispatch_fails_when_loop_stops() {
    let (main, dispatcher) = MainLoop::new();
    let (queued_tx, queued_rx) = mpsc::channel();
    let queued_tx = Mutex::new(queued_tx);
    dispatcher.set_waker(move || {
        let _ = queued_tx.lock().unwrap().send(());
    });

    let remote = dispatcher.clone();
    let worker = thread::spawn(move || remote.dispatch(|| 1));

    // Tear down with the task still queued.
    queued_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    main.stop();
    assert_eq!(worker.join().unwrap(), Err(NotRunning));
}

#[test]
fn waker_called_per_post() {
    let (main, dispatcher) = MainLoop::new();
    let wakes = Arc::new(AtomicUsize::new(0));
    let w = Arc::clone(&wakes);
    dispatcher.set_waker(move || {
        w.fetch_add(1, Ordering::SeqCst);
    });

    dispatcher.post(|| {});
    dispatcher.post(|| {});
    assert_eq!(wakes.load(Ordering::SeqCst), 2);
    main.run_pending();
}

#[test]
fn quit_returns_from_run() {
    let (main, dispatcher) = MainLoop::new();
    let remote = dispatcher.clone();
    let ran = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&ran);

    thread::spawn(move || {
        remote.post(move || {
            r.fetch_add(1, Ordering::SeqCst);
        });
        remote.quit();
    });

    main.run();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn run_for_times_out_when_idle() {
    let (main, _dispatcher) = MainLoop::new();
    assert_eq!(main.run_for(Duration::from_millis(5)), 0);
}
