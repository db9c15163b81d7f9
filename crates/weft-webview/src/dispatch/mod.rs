//! Owning-thread task marshaling.
//!
//! A [`MainLoop`] is created on the thread that owns the native control
//! and stays there (it is `!Send`). The [`Dispatcher`] it hands out can be
//! cloned to any thread and used to run closures on the owning thread,
//! either fire-and-forget ([`Dispatcher::post`]) or blocking for the
//! result ([`Dispatcher::dispatch`]). Tasks run in FIFO arrival order.

mod affine;

#[cfg(test)]
mod tests;

pub use affine::Affine;

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use tracing::{debug, info};

type Task = Box<dyn FnOnce() + Send + 'static>;
type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// The owning loop has stopped; the task was not (and will not be) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("owning thread is no longer running")]
pub struct NotRunning;

struct Inner {
    owner: ThreadId,
    running: AtomicBool,
    quit: AtomicBool,
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    waker: Mutex<Option<Waker>>,
}

impl Inner {
    fn send(&self, task: Task) -> bool {
        if !self.running.load(Ordering::Acquire) {
            return false;
        }
        match self.sender.lock() {
            Ok(sender) => sender.as_ref().is_some_and(|tx| tx.send(task).is_ok()),
            Err(_) => false,
        }
    }

    fn wake(&self) {
        let waker = match self.waker.lock() {
            Ok(waker) => waker.clone(),
            Err(_) => None,
        };
        if let Some(waker) = waker {
            waker();
        }
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// Cloneable, thread-safe handle onto a [`MainLoop`].
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Whether the caller is on the owning thread.
    pub fn is_thread_safe(&self) -> bool {
        thread::current().id() == self.inner.owner
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Queue `task` for the owning thread. Never blocks. Dropped silently
    /// once the loop has stopped.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        if self.inner.send(Box::new(task)) {
            self.inner.wake();
        } else {
            debug!("owning loop stopped, dropping posted task");
        }
    }

    /// Run `task` on the owning thread and wait for its result.
    ///
    /// Runs inline when already on the owning thread.
    pub fn dispatch<R, F>(&self, task: F) -> Result<R, NotRunning>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if !self.is_running() {
            return Err(NotRunning);
        }
        if self.is_thread_safe() {
            return Ok(task());
        }

        let (tx, rx) = mpsc::sync_channel(1);
        let queued = self.inner.send(Box::new(move || {
            let _ = tx.send(task());
        }));
        if !queued {
            return Err(NotRunning);
        }
        self.inner.wake();

        // The sender is dropped unsent if the loop discards the task.
        rx.recv().map_err(|_| NotRunning)
    }

    /// Called after every successful `post`, from the posting thread.
    ///
    /// Lets a native event loop wake up and call [`MainLoop::run_pending`].
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        if let Ok(mut slot) = self.inner.waker.lock() {
            *slot = Some(Arc::new(waker));
        }
    }

    /// Ask a blocking [`MainLoop::run`] to return.
    pub fn quit(&self) {
        self.inner.quit.store(true, Ordering::Release);
        // Unblock a loop parked in `recv`.
        self.post(|| {});
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("owner", &self.inner.owner)
            .field("running", &self.is_running())
            .finish()
    }
}

// =============================================================================
// MAIN LOOP
// =============================================================================

/// The owning side of the dispatcher. Stays on the thread that created it.
pub struct MainLoop {
    inner: Arc<Inner>,
    receiver: mpsc::Receiver<Task>,
    _not_send: PhantomData<*const ()>,
}

impl MainLoop {
    /// Bind the calling thread as the owning thread.
    pub fn new() -> (MainLoop, Dispatcher) {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::new(Inner {
            owner: thread::current().id(),
            running: AtomicBool::new(true),
            quit: AtomicBool::new(false),
            sender: Mutex::new(Some(tx)),
            waker: Mutex::new(None),
        });

        let main_loop = MainLoop {
            inner: Arc::clone(&inner),
            receiver: rx,
            _not_send: PhantomData,
        };
        (main_loop, Dispatcher { inner })
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Run every task queued so far, plus any they queue. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Block running tasks until [`quit`](Self::quit) or [`stop`](Self::stop).
    ///
    /// The quit flag is checked after each task, so work queued ahead of
    /// the quit request still runs.
    pub fn run(&self) {
        info!("main loop running");
        while self.is_running() {
            match self.receiver.recv() {
                Ok(task) => task(),
                Err(_) => break,
            }
            if self.take_quit() {
                break;
            }
        }
        info!("main loop returned");
    }

    /// Run tasks for at most `timeout`, returning early on quit.
    pub fn run_for(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut ran = 0;

        while self.is_running() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.receiver.recv_timeout(remaining) {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(mpsc::RecvTimeoutError::Timeout) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
            if self.take_quit() {
                break;
            }
        }
        ran
    }

    pub fn quit(&self) {
        self.inner.quit.store(true, Ordering::Release);
    }

    /// Tear the loop down. Queued tasks are dropped unrun, later posts are
    /// discarded and blocking dispatches fail with [`NotRunning`].
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Ok(mut sender) = self.inner.sender.lock() {
            sender.take();
        }

        let mut dropped = 0usize;
        while let Ok(task) = self.receiver.try_recv() {
            drop(task);
            dropped += 1;
        }
        info!(dropped, "main loop stopped");
    }

    fn take_quit(&self) -> bool {
        self.inner.quit.swap(false, Ordering::AcqRel)
    }
}

impl Drop for MainLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
