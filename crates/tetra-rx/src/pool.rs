//! Worker pool that executes jobs in parallel but delivers results in
//! submission order.
//!
//! Jobs enter a shared deque tagged with a monotonically increasing
//! sequence id; workers park results in a map keyed by that id; `pop`
//! hands out results strictly in id order. Shutdown is two-phase: the
//! producer stops accepting, workers drain the input queue and exit, and
//! `pop` returns `None` once every accepted job has been delivered.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Condition-variable waits re-check the termination state at this period.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

type Job<R> = Box<dyn FnOnce() -> R + Send + 'static>;

struct Shared<R> {
    input: Mutex<VecDeque<(u64, Job<R>)>>,
    input_cv: Condvar,
    output: Mutex<OutputState<R>>,
    output_cv: Condvar,
    stop_accepting: AtomicBool,
}

struct OutputState<R> {
    results: BTreeMap<u64, R>,
    next_out: u64,
    /// sequence id the next submission will get; results below this are owed
    submitted: u64,
}

pub struct OrderedWorkerPool<R: Send + 'static> {
    shared: Arc<Shared<R>>,
    workers: Vec<JoinHandle<()>>,
}

impl<R: Send + 'static> OrderedWorkerPool<R> {
    pub fn new(num_workers: usize) -> Self {
        assert!(num_workers > 0);
        let shared = Arc::new(Shared {
            input: Mutex::new(VecDeque::new()),
            input_cv: Condvar::new(),
            output: Mutex::new(OutputState {
                results: BTreeMap::new(),
                next_out: 0,
                submitted: 0,
            }),
            output_cv: Condvar::new(),
            stop_accepting: AtomicBool::new(false),
        });

        let workers = (0..num_workers)
            .map(|i| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("lmac-worker-{}", i))
                    .spawn(move || worker_loop(shared))
                    .expect("failed to spawn pool worker")
            })
            .collect();

        OrderedWorkerPool { shared, workers }
    }

    /// Queue one job. Jobs submitted after [`shutdown`](Self::shutdown) are
    /// discarded.
    pub fn submit(&self, job: impl FnOnce() -> R + Send + 'static) {
        if self.shared.stop_accepting.load(Ordering::Acquire) {
            return;
        }
        let seq = {
            let mut output = self.shared.output.lock().unwrap();
            let seq = output.submitted;
            output.submitted += 1;
            seq
        };
        {
            let mut input = self.shared.input.lock().unwrap();
            input.push_back((seq, Box::new(job)));
        }
        self.shared.input_cv.notify_one();
    }

    /// Deliver the next result in submission order, blocking until it is
    /// available. Returns `None` once the pool is shut down and drained.
    pub fn pop(&self) -> Option<R> {
        let mut output = self.shared.output.lock().unwrap();
        loop {
            let next = output.next_out;
            if let Some(result) = output.results.remove(&next) {
                output.next_out += 1;
                return Some(result);
            }
            if self.shared.stop_accepting.load(Ordering::Acquire) && next >= output.submitted {
                return None;
            }
            let (guard, _timeout) = self
                .shared
                .output_cv
                .wait_timeout(output, POLL_INTERVAL)
                .unwrap();
            output = guard;
        }
    }

    /// Stop accepting new work. Workers drain what was already queued;
    /// `pop` keeps delivering until the drain is complete.
    pub fn shutdown(&self) {
        self.shared.stop_accepting.store(true, Ordering::Release);
        self.shared.input_cv.notify_all();
        self.shared.output_cv.notify_all();
    }

    /// Shut down and wait for all workers to exit.
    pub fn join(mut self) {
        self.shutdown();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl<R: Send + 'static> Drop for OrderedWorkerPool<R> {
    fn drop(&mut self) {
        self.shutdown();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop<R: Send + 'static>(shared: Arc<Shared<R>>) {
    loop {
        let work = {
            let mut input = shared.input.lock().unwrap();
            loop {
                if let Some(work) = input.pop_front() {
                    break Some(work);
                }
                if shared.stop_accepting.load(Ordering::Acquire) {
                    break None;
                }
                let (guard, _timeout) =
                    shared.input_cv.wait_timeout(input, POLL_INTERVAL).unwrap();
                input = guard;
            }
        };

        let Some((seq, job)) = work else {
            return;
        };

        let result = job();

        {
            let mut output = shared.output.lock().unwrap();
            output.results.insert(seq, result);
        }
        shared.output_cv.notify_all();
    }
}
