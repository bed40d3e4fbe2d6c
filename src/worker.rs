// src/worker.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A fixed pool of one worker per assigned CPU, each running a FIFO task
//! queue behind a mutex and a pair of condition variables.
//!
//! Worker 0 never gets its own OS thread: the driver runs its stripes
//! inline on the calling thread via [`Worker::run_inline`], saving one
//! thread and giving the main thread useful work while the others run.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::planner::read_cpu_freq_khz;

type Task = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Task>>,
    task_enqueued: Condvar,
    queue_empty: Condvar,
    busy: AtomicBool,
    die: AtomicBool,
    stats: Mutex<WorkerStats>,
}

/// Rolling timing figures a worker accumulates across its tasks, used by
/// the driver's benchmark summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerStats {
    pub tasks_run: u64,
    pub busy_time: Duration,
    pub last_cpu_freq_khz: u64,
}

/// One pinned (or unpinned) OS thread draining a FIFO task queue.
pub struct Worker {
    cpu_id: usize,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns the worker thread for `cpu_id`. When `pin` is true and the
    /// `thread-pinning` feature is enabled, the thread is pinned to that
    /// CPU before entering its run loop; pinning failures are logged and
    /// otherwise ignored, matching the "best effort" affinity the original
    /// engine settles for on unsupported platforms.
    pub fn start(cpu_id: usize, pin: bool) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            task_enqueued: Condvar::new(),
            queue_empty: Condvar::new(),
            busy: AtomicBool::new(false),
            die: AtomicBool::new(false),
            stats: Mutex::new(WorkerStats::default()),
        });

        let thread_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name(format!("wator-worker-{cpu_id}"))
            .spawn(move || {
                if pin {
                    try_pin(cpu_id);
                }
                run_loop(&thread_shared, cpu_id);
            })
            .expect("failed to spawn worker thread");

        Worker {
            cpu_id,
            shared,
            thread: Some(thread),
        }
    }

    pub fn cpu_id(&self) -> usize {
        self.cpu_id
    }

    /// Enqueues `task` for the worker thread to run.
    pub fn push(&self, task: Task) {
        let mut queue = self.shared.queue.lock().unwrap();
        queue.push_back(task);
        self.shared.busy.store(true, Ordering::SeqCst);
        self.shared.task_enqueued.notify_one();
    }

    /// Blocks until every enqueued task has been dequeued and finished.
    pub fn wait_idle(&self) {
        let mut queue = self.shared.queue.lock().unwrap();
        while !queue.is_empty() || self.shared.busy.load(Ordering::SeqCst) {
            queue = self.shared.queue_empty.wait(queue).unwrap();
        }
    }

    /// Runs `task` on the calling thread, outside the queue, with the same
    /// panic-swallowing discipline as a queued task. Used for the worker
    /// assigned to the main thread.
    pub fn run_inline(task: Task) {
        run_task(task);
    }

    pub fn stats(&self) -> WorkerStats {
        *self.shared.stats.lock().unwrap()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shared.die.store(true, Ordering::SeqCst);
        self.shared.task_enqueued.notify_all();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn run_loop(shared: &Shared, cpu_id: usize) {
    loop {
        let task = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(task) = queue.pop_front() {
                    break Some(task);
                }
                if shared.die.load(Ordering::SeqCst) {
                    break None;
                }
                queue = shared.task_enqueued.wait(queue).unwrap();
            }
        };

        let Some(task) = task else { return };

        let started = Instant::now();
        run_task(task);
        let elapsed = started.elapsed();

        {
            let mut stats = shared.stats.lock().unwrap();
            stats.tasks_run += 1;
            stats.busy_time += elapsed;
            stats.last_cpu_freq_khz = read_cpu_freq_khz(cpu_id);
        }

        let mut queue = shared.queue.lock().unwrap();
        if queue.is_empty() {
            shared.busy.store(false, Ordering::SeqCst);
            drop(queue);
            shared.queue_empty.notify_all();
        }
    }
}

/// Runs `task`, catching and discarding a panic. A stripe task panicking
/// leaves that stripe's state for this half-iteration incomplete, but must
/// never take down the worker thread or the rest of the run.
fn run_task(task: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::error!(panic = %message, "worker task panicked, discarding");
    }
}

/// Pins the calling thread to `cpu_id`. Used by the driver to pin the main
/// thread, which runs worker 0 inline rather than through [`Worker::start`].
pub fn pin_current_thread(cpu_id: usize) {
    try_pin(cpu_id);
}

#[cfg(feature = "thread-pinning")]
fn try_pin(cpu_id: usize) {
    let core_id = core_affinity::CoreId { id: cpu_id };
    if !core_affinity::set_for_current(core_id) {
        tracing::warn!(cpu_id, "failed to pin worker thread to CPU");
    }
}

#[cfg(not(feature = "thread-pinning"))]
fn try_pin(cpu_id: usize) {
    tracing::debug!(cpu_id, "thread-pinning feature disabled, running unpinned");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn runs_queued_tasks_in_order() {
        let worker = Worker::start(0, false);
        let counter = Arc::new(AtomicU32::new(0));
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            worker.push(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        worker.wait_idle();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(worker.stats().tasks_run, 10);
    }

    #[test]
    fn panicking_task_does_not_kill_worker() {
        let worker = Worker::start(0, false);
        worker.push(Box::new(|| panic!("boom")));
        worker.wait_idle();

        let counter = Arc::new(AtomicU32::new(0));
        let counter2 = Arc::clone(&counter);
        worker.push(Box::new(move || {
            counter2.fetch_add(1, Ordering::SeqCst);
        }));
        worker.wait_idle();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_inline_executes_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter2 = Arc::clone(&counter);
        Worker::run_inline(Box::new(move || {
            counter2.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
