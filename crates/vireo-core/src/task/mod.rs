// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Parallel task submission service.
//!
//! The binning engine hands its per-frame work to a [`TaskScheduler`]: a
//! list of typed closures submitted together, executed concurrently, with
//! the caller blocking until every task has run to completion. Tasks never
//! suspend and there is no cancellation; shared state between tasks is
//! limited to atomics and the data captured by the closures.

use std::fmt;

/// An error produced when submitting tasks to a scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The scheduler could not accept the submission.
    SubmissionFailed {
        /// Backend-specific description of the failure.
        reason: String,
    },
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::SubmissionFailed { reason } => {
                write!(f, "Task submission failed: {reason}")
            }
        }
    }
}

impl std::error::Error for TaskError {}

/// A fork-join task scheduler.
///
/// Implementations run every submitted task to completion before `run`
/// returns. A panicking task propagates out of `run`; the caller treats
/// that as a fatal precondition violation, not a recoverable error.
pub trait TaskScheduler: Send + Sync {
    /// The number of workers the scheduler executes tasks on.
    ///
    /// Callers use this to decide how many data-parallel tasks to submit.
    fn worker_count(&self) -> usize;

    /// Submits `tasks` for concurrent execution and blocks until all of
    /// them have completed.
    fn run(&self, tasks: &[&(dyn Fn() + Sync)]) -> Result<(), TaskError>;
}

/// A [`TaskScheduler`] backed by scoped OS threads.
///
/// Each submission spawns one thread per task inside a scope, so borrowed
/// captures work without `'static` bounds and the join-all barrier is the
/// scope exit. With a worker count of 1 the pull-based consumers degrade
/// to a serial run, which tests use for determinism.
#[derive(Debug, Clone)]
pub struct ScopedTaskScheduler {
    worker_count: usize,
}

impl ScopedTaskScheduler {
    /// Creates a scheduler reporting the given worker count.
    ///
    /// # Panics
    ///
    /// Panics if `worker_count` is zero.
    pub fn new(worker_count: usize) -> Self {
        assert!(worker_count > 0, "worker_count must be at least 1");
        Self { worker_count }
    }
}

impl Default for ScopedTaskScheduler {
    /// Creates a scheduler sized to the machine's available parallelism.
    fn default() -> Self {
        let worker_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self { worker_count }
    }
}

impl TaskScheduler for ScopedTaskScheduler {
    fn worker_count(&self) -> usize {
        self.worker_count
    }

    fn run(&self, tasks: &[&(dyn Fn() + Sync)]) -> Result<(), TaskError> {
        std::thread::scope(|scope| {
            for task in tasks {
                scope.spawn(move || task());
            }
        });
        Ok(())
    }
}

// --- Tests ---

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_worker_count() {
        assert_eq!(ScopedTaskScheduler::new(3).worker_count(), 3);
        assert!(ScopedTaskScheduler::default().worker_count() >= 1);
    }

    #[test]
    #[should_panic]
    fn test_zero_workers_rejected() {
        let _ = ScopedTaskScheduler::new(0);
    }

    #[test]
    fn test_run_executes_all_tasks() {
        let scheduler = ScopedTaskScheduler::new(4);
        let counter = AtomicUsize::new(0);

        let task = || {
            counter.fetch_add(1, Ordering::Relaxed);
        };
        let tasks: Vec<&(dyn Fn() + Sync)> = vec![&task; 5];
        scheduler.run(&tasks).unwrap();

        assert_eq!(counter.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_run_blocks_until_complete() {
        let scheduler = ScopedTaskScheduler::new(2);
        let progress = AtomicUsize::new(0);

        let slow = || {
            std::thread::sleep(std::time::Duration::from_millis(10));
            progress.fetch_add(1, Ordering::Relaxed);
        };
        let fast = || {
            progress.fetch_add(1, Ordering::Relaxed);
        };
        let tasks: Vec<&(dyn Fn() + Sync)> = vec![&slow, &fast];
        scheduler.run(&tasks).unwrap();

        // Both tasks finished before run() returned.
        assert_eq!(progress.load(Ordering::Relaxed), 2);
    }
}
