//! Position-preserving parallel map over independent units of work.

use rayon::prelude::*;
use tracing::debug;

use crate::{AlignError, AlignResult};

/// Executes a function over every input, returning outputs in input order.
///
/// `outputs[i]` is always the result for `inputs[i]`, whatever order the
/// work actually completes in. Units of work share no mutable state.
pub trait ParallelMap {
    /// Maps `f` over `inputs`, blocking until every unit has completed.
    fn map<I, O, F>(&self, inputs: &[I], f: F) -> Vec<O>
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> O + Sync + Send;
}

/// Runs every unit on the calling thread, in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl ParallelMap for Sequential {
    fn map<I, O, F>(&self, inputs: &[I], f: F) -> Vec<O>
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> O + Sync + Send,
    {
        inputs.iter().map(f).collect()
    }
}

/// A bounded pool of worker threads with an explicit lifecycle.
///
/// Create it before alignment runs, pass it in, and call
/// [`WorkerPool::shutdown`] (or drop it) afterwards. No global executor is
/// touched.
///
/// # Example
///
/// ```
/// use shape_align::{ParallelMap, WorkerPool};
///
/// let pool = WorkerPool::new(2).unwrap();
/// let squares = pool.map(&[1, 2, 3, 4], |x| x * x);
/// assert_eq!(squares, vec![1, 4, 9, 16]);
/// pool.shutdown();
/// ```
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Builds a pool with `workers` threads; `0` picks one per logical CPU.
    ///
    /// # Errors
    ///
    /// Returns [`AlignError::WorkerPool`] if the threads cannot be spawned.
    pub fn new(workers: usize) -> AlignResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("ssm-worker-{idx}"))
            .build()
            .map_err(|e| AlignError::WorkerPool(e.to_string()))?;
        debug!(workers = pool.current_num_threads(), "Worker pool started");
        Ok(Self { pool })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Stops the pool, joining its threads once pending work has drained.
    pub fn shutdown(self) {
        debug!(workers = self.workers(), "Worker pool shut down");
        drop(self.pool);
    }
}

impl ParallelMap for WorkerPool {
    fn map<I, O, F>(&self, inputs: &[I], f: F) -> Vec<O>
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> O + Sync + Send,
    {
        // collect() on an indexed parallel iterator keeps input order
        self.pool.install(|| inputs.par_iter().map(f).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_sequential_preserves_order() {
        let out = Sequential.map(&["a", "bb", "ccc"], |s| s.len());
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn test_pool_preserves_order_under_uneven_work() {
        let pool = WorkerPool::new(4).unwrap();
        let inputs: Vec<u64> = (0..16).collect();
        // earlier items sleep longer so they finish last
        let out = pool.map(&inputs, |&i| {
            thread::sleep(Duration::from_millis(16 - i));
            i * 10
        });
        assert_eq!(out, inputs.iter().map(|i| i * 10).collect::<Vec<_>>());
        pool.shutdown();
    }

    #[test]
    fn test_pool_thread_names() {
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.workers(), 2);
        let names = pool.map(&[0, 1], |_| {
            thread::current().name().map(str::to_string).unwrap_or_default()
        });
        assert!(names.iter().all(|n| n.starts_with("ssm-worker-")));
    }

    #[test]
    fn test_empty_inputs() {
        let pool = WorkerPool::new(1).unwrap();
        let out: Vec<i32> = pool.map(&[] as &[i32], |x| *x);
        assert!(out.is_empty());
    }
}
