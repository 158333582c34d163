//! Concurrency stress helpers.
//!
//! These drive one registry from several threads to check that the sequence
//! lock and the optimistic state guard hold under contention.

use digireg_core::{DigitizationState, IdentifierSet, RecordLocator, Registry, StateChange};
use parking_lot::Mutex;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Operations that returned `Ok(true)`.
    pub successful_ops: usize,
    /// Operations that returned `Ok(false)`.
    pub declined_ops: usize,
    /// Operations that returned an error.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    fn from_outcomes(outcomes: &[Option<bool>], duration: Duration) -> Self {
        let successful_ops = outcomes.iter().filter(|o| **o == Some(true)).count();
        let declined_ops = outcomes.iter().filter(|o| **o == Some(false)).count();
        Self {
            total_ops: outcomes.len(),
            successful_ops,
            declined_ops,
            failed_ops: outcomes.len() - successful_ops - declined_ops,
            duration,
        }
    }

    /// Operations per second.
    pub fn ops_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_ops as f64 / secs
        } else {
            0.0
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Declined: {}", self.declined_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second());
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent threads.
    pub threads: usize,
    /// Operations per thread.
    pub operations_per_thread: usize,
    /// Identifiers per allocation.
    pub batch_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            operations_per_thread: 25,
            batch_size: 3,
        }
    }
}

fn run_threads<F>(threads: usize, operations: usize, op: F) -> StressTestResult
where
    F: Fn(usize, usize) -> Option<bool> + Send + Sync + 'static,
{
    let op = Arc::new(op);
    let barrier = Arc::new(Barrier::new(threads));
    let outcomes = Arc::new(Mutex::new(Vec::with_capacity(threads * operations)));
    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let op = Arc::clone(&op);
            let barrier = Arc::clone(&barrier);
            let outcomes = Arc::clone(&outcomes);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..operations {
                    let outcome = op(t, i);
                    outcomes.lock().push(outcome);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let outcomes = outcomes.lock();
    StressTestResult::from_outcomes(&outcomes, start.elapsed())
}

/// Allocates identifiers for `record` from several threads at once.
///
/// Every allocation adds `batch_size` identifiers unique to its thread and
/// iteration.
pub fn stress_concurrent_allocation(registry: &Registry, record: i64, config: &StressConfig) -> StressTestResult {
    let registry = registry.clone();
    let batch_size = config.batch_size;
    run_threads(config.threads, config.operations_per_thread, move |t, i| {
        let identifiers: IdentifierSet = (0..batch_size)
            .map(|k| format!("urn:nbn:cz:stress-{t}-{i}-{k}"))
            .collect();
        registry
            .add_identifiers(RecordLocator::id(record), None, identifiers)
            .ok()
    })
}

/// Races threads to apply the same state transition to `record`.
///
/// Each thread attempts `from -> to` once per operation.
pub fn stress_state_race(
    registry: &Registry,
    record: i64,
    from: DigitizationState,
    to: DigitizationState,
    config: &StressConfig,
) -> StressTestResult {
    let registry = registry.clone();
    run_threads(config.threads, config.operations_per_thread, move |t, _| {
        let change = StateChange::new(to, from).operator(format!("thread-{t}"));
        registry
            .update_record_state(RecordLocator::id(record), change)
            .ok()
    })
}
