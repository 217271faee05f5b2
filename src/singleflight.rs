//! Per-key deduplication of concurrent loads.
//!
//! `SingleFlight::work` ensures that, for the span during which a call for
//! a given key is in flight, every other caller for that same key waits on
//! the first call instead of starting its own — and all of them observe
//! the exact same result, success or failure. Once the call settles, the
//! record is removed, so a later call for the same key starts a fresh
//! leader execution rather than reading a stale result: this is a
//! deduplication barrier, not a cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

struct Call<T, E> {
    result: Mutex<Option<Result<T, E>>>,
    done: Condvar,
}

/// Coordinates concurrent calls so that at most one executes per key at a
/// time.
pub struct SingleFlight<T, E> {
    in_flight: Mutex<HashMap<String, Arc<Call<T, E>>>>,
}

impl<T, E> std::fmt::Debug for SingleFlight<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let in_flight = self.in_flight.lock().len();
        f.debug_struct("SingleFlight")
            .field("in_flight", &in_flight)
            .finish()
    }
}

impl<T, E> Default for SingleFlight<T, E> {
    fn default() -> Self {
        SingleFlight {
            in_flight: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone, E: Clone> SingleFlight<T, E> {
    /// Creates an empty coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` on behalf of `key`, collapsing concurrent callers for the
    /// same key into a single execution.
    ///
    /// If a call for `key` is already in flight, this blocks until it
    /// settles and returns its exact result without invoking `f`.
    /// Otherwise this becomes the leader: it registers the in-flight
    /// record, runs `f` (outside the coordinator's lock, so other keys are
    /// never blocked by it), stores the result, wakes any waiters, and
    /// removes the record before returning.
    pub fn work(&self, key: &str, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        {
            let mut in_flight = self.in_flight.lock();
            if let Some(call) = in_flight.get(key).cloned() {
                drop(in_flight);
                return Self::wait(&call);
            }
            let call = Arc::new(Call {
                result: Mutex::new(None),
                done: Condvar::new(),
            });
            in_flight.insert(key.to_string(), call);
        }

        let call = {
            let in_flight = self.in_flight.lock();
            in_flight.get(key).cloned().unwrap()
        };

        let result = f();

        {
            let mut slot = call.result.lock();
            *slot = Some(result.clone());
            call.done.notify_all();
        }

        self.in_flight.lock().remove(key);

        result
    }

    fn wait(call: &Arc<Call<T, E>>) -> Result<T, E> {
        let mut slot = call.result.lock();
        while slot.is_none() {
            call.done.wait(&mut slot);
        }
        slot.clone().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn concurrent_calls_for_same_key_run_once() {
        // scenario 4: 10 concurrent Do("x", fn) calls.
        let sf: Arc<SingleFlight<String, String>> = Arc::new(SingleFlight::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let sf = sf.clone();
                let counter = counter.clone();
                thread::spawn(move || {
                    sf.work("x", || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(20));
                        Ok::<_, String>("bar".to_string())
                    })
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), Ok("bar".to_string()));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn error_is_broadcast_identically() {
        let sf: SingleFlight<i32, String> = SingleFlight::new();
        let result = sf.work("k", || Err("boom".to_string()));
        assert_eq!(result, Err("boom".to_string()));
    }

    #[test]
    fn later_call_after_settling_runs_again() {
        let sf: SingleFlight<i32, String> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        sf.work("k", || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(1)
        })
        .unwrap();

        let c = calls.clone();
        sf.work("k", || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(2)
        })
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn distinct_keys_do_not_collapse() {
        let sf: Arc<SingleFlight<i32, String>> = Arc::new(SingleFlight::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|&k| {
                let sf = sf.clone();
                let counter = counter.clone();
                thread::spawn(move || {
                    sf.work(k, || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, String>(0)
                    })
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
