//! Bounded worker pool for batch key generation. Keys are expensive to
//! derive (Argon2 is not involved, but ML-DSA expansion and BLS KeyGen
//! are non-trivial), so `generate --count N` fans out across a few threads.
//!
//! Completion order is unspecified; `results[i]` always corresponds to
//! `names[i]`. The progress callback fires once per finished key under a
//! shared counter, never concurrently.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::Result;
use crate::keyset::KeySet;

pub const DEFAULT_WORKERS: usize = 4;

/// Generate one fresh key set per name. No key set is observable until its
/// slot holds a fully-initialized result.
pub fn generate_batch<F>(names: &[String], workers: usize, progress: F) -> Vec<Result<KeySet>>
where
    F: Fn(usize, usize) + Send + Sync,
{
    let total = names.len();
    let workers = workers.clamp(1, total.max(1));

    let queue: Mutex<VecDeque<(usize, String)>> =
        Mutex::new(names.iter().cloned().enumerate().collect());
    let results: Mutex<Vec<Option<Result<KeySet>>>> =
        Mutex::new((0..total).map(|_| None).collect());
    let done = Mutex::new(0usize);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let job = queue.lock().expect("batch queue poisoned").pop_front();
                let Some((index, name)) = job else {
                    break;
                };
                let outcome = KeySet::generate(&name);
                results.lock().expect("batch results poisoned")[index] = Some(outcome);
                let mut counter = done.lock().expect("batch counter poisoned");
                *counter += 1;
                progress(*counter, total);
            });
        }
    });

    results
        .into_inner()
        .expect("batch results poisoned")
        .into_iter()
        .map(|slot| slot.expect("every slot filled by the pool"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn results_are_indexed_by_request_order() {
        let names: Vec<String> = (0..6).map(|i| format!("batch-{i}")).collect();
        let ticks = AtomicUsize::new(0);
        let results = generate_batch(&names, 3, |_, _| {
            ticks.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(results.len(), 6);
        assert_eq!(ticks.load(Ordering::SeqCst), 6);
        for (i, result) in results.iter().enumerate() {
            let ks = result.as_ref().unwrap();
            assert_eq!(ks.name, format!("batch-{i}"));
            assert!(!ks.is_locked());
        }
    }

    #[test]
    fn invalid_name_fails_only_its_slot() {
        let names = vec!["ok-1".to_string(), "bad name".to_string()];
        let results = generate_batch(&names, 2, |_, _| {});
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn single_worker_still_completes() {
        let names = vec!["solo".to_string()];
        let results = generate_batch(&names, 1, |done, total| {
            assert_eq!((done, total), (1, 1));
        });
        assert!(results[0].is_ok());
    }
}
