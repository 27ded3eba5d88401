//! Bounded worker pool shared by descriptor fetching and artifact downloads.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Mutex;

use crate::control::CancelToken;

/// Run `job` over `items` with at most `workers` threads.
///
/// Results come back indexed like `items`. A slot is `None` when the item was
/// never started (cancellation) or its worker panicked. Workers stop taking new
/// items once `cancel` fires; items already running finish or observe the token
/// themselves.
pub fn run_bounded<T, R, F>(items: Vec<T>, workers: usize, cancel: &CancelToken, job: F) -> Vec<Option<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let count = items.len();
    let mut results: Vec<Option<R>> = (0..count).map(|_| None).collect();
    if count == 0 {
        return results;
    }
    let work: Mutex<VecDeque<(usize, T)>> = Mutex::new(items.into_iter().enumerate().collect());
    let (tx, rx) = mpsc::channel::<(usize, R)>();
    let num_workers = workers.max(1).min(count);

    std::thread::scope(|s| {
        let mut handles = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            let tx = tx.clone();
            let work = &work;
            let job = &job;
            handles.push(s.spawn(move || loop {
                if cancel.is_cancelled() {
                    break;
                }
                let next = match work.lock() {
                    Ok(mut q) => q.pop_front(),
                    Err(_) => None,
                };
                let Some((index, item)) = next else {
                    break;
                };
                let out = job(item);
                if tx.send((index, out)).is_err() {
                    break;
                }
            }));
        }
        drop(tx);

        for (index, out) in rx.iter() {
            results[index] = Some(out);
        }
        for h in handles {
            if h.join().is_err() {
                tracing::error!("pool worker panicked");
            }
        }
    });
    results
}
