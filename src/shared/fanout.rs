use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;

pub const DEFAULT_MAX_FANOUT: usize = 4;

/// Runs `work` over `items` on at most `max_concurrency` scoped threads and
/// returns the results in input order. A new item starts as soon as a slot
/// frees up; a panicking item is re-raised once the batch has drained.
pub fn run_bounded<T, R, F>(items: Vec<T>, max_concurrency: usize, work: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let width = max_concurrency.max(1);
    let mut slots: Vec<Option<R>> = items.iter().map(|_| None).collect();
    let mut panicked = None;
    let work = &work;

    thread::scope(|scope| {
        let (result_tx, result_rx) = mpsc::channel::<(usize, thread::Result<R>)>();
        let mut queued = items.into_iter().enumerate();
        let mut in_flight = 0usize;

        loop {
            while in_flight < width {
                let Some((index, item)) = queued.next() else {
                    break;
                };
                let tx = result_tx.clone();
                scope.spawn(move || {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(item)));
                    let _ = tx.send((index, outcome));
                });
                in_flight += 1;
            }

            if in_flight == 0 {
                break;
            }

            let Ok((index, outcome)) = result_rx.recv() else {
                break;
            };
            in_flight -= 1;
            match outcome {
                Ok(value) => slots[index] = Some(value),
                Err(payload) => {
                    if panicked.is_none() {
                        panicked = Some(payload);
                    }
                }
            }
        }
    });

    if let Some(payload) = panicked {
        panic::resume_unwind(payload);
    }
    slots.into_iter().flatten().collect()
}
