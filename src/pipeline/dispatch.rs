//! Dispatcher feeding per-worker inboxes from one bounded upstream queue
//!
//! - single-consumer upstream `mpsc::Receiver` (the dispatcher)
//! - per-worker `mpsc` inboxes of capacity one
//! - inboxes are dropped when upstream closes, which is the workers' exit signal

use super::CancelToken;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Create `workers` inboxes; senders go to the dispatcher, receivers to workers
pub(crate) fn worker_inboxes<T>(workers: usize) -> (Vec<mpsc::Sender<T>>, Vec<mpsc::Receiver<T>>) {
    (0..workers.max(1)).map(|_| mpsc::channel(1)).unzip()
}

/// Forward every upstream item to an idle worker until upstream closes or the
/// run is cancelled. Returns the number of items handed to workers.
pub(crate) fn spawn_dispatcher<T: Send + 'static>(
    mut upstream: mpsc::Receiver<T>,
    inboxes: Vec<mpsc::Sender<T>>,
    cancel: CancelToken,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let worker_len = inboxes.len();
        let mut next_worker = 0usize;
        let mut dispatched = 0usize;

        'items: loop {
            let mut item = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = upstream.recv() => match received {
                    Some(item) => item,
                    None => break,
                },
            };

            // Prefer any idle worker so one slow file does not stall the rest.
            for offset in 0..worker_len {
                let target = (next_worker + offset) % worker_len;
                match inboxes[target].try_send(item) {
                    Ok(()) => {
                        dispatched += 1;
                        next_worker = (target + 1) % worker_len;
                        continue 'items;
                    }
                    Err(TrySendError::Full(back) | TrySendError::Closed(back)) => item = back,
                }
            }

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = inboxes[next_worker].send(item) => sent,
            };
            if sent.is_err() {
                break;
            }
            dispatched += 1;
            next_worker = (next_worker + 1) % worker_len;
        }
        // upstream and inboxes are dropped here: producers unblock, workers drain and exit.
        dispatched
    })
}
