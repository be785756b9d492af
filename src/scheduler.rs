// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crossbeam_queue::ArrayQueue;
use num_complex::Complex64;

use crate::error::{ModalError, Result};
use crate::sink::RowSink;

/// Parallel row producer with serialized, strictly ordered delivery.
///
/// Workers claim row indices from a shared counter and compute them
/// independently. Completed rows go through a bounded queue to the calling
/// thread, which reorders them and hands them to the sink one at a time in
/// increasing index order. A worker may not start row `r` until fewer than
/// `buffer_size` rows separate it from the next undelivered row, so memory
/// stays bounded when the sink is slower than the workers.
#[derive(Debug, Clone, Copy)]
pub struct OrderedDelivery {
    workers: usize,
    buffer_size: usize,
}

struct LiveGuard<'a>(&'a AtomicUsize);

impl Drop for LiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl OrderedDelivery {
    /// Create a scheduler.
    ///
    /// # Errors
    /// Returns a configuration error if `workers` or `buffer_size` is zero.
    pub fn new(workers: usize, buffer_size: usize) -> Result<Self> {
        if workers == 0 {
            return Err(ModalError::Configuration(
                "number of workers must be >= 1".to_string(),
            ));
        }
        if buffer_size == 0 {
            return Err(ModalError::Configuration(
                "buffer size must be >= 1".to_string(),
            ));
        }
        Ok(OrderedDelivery {
            workers,
            buffer_size,
        })
    }

    /// Worker count.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Maximum number of rows computed ahead of the sink.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Compute rows `0..num_rows` with `compute` and deliver them to `sink`.
    ///
    /// With a single worker rows are computed and delivered inline on the
    /// calling thread.
    ///
    /// # Errors
    /// The first error from `compute` or from the sink stops the run and is
    /// returned. Rows already delivered stay delivered.
    pub fn run<F>(&self, num_rows: usize, compute: F, sink: &mut dyn RowSink) -> Result<()>
    where
        F: Fn(usize) -> Result<Vec<Complex64>> + Sync,
    {
        if self.workers == 1 {
            for row in 0..num_rows {
                let values = compute(row)?;
                sink.accept(row, &values)?;
            }
            return Ok(());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| ModalError::Other(e.to_string()))?;

        let buffer = self.buffer_size;
        let next_row = AtomicUsize::new(0);
        let delivered = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let live = AtomicUsize::new(self.workers);
        let completed: ArrayQueue<(usize, Vec<Complex64>)> = ArrayQueue::new(buffer);
        let failure: Mutex<Option<ModalError>> = Mutex::new(None);

        let record_failure = |e: ModalError| {
            if let Ok(mut slot) = failure.lock() {
                slot.get_or_insert(e);
            }
            abort.store(true, Ordering::Release);
        };

        let consumed = pool.in_place_scope(|s| {
            for _ in 0..self.workers {
                s.spawn(|_| {
                    let _guard = LiveGuard(&live);
                    loop {
                        if abort.load(Ordering::Acquire) {
                            break;
                        }
                        let row = next_row.fetch_add(1, Ordering::AcqRel);
                        if row >= num_rows {
                            break;
                        }
                        while row >= delivered.load(Ordering::Acquire) + buffer {
                            if abort.load(Ordering::Acquire) {
                                return;
                            }
                            std::thread::yield_now();
                        }
                        let values = match compute(row) {
                            Ok(values) => values,
                            Err(e) => {
                                record_failure(e);
                                break;
                            }
                        };
                        let mut item = (row, values);
                        loop {
                            match completed.push(item) {
                                Ok(()) => break,
                                Err(back) => {
                                    if abort.load(Ordering::Acquire) {
                                        return;
                                    }
                                    item = back;
                                    std::thread::yield_now();
                                }
                            }
                        }
                    }
                });
            }

            let mut pending: BTreeMap<usize, Vec<Complex64>> = BTreeMap::new();
            let mut next = 0;
            while next < num_rows {
                if let Some((row, values)) = completed.pop() {
                    pending.insert(row, values);
                    while let Some(values) = pending.remove(&next) {
                        if let Err(e) = sink.accept(next, &values) {
                            abort.store(true, Ordering::Release);
                            return Err(e);
                        }
                        next += 1;
                        delivered.store(next, Ordering::Release);
                    }
                    continue;
                }
                if abort.load(Ordering::Acquire) {
                    break;
                }
                // live is read before the queue so every finished push is visible
                if live.load(Ordering::Acquire) == 0 && completed.is_empty() {
                    break;
                }
                std::thread::yield_now();
            }
            Ok(next)
        })?;

        if let Some(e) = failure.into_inner().ok().flatten() {
            return Err(e);
        }
        if consumed < num_rows {
            return Err(ModalError::EngineStopped {
                delivered: consumed,
                expected: num_rows,
            });
        }
        Ok(())
    }
}
