use std::io::Write;
use std::sync::mpsc;
use std::thread;

use crossbeam::channel::{self, Receiver};
use log::debug;

use crate::aggregator::UsageAggregator;
use crate::error::{Result, UsageError};

pub fn process_file(filename: &str, output: &mut dyn Write, workers: usize) -> Result<()> {
    let agg = ParallelUsageAggregator::new(workers);
    agg.process(filename, output)?;
    Ok(())
}

struct Task {
    id: usize,
    start: u64,
    end: u64,
    filename: String,
    response: mpsc::Sender<(usize, Result<UsageAggregator>)>,
}

struct ParallelUsageAggregator {
    workers: usize,
    task_tx: channel::Sender<Option<Task>>,
    worker_handles: Vec<thread::JoinHandle<()>>,
}

impl Drop for ParallelUsageAggregator {
    fn drop(&mut self) {
        for _ in &self.worker_handles {
            let _ = self.task_tx.send(None);
        }

        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl ParallelUsageAggregator {
    fn new(workers: usize) -> Self {
        let (tx, rx) = channel::bounded(workers);

        let handles = (0..workers)
            .map(|_| {
                let rx: Receiver<Option<Task>> = rx.clone();
                thread::spawn(move || {
                    loop {
                        match rx.recv() {
                            Ok(Some(task)) => {
                                let mut agg = UsageAggregator::new();
                                let outcome = agg
                                    .process_chunk(task.filename.as_str(), task.start, task.end)
                                    .map(|_| ());
                                // the collector may have bailed on an
                                // earlier chunk's error
                                let _ = task.response.send((task.id, outcome.map(|()| agg)));
                            }
                            Ok(None) => break, // shutdown sentinel
                            Err(_) => break,
                        }
                    }
                })
            })
            .collect();

        ParallelUsageAggregator {
            workers,
            task_tx: tx,
            worker_handles: handles,
        }
    }

    fn process(&self, filename: &str, output: &mut dyn Write) -> Result<()> {
        let metadata = std::fs::metadata(filename)?;
        let file_size = metadata.len();
        if file_size == 0 {
            return Err(UsageError::EmptyInput);
        }
        let min_chunk_size = 1024_u64;
        let chunk_size = file_size.min(min_chunk_size.max(file_size / self.workers as u64));
        let chunks = (file_size / chunk_size + 1) as usize;

        let (tx, rx) = mpsc::channel();
        for i in 0..chunks {
            let start = i as u64 * chunk_size;
            let mut end = (i as u64 + 1) * chunk_size;
            if i == chunks - 1 {
                end = 0;
            }

            debug!("size:{}, task: {} - ]{}-{}]", file_size, i, start, end);
            let task = Task {
                id: i,
                start,
                end,
                filename: filename.to_string(),
                response: tx.clone(),
            };
            self.task_tx
                .send(Some(task))
                .map_err(|e| UsageError::WorkerPool(e.to_string()))?;
        }
        drop(tx);

        // chunk results arrive in completion order; merging them back in
        // chunk order keeps entry order equal to file order, so tie-breaks
        // match the serial path
        let mut parts: Vec<Option<UsageAggregator>> = Vec::with_capacity(chunks);
        parts.resize_with(chunks, || None);
        for _ in 0..chunks {
            let (id, outcome) = rx
                .recv()
                .map_err(|e| UsageError::WorkerPool(e.to_string()))?;
            parts[id] = Some(outcome?);
        }

        let mut result = UsageAggregator::new();
        for part in parts.into_iter().flatten() {
            result.merge(part)?;
        }
        result.write(output)?;
        Ok(())
    }
}
