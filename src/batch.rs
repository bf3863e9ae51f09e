//! Worker pool for many independent alignments under one set of options.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, info};

use crate::config::AlignOptions;
use crate::report::AlignmentResult;
use crate::sequence::Sequence;
use crate::{Aligner, AlignerError, Result};

struct WorkItem {
    index: usize,
    seq1: Sequence,
    seq2: Arc<Sequence>,
    reply: Sender<WorkResult>,
}

struct WorkResult {
    index: usize,
    result: Result<AlignmentResult>,
}

/// Persistent threads pulling alignment jobs from a shared queue.
///
/// Each call gets its own reply channel, so results always come back in
/// input order. Dropping the pool closes the queue and joins the workers.
pub struct BatchAligner {
    aligner: Arc<Aligner>,
    work_tx: Option<Sender<WorkItem>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl BatchAligner {
    /// Starts `workers` threads; zero picks one per available core.
    pub fn new(workers: usize, options: AlignOptions) -> Result<Self> {
        let aligner = Arc::new(Aligner::new(options)?);
        let count = match workers {
            0 => thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        };
        let (work_tx, work_rx) = bounded::<WorkItem>(count * 2);

        let mut handles = Vec::with_capacity(count);
        for id in 0..count {
            let work_rx = work_rx.clone();
            let aligner = Arc::clone(&aligner);
            let handle = thread::Builder::new()
                .name(format!("pairalign-worker-{}", id))
                .spawn(move || Self::worker(id, aligner, work_rx))
                .map_err(|e| AlignerError::Batch(e.to_string()))?;
            handles.push(handle);
        }
        info!("started {} alignment workers", count);

        Ok(Self {
            aligner,
            work_tx: Some(work_tx),
            workers: handles,
        })
    }

    fn worker(id: usize, aligner: Arc<Aligner>, work_rx: Receiver<WorkItem>) {
        let mut done = 0usize;
        while let Ok(work) = work_rx.recv() {
            let result = aligner.align_sequences(&work.seq1, &work.seq2);
            done += 1;
            let index = work.index;
            if work.reply.send(WorkResult { index, result }).is_err() {
                debug!("worker {}: caller went away, dropping result {}", id, index);
            }
        }
        debug!("worker {} exiting after {} alignments", id, done);
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    pub fn aligner(&self) -> &Aligner {
        &self.aligner
    }

    /// Aligns every pair; slot `i` of the output belongs to pair `i`.
    pub fn align_pairs<I, A, B>(&self, pairs: I) -> Vec<Result<AlignmentResult>>
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<[u8]>,
        B: AsRef<[u8]>,
    {
        let jobs = pairs
            .into_iter()
            .map(|(a, b)| (Sequence::new(a.as_ref()), Arc::new(Sequence::new(b.as_ref()))));
        self.run(jobs)
    }

    /// Aligns each length-`k` window of `query` against `reference`.
    ///
    /// Returns `(offset, result)` per window, offsets 0-based.
    pub fn scan_kmers(
        &self,
        query: impl AsRef<[u8]>,
        reference: impl AsRef<[u8]>,
        k: usize,
    ) -> Vec<(usize, Result<AlignmentResult>)> {
        let query = Sequence::new(query.as_ref());
        let reference = Arc::new(Sequence::new(reference.as_ref()));
        let offsets: Vec<usize> = query.kmers(k).map(|(offset, _)| offset).collect();
        let jobs = query
            .kmers(k)
            .map(|(_, window)| (Sequence::new(window), Arc::clone(&reference)));
        offsets.into_iter().zip(self.run(jobs)).collect()
    }

    fn run(&self, jobs: impl Iterator<Item = (Sequence, Arc<Sequence>)>) -> Vec<Result<AlignmentResult>> {
        let (reply_tx, reply_rx) = unbounded();
        let mut submitted = 0usize;
        let mut failed = None;

        match &self.work_tx {
            Some(work_tx) => {
                for (index, (seq1, seq2)) in jobs.enumerate() {
                    let item = WorkItem {
                        index,
                        seq1,
                        seq2,
                        reply: reply_tx.clone(),
                    };
                    if let Err(e) = work_tx.send(item) {
                        failed = Some(e.to_string());
                        break;
                    }
                    submitted += 1;
                }
            }
            None => failed = Some("worker queue is closed".to_string()),
        }
        drop(reply_tx);

        let mut results: Vec<Option<Result<AlignmentResult>>> = (0..submitted).map(|_| None).collect();
        for _ in 0..submitted {
            match reply_rx.recv() {
                Ok(WorkResult { index, result }) => results[index] = Some(result),
                Err(e) => {
                    failed.get_or_insert_with(|| e.to_string());
                    break;
                }
            }
        }

        let reason = failed.unwrap_or_else(|| "worker dropped a job".to_string());
        results
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(AlignerError::Batch(reason.clone()))))
            .collect()
    }
}

impl Drop for BatchAligner {
    fn drop(&mut self) {
        // Closing the queue ends each worker's recv loop.
        self.work_tx.take();
        while let Some(worker) = self.workers.pop() {
            let _ = worker.join();
        }
        info!("alignment workers stopped");
    }
}
