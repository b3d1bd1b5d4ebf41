/*
 * File acquisition turns a filtered candidate list into a sorted `ProjectFileSet`.
 * The actual enumeration and decoding is delegated to a `FileSourceOperations`
 * implementation; this module only fans the reads out over a small pool of
 * worker threads, collects the results, and enforces the all-or-nothing
 * contract: the first failed read (or an expired deadline) aborts the whole
 * acquisition and any reads still in flight are discarded.
 */
use crate::core::models::{CandidateFile, ProjectFile, ProjectFileSet};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_READ_WORKERS: usize = 8;

#[derive(Debug)]
pub enum ReadError {
    Io { path: String, source: io::Error },
    Listing { root: String, source: io::Error },
    Unreadable { path: String, reason: String },
    Timeout { elapsed: Duration, pending: usize },
    WorkerSpawn(io::Error),
    WorkersLost { pending: usize },
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Io { path, source } => write!(f, "Failed to read '{path}': {source}"),
            ReadError::Listing { root, source } => {
                write!(f, "Failed to enumerate files under '{root}': {source}")
            }
            ReadError::Unreadable { path, reason } => {
                write!(f, "File '{path}' is no longer readable: {reason}")
            }
            ReadError::Timeout { elapsed, pending } => write!(
                f,
                "Reading files timed out after {:.1}s with {pending} file(s) still pending",
                elapsed.as_secs_f64()
            ),
            ReadError::WorkerSpawn(e) => write!(f, "Failed to start file reader thread: {e}"),
            ReadError::WorkersLost { pending } => write!(
                f,
                "File reader threads stopped unexpectedly with {pending} file(s) still pending"
            ),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io { source, .. } => Some(source),
            ReadError::Listing { source, .. } => Some(source),
            ReadError::WorkerSpawn(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReadError>;

/*
 * The capability the core needs from whoever owns the files. `list_candidates`
 * returns every file under the selected root; `read_text` decodes a single file.
 * Implementations must be shareable across the reader threads.
 */
pub trait FileSourceOperations: Send + Sync {
    fn list_candidates(&self) -> Result<Vec<CandidateFile>>;
    fn read_text(&self, candidate: &CandidateFile) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionOptions {
    pub workers: usize,
    pub timeout: Option<Duration>,
}

impl Default for AcquisitionOptions {
    fn default() -> Self {
        AcquisitionOptions {
            workers: DEFAULT_READ_WORKERS,
            timeout: None,
        }
    }
}

type ReadOutcome = Result<ProjectFile>;

/*
 * Reads every candidate through `source` and returns the sorted file set.
 *
 * Up to `options.workers` threads pull candidates from a shared queue. The
 * calling thread waits for one result per candidate and bails out on the first
 * error or when `options.timeout` expires. On bail-out a cancellation flag stops
 * workers from starting new reads; reads already running finish on their own and
 * their results are dropped with the channel.
 */
pub fn acquire_project_files(
    source: Arc<dyn FileSourceOperations>,
    candidates: Vec<CandidateFile>,
    options: AcquisitionOptions,
) -> Result<ProjectFileSet> {
    let total = candidates.len();
    if total == 0 {
        return Ok(ProjectFileSet::default());
    }

    let worker_count = options.workers.clamp(1, total);
    log::debug!(
        "FileAcquisition: Reading {total} file(s) with {worker_count} worker(s), timeout {:?}.",
        options.timeout
    );

    let queue = Arc::new(Mutex::new(candidates.into_iter().collect::<VecDeque<_>>()));
    let cancelled = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<ReadOutcome>();

    for index in 0..worker_count {
        let queue = Arc::clone(&queue);
        let worker_cancelled = Arc::clone(&cancelled);
        let source = Arc::clone(&source);
        let tx = tx.clone();
        let spawn_result = thread::Builder::new()
            .name(format!("file-reader-{index}"))
            .spawn(move || run_reader(source.as_ref(), &queue, &worker_cancelled, &tx));
        if let Err(e) = spawn_result {
            cancelled.store(true, Ordering::SeqCst);
            log::error!("FileAcquisition: Could not spawn reader thread {index}: {e}");
            return Err(ReadError::WorkerSpawn(e));
        }
    }
    // Only the workers hold senders now, so a disconnect means they all exited.
    drop(tx);

    let started = Instant::now();
    let deadline = options.timeout.map(|t| started + t);
    let mut files = Vec::with_capacity(total);

    while files.len() < total {
        let received = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                rx.recv_timeout(remaining)
            }
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(Ok(file)) => files.push(file),
            Ok(Err(e)) => {
                cancelled.store(true, Ordering::SeqCst);
                log::error!("FileAcquisition: Aborting, read failed: {e}");
                return Err(e);
            }
            Err(RecvTimeoutError::Timeout) => {
                cancelled.store(true, Ordering::SeqCst);
                let pending = total - files.len();
                log::error!(
                    "FileAcquisition: Timed out after {:?} with {pending} file(s) pending.",
                    started.elapsed()
                );
                return Err(ReadError::Timeout {
                    elapsed: started.elapsed(),
                    pending,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ReadError::WorkersLost {
                    pending: total - files.len(),
                });
            }
        }
    }

    log::debug!(
        "FileAcquisition: Read {} file(s) in {:?}.",
        files.len(),
        started.elapsed()
    );
    Ok(ProjectFileSet::from_files(files))
}

fn run_reader(
    source: &dyn FileSourceOperations,
    queue: &Mutex<VecDeque<CandidateFile>>,
    cancelled: &AtomicBool,
    tx: &mpsc::Sender<ReadOutcome>,
) {
    loop {
        if cancelled.load(Ordering::SeqCst) {
            return;
        }
        let next = match queue.lock() {
            Ok(mut pending) => pending.pop_front(),
            Err(_) => None,
        };
        let Some(candidate) = next else {
            return;
        };

        let outcome = source
            .read_text(&candidate)
            .map(|content| ProjectFile::new(candidate.path.clone(), content));
        if tx.send(outcome).is_err() {
            // Receiver gone: the acquisition was abandoned.
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    struct MockFileSource {
        contents: HashMap<String, String>,
        failing: Option<String>,
        delay: Duration,
        reads: AtomicUsize,
    }

    impl MockFileSource {
        fn new(entries: &[(&str, &str)]) -> Self {
            MockFileSource {
                contents: entries
                    .iter()
                    .map(|(p, c)| (p.to_string(), c.to_string()))
                    .collect(),
                failing: None,
                delay: Duration::ZERO,
                reads: AtomicUsize::new(0),
            }
        }

        fn failing_on(mut self, path: &str) -> Self {
            self.failing = Some(path.to_string());
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn candidates(&self) -> Vec<CandidateFile> {
            let mut paths: Vec<&String> = self.contents.keys().collect();
            paths.sort();
            paths
                .into_iter()
                .map(|p| CandidateFile::new(p.clone(), p.clone()))
                .collect()
        }
    }

    impl FileSourceOperations for MockFileSource {
        fn list_candidates(&self) -> Result<Vec<CandidateFile>> {
            Ok(self.candidates())
        }

        fn read_text(&self, candidate: &CandidateFile) -> Result<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            if self.failing.as_deref() == Some(candidate.path.as_str()) {
                return Err(ReadError::Unreadable {
                    path: candidate.path.clone(),
                    reason: "access revoked".to_string(),
                });
            }
            self.contents
                .get(&candidate.path)
                .cloned()
                .ok_or_else(|| ReadError::Io {
                    path: candidate.path.clone(),
                    source: io::Error::new(io::ErrorKind::NotFound, "missing"),
                })
        }
    }

    #[test]
    fn test_acquire_reads_and_sorts_all_files() {
        let source = Arc::new(MockFileSource::new(&[
            ("proj/b.txt", "B"),
            ("proj/a.txt", "A"),
            ("proj/src/main.rs", "fn main() {}"),
        ]));
        // Reverse the candidate order to show the result is sorted regardless.
        let mut candidates = source.candidates();
        candidates.reverse();

        let set = acquire_project_files(source.clone(), candidates, AcquisitionOptions::default())
            .unwrap();

        assert_eq!(
            set.paths(),
            vec!["proj/a.txt", "proj/b.txt", "proj/src/main.rs"]
        );
        assert_eq!(set.as_slice()[0].content, "A");
        assert_eq!(source.reads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_acquire_single_worker_matches_parallel_result() {
        let entries: Vec<(String, String)> = (0..20)
            .map(|i| (format!("proj/file_{i:02}.txt"), format!("content {i}")))
            .collect();
        let borrowed: Vec<(&str, &str)> = entries
            .iter()
            .map(|(p, c)| (p.as_str(), c.as_str()))
            .collect();
        let source = Arc::new(MockFileSource::new(&borrowed));

        let sequential = acquire_project_files(
            source.clone(),
            source.candidates(),
            AcquisitionOptions {
                workers: 1,
                timeout: None,
            },
        )
        .unwrap();
        let parallel = acquire_project_files(
            source.clone(),
            source.candidates(),
            AcquisitionOptions {
                workers: 6,
                timeout: None,
            },
        )
        .unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(parallel.len(), 20);
    }

    #[test]
    fn test_acquire_fails_whole_batch_on_single_read_error() {
        let source = Arc::new(
            MockFileSource::new(&[("proj/a.txt", "A"), ("proj/b.txt", "B"), ("proj/c.txt", "C")])
                .failing_on("proj/b.txt"),
        );
        let result =
            acquire_project_files(source.clone(), source.candidates(), AcquisitionOptions::default());
        match result {
            Err(ReadError::Unreadable { path, .. }) => assert_eq!(path, "proj/b.txt"),
            other => panic!("Expected Unreadable error, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_read_stops_workers_from_starting_new_reads() {
        let source = Arc::new(
            MockFileSource::new(&[
                ("proj/a.txt", "A"),
                ("proj/b.txt", "B"),
                ("proj/c.txt", "C"),
                ("proj/d.txt", "D"),
                ("proj/e.txt", "E"),
                ("proj/f.txt", "F"),
            ])
            .failing_on("proj/a.txt")
            .with_delay(Duration::from_millis(50)),
        );
        let options = AcquisitionOptions {
            workers: 1,
            timeout: None,
        };
        let result = acquire_project_files(source.clone(), source.candidates(), options);
        assert!(matches!(result, Err(ReadError::Unreadable { .. })));

        // Give the worker time to drain the queue if it never saw the flag.
        thread::sleep(Duration::from_millis(400));
        // At most one read can slip in between the failure and the flag being set.
        assert!(source.reads.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_acquire_maps_timeout_to_read_error() {
        let source = Arc::new(
            MockFileSource::new(&[("proj/slow.txt", "zzz")]).with_delay(Duration::from_millis(500)),
        );
        let result = acquire_project_files(
            source.clone(),
            source.candidates(),
            AcquisitionOptions {
                workers: 1,
                timeout: Some(Duration::from_millis(20)),
            },
        );
        match result {
            Err(ReadError::Timeout { pending, .. }) => assert_eq!(pending, 1),
            other => panic!("Expected Timeout error, got {other:?}"),
        }
    }

    #[test]
    fn test_acquire_empty_candidate_list_returns_empty_set() {
        let source = Arc::new(MockFileSource::new(&[]));
        let set =
            acquire_project_files(source, Vec::new(), AcquisitionOptions::default()).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_zero_workers_is_clamped_to_one() {
        let source = Arc::new(MockFileSource::new(&[("proj/a.txt", "A")]));
        let set = acquire_project_files(
            source.clone(),
            source.candidates(),
            AcquisitionOptions {
                workers: 0,
                timeout: None,
            },
        )
        .unwrap();
        assert_eq!(set.len(), 1);
    }
}
