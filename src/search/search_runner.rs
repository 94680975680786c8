use crossbeam_channel::{unbounded, Receiver};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::formula::{validate, CompiledFormula, EvaluationError};
use crate::models::MatchResult;
use crate::search::cancel::{start_timeout_thread, CancellationToken};
use crate::search::file_search::find_files;
use crate::search::scanner::{ScanOutcome, Scanner};
use crate::search::search_options::SearchOptions;

/// Failures that stop a run before any file is read.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("No search paths were given")]
    NoSearchPaths,

    #[error("At least one phrase must have search text")]
    NoPhrases,

    #[error("Invalid formula: {}", .0.join("; "))]
    InvalidFormula(Vec<String>),

    #[error(transparent)]
    Formula(#[from] EvaluationError),

    #[error("Failed to start search worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Search worker panicked")]
    WorkerPanicked,
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Complete,
    Cancelled,
    NoFiles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSummary {
    pub status: RunStatus,
    pub files_scanned: usize,
    pub total_files: usize,
    pub matches: usize,
    pub file_errors: usize,
}

impl SearchSummary {
    /// Human readable status line for the end of a run.
    pub fn message(&self) -> String {
        match self.status {
            RunStatus::Complete => format!(
                "Search complete. Found {} matches in {} files.",
                self.matches, self.total_files
            ),
            RunStatus::Cancelled => format!(
                "Search cancelled. Found {} matches in {} of {} files.",
                self.matches, self.files_scanned, self.total_files
            ),
            RunStatus::NoFiles => "No files found matching the criteria.".to_string(),
        }
    }
}

/// One notification from the worker to whoever is watching the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SearchEvent {
    /// Sent before each file; `current` is 1-based.
    Progress { current: usize, total: usize },
    Match(MatchResult),
    /// A file that could not be read. The run carries on.
    FileError { path: PathBuf, message: String },
    Finished(SearchSummary),
}

/// Checks the options and compiles the formula the run will use.
pub fn prepare(options: &SearchOptions) -> Result<CompiledFormula, SearchError> {
    if options.roots.is_empty() {
        return Err(SearchError::NoSearchPaths);
    }
    if options.phrases.is_empty() {
        return Err(SearchError::NoPhrases);
    }

    let formula = options.effective_formula();
    let result = validate(&formula, &options.phrases);
    if !result.is_valid {
        return Err(SearchError::InvalidFormula(result.error_messages()));
    }
    for warning in &result.warnings {
        warn!("{}", warning);
    }

    Ok(CompiledFormula::compile(&formula)?)
}

/// Runs a search on the current thread, reporting through `emit`.
///
/// The last event is always `Finished`. Cancellation is observed before each
/// file and between lines, and ends the run with [`RunStatus::Cancelled`].
pub fn run_search(
    options: &SearchOptions,
    cancel: &CancellationToken,
    mut emit: impl FnMut(SearchEvent),
) -> Result<SearchSummary, SearchError> {
    let formula = prepare(options)?;
    let start = Instant::now();
    info!(
        "Searching {} root(s) for {} in {} mode",
        options.roots.len(),
        formula,
        options.mode
    );

    let watchdog = options
        .timeout_secs
        .map(|secs| start_timeout_thread(Duration::from_secs(secs), cancel.clone()));

    let summary = run_worker(options, &formula, cancel, &mut emit);

    if let Some(stop) = watchdog {
        stop.store(true, Ordering::SeqCst);
    }

    info!("{} ({:.2?})", summary.message(), start.elapsed());
    emit(SearchEvent::Finished(summary.clone()));
    Ok(summary)
}

fn run_worker(
    options: &SearchOptions,
    formula: &CompiledFormula,
    cancel: &CancellationToken,
    emit: &mut dyn FnMut(SearchEvent),
) -> SearchSummary {
    let files = find_files(options);
    let mut summary = SearchSummary {
        status: RunStatus::Complete,
        files_scanned: 0,
        total_files: files.len(),
        matches: 0,
        file_errors: 0,
    };

    if files.is_empty() {
        summary.status = RunStatus::NoFiles;
        return summary;
    }

    let mut scanner = Scanner::new(formula, &options.phrases, options.mode)
        .unique(options.unique)
        .snippet_chars(options.snippet_chars);

    for (index, path) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            summary.status = RunStatus::Cancelled;
            break;
        }

        emit(SearchEvent::Progress {
            current: index + 1,
            total: files.len(),
        });
        debug!("Scanning {}", path.display());

        let mut found = 0;
        let outcome = scanner.scan_file(path, cancel, &mut |m| {
            found += 1;
            emit(SearchEvent::Match(m));
        });
        summary.matches += found;

        match outcome {
            Ok(ScanOutcome::Finished) => summary.files_scanned += 1,
            Ok(ScanOutcome::Cancelled) => {
                summary.status = RunStatus::Cancelled;
                break;
            }
            Err(err) => {
                warn!("{:#}", err);
                summary.files_scanned += 1;
                summary.file_errors += 1;
                emit(SearchEvent::FileError {
                    path: path.clone(),
                    message: format!("{err:#}"),
                });
            }
        }
    }

    summary
}

/// A search running on its own thread.
pub struct SearchHandle {
    cancel: CancellationToken,
    events: Receiver<SearchEvent>,
    worker: JoinHandle<Result<SearchSummary, SearchError>>,
}

impl SearchHandle {
    /// Asks the worker to stop at its next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Events in emission order. The channel closes when the worker ends.
    pub fn events(&self) -> &Receiver<SearchEvent> {
        &self.events
    }

    /// Waits for the worker and returns its summary.
    pub fn join(self) -> Result<SearchSummary, SearchError> {
        self.worker
            .join()
            .map_err(|_| SearchError::WorkerPanicked)?
    }
}

/// Starts a search on a dedicated worker thread.
///
/// Options are checked up front so a bad formula is reported here rather
/// than through the handle.
pub fn spawn_search(options: SearchOptions) -> Result<SearchHandle, SearchError> {
    prepare(&options)?;

    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();
    let (sender, events) = unbounded();

    let worker = thread::Builder::new()
        .name("finder-search".to_string())
        .spawn(move || {
            run_search(&options, &worker_cancel, |event| {
                // A dropped receiver only means nobody is listening any more
                let _ = sender.send(event);
            })
        })?;

    Ok(SearchHandle {
        cancel,
        events,
        worker,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PhraseId, PhraseSet};
    use std::fs;
    use tempfile::TempDir;

    fn cat_options(root: PathBuf) -> SearchOptions {
        SearchOptions::new(vec![root], PhraseSet::new().with(PhraseId::A, "cat", false))
    }

    #[test]
    fn test_prepare_rejects_bad_options() {
        let mut options = cat_options(PathBuf::from("."));
        options.roots.clear();
        assert!(matches!(prepare(&options), Err(SearchError::NoSearchPaths)));

        let options = SearchOptions::new(vec![PathBuf::from(".")], PhraseSet::new());
        assert!(matches!(prepare(&options), Err(SearchError::NoPhrases)));

        let mut options = cat_options(PathBuf::from("."));
        options.formula = "A AND".to_string();
        match prepare(&options) {
            Err(SearchError::InvalidFormula(errors)) => assert!(!errors.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_run_reports_progress_and_matches() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "cat\ndog\n").unwrap();
        fs::write(temp_dir.path().join("b.txt"), "no match\n").unwrap();

        let mut events = Vec::new();
        let summary = run_search(
            &cat_options(temp_dir.path().to_path_buf()),
            &CancellationToken::new(),
            |e| events.push(e),
        )
        .unwrap();

        assert_eq!(summary.status, RunStatus::Complete);
        assert_eq!(summary.matches, 1);
        assert_eq!(summary.total_files, 2);
        assert_eq!(summary.message(), "Search complete. Found 1 matches in 2 files.");

        assert!(matches!(events[0], SearchEvent::Progress { current: 1, total: 2 }));
        assert!(matches!(&events[1], SearchEvent::Match(m) if m.position == 1));
        assert!(matches!(events[2], SearchEvent::Progress { current: 2, total: 2 }));
        assert!(matches!(events.last(), Some(SearchEvent::Finished(_))));
    }

    #[test]
    fn test_no_files_status() {
        let temp_dir = TempDir::new().unwrap();
        let summary = run_search(
            &cat_options(temp_dir.path().to_path_buf()),
            &CancellationToken::new(),
            |_| {},
        )
        .unwrap();
        assert_eq!(summary.status, RunStatus::NoFiles);
        assert_eq!(summary.message(), "No files found matching the criteria.");
    }

    #[test]
    fn test_pre_cancelled_run_emits_no_matches() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "cat\n").unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut events = Vec::new();
        let summary = run_search(
            &cat_options(temp_dir.path().to_path_buf()),
            &cancel,
            |e| events.push(e),
        )
        .unwrap();

        assert_eq!(summary.status, RunStatus::Cancelled);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_spawned_search_streams_events() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "cat\ncat\n").unwrap();

        let handle = spawn_search(cat_options(temp_dir.path().to_path_buf())).unwrap();
        let events: Vec<SearchEvent> = handle.events().iter().collect();
        let summary = handle.join().unwrap();

        assert_eq!(summary.matches, 2);
        let matches = events
            .iter()
            .filter(|e| matches!(e, SearchEvent::Match(_)))
            .count();
        assert_eq!(matches, 2);
    }

    #[test]
    fn test_event_json_shape() {
        let event = SearchEvent::Progress {
            current: 1,
            total: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "progress");
        assert_eq!(json["current"], 1);
    }
}
