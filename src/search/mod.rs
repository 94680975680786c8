pub mod cancel;
pub mod file_search;
pub mod scanner;
mod search_options;
pub mod search_output;
pub mod search_runner;

// Public exports
pub use cancel::CancellationToken;
pub use search_options::{normalize_extensions, SearchOptions, DEFAULT_SNIPPET_CHARS};
pub use search_output::{write_event, OutputFormat};
pub use search_runner::{
    run_search, spawn_search, RunStatus, SearchError, SearchEvent, SearchHandle, SearchSummary,
};
