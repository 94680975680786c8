use std::path::PathBuf;

use crate::formula::auto_formula;
use crate::models::{PhraseSet, SearchMode};

/// Default number of characters shown for a whole-document match
pub const DEFAULT_SNIPPET_CHARS: usize = 200;

/// Options for one search run. Owned so the run can move onto a worker thread.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub roots: Vec<PathBuf>,
    pub phrases: PhraseSet,
    /// User formula; when blank the run falls back to [`auto_formula`].
    pub formula: String,
    pub mode: SearchMode,
    /// Suppress repeats of a match already seen during this run
    pub unique: bool,
    /// Normalized extensions (see [`normalize_extensions`]); empty matches every file
    pub extensions: Vec<String>,
    pub custom_ignores: Vec<String>,
    pub respect_gitignore: bool,
    pub snippet_chars: usize,
    pub timeout_secs: Option<u64>,
}

impl SearchOptions {
    pub fn new(roots: Vec<PathBuf>, phrases: PhraseSet) -> Self {
        SearchOptions {
            roots,
            phrases,
            formula: String::new(),
            mode: SearchMode::Line,
            unique: false,
            extensions: Vec::new(),
            custom_ignores: Vec::new(),
            respect_gitignore: false,
            snippet_chars: DEFAULT_SNIPPET_CHARS,
            timeout_secs: None,
        }
    }

    pub fn effective_formula(&self) -> String {
        if self.formula.trim().is_empty() {
            auto_formula(&self.phrases)
        } else {
            self.formula.trim().to_string()
        }
    }
}

/// Splits comma-separated entries, trims them, lowercases them and adds the
/// leading `.` when it is missing. `"txt, .MD"` becomes `[".txt", ".md"]`.
pub fn normalize_extensions<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for entry in raw {
        for ext in entry.as_ref().split(',') {
            let ext = ext.trim().to_lowercase();
            if ext.is_empty() || ext == "." {
                continue;
            }
            let ext = if ext.starts_with('.') {
                ext
            } else {
                format!(".{ext}")
            };
            if !out.contains(&ext) {
                out.push(ext);
            }
        }
    }
    out
}
