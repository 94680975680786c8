use ahash::AHashSet;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::formula::CompiledFormula;
use crate::models::{MatchResult, PhraseSet, SearchMode};
use crate::search::cancel::CancellationToken;

/// How a single file scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Finished,
    Cancelled,
}

// Identity of a match for first-occurrence tracking
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SeenKey {
    Document(PathBuf),
    Line(PathBuf, String),
}

/// Evaluates a compiled formula over files, one content unit at a time.
///
/// Owns the set of matches already seen, so one `Scanner` corresponds to
/// one search run.
pub struct Scanner<'a> {
    formula: &'a CompiledFormula,
    phrases: &'a PhraseSet,
    mode: SearchMode,
    unique: bool,
    snippet_chars: usize,
    seen: AHashSet<SeenKey>,
}

impl<'a> Scanner<'a> {
    pub fn new(formula: &'a CompiledFormula, phrases: &'a PhraseSet, mode: SearchMode) -> Self {
        Scanner {
            formula,
            phrases,
            mode,
            unique: false,
            snippet_chars: crate::search::search_options::DEFAULT_SNIPPET_CHARS,
            seen: AHashSet::new(),
        }
    }

    /// Only emit the first occurrence of each match.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn snippet_chars(mut self, snippet_chars: usize) -> Self {
        self.snippet_chars = snippet_chars;
        self
    }

    /// Scans one file and hands every match to `emit` in line order.
    ///
    /// Open and read failures are returned as errors; matches already
    /// emitted for the file stay emitted.
    pub fn scan_file(
        &mut self,
        path: &Path,
        cancel: &CancellationToken,
        emit: &mut dyn FnMut(MatchResult),
    ) -> Result<ScanOutcome> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;

        match self.mode {
            SearchMode::Document => self.scan_document(path, file, emit),
            SearchMode::Line => self.scan_lines(path, file, cancel, emit),
        }
    }

    fn scan_document(
        &mut self,
        path: &Path,
        mut file: File,
        emit: &mut dyn FnMut(MatchResult),
    ) -> Result<ScanOutcome> {
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let content = String::from_utf8_lossy(&bytes);

        if self.formula.evaluate(self.phrases, &content) {
            let snippet = truncate_snippet(&content, self.snippet_chars);
            self.record(SeenKey::Document(path.to_path_buf()), path, snippet, 0, emit);
        }

        Ok(ScanOutcome::Finished)
    }

    fn scan_lines(
        &mut self,
        path: &Path,
        file: File,
        cancel: &CancellationToken,
        emit: &mut dyn FnMut(MatchResult),
    ) -> Result<ScanOutcome> {
        let reader = BufReader::new(file);

        for (index, line) in reader.split(b'\n').enumerate() {
            if cancel.is_cancelled() {
                debug!("Cancelled while scanning {}", path.display());
                return Ok(ScanOutcome::Cancelled);
            }

            let line = line.with_context(|| {
                format!("Failed to read line {} of {}", index + 1, path.display())
            })?;
            let decoded = String::from_utf8_lossy(&line);
            let line = decoded.strip_suffix('\r').unwrap_or(&decoded);

            if self.formula.evaluate(self.phrases, line) {
                let trimmed = line.trim().to_string();
                let key = SeenKey::Line(path.to_path_buf(), trimmed.clone());
                self.record(key, path, trimmed, index + 1, emit);
            }
        }

        Ok(ScanOutcome::Finished)
    }

    fn record(
        &mut self,
        key: SeenKey,
        path: &Path,
        snippet: String,
        position: usize,
        emit: &mut dyn FnMut(MatchResult),
    ) {
        let is_first_occurrence = self.seen.insert(key);
        if self.unique && !is_first_occurrence {
            return;
        }
        emit(MatchResult {
            source: path.to_path_buf(),
            snippet,
            position,
            is_first_occurrence,
        });
    }
}

/// First `max_chars` characters of `content`, with `...` when anything was cut.
pub fn truncate_snippet(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}
