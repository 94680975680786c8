use memchr::memmem;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// One of the six phrase slots a formula can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhraseId {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl PhraseId {
    pub const ALL: [PhraseId; 6] = [
        PhraseId::A,
        PhraseId::B,
        PhraseId::C,
        PhraseId::D,
        PhraseId::E,
        PhraseId::F,
    ];

    /// Maps `a`..`f` / `A`..`F` to a slot. Anything else is `None`.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(PhraseId::A),
            'B' => Some(PhraseId::B),
            'C' => Some(PhraseId::C),
            'D' => Some(PhraseId::D),
            'E' => Some(PhraseId::E),
            'F' => Some(PhraseId::F),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            PhraseId::A => 'A',
            PhraseId::B => 'B',
            PhraseId::C => 'C',
            PhraseId::D => 'D',
            PhraseId::E => 'E',
            PhraseId::F => 'F',
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PhraseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

// Structure to hold a single phrase definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Phrase {
    pub text: String,
    pub case_sensitive: bool,
    // Lowercased once at construction for case-insensitive matching
    lowercase_text: String,
}

impl Phrase {
    /// Surrounding whitespace is trimmed; whitespace-only text leaves the phrase unset.
    pub fn new(text: impl Into<String>, case_sensitive: bool) -> Self {
        let text = text.into().trim().to_string();
        Phrase {
            lowercase_text: text.to_lowercase(),
            text,
            case_sensitive,
        }
    }

    pub fn is_set(&self) -> bool {
        !self.text.is_empty()
    }

    /// Substring presence against `content`; `folded` must be `content` lowercased.
    fn is_present(&self, content: &str, folded: Option<&str>) -> bool {
        if !self.is_set() {
            return false;
        }
        if self.case_sensitive {
            memmem::find(content.as_bytes(), self.text.as_bytes()).is_some()
        } else {
            let haystack = folded.unwrap_or(content);
            memmem::find(haystack.as_bytes(), self.lowercase_text.as_bytes()).is_some()
        }
    }
}

/// The six phrase slots supplied to validation and evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhraseSet {
    phrases: [Phrase; 6],
}

impl PhraseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper, mostly for tests and the CLI.
    pub fn with(mut self, id: PhraseId, text: impl Into<String>, case_sensitive: bool) -> Self {
        self.set(id, text, case_sensitive);
        self
    }

    pub fn set(&mut self, id: PhraseId, text: impl Into<String>, case_sensitive: bool) {
        self.phrases[id.index()] = Phrase::new(text, case_sensitive);
    }

    pub fn get(&self, id: PhraseId) -> &Phrase {
        &self.phrases[id.index()]
    }

    /// Slots with non-empty text, in `A`..`F` order.
    pub fn active_ids(&self) -> Vec<PhraseId> {
        PhraseId::ALL
            .into_iter()
            .filter(|id| self.get(*id).is_set())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.iter().all(|p| !p.is_set())
    }

    /// Computes the presence flag of every slot for one content unit.
    pub fn presence(&self, content: &str) -> Presence {
        let needs_folding = self
            .phrases
            .iter()
            .any(|p| p.is_set() && !p.case_sensitive);
        let folded = needs_folding.then(|| content.to_lowercase());

        let mut flags = [false; 6];
        for id in PhraseId::ALL {
            flags[id.index()] = self.get(id).is_present(content, folded.as_deref());
        }
        Presence(flags)
    }
}

/// Presence flags for one content unit, indexed by [`PhraseId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Presence(pub [bool; 6]);

impl Presence {
    pub fn get(&self, id: PhraseId) -> bool {
        self.0[id.index()]
    }
}

/// Granularity at which a formula is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Line,
    Document,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "line" => Ok(SearchMode::Line),
            "document" | "doc" => Ok(SearchMode::Document),
            other => Err(format!("Invalid search mode: {other}")),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Line => write!(f, "line"),
            SearchMode::Document => write!(f, "document"),
        }
    }
}

// Structure to hold one location where the formula evaluated true
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub source: PathBuf,
    pub snippet: String,
    // 1-based line number, or 0 for whole-document matches
    pub position: usize,
    pub is_first_occurrence: bool,
}
