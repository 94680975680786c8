use clap::{Args as ClapArgs, Parser as ClapParser, Subcommand};
use std::path::PathBuf;

use phrase_finder::models::{PhraseId, PhraseSet, SearchMode};
use phrase_finder::search::OutputFormat;

/// Text for the six phrase slots a formula can refer to
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct PhraseArgs {
    /// Search text for phrase A
    #[arg(short = 'a', long = "phrase-a", value_name = "TEXT")]
    pub a: Option<String>,

    /// Search text for phrase B
    #[arg(short = 'b', long = "phrase-b", value_name = "TEXT")]
    pub b: Option<String>,

    /// Search text for phrase C
    #[arg(short = 'c', long = "phrase-c", value_name = "TEXT")]
    pub c: Option<String>,

    /// Search text for phrase D
    #[arg(short = 'd', long = "phrase-d", value_name = "TEXT")]
    pub d: Option<String>,

    /// Search text for phrase E
    #[arg(short = 'e', long = "phrase-e", value_name = "TEXT")]
    pub e: Option<String>,

    /// Search text for phrase F
    #[arg(short = 'f', long = "phrase-f", value_name = "TEXT")]
    pub f: Option<String>,

    /// Phrase letters that match case-sensitively, e.g. "AC"
    #[arg(long = "case-sensitive", value_name = "LETTERS", default_value = "")]
    pub case_sensitive: String,
}

impl PhraseArgs {
    pub fn to_phrase_set(&self) -> PhraseSet {
        let case_sensitive: Vec<PhraseId> = self
            .case_sensitive
            .chars()
            .filter_map(PhraseId::from_char)
            .collect();

        let texts = [&self.a, &self.b, &self.c, &self.d, &self.e, &self.f];
        let mut phrases = PhraseSet::new();
        for (id, text) in PhraseId::ALL.into_iter().zip(texts) {
            if let Some(text) = text {
                phrases.set(id, text.as_str(), case_sensitive.contains(&id));
            }
        }
        phrases
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search files for lines or documents matching a phrase formula
    Search {
        /// Files or directories to search
        #[arg(value_name = "PATHS", default_value = ".")]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        phrases: PhraseArgs,

        /// Formula over phrases A-F; defaults to all set phrases joined by AND
        #[arg(short = 'x', long = "formula")]
        formula: Option<String>,

        /// Evaluate each line or each whole file
        #[arg(short = 'm', long = "mode", value_enum)]
        mode: Option<SearchMode>,

        /// Report each distinct match only once
        #[arg(short = 'u', long = "unique")]
        unique: bool,

        /// File extensions to include (repeatable or comma separated)
        #[arg(long = "ext", value_name = "EXT")]
        extensions: Vec<String>,

        /// Search every file regardless of extension
        #[arg(long = "all-files", conflicts_with = "extensions")]
        all_files: bool,

        /// Honor .gitignore and .ignore files
        #[arg(long = "gitignore")]
        gitignore: bool,

        /// Custom glob patterns to ignore
        #[arg(short = 'i', long = "ignore")]
        ignore: Vec<String>,

        /// Output format
        #[arg(short = 'o', long = "format", value_enum)]
        format: Option<OutputFormat>,

        /// Cancel the search after this many seconds
        #[arg(long = "timeout", value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Check a formula and report errors and warnings
    Validate {
        formula: String,

        #[command(flatten)]
        phrases: PhraseArgs,

        /// Print the result as JSON
        #[arg(long = "json")]
        json: bool,
    },

    /// Print a formula with symbolic operators replaced by keywords
    Normalize { formula: String },

    /// Evaluate a formula against a piece of text
    Eval {
        formula: String,

        /// Text to evaluate against
        #[arg(short = 't', long = "text")]
        text: String,

        #[command(flatten)]
        phrases: PhraseArgs,
    },

    /// Print the resolved configuration as JSON
    Config,
}

#[derive(ClapParser, Debug)]
#[command(author, version, about = "Search files with boolean phrase formulas", long_about = None)]
pub struct Args {
    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_command() {
        let args = Args::try_parse_from([
            "finder",
            "search",
            "notes",
            "-a",
            "cat",
            "-b",
            "Dog",
            "--case-sensitive",
            "b",
            "-x",
            "A & !B",
            "--mode",
            "document",
            "--ext",
            "txt,md",
        ])
        .unwrap();

        match args.command {
            Commands::Search {
                paths,
                phrases,
                formula,
                mode,
                extensions,
                ..
            } => {
                assert_eq!(paths, vec![PathBuf::from("notes")]);
                assert_eq!(formula.as_deref(), Some("A & !B"));
                assert_eq!(mode, Some(SearchMode::Document));
                assert_eq!(extensions, vec!["txt,md"]);

                let set = phrases.to_phrase_set();
                assert_eq!(set.active_ids(), vec![PhraseId::A, PhraseId::B]);
                assert!(!set.get(PhraseId::A).case_sensitive);
                assert!(set.get(PhraseId::B).case_sensitive);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_search_defaults_to_current_dir() {
        let args = Args::try_parse_from(["finder", "search", "-a", "x"]).unwrap();
        match args.command {
            Commands::Search { paths, format, .. } => {
                assert_eq!(paths, vec![PathBuf::from(".")]);
                assert_eq!(format, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_eval_requires_text() {
        assert!(Args::try_parse_from(["finder", "eval", "A"]).is_err());
    }
}
