use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use colored::*;
use std::io::Write;
use std::path::PathBuf;
use tracing::Level;

mod cli;

use cli::{Args, Commands, PhraseArgs};
use phrase_finder::config::{get_config, ResolvedConfig};
use phrase_finder::formula::{self, ValidationResult};
use phrase_finder::models::SearchMode;
use phrase_finder::search::{
    normalize_extensions, spawn_search, write_event, OutputFormat, RunStatus, SearchOptions,
};

struct SearchParams {
    paths: Vec<PathBuf>,
    phrases: PhraseArgs,
    formula: Option<String>,
    mode: Option<SearchMode>,
    unique: bool,
    extensions: Vec<String>,
    all_files: bool,
    gitignore: bool,
    ignore: Vec<String>,
    format: Option<OutputFormat>,
    timeout: Option<u64>,
}

fn build_search_options(params: SearchParams, config: &ResolvedConfig) -> SearchOptions {
    let mut options = SearchOptions::new(params.paths, params.phrases.to_phrase_set());
    options.formula = params.formula.unwrap_or_default();
    options.mode = params.mode.unwrap_or(config.search.mode);
    options.unique = params.unique || config.search.unique;
    options.extensions = if params.all_files {
        Vec::new()
    } else if params.extensions.is_empty() {
        config.search.extensions.clone()
    } else {
        normalize_extensions(&params.extensions)
    };
    options.custom_ignores = config
        .search
        .ignore
        .iter()
        .chain(params.ignore.iter())
        .cloned()
        .collect();
    options.respect_gitignore = params.gitignore || config.search.gitignore;
    options.snippet_chars = config.search.snippet_chars;
    options.timeout_secs = params
        .timeout
        .or(config.defaults.timeout)
        .filter(|secs| *secs > 0);
    options
}

fn handle_search(params: SearchParams, config: &ResolvedConfig) -> Result<RunStatus> {
    let format = params
        .format
        .unwrap_or_else(|| config.defaults.format.parse().unwrap_or_default());
    let options = build_search_options(params, config);

    let handle = spawn_search(options)?;

    let token = handle.cancellation_token();
    ctrlc::set_handler(move || token.cancel()).context("Failed to install Ctrl-C handler")?;

    let base = std::env::current_dir().ok();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for event in handle.events().iter() {
        if let Err(err) = write_event(&mut out, &event, format, base.as_deref()) {
            handle.cancel();
            return Err(err);
        }
    }
    out.flush()?;

    let summary = handle.join()?;
    Ok(summary.status)
}

fn print_validation(result: &ValidationResult) {
    if result.is_valid {
        println!("{}", "Formula is valid".green().bold());
    } else {
        println!("{}", "Formula is invalid".red().bold());
    }
    for error in &result.errors {
        println!("  {} {}", "error:".red(), error);
    }
    for warning in &result.warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
}

fn handle_validate(formula: &str, phrases: &PhraseArgs, json: bool) -> Result<bool> {
    let result = formula::validate(formula, &phrases.to_phrase_set());
    if json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation(&result);
    }
    Ok(result.is_valid)
}

fn handle_eval(formula: &str, text: &str, phrases: &PhraseArgs) -> Result<()> {
    let matched = formula::evaluate(formula, &phrases.to_phrase_set(), text)
        .with_context(|| format!("Failed to evaluate formula: {formula}"))?;
    println!("{matched}");
    Ok(())
}

fn init_logging(verbose: bool, configured_level: &str) {
    let log_level = if verbose {
        Level::DEBUG
    } else {
        configured_level.parse().unwrap_or(Level::INFO)
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = get_config();
    init_logging(args.verbose, &config.defaults.log_level);

    match args.command {
        Commands::Search {
            paths,
            phrases,
            formula,
            mode,
            unique,
            extensions,
            all_files,
            gitignore,
            ignore,
            format,
            timeout,
        } => {
            let status = handle_search(
                SearchParams {
                    paths,
                    phrases,
                    formula,
                    mode,
                    unique,
                    extensions,
                    all_files,
                    gitignore,
                    ignore,
                    format,
                    timeout,
                },
                config,
            )?;
            if status == RunStatus::Cancelled {
                std::process::exit(130);
            }
        }
        Commands::Validate {
            formula,
            phrases,
            json,
        } => {
            if !handle_validate(&formula, &phrases, json)? {
                std::process::exit(1);
            }
        }
        Commands::Normalize { formula } => {
            println!("{}", formula::normalize(&formula));
        }
        Commands::Eval {
            formula,
            text,
            phrases,
        } => handle_eval(&formula, &text, &phrases)?,
        Commands::Config => {
            println!("{}", config.to_json_string()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(paths: Vec<PathBuf>) -> SearchParams {
        SearchParams {
            paths,
            phrases: PhraseArgs {
                a: Some("cat".to_string()),
                ..Default::default()
            },
            formula: None,
            mode: None,
            unique: false,
            extensions: Vec::new(),
            all_files: false,
            gitignore: false,
            ignore: vec!["target/**".to_string()],
            format: None,
            timeout: None,
        }
    }

    #[test]
    fn test_options_fall_back_to_config() {
        let config = ResolvedConfig::default();
        let options = build_search_options(params(vec![PathBuf::from(".")]), &config);

        assert_eq!(options.extensions, vec![".txt", ".md"]);
        assert_eq!(options.mode, SearchMode::Line);
        assert_eq!(options.custom_ignores, vec!["target/**"]);
        assert_eq!(options.timeout_secs, None);
        assert_eq!(options.effective_formula(), "A");
    }

    #[test]
    fn test_cli_flags_override_config() {
        let config = ResolvedConfig::default();
        let mut p = params(vec![PathBuf::from(".")]);
        p.extensions = vec!["LOG".to_string()];
        p.mode = Some(SearchMode::Document);
        p.timeout = Some(3);
        let options = build_search_options(p, &config);

        assert_eq!(options.extensions, vec![".log"]);
        assert_eq!(options.mode, SearchMode::Document);
        assert_eq!(options.timeout_secs, Some(3));

        let mut p = params(vec![PathBuf::from(".")]);
        p.all_files = true;
        assert!(build_search_options(p, &config).extensions.is_empty());
    }
}
