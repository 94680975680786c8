use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::SearchMode;
use crate::search::{normalize_extensions, DEFAULT_SNIPPET_CHARS};

/// Extensions searched when nothing else is configured
pub const DEFAULT_EXTENSIONS: [&str; 2] = [".txt", ".md"];

const VALID_FORMATS: [&str; 3] = ["color", "plain", "json"];
const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Global configuration for finder
/// All fields are optional to support partial configurations and merging
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FinderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Seconds before a run is cancelled; 0 disables the timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet_chars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gitignore: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore: Option<Vec<String>>,
}

/// Configuration with every default filled in
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub defaults: ResolvedDefaultsConfig,
    pub search: ResolvedSearchConfig,
}

#[derive(Debug, Clone)]
pub struct ResolvedDefaultsConfig {
    pub log_level: String,
    pub format: String,
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedSearchConfig {
    pub extensions: Vec<String>,
    pub mode: SearchMode,
    pub unique: bool,
    pub snippet_chars: usize,
    pub gitignore: bool,
    pub ignore: Vec<String>,
}

impl FinderConfig {
    /// Load configuration from multiple levels and merge them
    pub fn load() -> Result<ResolvedConfig> {
        let mut merged = FinderConfig::default();
        for config in Self::load_all_configs()? {
            merged = Self::merge_configs(merged, config);
        }

        merged.apply_env_overrides();
        merged.validate()?;

        Ok(merged.resolve_with_defaults())
    }

    /// Get all configuration file paths in priority order
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Global config: ~/.finder/settings.json
        if let Ok(home) = env::var("HOME") {
            paths.push(PathBuf::from(home).join(".finder").join("settings.json"));
        } else if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".finder").join("settings.json"));
        }

        // 2. Project and local config
        paths.push(PathBuf::from(".finder").join("settings.json"));
        paths.push(PathBuf::from(".finder").join("settings.local.json"));

        // 3. Custom path via environment variable, highest precedence
        if let Ok(custom_path) = env::var("FINDER_CONFIG_PATH") {
            let looks_like_dir = custom_path.ends_with('/') || custom_path.ends_with('\\');
            let path = if looks_like_dir {
                PathBuf::from(&custom_path).join("settings.json")
            } else {
                PathBuf::from(&custom_path)
            };
            paths.push(path);
        }

        paths
    }

    /// Load all configuration files that exist
    fn load_all_configs() -> Result<Vec<FinderConfig>> {
        let mut configs = Vec::new();

        for path in Self::get_config_paths() {
            match fs::metadata(&path) {
                Ok(metadata) if metadata.is_file() => {
                    configs.push(Self::load_from_file(&path)?);
                }
                _ => continue,
            }
        }

        Ok(configs)
    }

    /// Load a single configuration file
    pub fn load_from_file(path: &Path) -> Result<FinderConfig> {
        let bytes = fs::read(path).context(format!("Failed to read config file: {path:?}"))?;

        // Strip UTF-8 BOM if present
        let content_bytes = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            &bytes[3..]
        } else {
            &bytes[..]
        };

        let config: FinderConfig = serde_json::from_slice(content_bytes)
            .context(format!("Failed to parse config file: {path:?}"))?;

        Ok(config)
    }

    /// Deep merge two configurations, with `other` taking precedence
    fn merge_configs(mut base: FinderConfig, other: FinderConfig) -> FinderConfig {
        if let Some(other_defaults) = other.defaults {
            let base_defaults = base.defaults.get_or_insert(DefaultsConfig::default());
            if other_defaults.log_level.is_some() {
                base_defaults.log_level = other_defaults.log_level;
            }
            if other_defaults.format.is_some() {
                base_defaults.format = other_defaults.format;
            }
            if other_defaults.timeout.is_some() {
                base_defaults.timeout = other_defaults.timeout;
            }
        }

        if let Some(other_search) = other.search {
            let base_search = base.search.get_or_insert(SearchConfig::default());
            if other_search.extensions.is_some() {
                base_search.extensions = other_search.extensions;
            }
            if other_search.mode.is_some() {
                base_search.mode = other_search.mode;
            }
            if other_search.unique.is_some() {
                base_search.unique = other_search.unique;
            }
            if other_search.snippet_chars.is_some() {
                base_search.snippet_chars = other_search.snippet_chars;
            }
            if other_search.gitignore.is_some() {
                base_search.gitignore = other_search.gitignore;
            }
            if other_search.ignore.is_some() {
                base_search.ignore = other_search.ignore;
            }
        }

        base
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        let defaults = self.defaults.get_or_insert(DefaultsConfig::default());
        if let Ok(val) = env::var("FINDER_LOG_LEVEL") {
            defaults.log_level = Some(val);
        }
        if let Ok(val) = env::var("FINDER_FORMAT") {
            defaults.format = Some(val);
        }
        if let Ok(val) = env::var("FINDER_TIMEOUT") {
            if let Ok(timeout) = val.parse() {
                defaults.timeout = Some(timeout);
            }
        }

        let search = self.search.get_or_insert(SearchConfig::default());
        if let Ok(val) = env::var("FINDER_EXTENSIONS") {
            search.extensions = Some(vec![val]);
        }
        if let Ok(val) = env::var("FINDER_MODE") {
            search.mode = Some(val);
        }
        if let Ok(val) = env::var("FINDER_UNIQUE") {
            search.unique = Some(parse_flag(&val));
        }
        if let Ok(val) = env::var("FINDER_GITIGNORE") {
            search.gitignore = Some(parse_flag(&val));
        }
    }

    /// Convert to resolved config with all defaults applied
    fn resolve_with_defaults(self) -> ResolvedConfig {
        let defaults = self.defaults.unwrap_or_default();
        let search = self.search.unwrap_or_default();

        let extensions = match search.extensions {
            Some(raw) => normalize_extensions(&raw),
            None => normalize_extensions(&DEFAULT_EXTENSIONS),
        };

        ResolvedConfig {
            defaults: ResolvedDefaultsConfig {
                log_level: defaults
                    .log_level
                    .map(|level| level.to_lowercase())
                    .unwrap_or_else(|| "info".to_string()),
                format: defaults
                    .format
                    .map(|format| format.to_lowercase())
                    .unwrap_or_else(|| "color".to_string()),
                timeout: defaults.timeout.filter(|secs| *secs > 0),
            },
            search: ResolvedSearchConfig {
                extensions,
                mode: search
                    .mode
                    .and_then(|mode| mode.parse().ok())
                    .unwrap_or_default(),
                unique: search.unique.unwrap_or(false),
                snippet_chars: search.snippet_chars.unwrap_or(DEFAULT_SNIPPET_CHARS),
                gitignore: search.gitignore.unwrap_or(false),
                ignore: search.ignore.unwrap_or_default(),
            },
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if let Some(ref defaults) = self.defaults {
            if let Some(ref format) = defaults.format {
                if !VALID_FORMATS.contains(&format.to_lowercase().as_str()) {
                    anyhow::bail!("Invalid format: {}", format);
                }
            }

            if let Some(ref log_level) = defaults.log_level {
                if !VALID_LOG_LEVELS.contains(&log_level.to_lowercase().as_str()) {
                    anyhow::bail!("Invalid log level: {}", log_level);
                }
            }
        }

        if let Some(ref search) = self.search {
            if let Some(ref mode) = search.mode {
                if mode.parse::<SearchMode>().is_err() {
                    anyhow::bail!("Invalid search mode: {}", mode);
                }
            }
            if search.snippet_chars == Some(0) {
                anyhow::bail!("snippet_chars must be greater than zero");
            }
        }

        Ok(())
    }
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        FinderConfig::default().resolve_with_defaults()
    }
}

impl ResolvedConfig {
    /// Convert back to FinderConfig for serialization
    pub fn to_finder_config(&self) -> FinderConfig {
        FinderConfig {
            defaults: Some(DefaultsConfig {
                log_level: Some(self.defaults.log_level.clone()),
                format: Some(self.defaults.format.clone()),
                timeout: Some(self.defaults.timeout.unwrap_or(0)),
            }),
            search: Some(SearchConfig {
                extensions: Some(self.search.extensions.clone()),
                mode: Some(self.search.mode.to_string()),
                unique: Some(self.search.unique),
                snippet_chars: Some(self.search.snippet_chars),
                gitignore: Some(self.search.gitignore),
                ignore: Some(self.search.ignore.clone()),
            }),
        }
    }

    /// Get a pretty-printed JSON representation
    pub fn to_json_string(&self) -> Result<String> {
        let config = self.to_finder_config();
        serde_json::to_string_pretty(&config).context("Failed to serialize configuration to JSON")
    }
}

/// Get the global configuration instance
/// This loads the configuration once and caches it for the lifetime of the program
pub fn get_config() -> &'static ResolvedConfig {
    use std::sync::OnceLock;
    static CONFIG: OnceLock<ResolvedConfig> = OnceLock::new();

    CONFIG.get_or_init(|| {
        FinderConfig::load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load configuration: {e:#}");
            ResolvedConfig::default()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_VARS: [&str; 7] = [
        "FINDER_LOG_LEVEL",
        "FINDER_FORMAT",
        "FINDER_TIMEOUT",
        "FINDER_EXTENSIONS",
        "FINDER_MODE",
        "FINDER_UNIQUE",
        "FINDER_GITIGNORE",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = FinderConfig::default();
        assert!(config.defaults.is_none());
        assert!(config.search.is_none());
    }

    #[test]
    fn test_resolved_config_defaults() {
        let resolved = FinderConfig::default().resolve_with_defaults();

        assert_eq!(resolved.defaults.log_level, "info");
        assert_eq!(resolved.defaults.format, "color");
        assert_eq!(resolved.defaults.timeout, None);
        assert_eq!(resolved.search.extensions, vec![".txt", ".md"]);
        assert_eq!(resolved.search.mode, SearchMode::Line);
        assert!(!resolved.search.unique);
        assert_eq!(resolved.search.snippet_chars, 200);
        assert!(!resolved.search.gitignore);
        assert!(resolved.search.ignore.is_empty());
    }

    #[test]
    fn test_config_merging() {
        let base = FinderConfig {
            defaults: Some(DefaultsConfig {
                log_level: Some("warn".to_string()),
                format: Some("plain".to_string()),
                ..Default::default()
            }),
            search: Some(SearchConfig {
                extensions: Some(vec!["txt".to_string()]),
                unique: Some(true),
                ..Default::default()
            }),
        };
        let local = FinderConfig {
            defaults: Some(DefaultsConfig {
                format: Some("json".to_string()),
                ..Default::default()
            }),
            search: Some(SearchConfig {
                mode: Some("document".to_string()),
                ..Default::default()
            }),
        };

        let resolved = FinderConfig::merge_configs(base, local).resolve_with_defaults();
        assert_eq!(resolved.defaults.log_level, "warn");
        assert_eq!(resolved.defaults.format, "json");
        assert_eq!(resolved.search.extensions, vec![".txt"]);
        assert_eq!(resolved.search.mode, SearchMode::Document);
        assert!(resolved.search.unique);
    }

    #[test]
    fn test_load_from_file_with_bom() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("settings.json");
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(
            br#"{ "defaults": { "timeout": 5 }, "search": { "extensions": ["log, csv"] } }"#,
        );
        fs::write(&config_file, bytes).unwrap();

        let resolved = FinderConfig::load_from_file(&config_file)
            .unwrap()
            .resolve_with_defaults();
        assert_eq!(resolved.defaults.timeout, Some(5));
        assert_eq!(resolved.search.extensions, vec![".log", ".csv"]);
    }

    #[test]
    fn test_load_from_file_reports_bad_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("settings.json");
        fs::write(&config_file, "{ not json").unwrap();

        let err = FinderConfig::load_from_file(&config_file).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = FinderConfig {
            defaults: Some(DefaultsConfig {
                timeout: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(config.resolve_with_defaults().defaults.timeout, None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = FinderConfig {
            defaults: Some(DefaultsConfig {
                format: Some("JSON".to_string()),
                log_level: Some("info".to_string()),
                ..Default::default()
            }),
            search: Some(SearchConfig {
                mode: Some("line".to_string()),
                ..Default::default()
            }),
        };
        assert!(config.validate().is_ok());

        config.defaults.as_mut().unwrap().format = Some("xml".to_string());
        assert!(config.validate().is_err());

        config.defaults.as_mut().unwrap().format = Some("json".to_string());
        config.defaults.as_mut().unwrap().log_level = Some("loud".to_string());
        assert!(config.validate().is_err());

        config.defaults.as_mut().unwrap().log_level = Some("debug".to_string());
        config.search.as_mut().unwrap().mode = Some("paragraph".to_string());
        assert!(config.validate().is_err());

        config.search.as_mut().unwrap().mode = None;
        config.search.as_mut().unwrap().snippet_chars = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_environment_variable_override() {
        clear_env();
        env::set_var("FINDER_FORMAT", "plain");
        env::set_var("FINDER_TIMEOUT", "12");
        env::set_var("FINDER_EXTENSIONS", "log,.TXT");
        env::set_var("FINDER_MODE", "doc");
        env::set_var("FINDER_UNIQUE", "true");
        env::set_var("FINDER_GITIGNORE", "1");

        let mut config = FinderConfig::default();
        config.apply_env_overrides();
        clear_env();

        assert!(config.validate().is_ok());
        let resolved = config.resolve_with_defaults();
        assert_eq!(resolved.defaults.format, "plain");
        assert_eq!(resolved.defaults.timeout, Some(12));
        assert_eq!(resolved.search.extensions, vec![".log", ".txt"]);
        assert_eq!(resolved.search.mode, SearchMode::Document);
        assert!(resolved.search.unique);
        assert!(resolved.search.gitignore);
    }

    #[test]
    #[serial]
    fn test_environment_overrides_create_sections() {
        clear_env();
        let mut config = FinderConfig::default();
        config.apply_env_overrides();

        assert!(config.defaults.is_some());
        assert!(config.search.is_some());
        assert!(config.defaults.unwrap().format.is_none());
    }

    #[test]
    fn test_to_json_string() {
        let json = FinderConfig::default()
            .resolve_with_defaults()
            .to_json_string()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["defaults"]["format"], "color");
        assert_eq!(value["search"]["mode"], "line");
        assert_eq!(value["search"]["extensions"][1], ".md");
    }
}
