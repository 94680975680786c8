use ahash::AHashSet;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::search::search_options::SearchOptions;

/// Lists the files a run will scan, in the order they will be scanned.
///
/// Roots are visited in the order given. A root that is a file is included
/// when its extension matches; a directory is walked recursively with
/// entries sorted by file name so repeated runs see the same order.
/// Overlapping roots contribute each file once, at its first position.
pub fn find_files(options: &SearchOptions) -> Vec<PathBuf> {
    let mut files = FileList::default();

    for root in &options.roots {
        match std::fs::metadata(root) {
            Ok(meta) if meta.is_dir() => {
                collect_from_dir(root, options, &mut files);
            }
            Ok(_) => {
                if has_valid_extension(root, &options.extensions) {
                    files.push(root.clone());
                }
            }
            Err(err) => {
                warn!("Skipping search path {}: {}", root.display(), err);
            }
        }
    }

    debug!(
        "Found {} files to search ({} duplicates skipped)",
        files.paths.len(),
        files.duplicates
    );
    files.paths
}

#[derive(Default)]
struct FileList {
    paths: Vec<PathBuf>,
    seen: AHashSet<PathBuf>,
    duplicates: usize,
}

impl FileList {
    fn push(&mut self, path: PathBuf) {
        let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if self.seen.insert(key) {
            self.paths.push(path);
        } else {
            self.duplicates += 1;
        }
    }
}

fn collect_from_dir(root: &Path, options: &SearchOptions, files: &mut FileList) {
    let mut builder = WalkBuilder::new(root);

    // Plain directory walk by default; VCS ignore rules only on request
    builder
        .hidden(false)
        .parents(options.respect_gitignore)
        .ignore(options.respect_gitignore)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    if !options.custom_ignores.is_empty() {
        let mut override_builder = ignore::overrides::OverrideBuilder::new(root);
        for pattern in &options.custom_ignores {
            if let Err(err) = override_builder.add(&format!("!{pattern}")) {
                warn!("Invalid ignore pattern {:?}: {}", pattern, err);
            }
        }
        match override_builder.build() {
            Ok(overrides) => {
                builder.overrides(overrides);
            }
            Err(err) => {
                warn!("Error building ignore overrides: {}", err);
            }
        }
    }

    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Error walking directory: {}", err);
                continue;
            }
        };

        // Skip directories
        if entry.file_type().is_none_or(|ft| ft.is_dir()) {
            continue;
        }

        let path = entry.path();
        if has_valid_extension(path, &options.extensions) {
            files.push(path.to_path_buf());
        }
    }
}

/// Case-insensitive suffix match on the file name. An empty list accepts
/// every file.
pub fn has_valid_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy().to_lowercase(),
        None => return false,
    };
    extensions
        .iter()
        .any(|ext| name.ends_with(&ext.to_lowercase()))
}
