use crate::config::Settings;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Ignored folder list
const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".vscode",
    ".github",
    "target",
    "dist",
    "build",
    "vendor",
];

/// Filter: Returns true if this is a folder to be IGNORED
fn should_skip(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_str().unwrap_or("");
    entry.depth() > 0 && entry.file_type().is_dir() && EXCLUDED_DIRS.contains(&name)
}

/// Basic scan of files in the working directory
/// Returns every HTML or XML document to be linted
#[must_use]
pub fn scan_workspace_files(root: &Path, settings: &Settings) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !should_skip(e))
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file() && settings.mode_for_path(e.path()).is_some())
        .map(walkdir::DirEntry::into_path)
        .collect()
}
