//! Artifact discovery after a build.
//!
//! Each exporter walks an output directory, keeps the entries (files and
//! bundle directories) whose file name fully matches one of an ordered list
//! of patterns, and returns the most recently modified entry of the first
//! pattern that matched anything. Pattern order always wins over recency: a
//! signed APK from an earlier build beats a fresher unsigned one.
//!
//! The search first runs over entries modified within the [`BuildWindow`];
//! if that finds nothing it runs again over every entry. No match is not an
//! error, the exporters return `Ok(None)`.

use std::env;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use regex::{Regex, RegexBuilder};
use tracing::debug;
use walkdir::WalkDir;

use crate::types::{BuildWindow, BuilderError, OutputType};

/// Location of Xcode archives below the user's home directory.
pub const XCODE_ARCHIVES_DIR: &str = "Library/Developer/Xcode/Archives";

#[derive(Debug)]
struct Entry {
    path: PathBuf,
    modified: SystemTime,
}

fn entries(dir: &Path) -> Vec<Entry> {
    if !dir.is_dir() {
        debug!("output directory {} does not exist", dir.display());
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some(Entry {
                path: entry.into_path(),
                modified,
            })
        })
        .collect()
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>, BuilderError> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(&format!("^(?:{})$", pattern))
                .case_insensitive(true)
                .build()
                .map_err(BuilderError::from)
        })
        .collect()
}

fn last_modified_by_patterns<'a>(
    entries: impl Iterator<Item = &'a Entry> + Clone,
    patterns: &[Regex],
) -> Option<PathBuf> {
    for pattern in patterns {
        let newest = entries
            .clone()
            .filter(|entry| {
                entry
                    .path
                    .file_name()
                    .is_some_and(|name| pattern.is_match(&name.to_string_lossy()))
            })
            .max_by_key(|entry| entry.modified);
        if let Some(entry) = newest {
            return Some(entry.path.clone());
        }
    }
    None
}

/// Runs the windowed search over `dir`, falling back to all entries.
fn export_with_patterns(
    dir: &Path,
    patterns: &[String],
    window: BuildWindow,
) -> Result<Option<PathBuf>, BuilderError> {
    let patterns = compile(patterns)?;
    let entries = entries(dir);

    let in_window = entries.iter().filter(|entry| window.contains(entry.modified));
    if let Some(path) = last_modified_by_patterns(in_window, &patterns) {
        return Ok(Some(path));
    }

    let found = last_modified_by_patterns(entries.iter(), &patterns);
    if let Some(path) = &found {
        debug!(
            "no artifact modified during the build, using {}",
            path.display()
        );
    }
    Ok(found)
}

/// Patterns `.*NAME.*\.EXT` then `.*\.EXT`.
fn name_then_extension(name: &str, extension: &str) -> Vec<String> {
    let extension = regex::escape(extension);
    let mut patterns = Vec::with_capacity(2);
    if !name.is_empty() {
        patterns.push(format!(".*{}.*\\.{}", regex::escape(name), extension));
    }
    patterns.push(format!(".*\\.{}", extension));
    patterns
}

fn export_kind(
    dir: &Path,
    name: &str,
    kind: OutputType,
    window: BuildWindow,
) -> Result<Option<PathBuf>, BuilderError> {
    export_with_patterns(dir, &name_then_extension(name, kind.extension()), window)
}

/// Finds the APK, preferring signed packages named after `name`.
pub fn export_apk(
    dir: &Path,
    name: &str,
    window: BuildWindow,
) -> Result<Option<PathBuf>, BuilderError> {
    let name = regex::escape(name);
    let patterns = [
        format!(".*{}.*signed.*\\.apk", name),
        format!(".*{}.*\\.apk", name),
        ".*signed.*\\.apk".to_string(),
        ".*\\.apk".to_string(),
    ];
    export_with_patterns(dir, &patterns, window)
}

pub fn export_ipa(
    dir: &Path,
    name: &str,
    window: BuildWindow,
) -> Result<Option<PathBuf>, BuilderError> {
    export_kind(dir, name, OutputType::Ipa, window)
}

pub fn export_xcarchive(
    dir: &Path,
    name: &str,
    window: BuildWindow,
) -> Result<Option<PathBuf>, BuilderError> {
    export_kind(dir, name, OutputType::XcArchive, window)
}

pub fn export_app_dsym(
    dir: &Path,
    name: &str,
    window: BuildWindow,
) -> Result<Option<PathBuf>, BuilderError> {
    export_kind(dir, name, OutputType::AppDsym, window)
}

pub fn export_pkg(
    dir: &Path,
    name: &str,
    window: BuildWindow,
) -> Result<Option<PathBuf>, BuilderError> {
    export_kind(dir, name, OutputType::Pkg, window)
}

pub fn export_app(
    dir: &Path,
    name: &str,
    window: BuildWindow,
) -> Result<Option<PathBuf>, BuilderError> {
    export_kind(dir, name, OutputType::App, window)
}

/// Finds every `*.framework.dSYM` bundle directly inside `dir`.
///
/// Unlike the single-artifact exporters this keeps all matches. Bundles
/// modified within the window are preferred; if there are none, every
/// bundle is returned.
pub fn export_framework_dsyms(
    dir: &Path,
    window: BuildWindow,
) -> Result<Vec<PathBuf>, BuilderError> {
    let patterns = compile(&name_then_extension("", OutputType::FrameworkDsym.extension()))?;
    let entries = entries(dir);
    let dsyms: Vec<&Entry> = entries
        .iter()
        .filter(|entry| entry.path.parent() == Some(dir))
        .filter(|entry| {
            entry
                .path
                .file_name()
                .is_some_and(|name| patterns.iter().any(|p| p.is_match(&name.to_string_lossy())))
        })
        .collect();

    let in_window: Vec<PathBuf> = dsyms
        .iter()
        .filter(|entry| window.contains(entry.modified))
        .map(|entry| entry.path.clone())
        .collect();
    if !in_window.is_empty() {
        return Ok(in_window);
    }
    Ok(dsyms.into_iter().map(|entry| entry.path.clone()).collect())
}

/// Finds the newest matching archive in `$HOME/Library/Developer/Xcode/Archives`.
///
/// # Errors
///
/// * [`BuilderError::MissingEnv`] if `HOME` is unset or empty
/// * [`BuilderError::InvalidPath`] if the archives directory does not exist
pub fn export_latest_xcarchive_from_xcode_archives(
    name: &str,
    window: BuildWindow,
) -> Result<Option<PathBuf>, BuilderError> {
    let home = env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .ok_or(BuilderError::MissingEnv("HOME"))?;
    xcarchive_from_archives_of(Path::new(&home), name, window)
}

fn xcarchive_from_archives_of(
    home: &Path,
    name: &str,
    window: BuildWindow,
) -> Result<Option<PathBuf>, BuilderError> {
    let archives_dir = home.join(XCODE_ARCHIVES_DIR);
    if !archives_dir.is_dir() {
        return Err(BuilderError::invalid_path(
            archives_dir,
            "Xcode archives directory does not exist",
        ));
    }
    export_xcarchive(&archives_dir, name, window)
}
