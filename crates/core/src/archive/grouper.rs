//! Grouping algorithm: candidate enumeration, base-name derivation, primary
//! selection.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::{ArchivePart, ArchiveSet};

/// Extensions treated as standalone archives.
const SUPPORTED_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz", "bz2"];

/// Split-volume naming pattern: `<base>.partNNN`, `<base>.rNN`/`.sNN`,
/// `<base>.zNN` or a bare three-digit suffix.
static PART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?)\.(?:part\d{1,3}|[rs]\d{2}|z\d{2}|\d{3})$")
        .expect("split-volume pattern is valid")
});

/// Groups every archive candidate under `root` into archive sets.
///
/// `root` may be a single file or a directory tree; anything else (including
/// a missing path) yields no sets. An empty result is not an error.
pub fn group(root: &Path) -> io::Result<Vec<ArchiveSet>> {
    let candidates = collect_candidates(root)?;
    Ok(group_files(&candidates))
}

/// Enumerates archive candidates under `root`.
///
/// Directory entries are visited in name order so repeated scans of the same
/// tree enumerate identically.
pub fn collect_candidates(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if root.is_file() {
        if is_candidate(root) {
            found.push(root.to_path_buf());
        }
    } else if root.is_dir() {
        walk(root, &mut found)?;
    }
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|e| e.path())
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            walk(&path, found)?;
        } else if is_candidate(&path) {
            found.push(path);
        }
    }
    Ok(())
}

/// Partitions candidate files into archive sets, preserving first-encounter
/// order of base names and encounter order within each set.
pub fn group_files(files: &[PathBuf]) -> Vec<ArchiveSet> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<ArchivePart>> = HashMap::new();

    for path in files {
        let base = base_name(path);
        if !groups.contains_key(&base) {
            order.push(base.clone());
        }
        groups.entry(base.clone()).or_default().push(ArchivePart {
            path: path.clone(),
            base_name: base,
            primary: false,
        });
    }

    order
        .into_iter()
        .map(|base| {
            let parts = groups.remove(&base).expect("group exists for base");
            let primary_idx = select_primary(&parts);
            ArchiveSet::new(base, parts, primary_idx)
        })
        .collect()
}

/// Picks the set's entry point: the first `.rar` part in encounter order,
/// else the lexicographically smallest path.
///
/// Unpadded volume numbers sort unhelpfully (`part10` before `part2`); the
/// tool copes by following volume headers, so this stays as plain
/// lexicographic order.
fn select_primary(parts: &[ArchivePart]) -> usize {
    if let Some(idx) = parts.iter().position(|p| has_extension(&p.path, "rar")) {
        return idx;
    }
    parts
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.path.cmp(&b.path))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Derives the logical base name of a candidate.
///
/// The split pattern is tried against the stem first (`y.part1.rar` has stem
/// `y.part1`, base `y`). A `.rar` file whose stem did not match gets a
/// second try against its full name so it lands in the same group as its
/// `.r00`/`.r01` siblings. Everything else keys on its stem.
fn base_name(path: &Path) -> String {
    let name = file_name(path);
    let stem = file_stem(path);

    if let Some(base) = split_base(&stem) {
        return base;
    }
    if has_extension(path, "rar") {
        if let Some(base) = split_base(&name) {
            return base;
        }
    }
    stem
}

fn is_candidate(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            return true;
        }
    }
    PART_RE.is_match(&file_name(path))
}

fn split_base(name: &str) -> Option<String> {
    PART_RE
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
