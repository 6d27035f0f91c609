//! Types for archive set grouping.

use std::path::{Path, PathBuf};

/// A single file belonging to an archive set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePart {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Logical archive identity shared by every part of the set.
    pub base_name: String,
    /// Whether this part is the set's designated entry point.
    pub primary: bool,
}

/// A group of sibling files forming one logical archive.
///
/// Constructed fresh for every extraction scan and discarded afterwards;
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSet {
    /// Base name shared by all parts.
    pub base_name: String,
    /// Parts in encounter order.
    pub parts: Vec<ArchivePart>,
    primary_idx: usize,
}

impl ArchiveSet {
    /// Builds a set from parts in encounter order, marking `primary_idx` as
    /// the entry point.
    pub(crate) fn new(base_name: String, mut parts: Vec<ArchivePart>, primary_idx: usize) -> Self {
        debug_assert!(primary_idx < parts.len());
        for (i, part) in parts.iter_mut().enumerate() {
            part.primary = i == primary_idx;
        }
        Self {
            base_name,
            parts,
            primary_idx,
        }
    }

    /// The part the extraction tool is invoked against.
    pub fn primary(&self) -> &ArchivePart {
        &self.parts[self.primary_idx]
    }

    /// Number of parts in the set.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True if the set has no parts (never produced by the grouper).
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Paths of all parts, in encounter order.
    pub fn part_paths(&self) -> impl Iterator<Item = &Path> {
        self.parts.iter().map(|p| p.path.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_flag_follows_index() {
        let parts = vec![
            ArchivePart {
                path: PathBuf::from("/d/x.r00"),
                base_name: "x".into(),
                primary: false,
            },
            ArchivePart {
                path: PathBuf::from("/d/x.rar"),
                base_name: "x".into(),
                primary: false,
            },
        ];
        let set = ArchiveSet::new("x".into(), parts, 1);
        assert!(!set.parts[0].primary);
        assert!(set.parts[1].primary);
        assert_eq!(set.primary().path, PathBuf::from("/d/x.rar"));
    }
}
