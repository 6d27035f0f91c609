//! Archive set detection.
//!
//! Reconstructs logical archives from a flat file listing: multi-volume RAR
//! sets (`x.rar`/`x.r00`/`x.r01`, `y.part1.rar`/`y.part2.rar`), split zip
//! volumes and bare numeric suffixes all collapse into one `ArchiveSet` with
//! a single primary volume the extraction tool is pointed at.

mod grouper;
mod types;

pub use grouper::{collect_candidates, group, group_files};
pub use types::{ArchivePart, ArchiveSet};
