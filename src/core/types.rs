//! core::types
//!
//! Strong types for source-control status.
//!
//! # Types
//!
//! - [`ChangeKind`] - Closed set of per-file change classifications
//! - [`Status`] - One file's change, as reported by the engine
//!
//! # Invariants
//!
//! A [`Status`] is staged exactly when its [`ChangeKind`] is one of the
//! `*Staged` variants. The flag is derived at construction time and the
//! fields are private, so the two can never disagree.
//!
//! # Examples
//!
//! ```
//! use scmkit::core::types::{ChangeKind, Status};
//!
//! let status = Status::new("src/main.rs", ChangeKind::ModifiedStaged);
//! assert!(status.staged());
//! assert_eq!(status.path(), "src/main.rs");
//!
//! let status = Status::new("notes.txt", ChangeKind::Untracked);
//! assert!(!status.staged());
//! ```

use serde::{Deserialize, Serialize};

/// How a file differs from the last commit.
///
/// `None` is only produced by single-path queries on a clean file; batch
/// queries never report clean files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// No change (clean file).
    None,
    /// Added in the working tree (e.g. intent-to-add).
    Added,
    /// Added and recorded in the index.
    AddedStaged,
    /// Renamed in the working tree.
    Renamed,
    /// Renamed and recorded in the index.
    RenamedStaged,
    /// Modified in the working tree.
    Modified,
    /// Modified and recorded in the index.
    ModifiedStaged,
    /// Deleted from the working tree.
    Deleted,
    /// Deletion recorded in the index.
    DeletedStaged,
    /// Not tracked by the repository.
    Untracked,
    /// Status code not understood.
    Unknown,
}

impl ChangeKind {
    /// Every variant, in declaration order.
    pub const ALL: [ChangeKind; 11] = [
        ChangeKind::None,
        ChangeKind::Added,
        ChangeKind::AddedStaged,
        ChangeKind::Renamed,
        ChangeKind::RenamedStaged,
        ChangeKind::Modified,
        ChangeKind::ModifiedStaged,
        ChangeKind::Deleted,
        ChangeKind::DeletedStaged,
        ChangeKind::Untracked,
        ChangeKind::Unknown,
    ];

    /// Whether this kind describes a change already recorded in the index.
    pub fn is_staged(self) -> bool {
        matches!(
            self,
            ChangeKind::AddedStaged
                | ChangeKind::RenamedStaged
                | ChangeKind::ModifiedStaged
                | ChangeKind::DeletedStaged
        )
    }

    /// Stable lowercase name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::None => "none",
            ChangeKind::Added => "added",
            ChangeKind::AddedStaged => "added_staged",
            ChangeKind::Renamed => "renamed",
            ChangeKind::RenamedStaged => "renamed_staged",
            ChangeKind::Modified => "modified",
            ChangeKind::ModifiedStaged => "modified_staged",
            ChangeKind::Deleted => "deleted",
            ChangeKind::DeletedStaged => "deleted_staged",
            ChangeKind::Untracked => "untracked",
            ChangeKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The status of one file, relative to the project root.
///
/// Records are immutable. A refresh produces a fresh batch that replaces
/// the previous one as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Status {
    path: String,
    change: ChangeKind,
    staged: bool,
}

impl Status {
    /// Create a status record; `staged` is derived from `change`.
    pub fn new(path: impl Into<String>, change: ChangeKind) -> Self {
        Self {
            path: path.into(),
            change,
            staged: change.is_staged(),
        }
    }

    /// Project-relative path as reported by the tool.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The change classification.
    pub fn change(&self) -> ChangeKind {
        self.change
    }

    /// Whether the change is recorded in the index.
    pub fn staged(&self) -> bool {
        self.staged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod change_kind {
        use super::*;

        #[test]
        fn staged_variants() {
            let staged: Vec<_> = ChangeKind::ALL
                .iter()
                .copied()
                .filter(|k| k.is_staged())
                .collect();
            assert_eq!(
                staged,
                vec![
                    ChangeKind::AddedStaged,
                    ChangeKind::RenamedStaged,
                    ChangeKind::ModifiedStaged,
                    ChangeKind::DeletedStaged,
                ]
            );
        }

        #[test]
        fn display_matches_serde() {
            for kind in ChangeKind::ALL {
                let json = serde_json::to_string(&kind).unwrap();
                assert_eq!(json, format!("\"{}\"", kind));
            }
        }
    }

    mod status {
        use super::*;

        #[test]
        fn staged_flag_follows_change() {
            for kind in ChangeKind::ALL {
                let status = Status::new("file.txt", kind);
                assert_eq!(status.staged(), kind.is_staged(), "{kind}");
                assert_eq!(status.change(), kind);
            }
        }

        #[test]
        fn keeps_path_verbatim() {
            let status = Status::new("dir/with space.txt", ChangeKind::Modified);
            assert_eq!(status.path(), "dir/with space.txt");
        }

        #[test]
        fn serializes_for_ui() {
            let status = Status::new("a.rs", ChangeKind::AddedStaged);
            let json = serde_json::to_value(&status).unwrap();
            assert_eq!(json["path"], "a.rs");
            assert_eq!(json["change"], "added_staged");
            assert_eq!(json["staged"], true);
        }
    }
}
