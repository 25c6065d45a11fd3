//! scm::porcelain
//!
//! Decoder for the porcelain status format.
//!
//! # Format
//!
//! Each line is `XY <path>`: `X` is the index (staged) code, `Y` the
//! working-tree (unstaged) code. Lines are separated by `\n`; the last
//! line may or may not end with one.
//!
//! # Decoding
//!
//! | code | `Y` only | `X` |
//! |------|----------|-----|
//! | `A`  | Added    | AddedStaged    |
//! | `R`  | Renamed  | RenamedStaged  |
//! | `M`  | Modified | ModifiedStaged |
//! | `D`  | Deleted  | DeletedStaged  |
//!
//! A recognised `X` code wins over `Y`. `??` is Untracked. Anything else,
//! including truncated lines, is Unknown: a batch never fails because of
//! one odd line.
//!
//! A file that is both renamed and modified keeps a single kind (the
//! staged one).

use crate::core::types::{ChangeKind, Status};

/// Decode a whole-repository status listing, preserving line order.
///
/// Blank lines are skipped.
///
/// # Example
///
/// ```
/// use scmkit::core::types::ChangeKind;
/// use scmkit::scm::porcelain::parse_status;
///
/// let statuses = parse_status("?? new.txt\n M lib.rs\nA  added.rs");
/// assert_eq!(statuses.len(), 3);
/// assert_eq!(statuses[0].change(), ChangeKind::Untracked);
/// assert_eq!(statuses[1].change(), ChangeKind::Modified);
/// assert_eq!(statuses[2].change(), ChangeKind::AddedStaged);
/// ```
pub fn parse_status(output: &str) -> Vec<Status> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_line)
        .collect()
}

/// Decode the output of a single-path status query.
///
/// Output shorter than the two code characters means the file is clean.
pub fn parse_file_status(output: &str) -> ChangeKind {
    if output.chars().take(2).count() < 2 {
        return ChangeKind::None;
    }
    output
        .lines()
        .next()
        .map(|line| parse_line(line).change())
        .unwrap_or(ChangeKind::None)
}

/// Decode one `XY <path>` line.
pub fn parse_line(line: &str) -> Status {
    let mut chars = line.chars();
    let x = chars.next();
    let y = chars.next();
    let rest = chars.as_str();
    let path = rest.strip_prefix(' ').unwrap_or(rest);

    Status::new(path, decode(x, y))
}

fn decode(x: Option<char>, y: Option<char>) -> ChangeKind {
    if let Some(kind) = x.and_then(staged_kind) {
        return kind;
    }
    if let Some(kind) = y.and_then(unstaged_kind) {
        return kind;
    }
    match (x, y) {
        (Some('?'), Some('?')) => ChangeKind::Untracked,
        _ => ChangeKind::Unknown,
    }
}

fn staged_kind(code: char) -> Option<ChangeKind> {
    match code {
        'A' => Some(ChangeKind::AddedStaged),
        'R' => Some(ChangeKind::RenamedStaged),
        'M' => Some(ChangeKind::ModifiedStaged),
        'D' => Some(ChangeKind::DeletedStaged),
        _ => None,
    }
}

fn unstaged_kind(code: char) -> Option<ChangeKind> {
    match code {
        'A' => Some(ChangeKind::Added),
        'R' => Some(ChangeKind::Renamed),
        'M' => Some(ChangeKind::Modified),
        'D' => Some(ChangeKind::Deleted),
        _ => None,
    }
}
