//! Segment file naming and directory listing.
//!
//! A segment's name is its creation timestamp formatted so lexicographic
//! sort equals chronological order: `YYYYMMDD_HHMMSS.sssss` (UTC,
//! sub-second precision). When two segments would be created within the
//! same formatted tick, a `_N` suffix disambiguates them.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::Result;

/// Format `now` as a segment name, then probe `dir` for a free name,
/// appending a zero-padded `_001`, `_002`, ... if the canonical name is
/// already taken. The padding keeps lexicographic order monotonic past
/// nine collisions in the same formatted tick.
pub fn next_segment_name(dir: &Path, now: DateTime<Utc>) -> Result<String> {
    let subsec_ticks = now.timestamp_subsec_nanos() / 10_000;
    let base = format!("{}{subsec_ticks:05}", now.format("%Y%m%d_%H%M%S."));

    let mut candidate = base.clone();
    let mut suffix = 0u32;
    while dir.join(&candidate).exists() {
        suffix += 1;
        candidate = format!("{base}_{suffix:03}");
    }
    Ok(candidate)
}

/// List segment file names under `dir` in lexicographic (== chronological)
/// order. Creates `dir` if it doesn't exist yet.
pub fn list_segments(dir: &Path) -> Result<Vec<String>> {
    std::fs::create_dir_all(dir)?;

    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}

/// The lexicographically greatest segment name in `dir`, if any.
pub fn latest_segment(dir: &Path) -> Result<Option<String>> {
    Ok(list_segments(dir)?.into_iter().last())
}

pub fn segment_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn name_sorts_chronologically() {
        let dir = TempDir::new().unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();

        let n1 = next_segment_name(dir.path(), t1).unwrap();
        std::fs::write(dir.path().join(&n1), b"").unwrap();
        let n2 = next_segment_name(dir.path(), t2).unwrap();

        assert!(n1 < n2);
    }

    #[test]
    fn collision_gets_a_suffix() {
        let dir = TempDir::new().unwrap();
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let n1 = next_segment_name(dir.path(), t).unwrap();
        std::fs::write(dir.path().join(&n1), b"").unwrap();

        let n2 = next_segment_name(dir.path(), t).unwrap();
        assert_ne!(n1, n2);
        assert!(n2.starts_with(&n1));
    }

    #[test]
    fn latest_segment_picks_lex_max() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("20240101_000000.00000"), b"").unwrap();
        std::fs::write(dir.path().join("20240102_000000.00000"), b"").unwrap();
        assert_eq!(
            latest_segment(dir.path()).unwrap(),
            Some("20240102_000000.00000".to_string())
        );
    }
}
