// SPDX-License-Identifier: MIT

//! Bounded line-range reads over a task's log file (spec §4.3). Strategy is
//! chosen by file size, grounded on `internal/log_reader/log_reader.go` in
//! `original_source/`: a missing file reads as empty, `from=to=0` means
//! "last 100 lines", files at or under 1 MiB get a single buffered scan,
//! and larger files get an indexed seek so a narrow slice never requires
//! materializing the whole file.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::log_writer::log_file_path;

/// Size above which a range read uses the indexed seek strategy instead of
/// a full buffered scan.
const LARGE_FILE_THRESHOLD: u64 = 1024 * 1024;

/// Last-N-lines window used when both `from` and `to` are zero.
const TAIL_WINDOW: usize = 100;

/// Reads bounded line ranges from task log files on disk. Stateless — each
/// call re-derives whatever index it needs from the file as it stands.
#[derive(Clone)]
pub struct LogReader {
    dir: std::path::PathBuf,
}

impl LogReader {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Read the 1-based inclusive range `[from, to]`, or the last 100 lines
    /// if both are zero. `from`/`to` are clamped to `[1, total_lines]`; if
    /// `from > to` after clamping, returns `(vec![], total_lines)`.
    pub fn read(&self, task_id: i64, from: u64, to: u64) -> std::io::Result<(Vec<String>, u64)> {
        let path = log_file_path(&self.dir, task_id);
        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
            Err(e) => return Err(e),
        };

        if from == 0 && to == 0 {
            return tail(&path);
        }

        if metadata.len() > LARGE_FILE_THRESHOLD {
            indexed_range(&path, from, to)
        } else {
            buffered_scan(&path, from, to)
        }
    }
}

/// Clamp `from` up to 1 and `to` down to `total`, matching
/// `head_tail_reader.go`'s default branch: `from` is never pulled down to
/// fit inside the file, so a request entirely past the end of the file
/// (`from > total`) still reports empty rather than silently shifting the
/// window.
fn clamp_range(from: u64, to: u64, total: u64) -> Option<(u64, u64)> {
    if total == 0 {
        return None;
    }
    let from = from.max(1);
    let to = to.min(total);
    if to < from {
        None
    } else {
        Some((from, to))
    }
}

fn tail(path: &Path) -> std::io::Result<(Vec<String>, u64)> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let mut window: VecDeque<String> = VecDeque::with_capacity(TAIL_WINDOW);
    let mut total: u64 = 0;

    for line in reader.lines() {
        let line = line?;
        total += 1;
        if window.len() == TAIL_WINDOW {
            window.pop_front();
        }
        window.push_back(line);
    }

    Ok((window.into_iter().collect(), total))
}

fn buffered_scan(path: &Path, from: u64, to: u64) -> std::io::Result<(Vec<String>, u64)> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let all: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    let total = all.len() as u64;

    match clamp_range(from, to, total) {
        None => Ok((Vec::new(), total)),
        Some((from, to)) => {
            let start = (from - 1) as usize;
            let end = to as usize;
            Ok((all[start..end].to_vec(), total))
        }
    }
}

/// Build a sparse index of line-start byte offsets with one raw scan (no
/// UTF-8 decoding, no per-line allocation), then seek directly to the
/// requested range and decode only those bytes.
fn indexed_range(path: &Path, from: u64, to: u64) -> std::io::Result<(Vec<String>, u64)> {
    let mut file = std::fs::File::open(path)?;
    let mut offsets: Vec<u64> = vec![0];
    let mut pos: u64 = 0;
    let mut buf = [0u8; 64 * 1024];
    let mut reader = BufReader::new(&mut file);

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        for (i, &b) in buf[..n].iter().enumerate() {
            if b == b'\n' {
                offsets.push(pos + i as u64 + 1);
            }
        }
        pos += n as u64;
    }
    // `offsets` now holds one entry per line start plus a trailing entry for
    // EOF if the file didn't end in a newline; total lines is bounded by
    // however many start offsets come before EOF.
    let file_len = pos;
    if offsets.last() != Some(&file_len) {
        offsets.push(file_len);
    }
    let total = offsets.len() as u64 - 1;

    match clamp_range(from, to, total) {
        None => Ok((Vec::new(), total)),
        Some((from, to)) => {
            let start_offset = offsets[(from - 1) as usize];
            let end_offset = offsets[to as usize];
            let mut file = std::fs::File::open(path)?;
            file.seek(SeekFrom::Start(start_offset))?;
            let mut chunk = vec![0u8; (end_offset - start_offset) as usize];
            file.read_exact(&mut chunk)?;
            let text = String::from_utf8_lossy(&chunk);
            let lines = text.lines().map(|s| s.to_string()).collect();
            Ok((lines, total))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_lines(dir: &Path, task_id: i64, n: usize) {
        let mut content = String::new();
        for i in 1..=n {
            content.push_str(&format!("line {i}\n"));
        }
        std::fs::write(log_file_path(dir, task_id), content).unwrap();
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reader = LogReader::new(dir.path());
        let (lines, total) = reader.read(1, 1, 5).unwrap();
        assert!(lines.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn zero_zero_returns_last_100_or_fewer() {
        let dir = tempfile::tempdir().unwrap();
        write_lines(dir.path(), 1, 3);
        let reader = LogReader::new(dir.path());
        let (lines, total) = reader.read(1, 0, 0).unwrap();
        assert_eq!(total, 3);
        assert_eq!(lines, vec!["line 1", "line 2", "line 3"]);

        write_lines(dir.path(), 2, 250);
        let (lines, total) = reader.read(2, 0, 0).unwrap();
        assert_eq!(total, 250);
        assert_eq!(lines.len(), 100);
        assert_eq!(lines[0], "line 151");
        assert_eq!(lines[99], "line 250");
    }

    #[test]
    fn small_file_bounded_range_matches_full_scan_slice() {
        let dir = tempfile::tempdir().unwrap();
        write_lines(dir.path(), 1, 10);
        let reader = LogReader::new(dir.path());
        let (lines, total) = reader.read(1, 3, 5).unwrap();
        assert_eq!(total, 10);
        assert_eq!(lines, vec!["line 3", "line 4", "line 5"]);
    }

    #[test]
    fn inverted_range_after_clamping_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        write_lines(dir.path(), 1, 5);
        let reader = LogReader::new(dir.path());
        let (lines, total) = reader.read(1, 9, 20).unwrap();
        assert_eq!(total, 5);
        assert!(lines.is_empty());
    }

    #[test]
    fn large_file_uses_indexed_range_and_matches_full_scan() {
        let dir = tempfile::tempdir().unwrap();
        // Force the file over the 1 MiB threshold with padded lines.
        let mut content = String::new();
        for i in 1..=40_000 {
            content.push_str(&format!("{i:07} padding-padding-padding-padding\n"));
        }
        assert!(content.len() as u64 > LARGE_FILE_THRESHOLD);
        std::fs::write(log_file_path(dir.path(), 3), &content).unwrap();

        let reader = LogReader::new(dir.path());
        let (lines, total) = reader.read(3, 100, 105).unwrap();
        assert_eq!(total, 40_000);
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("0000100"));
        assert!(lines[5].starts_with("0000105"));
    }
}
