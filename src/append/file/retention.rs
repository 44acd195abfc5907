// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Age- and size-based deletion of rotated log files.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;

use crate::Error;
use crate::ErrorKind;
use crate::trap::Trap;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Which directory entries belong to a log file's set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionMatch {
    /// The base name itself, or any name starting with `base_name.`.
    ///
    /// Besides numbered backups this also matches unrelated files that share the prefix, such as
    /// `app.log.old-export`.
    #[default]
    Prefix,
    /// The base name itself, or `base_name.N` where `N` is a decimal integer.
    Numeric,
}

impl RetentionMatch {
    /// Whether `filename` belongs to the set of `base_name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use drishti::append::file::RetentionMatch;
    ///
    /// assert!(RetentionMatch::Prefix.matches("app.log", "app.log.old-export"));
    /// assert!(!RetentionMatch::Numeric.matches("app.log", "app.log.old-export"));
    /// assert!(RetentionMatch::Numeric.matches("app.log", "app.log.12"));
    /// assert!(!RetentionMatch::Prefix.matches("app.log", "other.log"));
    /// ```
    pub fn matches(&self, base_name: &str, filename: &str) -> bool {
        if filename == base_name {
            return true;
        }
        let Some(rest) = filename
            .strip_prefix(base_name)
            .and_then(|rest| rest.strip_prefix('.'))
        else {
            return false;
        };
        match self {
            RetentionMatch::Prefix => true,
            RetentionMatch::Numeric => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()),
        }
    }
}

impl std::str::FromStr for RetentionMatch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("prefix") {
            Ok(RetentionMatch::Prefix)
        } else if s.eq_ignore_ascii_case("numeric") {
            Ok(RetentionMatch::Numeric)
        } else {
            Err(Error::new(
                ErrorKind::Config,
                format!("unknown retention match: {s:?}"),
            ))
        }
    }
}

/// The outcome of one retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Files that matched the log set, aged or not.
    pub candidates: usize,
    /// Files that were deleted.
    pub deleted: Vec<PathBuf>,
    /// Total size of the deleted files.
    pub bytes_freed: u64,
    /// Number of failures handed to the trap.
    pub errors: usize,
}

/// Current on-disk footprint of a log set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskUsage {
    /// Sum of the sizes of all files in the set.
    pub total_bytes: u64,
    /// Number of files in the set.
    pub file_count: usize,
    /// The least recently modified file.
    pub oldest: Option<PathBuf>,
    /// The most recently modified file.
    pub newest: Option<PathBuf>,
}

#[derive(Debug)]
struct LogFile {
    filepath: PathBuf,
    len: u64,
    modified: Option<SystemTime>,
}

// Split an active log path into the directory to scan and the base name to match.
pub(crate) fn split_log_path(log_path: &Path) -> Result<(PathBuf, String), Error> {
    let base_name = log_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            Error::new(ErrorKind::Init, "log file path has no UTF-8 file name")
                .with_context("path", log_path.display())
        })?;
    let dir = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, base_name.to_string()))
}

fn list_logfiles(
    dir: &Path,
    base_name: &str,
    matching: RetentionMatch,
) -> Result<Vec<LogFile>, Error> {
    let read_dir = fs::read_dir(dir).map_err(|err| {
        Error::new(ErrorKind::Retention, "failed to read log dir")
            .with_context("dir", dir.display())
            .with_source(err)
    })?;

    let files = read_dir
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let metadata = entry.metadata().ok()?;
            // the sink only creates regular files; never touch directories or symlinks
            if !metadata.is_file() {
                return None;
            }

            let filename = entry.file_name();
            // if the filename is not a UTF-8 string, skip it.
            let filename = filename.to_str()?;
            if !matching.matches(base_name, filename) {
                return None;
            }

            Some(LogFile {
                filepath: entry.path(),
                len: metadata.len(),
                modified: metadata.modified().ok(),
            })
        })
        .collect();

    Ok(files)
}

/// Limits applied by a retention sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Files last modified more than this many days ago are deleted. Zero disables the age pass.
    pub days: u64,
    /// Upper bound on the total size of the log set. Zero disables the size pass.
    pub max_disk_bytes: u64,
    /// Which directory entries belong to the log set.
    pub matching: RetentionMatch,
}

impl RetentionPolicy {
    /// An age-only policy over the [`RetentionMatch::Prefix`] set.
    pub fn new(days: u64) -> Self {
        RetentionPolicy {
            days,
            max_disk_bytes: 0,
            matching: RetentionMatch::default(),
        }
    }

    /// Set the total size bound of the log set.
    pub fn max_disk_bytes(mut self, max_disk_bytes: u64) -> Self {
        self.max_disk_bytes = max_disk_bytes;
        self
    }

    /// Set which directory entries belong to the log set.
    pub fn matching(mut self, matching: RetentionMatch) -> Self {
        self.matching = matching;
        self
    }

    fn is_disabled(&self) -> bool {
        self.days == 0 && self.max_disk_bytes == 0
    }
}

/// Delete the files of the log set at `log_path` that the `policy` no longer allows.
///
/// Only the directory containing `log_path` is scanned; subdirectories are never entered.
///
/// The age pass deletes a file iff its modification time is strictly older than `now` minus
/// `policy.days`. The size pass then, if the remaining set is larger than
/// `policy.max_disk_bytes`, deletes the least recently modified files until it fits. The size pass
/// never deletes the active file itself.
///
/// A failure to delete one file is handed to `trap` and the sweep goes on with the remaining
/// candidates.
pub fn sweep(
    log_path: &Path,
    policy: RetentionPolicy,
    now: SystemTime,
    trap: &dyn Trap,
) -> SweepReport {
    sweep_with(log_path, policy, now, trap, &|path: &Path| fs::remove_file(path))
}

fn sweep_with(
    log_path: &Path,
    policy: RetentionPolicy,
    now: SystemTime,
    trap: &dyn Trap,
    remove: &dyn Fn(&Path) -> io::Result<()>,
) -> SweepReport {
    let mut report = SweepReport::default();
    if policy.is_disabled() {
        return report;
    }

    let (dir, base_name) = match split_log_path(log_path) {
        Ok(parts) => parts,
        Err(err) => {
            trap.trap(&err);
            report.errors += 1;
            return report;
        }
    };

    // a missing directory has nothing to sweep
    if !dir.is_dir() {
        return report;
    }

    let files = match list_logfiles(&dir, &base_name, policy.matching) {
        Ok(files) => files,
        Err(err) => {
            trap.trap(&err);
            report.errors += 1;
            return report;
        }
    };
    report.candidates = files.len();

    let delete = |file: &LogFile, reason: &'static str, report: &mut SweepReport| -> bool {
        match remove(&file.filepath) {
            Ok(()) => {
                report.bytes_freed += file.len;
                report.deleted.push(file.filepath.clone());
                true
            }
            Err(err) => {
                let err = Error::new(ErrorKind::Retention, reason)
                    .with_context("path", file.filepath.display())
                    .with_source(err);
                trap.trap(&err);
                report.errors += 1;
                false
            }
        }
    };

    let remaining = if policy.days == 0 {
        files
    } else {
        let retention = Duration::from_secs(policy.days.saturating_mul(SECONDS_PER_DAY));
        let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);
        let mut remaining = Vec::with_capacity(files.len());
        for file in files {
            let aged = file.modified.is_some_and(|modified| modified < cutoff);
            // a file that failed to delete still counts toward the size bound
            if !aged || !delete(&file, "failed to delete aged log", &mut report) {
                remaining.push(file);
            }
        }
        remaining
    };

    if policy.max_disk_bytes == 0 {
        return report;
    }

    let mut total: u64 = remaining.iter().map(|file| file.len).sum();
    if total <= policy.max_disk_bytes {
        return report;
    }

    let mut backups: Vec<LogFile> = remaining
        .into_iter()
        .filter(|file| file.filepath.file_name() != Some(OsStr::new(&base_name)))
        .collect();
    // oldest first; files without a modification time go first
    backups.sort_by_key(|file| file.modified);
    for file in backups {
        if total <= policy.max_disk_bytes {
            break;
        }
        if delete(&file, "failed to delete log over disk limit", &mut report) {
            total = total.saturating_sub(file.len);
        }
    }

    report
}

/// Measure the log set at `log_path`.
///
/// # Errors
///
/// Return an error if the log directory cannot be read.
pub fn disk_usage(log_path: &Path, matching: RetentionMatch) -> Result<DiskUsage, Error> {
    let (dir, base_name) = split_log_path(log_path)?;
    let files = list_logfiles(&dir, &base_name, matching)?;

    let mut usage = DiskUsage {
        file_count: files.len(),
        ..DiskUsage::default()
    };
    let mut oldest: Option<SystemTime> = None;
    let mut newest: Option<SystemTime> = None;
    for file in files {
        usage.total_bytes += file.len;
        let Some(modified) = file.modified else {
            continue;
        };
        if oldest.is_none_or(|t| modified < t) {
            oldest = Some(modified);
            usage.oldest = Some(file.filepath.clone());
        }
        if newest.is_none_or(|t| modified > t) {
            newest = Some(modified);
            usage.newest = Some(file.filepath);
        }
    }

    Ok(usage)
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::fs::FileTimes;
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;

    const DAY: Duration = Duration::from_secs(SECONDS_PER_DAY);

    #[derive(Debug, Default)]
    struct CollectingTrap {
        errors: Mutex<Vec<String>>,
    }

    impl Trap for CollectingTrap {
        fn trap(&self, err: &Error) {
            self.errors.lock().unwrap().push(err.to_string());
        }
    }

    fn touch(path: &Path, content: &[u8], age: Duration) {
        fs::write(path, content).unwrap();
        let mtime = SystemTime::now() - age;
        let file = File::options().write(true).open(path).unwrap();
        file.set_times(FileTimes::new().set_modified(mtime)).unwrap();
    }

    #[test]
    fn test_sweep_deletes_only_aged_candidates() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("app.log");
        touch(&log, b"fresh", DAY);
        touch(&temp_dir.path().join("app.log.1"), b"stale-one", 20 * DAY);
        touch(&temp_dir.path().join("app.log.2"), b"recent", 2 * DAY);
        touch(&temp_dir.path().join("other.log"), b"unrelated", 100 * DAY);

        let trap = CollectingTrap::default();
        let report = sweep(&log, RetentionPolicy::new(14), SystemTime::now(), &trap);

        assert_eq!(report.candidates, 3);
        assert_eq!(report.deleted, vec![temp_dir.path().join("app.log.1")]);
        assert_eq!(report.bytes_freed, 9);
        assert_eq!(report.errors, 0);
        assert!(log.exists());
        assert!(temp_dir.path().join("app.log.2").exists());
        assert!(temp_dir.path().join("other.log").exists());
        assert!(trap.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_prefix_match_includes_lookalikes() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("app.log");
        let export = temp_dir.path().join("app.log.old-export");
        touch(&export, b"x", 30 * DAY);

        let trap = CollectingTrap::default();
        let numeric = RetentionPolicy::new(14).matching(RetentionMatch::Numeric);
        let report = sweep(&log, numeric, SystemTime::now(), &trap);
        assert!(report.deleted.is_empty());
        assert!(export.exists());

        let report = sweep(&log, RetentionPolicy::new(14), SystemTime::now(), &trap);
        assert_eq!(report.deleted, vec![export.clone()]);
        assert!(!export.exists());
    }

    #[test]
    fn test_sweep_skips_directories() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("app.log");
        let nested = temp_dir.path().join("app.log.d");
        fs::create_dir(&nested).unwrap();
        touch(&nested.join("app.log"), b"deep", 30 * DAY);

        let trap = CollectingTrap::default();
        let report = sweep(&log, RetentionPolicy::new(1), SystemTime::now(), &trap);
        assert_eq!(report.candidates, 0);
        assert!(nested.join("app.log").exists());
    }

    #[test]
    fn test_zero_days_disables_sweep() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("app.log");
        touch(&log, b"ancient", 3650 * DAY);

        let trap = CollectingTrap::default();
        let report = sweep(&log, RetentionPolicy::new(0), SystemTime::now(), &trap);
        assert_eq!(report, SweepReport::default());
        assert!(log.exists());
    }

    #[test]
    fn test_missing_directory_is_empty_sweep() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("nope").join("app.log");

        let trap = CollectingTrap::default();
        let report = sweep(&log, RetentionPolicy::new(14), SystemTime::now(), &trap);
        assert_eq!(report, SweepReport::default());
        assert!(trap.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cutoff_is_strict() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("app.log");
        touch(&log, b"edge", 14 * DAY);
        let mtime = fs::metadata(&log).unwrap().modified().unwrap();

        // exactly at the cutoff survives
        let trap = CollectingTrap::default();
        let report = sweep(&log, RetentionPolicy::new(14), mtime + 14 * DAY, &trap);
        assert!(report.deleted.is_empty());

        let after = mtime + 14 * DAY + Duration::from_secs(1);
        let report = sweep(&log, RetentionPolicy::new(14), after, &trap);
        assert_eq!(report.deleted, vec![log]);
    }

    #[test]
    fn test_disk_usage() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("app.log");
        touch(&log, b"0123456789", Duration::ZERO);
        touch(&temp_dir.path().join("app.log.1"), b"01234", DAY);
        touch(&temp_dir.path().join("app.log.2"), b"012", 2 * DAY);
        touch(&temp_dir.path().join("unrelated.txt"), b"0123456789", 9 * DAY);

        let usage = disk_usage(&log, RetentionMatch::Numeric).unwrap();
        assert_eq!(usage.file_count, 3);
        assert_eq!(usage.total_bytes, 18);
        assert_eq!(usage.oldest, Some(temp_dir.path().join("app.log.2")));
        assert_eq!(usage.newest, Some(log));
    }

    #[test]
    fn test_disk_limit_deletes_oldest_backups_first() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("app.log");
        touch(&log, b"0123456789", 30 * DAY);
        touch(&temp_dir.path().join("app.log.1"), b"0123456789", DAY);
        touch(&temp_dir.path().join("app.log.2"), b"0123456789", 2 * DAY);
        touch(&temp_dir.path().join("app.log.3"), b"0123456789", 3 * DAY);

        // the age pass is off, so only the size bound applies
        let policy = RetentionPolicy::new(0).max_disk_bytes(25);
        let trap = CollectingTrap::default();
        let report = sweep(&log, policy, SystemTime::now(), &trap);

        assert_eq!(report.candidates, 4);
        assert_eq!(
            report.deleted,
            vec![
                temp_dir.path().join("app.log.3"),
                temp_dir.path().join("app.log.2"),
            ]
        );
        assert_eq!(report.bytes_freed, 20);
        assert_eq!(report.errors, 0);
        // the active file is the oldest but is never removed for size
        assert!(log.exists());
        assert!(temp_dir.path().join("app.log.1").exists());
        assert_eq!(disk_usage(&log, RetentionMatch::Prefix).unwrap().total_bytes, 20);
    }

    #[test]
    fn test_disk_limit_runs_after_age_pass() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("app.log");
        touch(&log, b"01234", Duration::ZERO);
        touch(&temp_dir.path().join("app.log.1"), b"01234", DAY);
        touch(&temp_dir.path().join("app.log.2"), b"01234", 2 * DAY);
        touch(&temp_dir.path().join("app.log.3"), b"01234", 20 * DAY);

        let policy = RetentionPolicy::new(14).max_disk_bytes(10);
        let trap = CollectingTrap::default();
        let report = sweep(&log, policy, SystemTime::now(), &trap);

        assert_eq!(
            report.deleted,
            vec![
                temp_dir.path().join("app.log.3"),
                temp_dir.path().join("app.log.2"),
            ]
        );
        assert_eq!(report.bytes_freed, 10);
        assert!(temp_dir.path().join("app.log.1").exists());

        // within the bound, nothing more goes
        let report = sweep(&log, policy, SystemTime::now(), &trap);
        assert!(report.deleted.is_empty());
        assert!(trap.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_delete_is_trapped_and_sweep_continues() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("app.log");
        let stuck = temp_dir.path().join("app.log.2");
        touch(&temp_dir.path().join("app.log.1"), b"one", 20 * DAY);
        touch(&stuck, b"two", 21 * DAY);
        touch(&temp_dir.path().join("app.log.3"), b"three", 22 * DAY);

        let remove = |path: &Path| {
            if path == stuck.as_path() {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
            } else {
                fs::remove_file(path)
            }
        };
        let trap = CollectingTrap::default();
        let report = sweep_with(&log, RetentionPolicy::new(14), SystemTime::now(), &trap, &remove);

        assert_eq!(report.candidates, 3);
        assert_eq!(report.errors, 1);
        assert_eq!(report.deleted.len(), 2);
        assert_eq!(report.bytes_freed, 8);
        assert!(stuck.exists());
        assert!(!temp_dir.path().join("app.log.1").exists());
        assert!(!temp_dir.path().join("app.log.3").exists());

        let errors = trap.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("failed to delete aged log"), "{}", errors[0]);
        assert!(errors[0].contains("read-only"), "{}", errors[0]);
    }

    #[test]
    fn test_split_log_path() {
        let (dir, base) = split_log_path(Path::new("app.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(base, "app.log");

        let (dir, base) = split_log_path(Path::new("/var/log/svc/app.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/svc"));
        assert_eq!(base, "app.log");

        assert!(split_log_path(Path::new("/")).is_err());
    }
}
