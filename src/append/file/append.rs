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

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::SystemTime;

use crate::Error;
use crate::Layout;
use crate::append::Append;
use crate::append::file::retention;
use crate::append::file::retention::DiskUsage;
use crate::append::file::retention::RetentionMatch;
use crate::append::file::retention::RetentionPolicy;
use crate::append::file::retention::SweepReport;
use crate::append::file::rolling::RollingFileWriter;
use crate::append::file::rolling::RollingFileWriterBuilder;
use crate::clock::Clock;
use crate::layout::StructuredLayout;
use crate::record::Record;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// Default size in bytes at which the active file rotates.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
/// Default number of backups kept by rotation.
pub const DEFAULT_MAX_LOG_FILES: usize = 5;
/// Default age in days past which log files are swept.
pub const DEFAULT_RETENTION_DAYS: u64 = 14;

/// A builder to configure and create an [`File`] appender.
#[derive(Debug)]
pub struct FileBuilder {
    log_path: PathBuf,
    layout: Box<dyn Layout>,
    max_size: u64,
    max_files: usize,
    retention: RetentionPolicy,
    clock: Clock,
    trap: Arc<dyn Trap>,
}

impl FileBuilder {
    /// Create a new file appender builder writing to `log_path`.
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            layout: Box::new(StructuredLayout::default()),
            max_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_LOG_FILES,
            retention: RetentionPolicy::new(DEFAULT_RETENTION_DAYS),
            clock: Clock::default(),
            trap: Arc::new(DefaultTrap::default()),
        }
    }

    /// Build the [`File`] appender.
    ///
    /// Log files older than the retention period, or beyond the disk limit, are swept before the
    /// active file is opened. The outcome is available from [`File::startup_sweep`].
    ///
    /// # Errors
    ///
    /// Return an error if either:
    ///
    /// * The log path has no file name.
    /// * The log directory cannot be created.
    /// * The active log file cannot be opened.
    pub fn build(self) -> Result<File, Error> {
        let FileBuilder {
            log_path,
            layout,
            max_size,
            max_files,
            retention,
            clock,
            trap,
        } = self;

        let now = SystemTime::from(clock.now());
        let startup = retention::sweep(&log_path, retention, now, &*trap);

        let writer = RollingFileWriterBuilder::new(&log_path)
            .max_file_size(max_size)
            .max_log_files(max_files)
            .trap(Arc::clone(&trap))
            .build()?;

        Ok(File {
            writer: Mutex::new(writer),
            layout,
            log_path,
            retention,
            clock,
            trap,
            startup,
        })
    }

    /// Set the layout for the logs.
    ///
    /// Default to [`StructuredLayout`].
    ///
    /// # Examples
    ///
    /// ```
    /// use drishti::append::FileBuilder;
    /// use drishti::layout::SimpleLayout;
    ///
    /// let builder = FileBuilder::new("logs/app.log");
    /// builder.layout(SimpleLayout::default());
    /// ```
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Set the trap for handling errors during logging.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Trap) -> Self {
        self.trap = Arc::new(trap);
        self
    }

    /// Set a trap shared with other components.
    pub fn shared_trap(mut self, trap: Arc<dyn Trap>) -> Self {
        self.trap = trap;
        self
    }

    /// Set the size in bytes at which the active file rotates. Zero disables rotation.
    ///
    /// Default to 1 MiB.
    pub fn max_file_size(mut self, n: u64) -> Self {
        self.max_size = n;
        self
    }

    /// Set the number of numbered backups to keep. Zero truncates the full file in place.
    ///
    /// Default to 5.
    pub fn max_log_files(mut self, n: usize) -> Self {
        self.max_files = n;
        self
    }

    /// Set the retention period in days. Zero disables sweeping.
    ///
    /// Default to 14.
    pub fn retention_days(mut self, days: u64) -> Self {
        self.retention.days = days;
        self
    }

    /// Set the total size in bytes the log set may take on disk. Sweeps delete the least recently
    /// modified backups past it. Zero disables the limit.
    ///
    /// Default to 0.
    pub fn max_disk_bytes(mut self, n: u64) -> Self {
        self.retention.max_disk_bytes = n;
        self
    }

    /// Set which files of the log directory a sweep considers.
    ///
    /// Default to [`RetentionMatch::Prefix`].
    pub fn retention_match(mut self, matching: RetentionMatch) -> Self {
        self.retention.matching = matching;
        self
    }

    #[cfg(test)]
    fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

/// An appender that writes log records to a size-rotated file.
#[derive(Debug)]
pub struct File {
    writer: Mutex<RollingFileWriter>,
    layout: Box<dyn Layout>,
    log_path: PathBuf,
    retention: RetentionPolicy,
    clock: Clock,
    trap: Arc<dyn Trap>,
    startup: SweepReport,
}

impl File {
    fn writer(&self) -> MutexGuard<'_, RollingFileWriter> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The path of the active log file.
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// The limits applied by this appender's sweeps.
    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// The outcome of the sweep that ran when this appender was built.
    pub fn startup_sweep(&self) -> &SweepReport {
        &self.startup
    }

    /// Run a retention sweep now.
    ///
    /// Writes are held off for the duration. If the sweep removed the active file, it is
    /// recreated.
    pub fn sweep(&self) -> SweepReport {
        let mut writer = self.writer();
        let now = SystemTime::from(self.clock.now());
        let report = retention::sweep(&self.log_path, self.retention, now, &*self.trap);

        if !self.log_path.exists()
            && let Err(err) = writer.reopen()
        {
            self.trap.trap(&err);
        }

        report
    }

    /// Measure the files of this appender's log set.
    pub fn disk_usage(&self) -> Result<DiskUsage, Error> {
        retention::disk_usage(&self.log_path, self.retention.matching)
    }
}

impl Append for File {
    fn append(&self, record: &Record) -> Result<(), Error> {
        // format under the lock so timestamps follow file order
        let mut writer = self.writer();
        let mut bytes = self.layout.format(record)?;
        bytes.push(b'\n');
        writer.write_all(&bytes).map_err(Error::from_io_error)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        let mut writer = self.writer();
        writer.flush().map_err(|err| {
            Error::new(crate::ErrorKind::Flush, "failed to flush log file").with_source(err)
        })?;
        Ok(())
    }
}

impl Drop for File {
    fn drop(&mut self) {
        let writer = self.writer.get_mut().unwrap_or_else(|e| e.into_inner());
        let _ = writer.flush();
    }
}
