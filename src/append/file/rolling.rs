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

use std::ffi::OsString;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::Error;
use crate::ErrorKind;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// A writer that rotates its file by size, keeping numbered backups.
///
/// Backups are named by appending `.1`, `.2`, ... to the active path; `.1` is the most recent.
#[derive(Debug)]
pub struct RollingFileWriter {
    state: State,
    writer: File,
}

impl Drop for RollingFileWriter {
    fn drop(&mut self) {
        if let Err(err) = self.writer.flush() {
            let err = Error::new(ErrorKind::Flush, "failed to flush file writer on dropped")
                .with_source(err);
            self.state.trap.trap(&err);
        }
    }
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // a line always lands whole in one file
        self.writer.write_all(buf)?;
        self.state.current_filesize += buf.len() as u64;

        if self.state.should_rollover_on_size() {
            self.refresh_writer();
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl RollingFileWriter {
    /// The path of the active log file.
    pub fn path(&self) -> &Path {
        &self.state.log_path
    }

    /// Bytes written to the active file, including what it held when opened.
    pub fn current_filesize(&self) -> u64 {
        self.state.current_filesize
    }

    // Reopen the active path, e.g. after it was removed underneath us.
    pub(crate) fn reopen(&mut self) -> Result<(), Error> {
        let file = self.state.open_log_writer()?;
        self.state.current_filesize = file.metadata().map(|m| m.len()).unwrap_or(0);
        if let Err(err) = self.writer.flush() {
            let err = Error::new(ErrorKind::Flush, "failed to flush previous writer")
                .with_source(err);
            self.state.trap.trap(&err);
        }
        self.writer = file;
        Ok(())
    }

    fn refresh_writer(&mut self) {
        match self.state.rotate_log_writer() {
            Ok(new_file) => {
                if let Err(err) = self.writer.flush() {
                    let err = Error::new(ErrorKind::Flush, "failed to flush previous writer")
                        .with_source(err);
                    self.state.trap.trap(&err);
                }
                self.writer = new_file;
                self.state.current_filesize = 0;
            }
            Err(err) => {
                // keep writing to the current handle and try again on the next write
                self.state.trap.trap(&err);
            }
        }
    }
}

/// A builder for configuring [`RollingFileWriter`].
#[derive(Debug)]
pub struct RollingFileWriterBuilder {
    // required
    log_path: PathBuf,

    // has default
    max_size: u64,
    max_files: usize,
    trap: Box<dyn Trap>,
}

impl RollingFileWriterBuilder {
    /// Creates a new [`RollingFileWriterBuilder`].
    #[must_use]
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            max_size: 0,
            max_files: 0,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the trap for the rolling file writer.
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Set the number of backups to keep.
    ///
    /// Zero keeps no backup: a full file is truncated in place.
    #[must_use]
    pub fn max_log_files(mut self, n: usize) -> Self {
        self.max_files = n;
        self
    }

    /// Set the size in bytes at which the active file rotates.
    ///
    /// Zero disables rotation.
    #[must_use]
    pub fn max_file_size(mut self, n: u64) -> Self {
        self.max_size = n;
        self
    }

    /// Builds the [`RollingFileWriter`].
    ///
    /// An existing file at the path is appended to and its size counts towards the next rotation.
    pub fn build(self) -> Result<RollingFileWriter, Error> {
        let Self {
            log_path,
            max_size,
            max_files,
            trap,
        } = self;

        if log_path.file_name().is_none() {
            return Err(Error::new(ErrorKind::Init, "log file path has no file name")
                .with_context("path", log_path.display()));
        }

        if let Some(log_dir) = log_path.parent()
            && !log_dir.as_os_str().is_empty()
        {
            fs::create_dir_all(log_dir).map_err(|err| {
                Error::new(ErrorKind::Init, "failed to create log directory")
                    .with_context("dir", log_dir.display())
                    .with_source(err)
            })?;
        }

        let mut state = State {
            log_path,
            current_filesize: 0,
            max_size,
            max_files,
            trap,
        };

        let writer = state.open_log_writer()?;
        state.current_filesize = writer
            .metadata()
            .map_err(|err| {
                Error::new(ErrorKind::Init, "failed to stat log file")
                    .with_context("path", state.log_path.display())
                    .with_source(err)
            })?
            .len();

        Ok(RollingFileWriter { state, writer })
    }
}

#[derive(Debug)]
struct State {
    log_path: PathBuf,
    current_filesize: u64,
    max_size: u64,
    max_files: usize,
    trap: Box<dyn Trap>,
}

impl State {
    fn open_log_writer(&self) -> Result<File, Error> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|err| {
                Error::new(ErrorKind::Init, "failed to open log file")
                    .with_context("path", self.log_path.display())
                    .with_source(err)
            })
    }

    fn create_log_writer(&self) -> Result<File, Error> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.log_path)
            .map_err(|err| {
                Error::new(ErrorKind::Rotate, "failed to create log file")
                    .with_context("path", self.log_path.display())
                    .with_source(err)
            })
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut path = OsString::from(self.log_path.as_os_str());
        path.push(format!(".{index}"));
        PathBuf::from(path)
    }

    fn rotate_log_writer(&self) -> Result<File, Error> {
        if self.max_files == 0 {
            return self.create_log_writer();
        }

        let oldest = self.backup_path(self.max_files);
        if fs::exists(&oldest).is_ok_and(|ok| ok) {
            fs::remove_file(&oldest).map_err(|err| {
                Error::new(ErrorKind::Rotate, "failed to remove oldest log")
                    .with_context("path", oldest.display())
                    .with_source(err)
            })?;
        }

        for i in (1..self.max_files).rev() {
            let filepath = self.backup_path(i);
            if fs::exists(&filepath).is_ok_and(|ok| ok) {
                let next = self.backup_path(i + 1);
                fs::rename(&filepath, &next).map_err(|err| {
                    Error::new(ErrorKind::Rotate, "failed to shift log")
                        .with_context("from", filepath.display())
                        .with_context("to", next.display())
                        .with_source(err)
                })?;
            }
        }

        // someone may have removed the active file; there is nothing to archive then
        if fs::exists(&self.log_path).is_ok_and(|ok| ok) {
            let archive = self.backup_path(1);
            fs::rename(&self.log_path, &archive).map_err(|err| {
                Error::new(ErrorKind::Rotate, "failed to archive log")
                    .with_context("path", self.log_path.display())
                    .with_source(err)
            })?;
        }

        self.create_log_writer()
    }

    fn should_rollover_on_size(&self) -> bool {
        self.max_size > 0 && self.current_filesize >= self.max_size
    }
}
