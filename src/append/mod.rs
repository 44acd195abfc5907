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

//! Sinks that receive formatted log records.

use std::fmt;
use std::sync::Arc;

use crate::Error;
use crate::record::Record;

pub mod file;
mod memory;
mod stdio;
mod testing;

pub use self::file::File;
pub use self::file::FileBuilder;
pub use self::memory::Memory;
pub use self::stdio::Console;
pub use self::stdio::ConsoleTarget;
pub use self::testing::Testing;

/// An output destination for log records.
///
/// Implementations must write each record as one unit: lines from concurrent callers may be
/// reordered, but never interleaved.
pub trait Append: fmt::Debug + Send + Sync + 'static {
    /// Format and write a log record.
    fn append(&self, record: &Record) -> Result<(), Error>;

    /// Flush any buffered records.
    ///
    /// Default to a no-op.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: Append> From<T> for Box<dyn Append> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

impl<T: Append + ?Sized> Append for Arc<T> {
    fn append(&self, record: &Record) -> Result<(), Error> {
        (**self).append(record)
    }

    fn flush(&self) -> Result<(), Error> {
        (**self).flush()
    }
}
