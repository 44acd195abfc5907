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

use std::io;
use std::io::Write;

use crate::Error;
use crate::ErrorKind;
use crate::Layout;
use crate::append::Append;
use crate::layout::StructuredLayout;
use crate::record::Record;

/// The standard stream a [`Console`] writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleTarget {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
}

impl std::str::FromStr for ConsoleTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("stdout") {
            Ok(ConsoleTarget::Stdout)
        } else if s.eq_ignore_ascii_case("stderr") {
            Ok(ConsoleTarget::Stderr)
        } else {
            Err(Error::new(
                ErrorKind::Config,
                format!("unknown console stream: {s:?}"),
            ))
        }
    }
}

/// An appender that prints log records to standard output or standard error.
///
/// Each record is written with a single `write_all` while holding the stream's lock, so lines from
/// concurrent callers never interleave.
///
/// # Examples
///
/// ```
/// use drishti::append::Console;
/// use drishti::append::ConsoleTarget;
/// use drishti::layout::SimpleLayout;
///
/// let console = Console::new(ConsoleTarget::Stderr).with_layout(SimpleLayout::default());
/// ```
#[derive(Debug)]
pub struct Console {
    target: ConsoleTarget,
    layout: Box<dyn Layout>,
}

impl Default for Console {
    fn default() -> Self {
        Console::new(ConsoleTarget::Stdout)
    }
}

impl Console {
    /// Create a console appender with the default [`StructuredLayout`].
    pub fn new(target: ConsoleTarget) -> Self {
        Self {
            target,
            layout: Box::new(StructuredLayout::default()),
        }
    }

    /// Set the layout.
    ///
    /// Default to [`StructuredLayout`].
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// The stream this appender writes to.
    pub fn target(&self) -> ConsoleTarget {
        self.target
    }
}

fn write_record(layout: &dyn Layout, record: &Record, mut out: impl Write) -> Result<(), Error> {
    let mut bytes = layout.format(record)?;
    bytes.push(b'\n');
    out.write_all(&bytes).map_err(Error::from_io_error)
}

impl Append for Console {
    fn append(&self, record: &Record) -> Result<(), Error> {
        // format under the stream lock so timestamps follow output order
        match self.target {
            ConsoleTarget::Stdout => write_record(&*self.layout, record, io::stdout().lock()),
            ConsoleTarget::Stderr => write_record(&*self.layout, record, io::stderr().lock()),
        }
    }

    fn flush(&self) -> Result<(), Error> {
        match self.target {
            ConsoleTarget::Stdout => io::stdout().flush(),
            ConsoleTarget::Stderr => io::stderr().flush(),
        }
        .map_err(|err| Error::new(ErrorKind::Flush, "failed to flush console").with_source(err))
    }
}
