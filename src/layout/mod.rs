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

//! Layouts for formatting log records.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::Error;
use crate::record::Record;

mod simple;
mod structured;

pub use self::simple::SimpleLayout;
pub use self::structured::StructuredLayout;

/// A layout for formatting log records.
pub trait Layout: fmt::Debug + Send + Sync + 'static {
    /// Formats a log record into one output line, without the trailing newline.
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error>;
}

impl<T: Layout> From<T> for Box<dyn Layout> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// The console formatting choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    /// `[timestamp] [LEVEL] [source] message metadata` with an optional failure trace.
    #[default]
    Structured,
    /// `[timestamp] [LEVEL] message`.
    Simple,
}

impl FormatMode {
    /// Build the layout for this mode.
    pub fn layout(self) -> Box<dyn Layout> {
        match self {
            FormatMode::Structured => Box::new(StructuredLayout::default()),
            FormatMode::Simple => Box::new(SimpleLayout::default()),
        }
    }
}

impl FromStr for FormatMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("structured") {
            Ok(FormatMode::Structured)
        } else if s.eq_ignore_ascii_case("simple") {
            Ok(FormatMode::Simple)
        } else {
            Err(Error::new(
                crate::ErrorKind::Config,
                format!("unknown format mode: {s:?}"),
            ))
        }
    }
}

// UTC, no offset suffix; callers append fractional digits and `Z` as needed.
fn format_utc_seconds(ts: Timestamp) -> impl fmt::Display {
    ts.to_zoned(TimeZone::UTC).strftime("%Y-%m-%dT%H:%M:%S")
}
