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

//! Log record and level.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;

use crate::metadata::Metadata;

/// An enum representing the available severity levels, ordered from the least to the most severe.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    /// Designates lower priority information.
    Debug = 0,
    /// Designates useful information.
    Info = 1,
    /// Designates hazardous situations.
    Warning = 2,
    /// Designates very serious errors.
    Error = 3,
    /// Designates failures the application may not survive.
    Critical = 4,
}

impl Level {
    /// All levels, least severe first.
    pub const ALL: [Level; 5] = [
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /// Return the string representation of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// Parse a level name, falling back to [`Level::Info`] for anything unknown.
    ///
    /// # Examples
    ///
    /// ```
    /// use drishti::Level;
    ///
    /// assert_eq!(Level::parse_or_default("error"), Level::Error);
    /// assert_eq!(Level::parse_or_default("loud"), Level::Info);
    /// ```
    pub fn parse_or_default(s: &str) -> Level {
        s.parse().unwrap_or(Level::Info)
    }

    pub(crate) fn from_u8(n: u8) -> Level {
        match n {
            0 => Level::Debug,
            1 => Level::Info,
            2 => Level::Warning,
            3 => Level::Error,
            _ => Level::Critical,
        }
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when a string is not a known level name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed level: {:?}", self.0)
    }
}

impl StdError for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Level, Self::Err> {
        let s = s.trim();
        for (name, level) in [
            ("debug", Level::Debug),
            ("info", Level::Info),
            ("warning", Level::Warning),
            ("warn", Level::Warning),
            ("error", Level::Error),
            ("critical", Level::Critical),
        ] {
            if s.eq_ignore_ascii_case(name) {
                return Ok(level);
            }
        }

        Err(ParseLevelError(s.to_string()))
    }
}

impl serde::Serialize for Level {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A captured error: its name, message and an optional multi-line trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    name: Cow<'static, str>,
    message: String,
    trace: Option<String>,
}

impl Failure {
    /// Create a failure from its parts.
    pub fn new(name: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            trace: None,
        }
    }

    /// Attach trace text, printed on the lines following the failure description.
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        let trace = trace.into();
        self.trace = if trace.is_empty() { None } else { Some(trace) };
        self
    }

    /// Capture an error value.
    ///
    /// The name is the error's type name without its module path. The trace lists the chain of
    /// [`source`](StdError::source) errors, one `caused by:` line each.
    ///
    /// # Examples
    ///
    /// ```
    /// use drishti::Failure;
    ///
    /// let err = "x".parse::<u32>().unwrap_err();
    /// let failure = Failure::capture(&err);
    /// assert_eq!(failure.name(), "ParseIntError");
    /// ```
    pub fn capture<E: StdError + ?Sized>(err: &E) -> Self {
        let name = short_type_name(std::any::type_name::<E>());
        let mut trace = String::new();
        let mut source = err.source();
        while let Some(cause) = source {
            if !trace.is_empty() {
                trace.push('\n');
            }
            trace.push_str("    caused by: ");
            trace.push_str(&cause.to_string());
            source = cause.source();
        }
        Failure::new(name, err.to_string()).with_trace(trace)
    }

    /// The error's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The error's message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The captured trace, if any.
    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }
}

impl From<&anyhow::Error> for Failure {
    fn from(err: &anyhow::Error) -> Self {
        let mut trace = String::new();
        for cause in err.chain().skip(1) {
            if !trace.is_empty() {
                trace.push('\n');
            }
            trace.push_str("    caused by: ");
            trace.push_str(&cause.to_string());
        }
        Failure::new("Error", err.to_string()).with_trace(trace)
    }
}

// "core::num::error::ParseIntError" -> "ParseIntError"; generic arguments are kept intact.
fn short_type_name(name: &'static str) -> &'static str {
    let head = name.split('<').next().unwrap_or(name);
    match head.rfind("::") {
        Some(pos) => &name[pos + 2..],
        None => name,
    }
}

/// The payload of a log message.
///
/// A record is immutable once built; it is created at the moment an emit call passes the level
/// check.
#[derive(Clone, Debug)]
pub struct Record<'a> {
    // the observed time
    now: Timestamp,

    level: Level,
    source: Option<&'a str>,

    // the payload
    payload: Cow<'a, str>,

    // structural logging
    metadata: Option<&'a Metadata>,
    failure: Option<&'a Failure>,
}

impl<'a> Record<'a> {
    /// The observed time.
    pub fn time(&self) -> Timestamp {
        self.now
    }

    /// The severity of the message.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The source label of the logger that emitted the message, if any.
    pub fn source(&self) -> Option<&'a str> {
        self.source
    }

    /// The message body.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The structured metadata, if any.
    pub fn metadata(&self) -> Option<&'a Metadata> {
        self.metadata
    }

    /// The captured failure, if any.
    pub fn failure(&self) -> Option<&'a Failure> {
        self.failure
    }

    /// Returns a new builder.
    pub fn builder() -> RecordBuilder<'a> {
        RecordBuilder::default()
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder<'a> {
    record: Record<'a>,
}

impl Default for RecordBuilder<'_> {
    fn default() -> Self {
        RecordBuilder {
            record: Record {
                now: Timestamp::now(),
                level: Level::Info,
                source: None,
                payload: Cow::Borrowed(""),
                metadata: None,
                failure: None,
            },
        }
    }
}

impl<'a> RecordBuilder<'a> {
    /// Set [`level`](Record::level).
    pub fn level(mut self, level: Level) -> Self {
        self.record.level = level;
        self
    }

    /// Set [`source`](Record::source). An empty label counts as no label.
    pub fn source(mut self, source: Option<&'a str>) -> Self {
        self.record.source = source.filter(|s| !s.is_empty());
        self
    }

    /// Set [`payload`](Record::payload).
    pub fn payload(mut self, payload: impl Into<Cow<'a, str>>) -> Self {
        self.record.payload = payload.into();
        self
    }

    /// Set [`metadata`](Record::metadata).
    pub fn metadata(mut self, metadata: Option<&'a Metadata>) -> Self {
        self.record.metadata = metadata;
        self
    }

    /// Set [`failure`](Record::failure).
    pub fn failure(mut self, failure: Option<&'a Failure>) -> Self {
        self.record.failure = failure;
        self
    }

    /// Set [`time`](Record::time).
    pub fn time(mut self, now: Timestamp) -> Self {
        self.record.now = now;
        self
    }

    /// Invoke the builder and return a `Record`
    pub fn build(self) -> Record<'a> {
        self.record
    }
}
