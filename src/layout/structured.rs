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

use std::fmt::Write;

#[cfg(feature = "colored")]
use colored::Color;
#[cfg(feature = "colored")]
use colored::Colorize;

use crate::Error;
use crate::Level;
use crate::clock::Clock;
use crate::layout::Layout;
use crate::layout::format_utc_seconds;
use crate::record::Record;

/// A layout that formats log record as a structured line.
///
/// Output format:
///
/// ```text
/// [2024-08-11T14:44:57.172Z] [INFO] [Checkout] order placed {"order_id":42,"total":19.99}
/// [2024-08-11T14:44:57.173Z] [WARNING] cache miss ratio high
/// [2024-08-11T14:44:57.174Z] [ERROR] [Storage] write failed
/// IoError: broken pipe
///     caused by: connection reset
/// ```
///
/// The `[source]` field is omitted when the record has no source, and metadata is printed as
/// compact JSON only when it is not empty. A failure is printed on the lines following the record.
/// The timestamp is taken when the record is formatted, in UTC with millisecond precision.
///
/// With the `colored` feature enabled, [`with_color`](StructuredLayout::with_color) colors the
/// level name.
#[derive(Debug, Clone, Default)]
pub struct StructuredLayout {
    clock: Clock,
    color: bool,
}

impl StructuredLayout {
    /// Color the level name. Has no effect unless the `colored` feature is enabled.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    #[cfg(feature = "colored")]
    fn write_level(&self, text: &mut String, level: Level) -> std::fmt::Result {
        if !self.color {
            return write!(text, "[{level}]");
        }
        let color = match level {
            Level::Debug => Color::Blue,
            Level::Info => Color::Green,
            Level::Warning => Color::Yellow,
            Level::Error => Color::Red,
            Level::Critical => Color::BrightRed,
        };
        write!(text, "[{}]", level.as_str().color(color))
    }

    #[cfg(not(feature = "colored"))]
    fn write_level(&self, text: &mut String, level: Level) -> std::fmt::Result {
        write!(text, "[{level}]")
    }
}

impl Layout for StructuredLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let mut text = String::new();

        let now = self.clock.now();
        let time = format_utc_seconds(now);
        let millis = now.subsec_millisecond().unsigned_abs();
        write!(&mut text, "[{time}.{millis:03}Z] ").map_err(Error::from_fmt_error)?;
        self.write_level(&mut text, record.level())
            .map_err(Error::from_fmt_error)?;

        if let Some(source) = record.source() {
            write!(&mut text, " [{source}]").map_err(Error::from_fmt_error)?;
        }

        write!(&mut text, " {}", record.payload()).map_err(Error::from_fmt_error)?;

        if let Some(metadata) = record.metadata().filter(|m| !m.is_empty()) {
            write!(&mut text, " {metadata}").map_err(Error::from_fmt_error)?;
        }

        if let Some(failure) = record.failure() {
            write!(&mut text, "\n{}: {}", failure.name(), failure.message())
                .map_err(Error::from_fmt_error)?;
            if let Some(trace) = failure.trace() {
                write!(&mut text, "\n{trace}").map_err(Error::from_fmt_error)?;
            }
        }

        Ok(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use jiff::Timestamp;

    use super::*;
    use crate::Failure;
    use crate::Metadata;
    use crate::clock::ManualClock;

    fn layout_at(now: &str) -> StructuredLayout {
        let now: Timestamp = now.parse().unwrap();
        StructuredLayout {
            clock: Clock::ManualClock(ManualClock::new(now)),
            color: false,
        }
    }

    fn format(layout: &StructuredLayout, record: &Record) -> String {
        String::from_utf8(layout.format(record).unwrap()).unwrap()
    }

    #[test]
    fn test_structured_with_source_and_metadata() {
        let layout = layout_at("2024-08-11T14:44:57.172105Z");
        let meta = Metadata::new().with("order_id", 42).with("total", 19.99);
        let record = Record::builder()
            .level(Level::Info)
            .source(Some("Checkout"))
            .payload("order placed")
            .metadata(Some(&meta))
            .build();

        assert_snapshot!(
            format(&layout, &record),
            @r#"[2024-08-11T14:44:57.172Z] [INFO] [Checkout] order placed {"order_id":42,"total":19.99}"#
        );
    }

    #[test]
    fn test_structured_omits_missing_fields() {
        let layout = layout_at("2024-01-02T03:04:05Z");
        let empty = Metadata::new();
        let record = Record::builder()
            .level(Level::Warning)
            .payload("cache miss ratio high")
            .metadata(Some(&empty))
            .build();

        assert_snapshot!(
            format(&layout, &record),
            @"[2024-01-02T03:04:05.000Z] [WARNING] cache miss ratio high"
        );
    }

    #[test]
    fn test_structured_failure_on_following_lines() {
        let layout = layout_at("2024-08-11T14:44:57.174Z");
        let failure =
            Failure::new("IoError", "broken pipe").with_trace("    caused by: connection reset");
        let record = Record::builder()
            .level(Level::Error)
            .source(Some("Storage"))
            .payload("write failed")
            .failure(Some(&failure))
            .build();

        assert_eq!(
            format(&layout, &record),
            "[2024-08-11T14:44:57.174Z] [ERROR] [Storage] write failed\n\
             IoError: broken pipe\n    caused by: connection reset"
        );
    }

    #[test]
    fn test_structured_failure_without_trace() {
        let layout = layout_at("2024-08-11T14:44:57.174Z");
        let failure = Failure::new("Timeout", "no reply in 5s");
        let record = Record::builder()
            .level(Level::Critical)
            .payload("upstream dead")
            .failure(Some(&failure))
            .build();

        assert_eq!(
            format(&layout, &record),
            "[2024-08-11T14:44:57.174Z] [CRITICAL] upstream dead\nTimeout: no reply in 5s"
        );
    }

    #[test]
    fn test_structured_uses_format_time() {
        let mut layout = layout_at("2024-08-11T00:00:00Z");
        let record = Record::builder()
            .time("2020-01-01T00:00:00Z".parse().unwrap())
            .payload("late")
            .build();
        layout.clock.set_now("2024-08-11T00:00:01.5Z".parse().unwrap());

        assert_snapshot!(format(&layout, &record), @"[2024-08-11T00:00:01.500Z] [INFO] late");
    }
}
