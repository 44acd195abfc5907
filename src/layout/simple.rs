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

use crate::Error;
use crate::clock::Clock;
use crate::layout::Layout;
use crate::layout::format_utc_seconds;
use crate::record::Record;

/// A layout that formats log record as a concise line without source, metadata or failure.
///
/// Output format:
///
/// ```text
/// [2024-08-11T14:44:57] [ERROR] Hello error!
/// [2024-08-11T14:44:57] [INFO] Hello info!
/// ```
///
/// The timestamp is taken when the record is formatted, in UTC with second precision.
#[derive(Debug, Clone, Default)]
pub struct SimpleLayout {
    clock: Clock,
}

impl Layout for SimpleLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let mut text = String::new();
        let time = format_utc_seconds(self.clock.now());
        let level = record.level();
        let message = record.payload();
        write!(&mut text, "[{time}] [{level}] {message}").map_err(Error::from_fmt_error)?;
        Ok(text.into_bytes())
    }
}
